//! Data models for harvested articles.
//!
//! - [`Stub`]: what the listing page tells us about an article
//! - [`Record`]: a stub plus its extracted body text, as persisted
//! - [`RunReport`]: counters for one pass of the pipeline
//!
//! Both stubs and records are keyed by their canonical URL, exposed through
//! the [`Identified`] trait so the dedup engine can work on either.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything that carries the identity key used for deduplication.
pub trait Identified {
    /// The canonical article URL.
    fn id(&self) -> &str;
}

/// One harvested article as stored in the collection.
///
/// Fields other than `id` default when missing so that hand-edited or older
/// entries still load. Unknown fields are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    /// Canonical article URL. Sole uniqueness key.
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Extracted body text; empty when no content block matched.
    #[serde(default)]
    pub content: String,
    /// Date as published by the listing (`<time datetime>`), or empty.
    #[serde(default)]
    pub date: String,
    /// Thumbnail URL. Serialized as `null` when the listing had none.
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Assemble a record from a listing stub and the article's body text.
    pub fn from_stub(stub: Stub, content: String, category: &str) -> Self {
        Self {
            id: stub.link,
            title: stub.title,
            content,
            date: stub.date,
            thumbnail: stub.thumbnail,
            category: category.to_string(),
            extra: Map::new(),
        }
    }
}

impl Identified for Record {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial article data parsed from one block of the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub title: String,
    /// Absolute article URL; becomes the record id.
    pub link: String,
    /// Empty when the block had no `<time>` element.
    pub date: String,
    pub thumbnail: Option<String>,
}

impl Identified for Stub {
    fn id(&self) -> &str {
        &self.link
    }
}

/// Counters collected over one run, logged at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Records present in the store at the start of the run.
    pub loaded: usize,
    /// Complete blocks found on the listing page.
    pub listed: usize,
    /// Stubs left after dropping known and repeated ids.
    pub candidates: usize,
    /// Articles fetched and extracted successfully.
    pub fetched: usize,
    /// Articles whose fetch failed and were skipped.
    pub failed: usize,
    /// Records appended to the collection.
    pub added: usize,
    /// Whether the store was rewritten.
    pub saved: bool,
}
