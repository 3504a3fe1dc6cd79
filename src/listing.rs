//! Listing page parsing and per-article harvesting.
//!
//! Two phases, mirroring how the site is laid out:
//!
//! 1. **Listing**: [`list_articles`] walks the `<article>` blocks of the news
//!    index and turns each complete one into a [`Stub`].
//! 2. **Harvesting**: [`Harvester`] fetches each stub's page one at a time,
//!    pausing between requests, and extracts the body into a [`Record`].
//!
//! # Listing markup
//!
//! ```html
//! <article>
//!   <img src="https://cdn.example.com/thumb.jpg">
//!   <h3><a href="/news/2025/05/06/some-story/">Some story</a></h3>
//!   <time datetime="2025-05-06T09:00:00+00:00">6 May 2025</time>
//! </article>
//! ```
//!
//! A block without an `<h3>`, or without an `<a href>` inside it, is skipped
//! whole. Date and thumbnail are optional.
//!
//! Record ids must stay byte-for-byte stable across runs, so root-relative
//! links are prefixed with the site base as written, without URL
//! normalisation.

use futures::stream::{self, Stream, TryStreamExt};
use futures::StreamExt;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::Fetch;
use crate::models::{Record, Stub};
use crate::utils::truncate_for_log;

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Enumerate article stubs in document order.
///
/// Only top-level `<article>` elements are considered; an article nested in
/// another belongs to its parent block.
#[instrument(level = "info", skip_all, fields(base = %base))]
pub fn list_articles(document: &Html, base: &str) -> Vec<Stub> {
    let stubs: Vec<Stub> = document
        .select(&ARTICLE)
        .filter(|block| !has_article_ancestor(*block))
        .filter_map(|block| parse_block(block, base))
        .collect();
    info!(count = stubs.len(), "Listed article stubs");
    stubs
}

fn has_article_ancestor(block: ElementRef<'_>) -> bool {
    block
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "article")
}

fn parse_block(block: ElementRef<'_>, base: &str) -> Option<Stub> {
    let Some(title_el) = block.select(&TITLE).next() else {
        debug!("Block has no title; skipping");
        return None;
    };
    let title = title_text(title_el);

    let Some(href) = title_el
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
    else {
        debug!(title = %truncate_for_log(&title, 80), "Title has no link; skipping");
        return None;
    };

    let link = resolve_link(base, href);

    let date = block
        .select(&TIME)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    let thumbnail = block
        .select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string());

    Some(Stub {
        title,
        link,
        date,
        thumbnail,
    })
}

/// Prefix a root-relative link with `base`; any other link is kept as-is.
///
/// `//host/x` and dot segments are not interpreted and nothing is
/// percent-encoded.
pub fn resolve_link(base: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

/// Text nodes of a heading, each trimmed, concatenated without separator.
fn title_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fetches article pages one by one and assembles full records.
#[derive(Debug)]
pub struct Harvester<'a, F> {
    fetcher: &'a F,
    extractor: &'a Extractor,
    category: &'a str,
    delay: Duration,
}

impl<'a, F: Fetch> Harvester<'a, F> {
    /// `delay` is the minimum pause between two consecutive article fetches.
    pub fn new(fetcher: &'a F, extractor: &'a Extractor, category: &'a str, delay: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            category,
            delay,
        }
    }

    /// Lazily harvest `stubs` in order, one fetch at a time.
    ///
    /// Nothing is requested until the stream is polled. Each item is the
    /// outcome for one stub, so the caller decides whether a failure ends
    /// the run.
    pub fn record_stream(&self, stubs: Vec<Stub>) -> impl Stream<Item = Result<Record>> + '_ {
        stream::iter(stubs.into_iter().enumerate()).then(move |(i, stub)| async move {
            if i > 0 {
                sleep(self.delay).await;
            }
            self.build_record(stub).await
        })
    }

    /// Harvest every stub, stopping at the first failed fetch.
    #[instrument(level = "info", skip_all, fields(count = stubs.len()))]
    pub async fn build_records(&self, stubs: Vec<Stub>) -> Result<Vec<Record>> {
        let records: Vec<Record> = self.record_stream(stubs).try_collect().await?;
        info!(count = records.len(), "Harvested article records");
        Ok(records)
    }

    /// Fetch one article page and combine it with its stub.
    #[instrument(level = "info", skip_all, fields(url = %stub.link))]
    pub async fn build_record(&self, stub: Stub) -> Result<Record> {
        info!(title = %truncate_for_log(&stub.title, 120), "Extracting article");
        let body = self.fetcher.fetch(&stub.link).await?;
        let content = {
            let document = Html::parse_document(&body);
            self.extractor.extract_content(&document)
        };
        if content.is_empty() {
            warn!("No content block matched");
        } else {
            debug!(bytes = content.len(), "Extracted content");
        }
        Ok(Record::from_stub(stub, content, self.category))
    }
}
