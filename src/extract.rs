//! Article body extraction.
//!
//! An [`Extractor`] holds an ordered list of CSS selectors, most specific
//! first. The first selector that matches anything in the document wins and
//! the visible text of its first match becomes the article content. No match
//! is not an error: paywalled or malformed pages simply yield `""`.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{HarvestError, Result};
use crate::utils::collapse_whitespace;

/// Built-in content block selectors, tried in order.
pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[".post-content", "article", "div.content"];

/// Elements whose text is never shown to a reader.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// First-match content extractor.
#[derive(Debug, Clone)]
pub struct Extractor {
    selectors: Vec<(String, Selector)>,
}

impl Extractor {
    /// Build an extractor from CSS selectors in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Config`] if any selector does not parse.
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self> {
        let selectors = selectors
            .iter()
            .map(|css| {
                let css = css.as_ref();
                Selector::parse(css)
                    .map(|sel| (css.to_string(), sel))
                    .map_err(|e| HarvestError::config(format!("invalid selector '{css}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { selectors })
    }

    /// Return the collapsed visible text of the first matching content block,
    /// or an empty string when nothing matches.
    pub fn extract_content(&self, document: &Html) -> String {
        self.selectors
            .iter()
            .find_map(|(css, selector)| {
                document.select(selector).next().map(|block| {
                    debug!(selector = %css, "Content block matched");
                    visible_text(block)
                })
            })
            .unwrap_or_default()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        let selectors = DEFAULT_CONTENT_SELECTORS
            .iter()
            .map(|css| (css.to_string(), Selector::parse(css).unwrap()))
            .collect();
        Self { selectors }
    }
}

/// Concatenate the text nodes under `element`, skipping script-like
/// subtrees, with whitespace collapsed to single spaces.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let parts: Vec<&str> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .chain(std::iter::once(*element))
                .filter_map(|ancestor| ancestor.value().as_element())
                .any(|el| HIDDEN_TAGS.contains(&el.name()));
            (!hidden).then_some(&**text)
        })
        .collect();
    collapse_whitespace(&parts.join(" "))
}
