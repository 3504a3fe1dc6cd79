//! Harvest settings.
//!
//! Settings come from an optional YAML file; every key has a default so an
//! absent file (or an empty one) describes the stock Marketing Tech News
//! harvest. The store location is not a setting: it is always
//! [`STORE_FILE_NAME`] under the project root.
//!
//! ```yaml
//! base_url: https://www.marketingtechnews.net
//! listing_path: /news/
//! category: Marketing
//! request_delay_ms: 1500
//! on_article_error: skip
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::error::{HarvestError, Result};
use crate::extract::DEFAULT_CONTENT_SELECTORS;

/// Name of the persisted collection inside the project root.
pub const STORE_FILE_NAME: &str = "news.json";

/// Lower bound on the pause between two article fetches.
pub const MIN_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// What to do when a single article fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleErrorPolicy {
    /// Abort the whole run; nothing is saved.
    #[default]
    Abort,
    /// Log the failure, leave the article for the next run, and carry on.
    Skip,
}

/// What to do when the store file exists but cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptStorePolicy {
    /// Move the file aside and start from an empty collection.
    #[default]
    Recover,
    /// Abort the run with [`HarvestError::CorruptStore`].
    Fail,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Site root; root-relative listing links are resolved against it.
    pub base_url: String,
    /// Path of the listing page, relative to `base_url`.
    pub listing_path: String,
    /// Constant classification tag written on every record.
    pub category: String,
    /// Content block selectors, most specific first.
    pub content_selectors: Vec<String>,
    /// Pause between consecutive article fetches. Never below one second.
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Fetch at most this many new articles per run.
    pub max_articles: Option<usize>,
    pub on_article_error: ArticleErrorPolicy,
    pub corrupt_store: CorruptStorePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://www.marketingtechnews.net".to_string(),
            listing_path: "/news/".to_string(),
            category: "Marketing".to_string(),
            content_selectors: DEFAULT_CONTENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            request_delay_ms: 1000,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            max_articles: None,
            on_article_error: ArticleErrorPolicy::default(),
            corrupt_store: CorruptStorePolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    ///
    /// An explicitly named file that is missing is an error; a silent
    /// fallback would harvest the wrong site.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    HarvestError::config(format!("cannot read {}: {e}", path.display()))
                })?;
                info!(path = %path.display(), "Loaded settings file");
                if text.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(&text)?
                }
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants that the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        self.base()?;
        self.listing_url()?;
        if self.request_delay() < MIN_REQUEST_DELAY {
            return Err(HarvestError::config(format!(
                "request_delay_ms must be at least {}, got {}",
                MIN_REQUEST_DELAY.as_millis(),
                self.request_delay_ms
            )));
        }
        if self.category.trim().is_empty() {
            return Err(HarvestError::config("category must not be empty"));
        }
        if self.content_selectors.is_empty() {
            return Err(HarvestError::config("content_selectors must not be empty"));
        }
        if self.max_articles == Some(0) {
            return Err(HarvestError::config("max_articles must be positive"));
        }
        Ok(())
    }

    /// Parsed site root.
    pub fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Absolute URL of the listing page.
    pub fn listing_url(&self) -> Result<Url> {
        Ok(self.base()?.join(&self.listing_path)?)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Location of the persisted collection under `root`.
    pub fn store_path(root: &Path) -> PathBuf {
        root.join(STORE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(
            settings.listing_url().unwrap().as_str(),
            "https://www.marketingtechnews.net/news/"
        );
        assert_eq!(settings.request_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "category: Tech\non_article_error: skip\nmax_articles: 5").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.category, "Tech");
        assert_eq!(settings.on_article_error, ArticleErrorPolicy::Skip);
        assert_eq!(settings.max_articles, Some(5));
        assert_eq!(settings.base_url, Settings::default().base_url);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(Settings::load(Some(file.path())).unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/harvest.yaml"))).unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn test_rejects_short_delay() {
        let settings = Settings {
            request_delay_ms: 200,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let settings = Settings {
            base_url: "not a url".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(HarvestError::Url(_))));
    }

    #[test]
    fn test_store_path_is_fixed_name() {
        assert_eq!(
            Settings::store_path(Path::new("/srv/news")),
            PathBuf::from("/srv/news/news.json")
        );
    }
}
