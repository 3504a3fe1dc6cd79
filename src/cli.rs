//! Command-line interface definitions for News Harvest.
//!
//! Every option is optional; a bare `news_harvest` harvests the default site
//! into `./news.json`.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{CorruptStorePolicy, Settings};

/// Command-line arguments for the News Harvest application.
///
/// # Examples
///
/// ```sh
/// # Harvest into ./news.json
/// news_harvest
///
/// # Harvest into another project root with a settings file
/// news_harvest --root /srv/news --config harvest.yaml
///
/// # Refuse to start over if news.json is damaged
/// news_harvest --strict
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Project root holding news.json
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "NEWS_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fetch at most this many new articles
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Fail instead of starting over when news.json cannot be decoded
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(limit) = self.limit {
            settings.max_articles = Some(limit);
        }
        if self.strict {
            settings.corrupt_store = CorruptStorePolicy::Fail;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["news_harvest"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.limit, None);
        assert!(!cli.strict);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["news_harvest", "-r", "/tmp/news", "-c", "h.yaml", "-l", "5"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/news"));
        assert_eq!(cli.config, Some(PathBuf::from("h.yaml")));
        assert_eq!(cli.limit, Some(5));
    }

    #[test]
    fn test_cli_apply_overrides() {
        let cli = Cli::parse_from(["news_harvest", "--limit", "3", "--strict"]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.max_articles, Some(3));
        assert_eq!(settings.corrupt_store, CorruptStorePolicy::Fail);
    }
}
