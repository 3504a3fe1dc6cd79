//! # News Harvest
//!
//! Incrementally harvests articles from a single news listing page into a
//! flat JSON collection, skipping articles that are already stored.
//!
//! ## Usage
//!
//! ```sh
//! news_harvest --root . --config harvest.yaml
//! ```
//!
//! ## Architecture
//!
//! Each run is one sequential pass:
//! 1. **Load**: read `news.json` (missing → empty)
//! 2. **List**: fetch the listing page once and parse article stubs
//! 3. **Dedupe**: drop stubs whose URL is already stored or repeated
//! 4. **Harvest**: fetch each remaining article, pausing between requests
//! 5. **Save**: append the new records and atomically rewrite `news.json`
//!
//! A run that finds nothing new leaves the file alone; a run that fails
//! leaves it exactly as it was.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dedup;
mod error;
mod extract;
mod fetch;
mod listing;
mod models;
mod pipeline;
mod store;
mod utils;

use cli::Cli;
use config::Settings;
use fetch::HttpFetcher;
use store::Store;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;
    info!(
        base_url = %settings.base_url,
        category = %settings.category,
        delay_ms = settings.request_delay_ms,
        "Settings ready"
    );

    // Fail before any request if the store cannot be written
    if let Err(e) = ensure_writable_dir(&args.root).await {
        error!(
            path = %args.root.display(),
            error = %e,
            "Project root is not writable (fix perms or choose a different --root)"
        );
        return Err(e.into());
    }

    let store = Store::new(Settings::store_path(&args.root), settings.corrupt_store);
    let fetcher = HttpFetcher::new(&settings)?;

    let report = match pipeline::run(&settings, &fetcher, &store).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Harvest aborted; store left unchanged");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        loaded = report.loaded,
        listed = report.listed,
        candidates = report.candidates,
        fetched = report.fetched,
        failed = report.failed,
        added = report.added,
        saved = report.saved,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
