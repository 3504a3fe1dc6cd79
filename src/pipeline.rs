//! One harvest run: load → list → dedupe → harvest → merge → save.
//!
//! The run is strictly sequential and commits once at the end. If it aborts
//! partway, the store on disk is exactly what it was before the run. A run
//! that finds nothing new does not touch the store at all.

use futures::StreamExt;
use scraper::Html;
use std::pin::pin;
use tracing::{info, instrument, warn};

use crate::config::{ArticleErrorPolicy, Settings};
use crate::dedup::{dedupe_batch, filter_new, known_ids, merge};
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::Fetch;
use crate::listing::{list_articles, Harvester};
use crate::models::{Record, RunReport, Stub};
use crate::store::Store;

/// Run the pipeline once against `store`, using `fetcher` for every request.
#[instrument(level = "info", skip_all, fields(store = %store.path().display()))]
pub async fn run<F: Fetch>(settings: &Settings, fetcher: &F, store: &Store) -> Result<RunReport> {
    let extractor = Extractor::new(&settings.content_selectors)?;
    let mut report = RunReport::default();

    // ---- Load ----
    let existing = store.load().await?;
    report.loaded = existing.len();
    let known = known_ids(&existing);
    info!(count = report.loaded, "Loaded existing records");

    // ---- List ----
    let stubs = fetch_listing(settings, fetcher).await?;
    report.listed = stubs.len();

    // ---- Dedupe ----
    // A stub's id is its resolved link, so known articles are dropped before
    // any article page is requested.
    let mut candidates = filter_new(dedupe_batch(stubs), &known);
    if let Some(max) = settings.max_articles {
        if candidates.len() > max {
            info!(max, available = candidates.len(), "Capping articles for this run");
            candidates.truncate(max);
        }
    }
    report.candidates = candidates.len();
    info!(listed = report.listed, new = report.candidates, "Identified new articles");

    // ---- Harvest ----
    let harvester = Harvester::new(
        fetcher,
        &extractor,
        &settings.category,
        settings.request_delay(),
    );
    let fresh = match settings.on_article_error {
        ArticleErrorPolicy::Abort => harvester.build_records(candidates).await?,
        ArticleErrorPolicy::Skip => {
            let (records, failed) = harvest_skipping_failures(&harvester, candidates).await;
            report.failed = failed;
            records
        }
    };
    report.fetched = fresh.len();
    info!(count = report.fetched, "Fetched items from site");

    // ---- Merge & save ----
    let (merged, added) = merge(existing, fresh);
    report.added = added;
    if added > 0 {
        store.save(&merged).await?;
        report.saved = true;
        info!(added, total = merged.len(), "Saved new articles");
    } else {
        info!("No new articles to add");
    }

    Ok(report)
}

/// Fetch the listing page once and enumerate its stubs.
#[instrument(level = "info", skip_all)]
pub async fn fetch_listing<F: Fetch>(settings: &Settings, fetcher: &F) -> Result<Vec<Stub>> {
    let listing_url = settings.listing_url()?;
    info!(url = %listing_url, "Fetching listing page");
    let body = fetcher.fetch(listing_url.as_str()).await?;
    let document = Html::parse_document(&body);
    Ok(list_articles(&document, &settings.base_url))
}

async fn harvest_skipping_failures<F: Fetch>(
    harvester: &Harvester<'_, F>,
    stubs: Vec<Stub>,
) -> (Vec<Record>, usize) {
    let mut records = Vec::with_capacity(stubs.len());
    let mut failed = 0;
    let mut stream = pin!(harvester.record_stream(stubs));
    while let Some(outcome) = stream.next().await {
        match outcome {
            Ok(record) => records.push(record),
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Article fetch failed; leaving it for the next run");
            }
        }
    }
    (records, failed)
}
