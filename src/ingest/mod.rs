// src/ingest/mod.rs
//! Extraction stage: poll each source, apply the recency and relevance gates,
//! and collect `RawCandidate`s. One source failing never stops the others.

pub mod reddit;
pub mod types;

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::Issue;
use crate::ingest::types::{FetchError, RawCandidate, SourceFetcher, SourceItem};
use crate::relevance::{is_recent, KeywordSet};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("extract_items_total", "Items returned by the source API.");
        describe_counter!("extract_kept_total", "Items kept after recency + relevance gates.");
        describe_counter!("extract_stale_total", "Items older than the watermark.");
        describe_counter!("extract_irrelevant_total", "Items without a keyword match.");
        describe_counter!(
            "extract_source_errors_total",
            "Sources skipped as non-public or failing."
        );
        describe_histogram!("extract_fetch_ms", "Per-source fetch time in milliseconds.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSettings {
    pub limit_per_source: usize,
    /// Pause between consecutive sources.
    pub delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExtractStats {
    pub sources_polled: usize,
    pub sources_skipped: usize,
    pub fetched: usize,
    pub stale: usize,
    pub empty: usize,
    pub irrelevant: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub candidates: Vec<RawCandidate>,
    pub stats: ExtractStats,
    pub issues: Vec<Issue>,
}

impl Extraction {
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Trim and flatten line breaks so the stored text is a single line.
pub fn clean_text(body: &str) -> String {
    body.trim().replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Gate one source's items; returns the kept candidates.
pub fn filter_items(
    source: &str,
    items: Vec<SourceItem>,
    keywords: &KeywordSet,
    watermark_start: i64,
    stats: &mut ExtractStats,
) -> Vec<RawCandidate> {
    let mut kept = Vec::new();
    for item in items {
        stats.fetched += 1;
        if !is_recent(item.created_at, watermark_start) {
            stats.stale += 1;
            continue;
        }
        let body = item.body.trim();
        if body.is_empty() {
            stats.empty += 1;
            continue;
        }
        if !keywords.matches(body) {
            stats.irrelevant += 1;
            continue;
        }
        kept.push(RawCandidate {
            id: item.id,
            source: source.to_string(),
            text: clean_text(body),
            created_at: item.created_at,
            origin_url: item.permalink,
        });
    }
    stats.kept += kept.len();
    kept
}

/// Run extraction over all sources, sequentially.
pub async fn extract(
    fetcher: &dyn SourceFetcher,
    sources: &[String],
    keywords: &KeywordSet,
    settings: ExtractSettings,
    watermark_start: i64,
) -> Extraction {
    ensure_metrics_described();

    let mut out = Extraction::default();
    for (i, source) in sources.iter().enumerate() {
        if i > 0 && !settings.delay.is_zero() {
            tokio::time::sleep(settings.delay).await;
        }

        info!(target: "extract", source = %source, fetcher = fetcher.name(), "fetching comments");
        out.stats.sources_polled += 1;

        let items = match fetcher.fetch_recent(source, settings.limit_per_source).await {
            Ok(items) => items,
            Err(e) => {
                match &e {
                    FetchError::NotPublic(_) => {
                        info!(target: "extract", source = %source, "skipping non-public source")
                    }
                    _ => warn!(target: "extract", source = %source, error = %e, "skipping source due to error"),
                }
                skip_source(&mut out, source, e.to_string());
                continue;
            }
        };

        if items.iter().any(|it| !it.is_public) {
            info!(target: "extract", source = %source, "skipping non-public source");
            skip_source(&mut out, source, "source is not public".to_string());
            continue;
        }

        let before = out.stats.clone();
        let mut kept = filter_items(source, items, keywords, watermark_start, &mut out.stats);
        debug!(
            target: "extract",
            source = %source,
            stale = out.stats.stale - before.stale,
            irrelevant = out.stats.irrelevant - before.irrelevant,
            "gates applied"
        );
        info!(target: "extract", source = %source, kept = kept.len(), "source collected");
        out.candidates.append(&mut kept);
    }

    counter!("extract_kept_total").increment(out.stats.kept as u64);
    counter!("extract_stale_total").increment(out.stats.stale as u64);
    counter!("extract_irrelevant_total").increment(out.stats.irrelevant as u64);
    info!(
        target: "extract",
        total = out.candidates.len(),
        skipped_sources = out.stats.sources_skipped,
        "extraction finished"
    );
    out
}

fn skip_source(out: &mut Extraction, source: &str, reason: String) {
    counter!("extract_source_errors_total").increment(1);
    out.stats.sources_skipped += 1;
    out.issues.push(Issue::SourceUnavailable {
        source: source.to_string(),
        reason,
    });
}
