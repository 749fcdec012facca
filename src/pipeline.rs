// src/pipeline.rs
//! Pipeline driver: Extraction → Classification → Load, strictly in sequence.
//!
//! Each stage either completes, completes degraded (issues collected in the
//! report), or, for the load stage only, fails the run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{Issue, PipelineError};
use crate::ingest::types::{RawCandidate, SourceFetcher};
use crate::ingest::{self, ExtractSettings, ExtractStats, Extraction};
use crate::load::{self, LoadReport, PendingRow};
use crate::relevance::{self, KeywordSet};
use crate::sentiment::TieredClassifier;
use crate::store::Store;
use crate::transform::{self, Classification, RouteCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    /// Finished, but some sources, fields or records needed a fallback.
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub watermark_start: i64,
    pub extract: ExtractStats,
    pub routes: RouteCounts,
    pub classified: usize,
    pub rows_written: u64,
    /// Watermark committed by this run, if anything was loaded.
    pub watermark: Option<i64>,
    pub issues: Vec<Issue>,
}

pub struct Pipeline {
    store: Store,
    classifier: TieredClassifier,
    fetcher: Arc<dyn SourceFetcher>,
    sources: Vec<String>,
    keywords: KeywordSet,
    extract_settings: ExtractSettings,
}

impl Pipeline {
    pub fn new(
        store: Store,
        classifier: TieredClassifier,
        fetcher: Arc<dyn SourceFetcher>,
        cfg: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            fetcher,
            sources: cfg.sources.clone(),
            keywords: KeywordSet::new(&cfg.keywords),
            extract_settings: cfg.extract_settings(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Stored watermark, or midnight UTC of `now`'s day.
    pub async fn watermark_start(&self, now: DateTime<Utc>) -> Result<i64, PipelineError> {
        let stored = self
            .store
            .watermark()
            .await
            .map_err(PipelineError::Watermark)?;
        Ok(relevance::watermark_start(stored, now))
    }

    pub async fn extract(&self, now: DateTime<Utc>) -> Result<(i64, Extraction), PipelineError> {
        let start = self.watermark_start(now).await?;
        info!(target: "pipeline", watermark_start = start, sources = self.sources.len(), "extract stage");
        let extraction = ingest::extract(
            self.fetcher.as_ref(),
            &self.sources,
            &self.keywords,
            self.extract_settings,
            start,
        )
        .await;
        Ok((start, extraction))
    }

    pub async fn classify(&self, raw: Vec<RawCandidate>) -> Classification {
        transform::classify_all(&self.classifier, raw).await
    }

    pub async fn load(&self, rows: Vec<PendingRow>) -> Result<LoadReport, PipelineError> {
        Ok(load::load(&self.store, rows).await?)
    }

    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        self.run_once_at(Utc::now()).await
    }

    /// One full run with an explicit clock.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<RunReport, PipelineError> {
        let (watermark_start, extraction) = self.extract(now).await?;
        let mut issues = extraction.issues;

        let classification = self.classify(extraction.candidates).await;
        issues.extend(classification.issues);
        let classified = classification.records.len();

        let rows: Vec<PendingRow> = classification
            .records
            .into_iter()
            .map(PendingRow::from)
            .collect();
        let loaded = match self.load(rows).await {
            Ok(r) => r,
            Err(e) => {
                error!(target: "pipeline", error = %e, "run aborted in load stage");
                return Err(e);
            }
        };
        issues.extend(loaded.issues);

        let status = if issues.is_empty() {
            RunStatus::Complete
        } else {
            warn!(target: "pipeline", issues = issues.len(), "run finished degraded");
            RunStatus::Degraded
        };
        info!(
            target: "pipeline",
            extracted = extraction.stats.kept,
            classified,
            loaded = loaded.rows_written,
            ?status,
            "run finished"
        );

        Ok(RunReport {
            status,
            started_at: now,
            watermark_start,
            extract: extraction.stats,
            routes: classification.routes,
            classified,
            rows_written: loaded.rows_written,
            watermark: loaded.batch_watermark,
            issues,
        })
    }
}

