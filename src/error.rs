// src/error.rs
//! Failure taxonomy.
//!
//! `Issue` covers everything a stage recovers from locally (the run continues,
//! degraded). `LoadError` is the only failure that aborts a run.

use serde::Serialize;

/// Recoverable, logged problems collected into the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// A source was non-public, unreachable or returned garbage.
    SourceUnavailable { source: String, reason: String },
    /// A field failed coercion and was defaulted.
    MalformedField {
        id: String,
        field: &'static str,
        value: String,
        defaulted_to: String,
    },
    /// Detector or model failed; the record was stored as neutral.
    ClassificationFallback { id: String, language: String },
    /// A record could not be turned into a classified record and was dropped.
    RecordDropped { id: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("database error during {stage}: {source}")]
    Database {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl LoadError {
    pub fn db(stage: &'static str) -> impl FnOnce(sqlx::Error) -> LoadError {
        move |source| LoadError::Database { stage, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("load stage failed; batch rejected and watermark left unchanged")]
    Load(#[from] LoadError),
    #[error("could not read watermark: {0}")]
    Watermark(#[source] LoadError),
}
