// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod ingest;
pub mod load;
pub mod metrics;
pub mod pipeline;
pub mod relevance;
pub mod sentiment;
pub mod store;
pub mod transform;

// ---- Re-exports for stable public API ----
pub use crate::config::PipelineConfig;
pub use crate::error::{Issue, LoadError, PipelineError};
pub use crate::ingest::types::{RawCandidate, SourceFetcher, SourceItem};
pub use crate::pipeline::{Pipeline, RunReport, RunStatus};
pub use crate::sentiment::{Sentiment, TieredClassifier};
pub use crate::store::{Store, StoredRow};
pub use crate::transform::ClassifiedRecord;
