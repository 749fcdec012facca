// src/ingest/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One record as returned by the source API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: String,
    pub body: String,
    pub created_at: i64, // unix seconds
    pub permalink: String,
    pub is_public: bool,
}

/// A relevant, recent record waiting for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub id: String,
    pub source: String,
    pub text: String,
    pub created_at: i64,
    pub origin_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("source `{0}` is not public")]
    NotPublic(String),
    #[error("source `{source_name}` request failed: {message}")]
    Transport { source_name: String, message: String },
    #[error("source `{source_name}` returned an unreadable payload: {message}")]
    Decode { source_name: String, message: String },
}

/// External source API (one call per configured source).
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_recent(&self, source: &str, limit: usize) -> Result<Vec<SourceItem>, FetchError>;
    fn name(&self) -> &'static str;
}
