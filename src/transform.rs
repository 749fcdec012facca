// src/transform.rs
//! Classification stage: RawCandidate → ClassifiedRecord via the tiered
//! classifier. A record that cannot be transformed is dropped on its own.

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Issue;
use crate::ingest::types::RawCandidate;
use crate::sentiment::{Route, Sentiment, TieredClassifier, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub id: String,
    pub source: String,
    pub clean_text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub created_at: i64,
    pub origin_url: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("record has no id")]
    MissingId,
    #[error("record {0} has no text")]
    EmptyText(String),
}

impl ClassifiedRecord {
    pub fn from_candidate(raw: RawCandidate, verdict: &Verdict) -> Result<Self, TransformError> {
        let id = raw.id.trim();
        if id.is_empty() {
            return Err(TransformError::MissingId);
        }
        let text = raw.text.trim();
        if text.is_empty() {
            return Err(TransformError::EmptyText(id.to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            source: raw.source,
            clean_text: text.to_string(),
            sentiment: verdict.sentiment,
            confidence: verdict.confidence,
            created_at: raw.created_at,
            origin_url: raw.origin_url,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteCounts {
    pub primary: usize,
    pub secondary: usize,
    pub lexicon: usize,
    pub failed: usize,
    pub empty: usize,
}

impl RouteCounts {
    fn bump(&mut self, route: Route) {
        match route {
            Route::Primary => self.primary += 1,
            Route::Secondary => self.secondary += 1,
            Route::Lexicon => self.lexicon += 1,
            Route::Failed => self.failed += 1,
            Route::Empty => self.empty += 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub records: Vec<ClassifiedRecord>,
    pub routes: RouteCounts,
    pub issues: Vec<Issue>,
}

/// Classify every candidate, in order. Never fails as a whole.
pub async fn classify_all(classifier: &TieredClassifier, raw: Vec<RawCandidate>) -> Classification {
    let mut out = Classification::default();
    if raw.is_empty() {
        info!(target: "classify", "no comments to transform");
        return out;
    }

    for candidate in raw {
        let verdict = classifier.score(&candidate.text).await;
        out.routes.bump(verdict.route);
        counter!("classify_route_total", "route" => verdict.route.as_str()).increment(1);

        let id = candidate.id.clone();
        match ClassifiedRecord::from_candidate(candidate, &verdict) {
            Ok(rec) => {
                if verdict.route == Route::Failed {
                    out.issues.push(Issue::ClassificationFallback {
                        id: rec.id.clone(),
                        language: verdict.language.clone(),
                    });
                }
                out.records.push(rec);
            }
            Err(e) => {
                warn!(target: "classify", id = %id, error = %e, "dropping record");
                counter!("classify_dropped_total").increment(1);
                out.issues.push(Issue::RecordDropped {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        target: "classify",
        transformed = out.records.len(),
        primary = out.routes.primary,
        secondary = out.routes.secondary,
        lexicon = out.routes.lexicon,
        failed = out.routes.failed,
        "classification finished"
    );
    out
}
