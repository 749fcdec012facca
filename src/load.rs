// src/load.rs
//! Load stage: field-by-field normalization, then one transactional upsert that
//! also advances the watermark.
//!
//! Input rows are loosely typed on purpose. They may come straight from the
//! classifier or from a JSON handoff file written by an earlier stage run,
//! where timestamps and confidences can arrive as strings or garbage.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{Issue, LoadError};
use crate::sentiment::Sentiment;
use crate::store::{Store, StoredRow};
use crate::transform::ClassifiedRecord;

/// A row on its way into the store, before coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingRow {
    pub id: String,
    #[serde(default, alias = "source")]
    pub subreddit: String,
    #[serde(default, alias = "clean_text")]
    pub comment_clean: String,
    #[serde(default)]
    pub sentiment: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default, alias = "created_at")]
    pub created_utc: Option<Value>,
    #[serde(default, alias = "origin_url")]
    pub url: String,
}

impl From<ClassifiedRecord> for PendingRow {
    fn from(r: ClassifiedRecord) -> Self {
        Self {
            id: r.id,
            subreddit: r.source,
            comment_clean: r.clean_text,
            sentiment: Some(Value::String(r.sentiment.as_str().to_string())),
            confidence: serde_json::Number::from_f64(r.confidence).map(Value::Number),
            created_utc: Some(Value::from(r.created_at)),
            url: r.origin_url,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows_written: u64,
    /// Newest `created_utc` in the committed batch; `None` for an empty batch.
    pub batch_watermark: Option<i64>,
    pub issues: Vec<Issue>,
}

fn malformed(id: &str, field: &'static str, value: &Value, defaulted_to: &str) -> Issue {
    warn!(target: "load", %id, field, value = %value, defaulted_to, "malformed field, using default");
    Issue::MalformedField {
        id: id.to_string(),
        field,
        value: value.to_string(),
        defaulted_to: defaulted_to.to_string(),
    }
}

fn numeric(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}

/// Integer unix seconds; anything unusable becomes the epoch.
pub fn coerce_timestamp(id: &str, v: Option<&Value>, issues: &mut Vec<Issue>) -> DateTime<Utc> {
    let epoch = DateTime::<Utc>::default();
    let Some(v) = v.filter(|v| !v.is_null()) else {
        return epoch;
    };
    match numeric(v).and_then(|f| DateTime::<Utc>::from_timestamp(f.trunc() as i64, 0)) {
        Some(ts) => ts,
        None => {
            issues.push(malformed(id, "created_utc", v, "0"));
            epoch
        }
    }
}

pub fn coerce_sentiment(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => Sentiment::Neutral.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn coerce_confidence(id: &str, v: Option<&Value>, issues: &mut Vec<Issue>) -> f64 {
    let Some(v) = v.filter(|v| !v.is_null()) else {
        return 0.0;
    };
    numeric(v).unwrap_or_else(|| {
        issues.push(malformed(id, "confidence", v, "0.0"));
        0.0
    })
}

pub fn normalize(p: PendingRow, issues: &mut Vec<Issue>) -> StoredRow {
    let created_utc = coerce_timestamp(&p.id, p.created_utc.as_ref(), issues);
    let confidence = coerce_confidence(&p.id, p.confidence.as_ref(), issues);
    StoredRow {
        sentiment: coerce_sentiment(p.sentiment.as_ref()),
        confidence,
        created_utc,
        id: p.id,
        subreddit: p.subreddit,
        comment_clean: p.comment_clean,
        url: p.url,
    }
}

/// Normalize and upsert `rows` as one batch.
///
/// On error nothing from the batch is stored and the watermark is untouched;
/// the error is returned for the driver to abort the run.
pub async fn load(store: &Store, rows: Vec<PendingRow>) -> Result<LoadReport, LoadError> {
    let mut report = LoadReport::default();
    if rows.is_empty() {
        info!(target: "load", "no records to load into db");
        return Ok(report);
    }

    let normalized: Vec<StoredRow> = rows
        .into_iter()
        .map(|p| normalize(p, &mut report.issues))
        .collect();
    let newest = normalized.iter().map(|r| r.created_utc.timestamp()).max();

    match store.upsert_batch(&normalized).await {
        Ok(n) => {
            report.rows_written = n;
            report.batch_watermark = newest;
            counter!("load_rows_total").increment(n);
            if let Some(ts) = newest {
                gauge!("pipeline_watermark").set(ts as f64);
            }
            info!(target: "load", rows = n, last_extracted_timestamp = ?newest, "loaded records");
            Ok(report)
        }
        Err(e) => {
            counter!("load_failures_total").increment(1);
            error!(target: "load", error = %e, batch = normalized.len(), "failed to upsert comments");
            Err(e)
        }
    }
}

pub async fn load_records(store: &Store, records: Vec<ClassifiedRecord>) -> Result<LoadReport, LoadError> {
    load(store, records.into_iter().map(PendingRow::from).collect()).await
}
