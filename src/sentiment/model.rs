// src/sentiment/model.rs
//! Model collaborator: an opaque `infer(text) -> (label, score)` function.
//!
//! `HttpSentimentModel` talks to a text-classification inference endpoint
//! (Hugging Face inference API request/response shape). Label vocabularies
//! differ per model, so everything is funnelled through `normalize_label`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Sentiment;

/// Raw model output before thresholding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub label: String,
    pub score: f64,
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn infer(&self, text: &str) -> Result<ModelOutput>;
    fn name(&self) -> &str;
}

/// Map a model label onto the three-way sentiment.
///
/// Understands plain labels (`POSITIVE`, `neg`), `LABEL_n` ids of three-class
/// heads (0 = negative, 1 = neutral, 2 = positive) and star ratings
/// (`"4 stars"`) emitted by review-trained multilingual models.
pub fn normalize_label(label: &str) -> Option<Sentiment> {
    let l = label.trim().to_ascii_lowercase();
    match l.as_str() {
        "positive" | "pos" | "label_2" => return Some(Sentiment::Positive),
        "negative" | "neg" | "label_0" => return Some(Sentiment::Negative),
        "neutral" | "neu" | "label_1" => return Some(Sentiment::Neutral),
        _ => {}
    }

    let stars = l.strip_suffix(" stars").or_else(|| l.strip_suffix(" star"))?;
    match stars.trim().parse::<u8>().ok()? {
        1 | 2 => Some(Sentiment::Negative),
        3 => Some(Sentiment::Neutral),
        4 | 5 => Some(Sentiment::Positive),
        _ => None,
    }
}

/// Remote inference endpoint.
pub struct HttpSentimentModel {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    name: String,
}

impl HttpSentimentModel {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("reddit-sentiment-etl/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building inference http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.filter(|t| !t.trim().is_empty()),
            name: name.into(),
        })
    }
}

#[derive(Serialize)]
struct InferReq<'a> {
    inputs: &'a str,
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    async fn infer(&self, text: &str) -> Result<ModelOutput> {
        let mut req = self.http.post(&self.endpoint).json(&InferReq { inputs: text });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{}: inference request", self.name))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("{}: decoding inference response", self.name))?;
        if !status.is_success() {
            return Err(anyhow!("{}: inference endpoint returned {status}: {body}", self.name));
        }
        top_prediction(&body)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Pick the highest-scoring `{label, score}` out of `[..]` or `[[..]]`.
pub fn top_prediction(body: &Value) -> Result<ModelOutput> {
    if let Some(err) = body.get("error") {
        return Err(anyhow!("inference error: {err}"));
    }

    let mut candidates: Vec<ModelOutput> = Vec::new();
    collect_predictions(body, &mut candidates);

    candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| anyhow!("inference response carried no predictions"))
}

fn collect_predictions(v: &Value, out: &mut Vec<ModelOutput>) {
    match v {
        Value::Array(items) => items.iter().for_each(|it| collect_predictions(it, out)),
        Value::Object(_) => {
            if let Ok(p) = serde_json::from_value::<ModelOutput>(v.clone()) {
                out.push(p);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_normalize_across_vocabularies() {
        assert_eq!(normalize_label("POSITIVE"), Some(Sentiment::Positive));
        assert_eq!(normalize_label("LABEL_0"), Some(Sentiment::Negative));
        assert_eq!(normalize_label("1 star"), Some(Sentiment::Negative));
        assert_eq!(normalize_label("3 stars"), Some(Sentiment::Neutral));
        assert_eq!(normalize_label("5 stars"), Some(Sentiment::Positive));
        assert_eq!(normalize_label("9 stars"), None);
        assert_eq!(normalize_label("joy"), None);
    }

    #[test]
    fn top_prediction_handles_nested_arrays() {
        let body = json!([[
            {"label": "1 star", "score": 0.05},
            {"label": "5 stars", "score": 0.71},
            {"label": "4 stars", "score": 0.2}
        ]]);
        let out = top_prediction(&body).unwrap();
        assert_eq!(out.label, "5 stars");
        assert!((out.score - 0.71).abs() < 1e-9);
    }

    #[test]
    fn top_prediction_flat_array() {
        let body = json!([{"label": "NEGATIVE", "score": 0.93}]);
        assert_eq!(top_prediction(&body).unwrap().label, "NEGATIVE");
    }

    #[test]
    fn top_prediction_surfaces_endpoint_errors() {
        assert!(top_prediction(&json!({"error": "model loading"})).is_err());
        assert!(top_prediction(&json!([])).is_err());
    }
}
