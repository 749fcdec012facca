// src/sentiment/mod.rs
//! Sentiment classification: lexicon fallback, language routing and the tiered
//! classifier that ties them to the transformer-style model collaborators.

pub mod lang;
pub mod lexicon;
pub mod model;
pub mod tiered;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use lang::{LanguageDetector, ScriptDetector};
pub use lexicon::LexiconClassifier;
pub use model::{HttpSentimentModel, ModelOutput, SentimentModel};
pub use tiered::{ClassifierSettings, ModelTier, TieredClassifier};

/// Three-way sentiment label stored in the `sentiment` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(anyhow::anyhow!("unknown sentiment label `{other}`")),
        }
    }
}

/// Which strategy produced a verdict. Used for logging and per-route metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Empty or whitespace-only input.
    Empty,
    Primary,
    Secondary,
    Lexicon,
    /// Detector or model errored; verdict was forced to neutral.
    Failed,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Empty => "empty",
            Route::Primary => "primary",
            Route::Secondary => "secondary",
            Route::Lexicon => "lexicon",
            Route::Failed => "failed",
        }
    }
}

/// Output of the tiered classifier for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub route: Route,
    /// Detected language code, `"unknown"` when detection failed.
    pub language: String,
}

impl Verdict {
    pub fn neutral(route: Route, language: impl Into<String>) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0.0,
            route,
            language: language.into(),
        }
    }
}

/// Round to two decimals, the precision every stored confidence carries.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
