// src/config/mod.rs
//! Pipeline configuration: TOML file + environment overrides + built-in defaults.
//!
//! Resolution order (later wins):
//! 1) defaults below
//! 2) `$PIPELINE_CONFIG_PATH` or `config/pipeline.toml`, when present
//! 3) individual env vars (`SUBREDDITS`, `KEYWORDS`, `MAX_COMMENTS`, ...)
//!
//! A missing file or variable is never an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ingest::reddit::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::ingest::ExtractSettings;
use crate::sentiment::tiered::{
    ClassifierSettings, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_MODEL_CHARS,
    DEFAULT_SECONDARY_LANGUAGES,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://reddit_sentiment.db";
pub const DEFAULT_SLEEP_SECONDS: f64 = 2.0;

pub const DEFAULT_SUBREDDITS: [&str; 34] = [
    "India", "AskIndia", "IndiaSpeaks", "IndianSocial", "TamilNadu", "Karnataka", "Maharashtra",
    "WestBengal", "Kerala", "Telangana", "Gujarat", "Rajasthan", "Punjab", "Bihar", "Odisha",
    "UttarPradesh", "MadhyaPradesh", "Haryana", "Jharkhand", "Assam", "Chhattisgarh",
    "AndhraPradesh", "HimachalPradesh", "Uttarakhand", "Goa", "Tripura", "Meghalaya", "Manipur",
    "Nagaland", "ArunachalPradesh", "Mizoram", "Sikkim", "AndamanAndNicobar", "Puducherry",
];

const STATE_NAMES: [&str; 31] = [
    "Tamil Nadu", "Karnataka", "Maharashtra", "West Bengal", "Kerala", "Telangana", "Gujarat",
    "Rajasthan", "Punjab", "Bihar", "Odisha", "Uttar Pradesh", "Madhya Pradesh", "Haryana",
    "Jharkhand", "Assam", "Chhattisgarh", "Andhra Pradesh", "Himachal Pradesh", "Uttarakhand",
    "Goa", "Tripura", "Meghalaya", "Manipur", "Nagaland", "Arunachal Pradesh", "Mizoram",
    "Sikkim", "Andaman", "Nicobar", "Puducherry",
];

const POLICY_KEYWORDS: [&str; 26] = [
    "government", "policy", "scheme", "minister", "cm", "chief minister", "budget", "tax",
    "healthcare", "education", "infrastructure", "railway", "election", "privatization",
    "subsidy", "reservation", "gst", "fdi", "niti aayog", "ayushman bharat", "pm kisan",
    "startup india", "digital india", "amma canteen", "kalia scheme", "shakti scheme",
];

pub fn default_subreddits() -> Vec<String> {
    DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect()
}

/// Policy keywords followed by lower-cased state names.
pub fn default_keywords() -> Vec<String> {
    POLICY_KEYWORDS
        .iter()
        .map(|s| s.to_string())
        .chain(STATE_NAMES.iter().map(|s| s.to_lowercase()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<String>,
    pub keywords: Vec<String>,
    pub max_items_per_source: usize,
    pub sleep_seconds: f64,
    pub secondary_languages: Vec<String>,
    pub confidence_threshold: f64,
    pub database_url: String,
    pub primary_model_url: Option<String>,
    pub secondary_model_url: Option<String>,
    pub model_api_token: Option<String>,
    pub user_agent: String,
    pub reddit_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: default_subreddits(),
            keywords: default_keywords(),
            max_items_per_source: 1000,
            sleep_seconds: DEFAULT_SLEEP_SECONDS,
            secondary_languages: DEFAULT_SECONDARY_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            primary_model_url: None,
            secondary_model_url: None,
            model_api_token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            reddit_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// File (if any) + process environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::from_optional_file(&path)?;
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Defaults when `path` does not exist; parse errors are reported.
    pub fn from_optional_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no pipeline config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: PipelineConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Apply overrides from an env-like lookup.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("SUBREDDITS").and_then(|raw| parse_csv(&raw)) {
            self.sources = v;
        }
        if let Some(v) = get("KEYWORDS").and_then(|raw| parse_csv(&raw)) {
            self.keywords = v;
        }
        if let Some(v) = get("SECONDARY_LANGUAGES").and_then(|raw| parse_csv(&raw)) {
            self.secondary_languages = v;
        }
        if let Some(raw) = get("MAX_COMMENTS") {
            match raw.trim().parse::<usize>() {
                Ok(n) => self.max_items_per_source = n,
                Err(_) => warn!(value = %raw, "ignoring invalid MAX_COMMENTS"),
            }
        }
        if let Some(raw) = get("SLEEP_TIME_SECONDS") {
            match raw.trim().parse::<f64>() {
                Ok(s) if Duration::try_from_secs_f64(s).is_ok() => self.sleep_seconds = s,
                _ => warn!(value = %raw, "ignoring invalid SLEEP_TIME_SECONDS"),
            }
        }
        if let Some(raw) = get("CONFIDENCE_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(t) if t.is_finite() => self.confidence_threshold = t,
                _ => warn!(value = %raw, "ignoring invalid CONFIDENCE_THRESHOLD"),
            }
        }
        if let Some(v) = non_blank(get("DATABASE_URL")) {
            self.database_url = v;
        }
        if let Some(v) = non_blank(get("PRIMARY_MODEL_URL")) {
            self.primary_model_url = Some(v);
        }
        if let Some(v) = non_blank(get("SECONDARY_MODEL_URL")) {
            self.secondary_model_url = Some(v);
        }
        if let Some(v) = non_blank(get("MODEL_API_TOKEN")) {
            self.model_api_token = Some(v);
        }
        if let Some(v) = non_blank(get("REDDIT_USER_AGENT")) {
            self.user_agent = v;
        }
        self.sanitize();
    }

    /// Harden values a file or env var could have set to something unusable.
    fn sanitize(&mut self) {
        self.sources = clean_list(std::mem::take(&mut self.sources));
        self.keywords = clean_list(std::mem::take(&mut self.keywords));
        self.secondary_languages = clean_list(std::mem::take(&mut self.secondary_languages))
            .into_iter()
            .map(|l| l.to_ascii_lowercase())
            .collect();
        if self.sources.is_empty() {
            self.sources = default_subreddits();
        }
        if self.keywords.is_empty() {
            self.keywords = default_keywords();
        }
        self.confidence_threshold = if self.confidence_threshold.is_finite() {
            self.confidence_threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_CONFIDENCE_THRESHOLD
        };
        // negative, NaN or too large for a Duration
        if Duration::try_from_secs_f64(self.sleep_seconds).is_err() {
            warn!(value = self.sleep_seconds, "unusable sleep_seconds, using default");
            self.sleep_seconds = DEFAULT_SLEEP_SECONDS;
        }
    }

    pub fn extract_settings(&self) -> ExtractSettings {
        ExtractSettings {
            limit_per_source: self.max_items_per_source,
            delay: Duration::try_from_secs_f64(self.sleep_seconds)
                .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_SLEEP_SECONDS)),
        }
    }

    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            primary_language: "en".to_string(),
            secondary_languages: self.secondary_languages.clone(),
            threshold: self.confidence_threshold,
            max_chars: DEFAULT_MAX_MODEL_CHARS,
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Comma-separated list; `None` when nothing usable is left.
pub fn parse_csv(raw: &str) -> Option<Vec<String>> {
    let v: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!v.is_empty()).then_some(v)
}

/// Trim, drop empties and duplicates, keep first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
