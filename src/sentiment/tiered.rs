// src/sentiment/tiered.rs
//! Tiered classifier: language detection → model routing → confidence gate,
//! with the lexicon as the terminal fallback. `score` never fails.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use super::lang::LanguageDetector;
use super::lexicon::LexiconClassifier;
use super::model::{normalize_label, SentimentModel};
use super::{round2, Route, Sentiment, Verdict};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MAX_MODEL_CHARS: usize = 512;
pub const DEFAULT_SECONDARY_LANGUAGES: [&str; 8] = ["hi", "ta", "mr", "bn", "gu", "kn", "ml", "ur"];

const PROBE_TEXT: &str = "The new budget is a good step.";

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub primary_language: String,
    pub secondary_languages: Vec<String>,
    /// Model scores below this are demoted to neutral (score is kept).
    pub threshold: f64,
    /// Model input is cut to this many characters.
    pub max_chars: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            primary_language: "en".to_string(),
            secondary_languages: DEFAULT_SECONDARY_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_chars: DEFAULT_MAX_MODEL_CHARS,
        }
    }
}

/// A model plus the availability flag established once at startup.
#[derive(Clone)]
pub struct ModelTier {
    model: Arc<dyn SentimentModel>,
    available: bool,
}

impl ModelTier {
    /// Run one inference to decide whether the tier is usable for this process.
    pub async fn probe(model: Arc<dyn SentimentModel>) -> Self {
        let available = match model.infer(PROBE_TEXT).await {
            Ok(out) if normalize_label(&out.label).is_some() => true,
            Ok(out) => {
                warn!(target: "classify", model = model.name(), label = %out.label, "model probe returned an unknown label");
                false
            }
            Err(e) => {
                warn!(target: "classify", model = model.name(), error = ?e, "model probe failed; tier disabled");
                false
            }
        };
        if available {
            info!(target: "classify", model = model.name(), "model tier available");
        }
        Self { model, available }
    }

    /// Skip the probe; used when the caller already knows the model works.
    pub fn assume_available(model: Arc<dyn SentimentModel>) -> Self {
        Self {
            model,
            available: true,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }
}

pub struct TieredClassifier {
    detector: Arc<dyn LanguageDetector>,
    primary: Option<ModelTier>,
    secondary: Option<ModelTier>,
    lexicon: LexiconClassifier,
    settings: ClassifierSettings,
}

impl TieredClassifier {
    pub fn new(settings: ClassifierSettings, detector: Arc<dyn LanguageDetector>) -> Self {
        Self {
            detector,
            primary: None,
            secondary: None,
            lexicon: LexiconClassifier::new(),
            settings,
        }
    }

    pub fn with_primary(mut self, tier: ModelTier) -> Self {
        self.primary = Some(tier);
        self
    }

    pub fn with_secondary(mut self, tier: ModelTier) -> Self {
        self.secondary = Some(tier);
        self
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn primary_available(&self) -> bool {
        self.primary.as_ref().is_some_and(ModelTier::is_available)
    }

    pub fn secondary_available(&self) -> bool {
        self.secondary.as_ref().is_some_and(ModelTier::is_available)
    }

    pub async fn score(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::neutral(Route::Empty, "unknown");
        }

        let language = match self.detector.detect(text) {
            Ok(code) => code,
            Err(_) => "unknown".to_string(),
        };

        let tier = if language == self.settings.primary_language && self.primary_available() {
            self.primary.as_ref().map(|t| (t, Route::Primary))
        } else if self.settings.secondary_languages.iter().any(|l| *l == language)
            && self.secondary_available()
        {
            self.secondary.as_ref().map(|t| (t, Route::Secondary))
        } else {
            None
        };

        let Some((tier, route)) = tier else {
            let (sentiment, confidence) = self.lexicon.classify(text);
            return Verdict {
                sentiment,
                confidence,
                route: Route::Lexicon,
                language,
            };
        };

        match self.run_model(tier, text).await {
            Ok((sentiment, confidence)) => Verdict {
                sentiment,
                confidence,
                route,
                language,
            },
            Err(e) => {
                warn!(target: "classify", model = tier.name(), %language, error = ?e, "sentiment scoring failed");
                Verdict::neutral(Route::Failed, language)
            }
        }
    }

    async fn run_model(&self, tier: &ModelTier, text: &str) -> Result<(Sentiment, f64)> {
        let out = tier.model.infer(truncate_chars(text, self.settings.max_chars)).await?;
        let label = normalize_label(&out.label)
            .ok_or_else(|| anyhow!("unrecognised model label `{}`", out.label))?;
        if !out.score.is_finite() || !(0.0..=1.0).contains(&out.score) {
            return Err(anyhow!("model score {} outside [0, 1]", out.score));
        }

        let confidence = round2(out.score);
        if out.score >= self.settings.threshold {
            Ok((label, confidence))
        } else {
            Ok((Sentiment::Neutral, confidence))
        }
    }
}

/// Prefix of at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::model::ModelOutput;
    use crate::sentiment::ScriptDetector;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedModel {
        label: &'static str,
        score: f64,
        seen: Mutex<Vec<String>>,
    }

    impl FixedModel {
        fn new(label: &'static str, score: f64) -> Arc<Self> {
            Arc::new(Self {
                label,
                score,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SentimentModel for FixedModel {
        async fn infer(&self, text: &str) -> Result<ModelOutput> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(ModelOutput {
                label: self.label.to_string(),
                score: self.score,
            })
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl SentimentModel for BrokenModel {
        async fn infer(&self, _text: &str) -> Result<ModelOutput> {
            Err(anyhow!("cuda out of memory"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    fn classifier() -> TieredClassifier {
        TieredClassifier::new(ClassifierSettings::default(), Arc::new(ScriptDetector::new()))
    }

    #[tokio::test]
    async fn low_confidence_is_demoted_to_neutral() {
        let c = classifier().with_primary(ModelTier::assume_available(FixedModel::new("POSITIVE", 0.4)));
        let v = c.score("this is the new budget for the state").await;
        assert_eq!(v.sentiment, Sentiment::Neutral);
        assert_eq!(v.confidence, 0.40);
        assert_eq!(v.route, Route::Primary);
    }

    #[tokio::test]
    async fn confident_label_is_kept() {
        let c = classifier().with_primary(ModelTier::assume_available(FixedModel::new("NEGATIVE", 0.987)));
        let v = c.score("this is a bad policy").await;
        assert_eq!((v.sentiment, v.confidence), (Sentiment::Negative, 0.99));
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let c = classifier().with_primary(ModelTier::assume_available(FixedModel::new("positive", 0.6)));
        let v = c.score("the scheme is fine").await;
        assert_eq!(v.sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn secondary_language_uses_secondary_model() {
        let primary = FixedModel::new("NEGATIVE", 0.99);
        let secondary = FixedModel::new("5 stars", 0.8);
        let c = classifier()
            .with_primary(ModelTier::assume_available(primary.clone()))
            .with_secondary(ModelTier::assume_available(secondary.clone()));
        let v = c.score("सरकार की योजना").await;
        assert_eq!(v.route, Route::Secondary);
        assert_eq!(v.sentiment, Sentiment::Positive);
        assert!(primary.seen.lock().unwrap().is_empty());
        assert_eq!(secondary.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_language_falls_back_to_lexicon() {
        let c = classifier().with_primary(ModelTier::assume_available(FixedModel::new("NEGATIVE", 0.99)));
        // Telugu is not in the default secondary set
        let v = c.score("ప్రభుత్వం").await;
        assert_eq!(v.route, Route::Lexicon);
        assert_eq!(v.language, "te");
    }

    #[tokio::test]
    async fn missing_model_degrades_to_lexicon() {
        let v = classifier().score("this scheme is very good and excellent").await;
        assert_eq!(v.route, Route::Lexicon);
        assert_eq!(v.sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn model_error_yields_neutral_zero() {
        let c = classifier().with_primary(ModelTier::assume_available(Arc::new(BrokenModel)));
        let v = c.score("this is a good scheme").await;
        assert_eq!(v.route, Route::Failed);
        assert_eq!((v.sentiment, v.confidence), (Sentiment::Neutral, 0.0));
    }

    #[tokio::test]
    async fn failed_probe_disables_tier() {
        let tier = ModelTier::probe(Arc::new(BrokenModel)).await;
        assert!(!tier.is_available());
        let c = classifier().with_primary(tier);
        let v = c.score("this is a good scheme").await;
        assert_eq!(v.route, Route::Lexicon);
    }

    #[tokio::test]
    async fn blank_text_short_circuits() {
        let v = classifier().score("   \n ").await;
        assert_eq!(v.route, Route::Empty);
        assert_eq!(v.confidence, 0.0);
    }

    #[tokio::test]
    async fn model_input_is_truncated() {
        let model = FixedModel::new("POSITIVE", 0.9);
        let c = classifier().with_primary(ModelTier::assume_available(model.clone()));
        let long = format!("this is {}", "é".repeat(2000));
        c.score(&long).await;
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].chars().count(), DEFAULT_MAX_MODEL_CHARS);
    }
}
