// src/bootstrap.rs
//! One-time construction of the service handles the pipeline runs on.
//! Nothing here is global: callers own what these functions return.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::ingest::reddit::RedditFetcher;
use crate::pipeline::Pipeline;
use crate::sentiment::{HttpSentimentModel, ModelTier, ScriptDetector, SentimentModel, TieredClassifier};
use crate::store::Store;

pub async fn connect_store(cfg: &PipelineConfig) -> Result<Store> {
    Store::connect(&cfg.database_url)
        .await
        .with_context(|| format!("opening database {}", cfg.database_url))
}

async fn probe_tier(name: &str, url: Option<&str>, token: Option<String>) -> Result<Option<ModelTier>> {
    let Some(url) = url else {
        info!(target: "classify", tier = name, "no model endpoint configured; lexicon fallback only");
        return Ok(None);
    };
    let model: Arc<dyn SentimentModel> = Arc::new(HttpSentimentModel::new(name, url, token)?);
    Ok(Some(ModelTier::probe(model).await))
}

/// Build the tiered classifier, probing each configured model exactly once.
pub async fn build_classifier(cfg: &PipelineConfig) -> Result<TieredClassifier> {
    // Safe diagnostics: endpoints + token length only
    info!(
        target: "classify",
        primary = cfg.primary_model_url.as_deref().unwrap_or("-"),
        secondary = cfg.secondary_model_url.as_deref().unwrap_or("-"),
        token_len = cfg.model_api_token.as_deref().map(str::len).unwrap_or(0),
        "classifier config loaded"
    );

    let mut classifier = TieredClassifier::new(cfg.classifier_settings(), Arc::new(ScriptDetector::new()));
    if let Some(tier) = probe_tier("primary", cfg.primary_model_url.as_deref(), cfg.model_api_token.clone()).await? {
        classifier = classifier.with_primary(tier);
    }
    if let Some(tier) =
        probe_tier("secondary", cfg.secondary_model_url.as_deref(), cfg.model_api_token.clone()).await?
    {
        classifier = classifier.with_secondary(tier);
    }

    if !classifier.primary_available() && !classifier.secondary_available() {
        warn!(target: "classify", "no sentiment model available; every record uses the lexicon");
    }
    let settings = classifier.settings();
    info!(
        target: "classify",
        primary = classifier.primary_available(),
        secondary = classifier.secondary_available(),
        secondary_languages = ?settings.secondary_languages,
        threshold = settings.threshold,
        max_chars = settings.max_chars,
        "classifier ready"
    );
    Ok(classifier)
}

pub fn build_fetcher(cfg: &PipelineConfig) -> Result<RedditFetcher> {
    Ok(RedditFetcher::new(&cfg.user_agent)?.with_base_url(cfg.reddit_base_url.clone()))
}

pub async fn build_pipeline(cfg: &PipelineConfig) -> Result<Pipeline> {
    let store = connect_store(cfg).await?;
    let classifier = build_classifier(cfg).await?;
    let fetcher = Arc::new(build_fetcher(cfg)?);
    Ok(Pipeline::new(store, classifier, fetcher, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifier_without_endpoints_uses_config_settings() {
        let cfg = PipelineConfig {
            confidence_threshold: 0.75,
            secondary_languages: vec!["ta".into()],
            ..PipelineConfig::default()
        };
        let classifier = build_classifier(&cfg).await.unwrap();

        assert!(!classifier.primary_available());
        assert!(!classifier.secondary_available());
        assert_eq!(classifier.settings().threshold, 0.75);
        assert_eq!(classifier.settings().secondary_languages, vec!["ta".to_string()]);
    }
}
