//! reddit-sentiment-etl binary entrypoint.
//! Runs the whole pipeline once, a single stage over JSON handoff files, or
//! the read-only API. Scheduling and retries belong to whatever invokes it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reddit_sentiment_etl::{
    api, bootstrap, ingest, load, metrics::Metrics, relevance, transform, PipelineConfig, RawCandidate,
};

#[derive(Parser)]
#[command(name = "reddit-sentiment-etl", version, about = "Reddit comment sentiment ETL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, classify and load once; prints the run report as JSON.
    Run,
    /// Extraction only; writes raw candidates to `--out`.
    Extract {
        #[arg(long)]
        out: PathBuf,
    },
    /// Classification only; reads raw candidates, writes classified records.
    Classify {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Load only; reads classified records and upserts them.
    Load {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the stored watermark and today's effective start.
    Watermark,
    /// Serve the read API and `/metrics`.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,
    },
}

/// `RUST_LOG` filter (default `info`), compact text or JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = PipelineConfig::load()?;

    match cli.command {
        Command::Run => {
            let pipeline = bootstrap::build_pipeline(&cfg).await?;
            let report = pipeline.run_once().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Extract { out } => {
            let store = bootstrap::connect_store(&cfg).await?;
            let fetcher = bootstrap::build_fetcher(&cfg)?;
            let start = relevance::watermark_start(store.watermark().await?, chrono::Utc::now());
            let keywords = relevance::KeywordSet::new(&cfg.keywords);
            let extraction =
                ingest::extract(&fetcher, &cfg.sources, &keywords, cfg.extract_settings(), start).await;
            write_json(&out, &extraction.candidates)?;
            info!(count = extraction.candidates.len(), out = %out.display(), "wrote raw candidates");
        }
        Command::Classify { input, out } => {
            let raw: Vec<RawCandidate> = read_json(&input)?;
            let classifier = bootstrap::build_classifier(&cfg).await?;
            let classified = transform::classify_all(&classifier, raw).await;
            write_json(&out, &classified.records)?;
            info!(count = classified.records.len(), out = %out.display(), "wrote classified records");
        }
        Command::Load { input } => {
            let rows: Vec<load::PendingRow> = read_json(&input)?;
            let store = bootstrap::connect_store(&cfg).await?;
            let report = load::load(&store, rows).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Watermark => {
            let store = bootstrap::connect_store(&cfg).await?;
            let stored = store.watermark().await?;
            let start = relevance::watermark_start(stored, chrono::Utc::now());
            println!(
                "{}",
                serde_json::json!({ "last_extracted_timestamp": stored, "watermark_start": start })
            );
        }
        Command::Serve { bind } => {
            let metrics = Metrics::init()?;
            let store = bootstrap::connect_store(&cfg).await?;
            let app = api::router(api::AppState { store }).merge(metrics.router());
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            info!(%bind, "serving read api");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
