// src/ingest/reddit.rs
//! Reddit JSON API client: subreddit visibility + paged recent comments.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use tracing::debug;

use crate::ingest::types::{FetchError, SourceFetcher, SourceItem};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_USER_AGENT: &str = "reddit_sentiment_bot/0.1";
const PAGE_MAX: usize = 100;

#[derive(Debug, Deserialize)]
struct About {
    data: AboutData,
}

#[derive(Debug, Deserialize)]
struct AboutData {
    #[serde(default)]
    subreddit_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Comment,
}

#[derive(Debug, Deserialize)]
struct Comment {
    #[serde(default)]
    id: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    permalink: String,
}

pub struct RedditFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl RedditFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (mirrors, local fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        source: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                source_name: source.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::NotPublic(source.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Transport {
                source_name: source.to_string(),
                message: format!("http status {status}"),
            });
        }

        resp.json::<T>().await.map_err(|e| FetchError::Decode {
            source_name: source.to_string(),
            message: e.to_string(),
        })
    }

    async fn subreddit_type(&self, source: &str) -> Result<String, FetchError> {
        let url = format!("{}/r/{}/about.json", self.base_url, source);
        let about: About = self.get_json(source, &url, &[]).await?;
        Ok(about.data.subreddit_type.unwrap_or_else(|| "public".to_string()))
    }
}

fn items_from_listing(listing: Listing) -> (Vec<SourceItem>, Option<String>) {
    let items = listing
        .data
        .children
        .into_iter()
        .map(|c| SourceItem {
            id: c.data.id,
            body: html_escape::decode_html_entities(c.data.body.as_deref().unwrap_or_default())
                .into_owned(),
            created_at: c.data.created_utc as i64,
            permalink: format!("https://reddit.com{}", c.data.permalink),
            is_public: true,
        })
        .collect();
    (items, listing.data.after)
}

#[async_trait]
impl SourceFetcher for RedditFetcher {
    async fn fetch_recent(&self, source: &str, limit: usize) -> Result<Vec<SourceItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let kind = self.subreddit_type(source).await?;
        if kind != "public" {
            debug!(target: "extract", %source, subreddit_type = %kind, "not paging a non-public source");
            return Err(FetchError::NotPublic(source.to_string()));
        }

        let url = format!("{}/r/{}/comments.json", self.base_url, source);
        let mut out: Vec<SourceItem> = Vec::new();
        let mut after: Option<String> = None;

        while out.len() < limit {
            let page = (limit - out.len()).min(PAGE_MAX);
            let mut query = vec![("limit", page.to_string())];
            if let Some(a) = &after {
                query.push(("after", a.clone()));
            }

            let listing: Listing = self.get_json(source, &url, &query).await?;
            let (mut items, next) = items_from_listing(listing);
            if items.is_empty() {
                break;
            }
            items.truncate(limit - out.len());
            out.append(&mut items);

            match next {
                Some(n) => after = Some(n),
                None => break,
            }
        }

        histogram!("extract_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("extract_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
