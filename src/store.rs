// src/store.rs
//! SQLite-backed store for classified comments and the extraction watermark.
//!
//! The `reddit_comments` layout is shared with read-only consumers and must not
//! change. Writes go through `upsert_batch`, which commits the rows and the
//! watermark in one transaction.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::LoadError;

pub const WATERMARK_KEY: &str = "last_extracted_timestamp";
pub const DEFAULT_READ_LIMIT: u32 = 100;
pub const MAX_READ_LIMIT: u32 = 10_000;

const CREATE_COMMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS reddit_comments (
        id TEXT PRIMARY KEY,
        subreddit TEXT,
        comment_clean TEXT,
        sentiment TEXT,
        confidence FLOAT,
        created_utc TIMESTAMP,
        url TEXT
    )
"#;

const CREATE_COMMENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_reddit_comments_created_utc ON reddit_comments (created_utc)";

const CREATE_STATE: &str = r#"
    CREATE TABLE IF NOT EXISTS pipeline_state (
        key TEXT PRIMARY KEY,
        value INTEGER NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )
"#;

// Provenance columns are written once; only the classification is refreshed.
const UPSERT_COMMENT: &str = r#"
    INSERT INTO reddit_comments
        (id, subreddit, comment_clean, sentiment, confidence, created_utc, url)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        sentiment = excluded.sentiment,
        confidence = excluded.confidence
"#;

// Never moves backwards, even if an older batch commits last.
const ADVANCE_WATERMARK: &str = r#"
    INSERT INTO pipeline_state (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT (key) DO UPDATE SET
        value = MAX(value, excluded.value),
        updated_at = excluded.updated_at
"#;

/// One persisted comment, exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub id: String,
    pub subreddit: String,
    pub comment_clean: String,
    pub sentiment: String,
    pub confidence: f64,
    pub created_utc: DateTime<Utc>,
    pub url: String,
}

/// Filters for the read side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentQuery {
    pub limit: Option<u32>,
    pub subreddit: Option<String>,
    pub sentiment: Option<String>,
}

impl RecentQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_READ_LIMIT).clamp(1, MAX_READ_LIMIT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: i64,
    pub average_confidence: Option<f64>,
    pub by_subreddit: Vec<(String, i64)>,
    pub by_sentiment: Vec<(String, i64)>,
}

/// Explicitly constructed store handle; clone freely (the pool is shared).
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `url` and make sure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, LoadError> {
        let opts = SqliteConnectOptions::from_str(url)
            .map_err(LoadError::db("parse database url"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(LoadError::db("connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        info!(target: "load", %url, "connected to database");
        Ok(store)
    }

    /// Private in-memory database; a single pinned connection keeps it alive.
    pub async fn in_memory() -> Result<Self, LoadError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(LoadError::db("parse database url"))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(LoadError::db("connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), LoadError> {
        for ddl in [CREATE_COMMENTS, CREATE_COMMENTS_INDEX, CREATE_STATE] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(LoadError::db("ensure schema"))?;
        }
        debug!(target: "load", "verified reddit_comments table exists");
        Ok(())
    }

    /// Upsert all rows and advance the watermark to their newest `created_utc`,
    /// atomically. Returns the number of rows written.
    pub async fn upsert_batch(&self, rows: &[StoredRow]) -> Result<u64, LoadError> {
        let Some(newest) = rows.iter().map(|r| r.created_utc.timestamp()).max() else {
            return Ok(0);
        };

        // Any early return drops `tx`, which rolls the whole batch back.
        let mut tx = self.pool.begin().await.map_err(LoadError::db("begin"))?;

        let mut affected = 0u64;
        for r in rows {
            let res = sqlx::query(UPSERT_COMMENT)
                .bind(&r.id)
                .bind(&r.subreddit)
                .bind(&r.comment_clean)
                .bind(&r.sentiment)
                .bind(r.confidence)
                .bind(r.created_utc)
                .bind(&r.url)
                .execute(&mut *tx)
                .await
                .map_err(LoadError::db("upsert"))?;
            affected += res.rows_affected();
        }

        sqlx::query(ADVANCE_WATERMARK)
            .bind(WATERMARK_KEY)
            .bind(newest)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(LoadError::db("advance watermark"))?;

        tx.commit().await.map_err(LoadError::db("commit"))?;
        Ok(affected)
    }

    pub async fn watermark(&self) -> Result<Option<i64>, LoadError> {
        let row = sqlx::query("SELECT value FROM pipeline_state WHERE key = ?")
            .bind(WATERMARK_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(LoadError::db("read watermark"))?;
        row.map(|r| r.try_get::<i64, _>("value"))
            .transpose()
            .map_err(LoadError::db("read watermark"))
    }

    pub async fn get(&self, id: &str) -> Result<Option<StoredRow>, LoadError> {
        let row = sqlx::query(
            "SELECT id, subreddit, comment_clean, sentiment, confidence, created_utc, url \
             FROM reddit_comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(LoadError::db("get"))?;
        row.as_ref()
            .map(row_to_stored)
            .transpose()
            .map_err(LoadError::db("get"))
    }

    pub async fn count(&self) -> Result<i64, LoadError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reddit_comments")
            .fetch_one(&self.pool)
            .await
            .map_err(LoadError::db("count"))
    }

    /// Newest first, bounded.
    pub async fn recent(&self, q: &RecentQuery) -> Result<Vec<StoredRow>, LoadError> {
        let rows = sqlx::query(
            r#"
            SELECT id, subreddit, comment_clean, sentiment, confidence, created_utc, url
            FROM reddit_comments
            WHERE (?1 IS NULL OR subreddit = ?1)
              AND (?2 IS NULL OR sentiment = ?2)
            ORDER BY created_utc DESC
            LIMIT ?3
            "#,
        )
        .bind(q.subreddit.as_deref())
        .bind(q.sentiment.as_deref())
        .bind(q.effective_limit() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(LoadError::db("recent"))?;

        rows.iter()
            .map(row_to_stored)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LoadError::db("recent"))
    }

    pub async fn summary(&self) -> Result<Summary, LoadError> {
        let (total, average_confidence): (i64, Option<f64>) =
            sqlx::query_as("SELECT COUNT(*), AVG(confidence) FROM reddit_comments")
                .fetch_one(&self.pool)
                .await
                .map_err(LoadError::db("summary"))?;

        let by_subreddit = self.grouped_counts("subreddit").await?;
        let by_sentiment = self.grouped_counts("sentiment").await?;

        Ok(Summary {
            total,
            average_confidence,
            by_subreddit,
            by_sentiment,
        })
    }

    async fn grouped_counts(&self, column: &'static str) -> Result<Vec<(String, i64)>, LoadError> {
        let sql = format!(
            "SELECT COALESCE({column}, ''), COUNT(*) AS n FROM reddit_comments \
             GROUP BY {column} ORDER BY n DESC, 1 ASC"
        );
        sqlx::query_as::<_, (String, i64)>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(LoadError::db("summary"))
    }
}

fn row_to_stored(row: &SqliteRow) -> Result<StoredRow, sqlx::Error> {
    Ok(StoredRow {
        id: row.try_get("id")?,
        subreddit: row.try_get::<Option<String>, _>("subreddit")?.unwrap_or_default(),
        comment_clean: row.try_get::<Option<String>, _>("comment_clean")?.unwrap_or_default(),
        sentiment: row
            .try_get::<Option<String>, _>("sentiment")?
            .unwrap_or_else(|| "neutral".to_string()),
        confidence: row.try_get::<Option<f64>, _>("confidence")?.unwrap_or(0.0),
        created_utc: row.try_get("created_utc")?,
        url: row.try_get::<Option<String>, _>("url")?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: &str, ts: i64, sentiment: &str) -> StoredRow {
        StoredRow {
            id: id.into(),
            subreddit: "India".into(),
            comment_clean: format!("comment {id}"),
            sentiment: sentiment.into(),
            confidence: 0.5,
            created_utc: Utc.timestamp_opt(ts, 0).unwrap(),
            url: format!("https://reddit.com/{id}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let store = Store::in_memory().await.unwrap();
        assert_eq!(store.upsert_batch(&[]).await.unwrap(), 0);
        assert_eq!(store.watermark().await.unwrap(), None);
    }

    #[tokio::test]
    async fn recent_orders_newest_first_and_filters() {
        let store = Store::in_memory().await.unwrap();
        store
            .upsert_batch(&[row("a", 100, "positive"), row("b", 300, "negative"), row("c", 200, "positive")])
            .await
            .unwrap();

        let all = store.recent(&RecentQuery::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let pos = store
            .recent(&RecentQuery {
                limit: Some(1),
                sentiment: Some("positive".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pos.len(), 1);
        assert_eq!(pos[0].id, "c");
    }

    #[tokio::test]
    async fn summary_counts_groups() {
        let store = Store::in_memory().await.unwrap();
        store
            .upsert_batch(&[row("a", 1, "positive"), row("b", 2, "positive"), row("c", 3, "neutral")])
            .await
            .unwrap();
        let s = store.summary().await.unwrap();
        assert_eq!(s.total, 3);
        assert_eq!(s.by_subreddit, vec![("India".to_string(), 3)]);
        assert_eq!(s.by_sentiment[0], ("positive".to_string(), 2));
        assert_eq!(s.average_confidence, Some(0.5));
    }

    #[test]
    fn read_limit_is_bounded() {
        assert_eq!(RecentQuery::default().effective_limit(), DEFAULT_READ_LIMIT);
        let q = RecentQuery {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), MAX_READ_LIMIT);
        let q = RecentQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), 1);
    }
}
