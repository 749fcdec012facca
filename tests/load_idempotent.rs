// tests/load_idempotent.rs
use reddit_sentiment_etl::load::{load, load_records, PendingRow};
use reddit_sentiment_etl::{ClassifiedRecord, Sentiment, Store};
use serde_json::json;

fn rec(id: &str, sentiment: Sentiment, confidence: f64, created_at: i64) -> ClassifiedRecord {
    ClassifiedRecord {
        id: id.to_string(),
        source: "India".to_string(),
        clean_text: format!("budget comment {id}"),
        sentiment,
        confidence,
        created_at,
        origin_url: format!("https://reddit.com/r/India/{id}"),
    }
}

async fn install_reject_trigger(store: &Store) {
    sqlx::query(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON reddit_comments \
         WHEN NEW.id = 'boom' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn second_load_overwrites_only_classification() {
    let store = Store::in_memory().await.unwrap();

    load_records(&store, vec![rec("c1", Sentiment::Positive, 0.91, 1_700_000_000)])
        .await
        .unwrap();

    // same id, different provenance and classification
    let mut again = rec("c1", Sentiment::Negative, 0.72, 1_700_009_999);
    again.source = "Kerala".into();
    again.clean_text = "edited text".into();
    again.origin_url = "https://example.test/other".into();
    load_records(&store, vec![again]).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    let row = store.get("c1").await.unwrap().expect("row");
    assert_eq!(row.sentiment, "negative");
    assert_eq!(row.confidence, 0.72);
    assert_eq!(row.subreddit, "India");
    assert_eq!(row.comment_clean, "budget comment c1");
    assert_eq!(row.url, "https://reddit.com/r/India/c1");
    assert_eq!(row.created_utc.timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn watermark_never_moves_backwards() {
    let store = Store::in_memory().await.unwrap();

    let r1 = load_records(&store, vec![rec("a", Sentiment::Neutral, 0.0, 500), rec("b", Sentiment::Neutral, 0.0, 900)])
        .await
        .unwrap();
    assert_eq!(r1.batch_watermark, Some(900));
    assert_eq!(store.watermark().await.unwrap(), Some(900));

    // an older batch (e.g. a late overlapping run) commits afterwards
    load_records(&store, vec![rec("c", Sentiment::Neutral, 0.0, 300)])
        .await
        .unwrap();
    assert_eq!(store.watermark().await.unwrap(), Some(900));

    load_records(&store, vec![rec("d", Sentiment::Neutral, 0.0, 1200)])
        .await
        .unwrap();
    assert_eq!(store.watermark().await.unwrap(), Some(1200));
}

#[tokio::test]
async fn failed_batch_commits_nothing_and_keeps_watermark() {
    let store = Store::in_memory().await.unwrap();
    load_records(&store, vec![rec("seed", Sentiment::Positive, 0.8, 1_000)])
        .await
        .unwrap();
    install_reject_trigger(&store).await;

    let batch = vec![
        rec("x1", Sentiment::Positive, 0.9, 5_000),
        rec("x2", Sentiment::Negative, 0.9, 6_000),
        rec("boom", Sentiment::Neutral, 0.1, 7_000),
    ];
    let err = load_records(&store, batch).await;
    assert!(err.is_err());

    assert_eq!(store.count().await.unwrap(), 1);
    assert!(store.get("x1").await.unwrap().is_none());
    assert!(store.get("x2").await.unwrap().is_none());
    assert_eq!(store.watermark().await.unwrap(), Some(1_000));
}

#[tokio::test]
async fn malformed_fields_are_defaulted_not_fatal() {
    let store = Store::in_memory().await.unwrap();
    let rows: Vec<PendingRow> = serde_json::from_value(json!([
        {
            "id": "m1",
            "subreddit": "Goa",
            "comment_clean": "tax on tourism",
            "confidence": "not-a-number",
            "created_utc": "1700000123.7",
            "url": "https://reddit.com/m1"
        },
        {
            "id": "m2",
            "subreddit": "Goa",
            "comment_clean": "railway",
            "sentiment": "positive",
            "confidence": 0.66,
            "created_utc": {"bad": true},
            "url": "https://reddit.com/m2"
        }
    ]))
    .unwrap();

    let report = load(&store, rows).await.unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.batch_watermark, Some(1_700_000_123));

    let m1 = store.get("m1").await.unwrap().unwrap();
    assert_eq!(m1.sentiment, "neutral");
    assert_eq!(m1.confidence, 0.0);
    assert_eq!(m1.created_utc.timestamp(), 1_700_000_123);

    let m2 = store.get("m2").await.unwrap().unwrap();
    assert_eq!(m2.created_utc.timestamp(), 0);
    assert_eq!(m2.confidence, 0.66);
}

#[tokio::test]
async fn empty_load_is_noop() {
    let store = Store::in_memory().await.unwrap();
    let report = load(&store, Vec::new()).await.unwrap();
    assert_eq!(report.rows_written, 0);
    assert_eq!(report.batch_watermark, None);
    assert_eq!(store.watermark().await.unwrap(), None);
}
