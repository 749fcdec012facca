// src/relevance.rs
//! Relevance gate: keyword substring matching plus the recency (watermark) gate.
//!
//! Matching is deliberately *not* tokenized: a keyword counts when it appears
//! anywhere in the lower-cased text, including inside a longer word
//! (`"cm"` matches `"acme"`). Recall characteristics downstream depend on this.

use chrono::{DateTime, NaiveTime, Utc};

/// Lower-cased keyword list, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// First keyword found in `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}

/// Any keyword present as a substring of the lower-cased text.
pub fn is_relevant<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    KeywordSet::new(keywords).matches(text)
}

/// Recency gate: inclusive at the boundary.
pub fn is_recent(created_at: i64, watermark_start: i64) -> bool {
    created_at >= watermark_start
}

/// 00:00:00 UTC of the calendar day containing `now`, as unix seconds.
pub fn start_of_day(now: DateTime<Utc>) -> i64 {
    now.date_naive().and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Lower bound for eligible candidates: the stored watermark when present,
/// otherwise the start of the current UTC day.
pub fn watermark_start(stored: Option<i64>, now: DateTime<Utc>) -> i64 {
    stored.unwrap_or_else(|| start_of_day(now))
}
