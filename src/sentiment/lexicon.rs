// src/sentiment/lexicon.rs
//! Deterministic bag-of-words scorer used when no model applies.
//!
//! The word lists are small and mix English with transliterated Hindi, Tamil
//! and Telugu so they work without language detection.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::{round2, Sentiment};

static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "awesome", "positive", "happy", "love", "like", "best",
        "fantastic", "support", "achha", "shandar", "badiya", "sahi", "nalla", "sirappu",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "terrible", "awful", "worst", "negative", "hate", "dislike", "problem", "fail",
        "angry", "issue", "bura", "galat", "ghatak", "kharaab", "mosamana", "ketta",
    ]
    .into_iter()
    .collect()
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word regex"));

#[derive(Debug, Clone, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Returns `(positive hits, negative hits)`.
    pub fn hits(&self, text: &str) -> (usize, usize) {
        let lowered = text.to_lowercase();
        let mut pos = 0usize;
        let mut neg = 0usize;
        for m in WORD_RE.find_iter(&lowered) {
            let tok = m.as_str();
            if POSITIVE_WORDS.contains(tok) {
                pos += 1;
            } else if NEGATIVE_WORDS.contains(tok) {
                neg += 1;
            }
        }
        (pos, neg)
    }

    /// `(pos - neg) / hits`, sign decides the label, magnitude is the confidence.
    pub fn classify(&self, text: &str) -> (Sentiment, f64) {
        let (pos, neg) = self.hits(text);
        let total = pos + neg;
        if total == 0 {
            return (Sentiment::Neutral, 0.0);
        }

        let score = (pos as f64 - neg as f64) / total as f64;
        let confidence = round2(score.abs().min(1.0));

        if score > 0.0 {
            (Sentiment::Positive, confidence)
        } else if score < 0.0 {
            (Sentiment::Negative, confidence)
        } else {
            (Sentiment::Neutral, confidence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_policy_comment() {
        let (s, c) = LexiconClassifier::new().classify("this scheme is very good and excellent");
        assert_eq!(s, Sentiment::Positive);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn negative_policy_comment() {
        let (s, c) = LexiconClassifier::new().classify("this is a terrible bad policy");
        assert_eq!(s, Sentiment::Negative);
        assert!(c > 0.0);
    }

    #[test]
    fn no_hits_is_neutral_zero() {
        assert_eq!(
            LexiconClassifier::new().classify("the weather today"),
            (Sentiment::Neutral, 0.0)
        );
    }

    #[test]
    fn balanced_hits_stay_neutral() {
        assert_eq!(
            LexiconClassifier::new().classify("good scheme, bad execution"),
            (Sentiment::Neutral, 0.0)
        );
    }

    #[test]
    fn mixed_hits_round_to_two_decimals() {
        // 2 positive, 1 negative -> 1/3
        let (s, c) = LexiconClassifier::new().classify("Achha budget, GREAT idea, but one problem");
        assert_eq!(s, Sentiment::Positive);
        assert_eq!(c, 0.33);
    }

    #[test]
    fn substrings_inside_words_do_not_count() {
        // "goodness" and "likely" are whole tokens, not lexicon words
        assert_eq!(
            LexiconClassifier::new().classify("goodness likely"),
            (Sentiment::Neutral, 0.0)
        );
    }
}
