// src/sentiment/lang.rs
//! Language detection seam.
//!
//! `ScriptDetector` is the built-in implementation: it picks the dominant
//! Unicode script, maps Indic scripts and Arabic to a language code, and only
//! calls Latin text English when English function words are present.
//! Romanized Hindi/Tamil therefore fails detection and lands on the lexicon.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Maps raw text to a language code (ISO 639-1 where one exists).
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<String>;
}

static ENGLISH_FUNCTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "and", "or", "but", "of",
        "to", "in", "on", "for", "with", "this", "that", "these", "those", "it", "its", "not",
        "i", "you", "we", "they", "he", "she", "have", "has", "had", "do", "does", "did", "what",
        "why", "how", "very", "will", "would", "should", "can", "could", "my", "our", "your",
        "their", "from", "at", "by", "about", "just", "so", "if", "no", "there", "who", "which",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Arabic,
    Other,
}

impl Script {
    const ALL: [Script; 12] = [
        Script::Latin,
        Script::Devanagari,
        Script::Bengali,
        Script::Gurmukhi,
        Script::Gujarati,
        Script::Oriya,
        Script::Tamil,
        Script::Telugu,
        Script::Kannada,
        Script::Malayalam,
        Script::Arabic,
        Script::Other,
    ];

    fn of(c: char) -> Option<Script> {
        if !c.is_alphabetic() && !is_combining_indic(c) {
            return None;
        }
        let s = match c as u32 {
            0x0041..=0x024F => Script::Latin,
            0x0900..=0x097F => Script::Devanagari,
            0x0980..=0x09FF => Script::Bengali,
            0x0A00..=0x0A7F => Script::Gurmukhi,
            0x0A80..=0x0AFF => Script::Gujarati,
            0x0B00..=0x0B7F => Script::Oriya,
            0x0B80..=0x0BFF => Script::Tamil,
            0x0C00..=0x0C7F => Script::Telugu,
            0x0C80..=0x0CFF => Script::Kannada,
            0x0D00..=0x0D7F => Script::Malayalam,
            0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Script::Arabic,
            _ => Script::Other,
        };
        Some(s)
    }

    fn index(self) -> usize {
        Script::ALL.iter().position(|s| *s == self).unwrap_or(Script::ALL.len() - 1)
    }

    fn language(self) -> Option<&'static str> {
        match self {
            Script::Devanagari => Some("hi"),
            Script::Bengali => Some("bn"),
            Script::Gurmukhi => Some("pa"),
            Script::Gujarati => Some("gu"),
            Script::Oriya => Some("or"),
            Script::Tamil => Some("ta"),
            Script::Telugu => Some("te"),
            Script::Kannada => Some("kn"),
            Script::Malayalam => Some("ml"),
            Script::Arabic => Some("ur"),
            Script::Latin | Script::Other => None,
        }
    }
}

// Vowel signs and viramas are marks, not alphabetic, but still carry the script.
fn is_combining_indic(c: char) -> bool {
    matches!(c as u32, 0x0900..=0x0D7F)
}

#[derive(Debug, Clone, Default)]
pub struct ScriptDetector;

impl ScriptDetector {
    pub fn new() -> Self {
        Self
    }

    fn looks_english(text: &str) -> bool {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return false;
        }
        let hits = tokens
            .iter()
            .filter(|t| ENGLISH_FUNCTION_WORDS.contains(**t))
            .count();
        // at least one function word per eight tokens
        hits > 0 && hits * 8 >= tokens.len()
    }
}

impl LanguageDetector for ScriptDetector {
    fn detect(&self, text: &str) -> Result<String> {
        let mut counts = [0usize; Script::ALL.len()];
        for c in text.chars() {
            if let Some(s) = Script::of(c) {
                counts[s.index()] += 1;
            }
        }

        let (best_idx, best_count) = counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, c)| (i, *c))
            .unwrap_or((0, 0));
        if best_count == 0 {
            return Err(anyhow!("no letters to detect a language from"));
        }

        let script = Script::ALL[best_idx];
        if let Some(code) = script.language() {
            return Ok(code.to_string());
        }
        match script {
            Script::Latin if Self::looks_english(text) => Ok("en".to_string()),
            Script::Latin => Err(anyhow!("latin text without english markers")),
            _ => Err(anyhow!("unsupported script")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_sentence_is_en() {
        let d = ScriptDetector::new();
        assert_eq!(d.detect("The budget for railways is far too small").unwrap(), "en");
    }

    #[test]
    fn indic_scripts_map_to_codes() {
        let d = ScriptDetector::new();
        assert_eq!(d.detect("सरकार की नई योजना अच्छी है").unwrap(), "hi");
        assert_eq!(d.detect("இந்த திட்டம் நல்லது").unwrap(), "ta");
        assert_eq!(d.detect("ಸರ್ಕಾರದ ಯೋಜನೆ").unwrap(), "kn");
        assert_eq!(d.detect("یہ حکومت کی پالیسی ہے").unwrap(), "ur");
    }

    #[test]
    fn mixed_text_follows_dominant_script() {
        let d = ScriptDetector::new();
        assert_eq!(d.detect("GST पर सरकार का फैसला बहुत गलत है").unwrap(), "hi");
    }

    #[test]
    fn romanized_hindi_fails_detection() {
        let d = ScriptDetector::new();
        assert!(d.detect("sarkar ki yojana bahut achha hai").is_err());
    }

    #[test]
    fn punctuation_only_fails() {
        assert!(ScriptDetector::new().detect("!!! 123 ???").is_err());
    }
}
