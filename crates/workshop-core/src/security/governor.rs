//! Child-mode governor: keeps generated text calm, short and free of blocked topics.
//!
//! | Step | Effect |
//! |------|--------|
//! | tone | "don't" → "do", "can't" → "can", "shouldn't" → "might", "isn't" → "can be" |
//! | reading level | first 3 sentences, each at most 120 chars (117 + "…") |
//! | redaction | deny-list terms → `[filtered]` |

use super::redaction::KeywordRedactor;
use super::TextSanitizer;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_SENTENCES: usize = 3;
pub const MAX_SENTENCE_CHARS: usize = 120;
const TRUNCATED_SENTENCE_CHARS: usize = 117;
const ELLIPSIS: char = '…';

static DISCOURAGED_TERMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bdon't\b", "do"),
        (r"(?i)\bcan't\b", "can"),
        (r"(?i)\bshouldn't\b", "might"),
        (r"(?i)\bisn't\b", "can be"),
    ]
    .into_iter()
    .filter_map(|(p, r)| Regex::new(p).ok().map(|re| (re, r)))
    .collect()
});

static SENTENCE_SPLIT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[.!?]+").ok());

/// Softens direct negatives. Intentionally shallow; it does not rewrite grammar.
pub fn enforce_child_tone(text: &str) -> String {
    let mut normalized = text.to_string();
    for (pattern, replacement) in DISCOURAGED_TERMS.iter() {
        normalized = pattern.replace_all(&normalized, *replacement).into_owned();
    }
    normalized
}

fn split_sentences(text: &str) -> Vec<&str> {
    match SENTENCE_SPLIT.as_ref() {
        Some(re) => re.split(text).collect(),
        None => text.split(['.', '!', '?']).collect(),
    }
}

/// Keeps at most three sentences and trims any sentence that is too long.
///
/// Sentences are split on runs of `.`, `!` or `?` and rejoined with `". "` plus a final
/// period. Returns an empty string when no sentence has content.
pub fn clamp_reading_level(text: &str) -> String {
    let pieces: Vec<String> = split_sentences(text)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_SENTENCES)
        .map(|sentence| {
            if sentence.chars().count() > MAX_SENTENCE_CHARS {
                let cut: String = sentence.chars().take(TRUNCATED_SENTENCE_CHARS).collect();
                format!("{}{}", cut.trim(), ELLIPSIS)
            } else {
                sentence.to_string()
            }
        })
        .collect();
    if pieces.is_empty() {
        return String::new();
    }
    format!("{}.", pieces.join(". "))
}

/// Replaces deny-list terms with `[filtered]`.
pub fn redact_disallowed_content(text: &str) -> String {
    KeywordRedactor::shared().redact(text)
}

/// The full pipeline: tone, then reading level, then redaction.
#[derive(Debug, Clone)]
pub struct ChildModeGovernor {
    redactor: KeywordRedactor,
}

impl Default for ChildModeGovernor {
    fn default() -> Self {
        Self {
            redactor: KeywordRedactor::child_safe(),
        }
    }
}

impl ChildModeGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Governor using a custom redactor (extra or different terms).
    pub fn with_redactor(redactor: KeywordRedactor) -> Self {
        Self { redactor }
    }

    pub fn enforce_child_tone(&self, text: &str) -> String {
        enforce_child_tone(text)
    }

    pub fn clamp_reading_level(&self, text: &str) -> String {
        clamp_reading_level(text)
    }

    pub fn redact_disallowed_content(&self, text: &str) -> String {
        self.redactor.redact(text)
    }
}

impl TextSanitizer for ChildModeGovernor {
    fn sanitize(&self, text: &str) -> String {
        let toned = self.enforce_child_tone(text);
        let clamped = self.clamp_reading_level(&toned);
        self.redact_disallowed_content(&clamped).trim().to_string()
    }
}
