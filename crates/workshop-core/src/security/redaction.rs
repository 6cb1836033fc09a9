//! Keyword redaction: replace blocked terms in model output with `[filtered]`.
//!
//! The built-in deny list covers self-harm and violence-adjacent words. Terms match as
//! case-insensitive substrings by default, so "killer" is filtered along with "kill".

use super::TextSanitizer;
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder used in place of any blocked term in sanitized output.
pub const FILTERED_PLACEHOLDER: &str = "[filtered]";

/// Terms that must never reach a child.
pub const DISALLOWED_TERMS: [&str; 5] = ["suicide", "self-harm", "violence", "kill", "weapon"];

static DEFAULT_REDACTOR: Lazy<KeywordRedactor> = Lazy::new(KeywordRedactor::child_safe);

/// Compiles a term list into one alternation regex and rewrites every match.
#[derive(Debug, Clone, Default)]
pub struct KeywordRedactor {
    terms: Vec<String>,
    pattern: Option<Regex>,
    whole_words: bool,
}

impl KeywordRedactor {
    /// Create an empty redactor (no terms; sanitize is a no-op).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Redactor loaded with [`DISALLOWED_TERMS`].
    pub fn child_safe() -> Self {
        Self::from_terms(DISALLOWED_TERMS.iter().map(|t| t.to_string()).collect())
    }

    /// Shared instance of [`KeywordRedactor::child_safe`].
    pub fn shared() -> &'static KeywordRedactor {
        &DEFAULT_REDACTOR
    }

    /// Build redactor from a list of terms. Terms are escaped for regex and combined with |.
    pub fn from_terms(terms: Vec<String>) -> Self {
        let mut r = Self::empty();
        r.set_terms(terms);
        r
    }

    /// Match only at word boundaries instead of anywhere inside a word.
    pub fn with_whole_words(mut self, whole_words: bool) -> Self {
        self.whole_words = whole_words;
        self.rebuild_pattern();
        self
    }

    /// Adds terms on top of the existing list.
    pub fn extend_terms<I: IntoIterator<Item = String>>(&mut self, extra: I) {
        let mut terms = std::mem::take(&mut self.terms);
        terms.extend(extra);
        self.set_terms(terms);
    }

    fn set_terms(&mut self, terms: Vec<String>) {
        self.terms = terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self.rebuild_pattern();
    }

    fn rebuild_pattern(&mut self) {
        if self.terms.is_empty() {
            self.pattern = None;
            return;
        }
        let escaped: Vec<String> = self.terms.iter().map(|t| regex::escape(t)).collect();
        let alternation = escaped.join("|");
        let pattern_str = if self.whole_words {
            format!(r"(?i)\b(?:{})\b", alternation)
        } else {
            format!(r"(?i)(?:{})", alternation)
        };
        self.pattern = match Regex::new(&pattern_str) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(target: "workshop::safety", error = %e, "redaction pattern rejected");
                None
            }
        };
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Replace every blocked term with [`FILTERED_PLACEHOLDER`].
    pub fn redact(&self, text: &str) -> String {
        match &self.pattern {
            None => text.to_string(),
            Some(r) => r.replace_all(text, FILTERED_PLACEHOLDER).into_owned(),
        }
    }

    /// True when `text` contains any blocked term.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// Return true if any terms are loaded.
    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }
}

impl TextSanitizer for KeywordRedactor {
    fn sanitize(&self, text: &str) -> String {
        self.redact(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_redactor_returns_unchanged() {
        let r = KeywordRedactor::empty();
        assert_eq!(r.redact("Build a weapon rack."), "Build a weapon rack.");
        assert!(!r.is_active());
    }

    #[test]
    fn every_occurrence_is_redacted() {
        let r = KeywordRedactor::child_safe();
        let out = r.redact("Kill the lights, then kill the music.");
        assert_eq!(out, "[filtered] the lights, then [filtered] the music.");
    }

    #[test]
    fn substring_mode_catches_inflections() {
        let r = KeywordRedactor::child_safe();
        assert_eq!(r.redact("a Killer idea"), "a [filtered]er idea");
    }

    #[test]
    fn whole_word_mode_leaves_inflections() {
        let r = KeywordRedactor::child_safe().with_whole_words(true);
        assert_eq!(r.redact("a killer idea"), "a killer idea");
        assert_eq!(r.redact("no weapon here"), "no [filtered] here");
    }

    #[test]
    fn hyphenated_terms_are_escaped() {
        let r = KeywordRedactor::child_safe();
        assert!(r.matches("talking about SELF-HARM"));
        assert!(!r.matches("self harm"));
    }
}
