//! Child-safety text filters: keyword redaction and the child-mode governor.
//!
//! Both are shallow heuristics. Callers depend on [`TextSanitizer`] so a stronger filter
//! (for example a classifier) can replace them without touching the harness or loader.

pub mod governor;
pub mod redaction;

pub use governor::{
    clamp_reading_level, enforce_child_tone, redact_disallowed_content, ChildModeGovernor,
};
pub use redaction::{KeywordRedactor, DISALLOWED_TERMS, FILTERED_PLACEHOLDER};

/// A text-to-text filter applied to model output.
pub trait TextSanitizer: Send + Sync {
    fn sanitize(&self, text: &str) -> String;
}
