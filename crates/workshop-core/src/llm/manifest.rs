//! Model catalogue and performance modes.
//!
//! | Model | Base max tokens | Priority |
//! |-------|-----------------|----------|
//! | Phi-3-mini-4k-instruct-q4 | 1024 | 1 (default) |
//! | Qwen2.5-1.5B-instruct-q4 | 1536 | 2 |
//! | TinyLlama-1.1B-chat-q4 | 512 | 3 |
//!
//! The effective token cap is `floor(base × mode multiplier)`, never below [`MIN_TOKEN_CAP`].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const MIN_TOKEN_CAP: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelChoice {
    pub id: String,
    pub label: String,
    pub size: String,
    pub quantization: String,
    pub priority: u32,
    pub provider: String,
    pub max_tokens: usize,
}

static MODEL_CHOICES: Lazy<Vec<ModelChoice>> = Lazy::new(|| {
    let mut models = vec![
        ModelChoice {
            id: "Qwen2.5-1.5B-instruct-q4".into(),
            label: "Qwen 2.5 (1.5B)".into(),
            size: "1.5B".into(),
            quantization: "q4".into(),
            priority: 2,
            provider: "webllm".into(),
            max_tokens: 1536,
        },
        ModelChoice {
            id: "TinyLlama-1.1B-chat-q4".into(),
            label: "TinyLlama (1.1B)".into(),
            size: "1.1B".into(),
            quantization: "q4".into(),
            priority: 3,
            provider: "webllm".into(),
            max_tokens: 512,
        },
        ModelChoice {
            id: "Phi-3-mini-4k-instruct-q4".into(),
            label: "Phi-3 Mini (4k)".into(),
            size: "3.8B".into(),
            quantization: "q4".into(),
            priority: 1,
            provider: "webllm".into(),
            max_tokens: 1024,
        },
    ];
    models.sort_by_key(|m| m.priority);
    models
});

/// All models, lowest priority number first.
pub fn model_choices() -> &'static [ModelChoice] {
    &MODEL_CHOICES
}

pub fn default_model_choice() -> &'static ModelChoice {
    &MODEL_CHOICES[0]
}

pub fn find_model_choice(id: &str) -> Option<&'static ModelChoice> {
    MODEL_CHOICES.iter().find(|m| m.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceModeId {
    Calm,
    #[default]
    Balanced,
    Adventure,
}

impl PerformanceModeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceModeId::Calm => "calm",
            PerformanceModeId::Balanced => "balanced",
            PerformanceModeId::Adventure => "adventure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("calm") => Some(Self::Calm),
            s if s.eq_ignore_ascii_case("balanced") => Some(Self::Balanced),
            s if s.eq_ignore_ascii_case("adventure") => Some(Self::Adventure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceMode {
    pub id: PerformanceModeId,
    pub label: &'static str,
    pub description: &'static str,
    pub multiplier: f64,
}

const PERFORMANCE_MODES: [PerformanceMode; 3] = [
    PerformanceMode {
        id: PerformanceModeId::Calm,
        label: "Calm mode",
        description: "Short answers with extra reassurance for younger explorers.",
        multiplier: 0.75,
    },
    PerformanceMode {
        id: PerformanceModeId::Balanced,
        label: "Balanced mode",
        description: "The kids-first default for friendly creativity.",
        multiplier: 1.0,
    },
    PerformanceMode {
        id: PerformanceModeId::Adventure,
        label: "Adventure mode",
        description: "Extended responses for adult-guided discovery.",
        multiplier: 1.25,
    },
];

pub fn performance_modes() -> &'static [PerformanceMode] {
    &PERFORMANCE_MODES
}

pub fn performance_mode(id: PerformanceModeId) -> &'static PerformanceMode {
    match id {
        PerformanceModeId::Calm => &PERFORMANCE_MODES[0],
        PerformanceModeId::Balanced => &PERFORMANCE_MODES[1],
        PerformanceModeId::Adventure => &PERFORMANCE_MODES[2],
    }
}

pub fn default_performance_mode() -> &'static PerformanceMode {
    performance_mode(PerformanceModeId::default())
}

/// Token budget for a model in a mode. Unknown model ids use the default model.
pub fn calculate_token_cap(model_id: &str, mode: PerformanceModeId) -> usize {
    let model = find_model_choice(model_id).unwrap_or_else(default_model_choice);
    let computed = (model.max_tokens as f64 * performance_mode(mode).multiplier).floor() as usize;
    computed.max(MIN_TOKEN_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_sorted_by_priority() {
        let priorities: Vec<u32> = model_choices().iter().map(|m| m.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert_eq!(default_model_choice().id, "Phi-3-mini-4k-instruct-q4");
    }

    #[test]
    fn token_cap_applies_multiplier_and_floor() {
        assert_eq!(calculate_token_cap("Phi-3-mini-4k-instruct-q4", PerformanceModeId::Balanced), 1024);
        assert_eq!(calculate_token_cap("Phi-3-mini-4k-instruct-q4", PerformanceModeId::Calm), 768);
        assert_eq!(calculate_token_cap("Qwen2.5-1.5B-instruct-q4", PerformanceModeId::Adventure), 1920);
        assert_eq!(calculate_token_cap("unknown", PerformanceModeId::Balanced), 1024);
        assert!(calculate_token_cap("TinyLlama-1.1B-chat-q4", PerformanceModeId::Calm) >= MIN_TOKEN_CAP);
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!(PerformanceModeId::parse("Calm"), Some(PerformanceModeId::Calm));
        assert_eq!(PerformanceModeId::parse("turbo"), None);
    }
}
