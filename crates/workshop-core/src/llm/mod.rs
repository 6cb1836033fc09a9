//! Local model catalogue, persisted model settings, and the token-streaming loader.

pub mod loader;
pub mod manifest;
pub mod settings;

pub use loader::{
    scrub, tag_uncertainty, ChunkStream, EngineFactory, GenerateOptions, LoadedModel, ModelLoader,
    StreamChunk, StubEngine, StubEngineFactory, TextEngine, TokenStream, STUB_MAX_TOKENS,
};
pub use manifest::{
    calculate_token_cap, default_model_choice, default_performance_mode, find_model_choice,
    model_choices, performance_mode, performance_modes, ModelChoice, PerformanceMode,
    PerformanceModeId, MIN_TOKEN_CAP,
};
pub use settings::{LlmSettings, LlmSettingsStore, LLM_SETTINGS_KEY};
