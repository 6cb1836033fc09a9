//! workshop-core: the offline core of the Workshop creation lab for children.
//!
//! A child-safe generation pipeline (station prompts, local model loader, child-mode
//! governor, safe harness with incident log, persona and adaptive coaching), profile-scoped
//! stores for projects, profiles, telemetry and preferences, and versioned project
//! export/import. All persisted state goes through [`KvStorage`] (sled or in-memory).

pub mod ai;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod listeners;
pub mod llm;
pub mod prompts;
pub mod security;
pub mod storage;
pub mod store;
pub mod templates;
mod workshop;

pub use ai::{
    build_adaptive_adjustments, build_persona_system_prompt, AdaptiveAdjustments, AiIncident,
    AiProvider, CoachingContext, IncidentCategory, IncidentLog, PersonaRequest, SafeAiHarness,
    SafeAiRequest, SafeAiResult, FALLBACK_MESSAGE,
};
pub use config::WorkshopConfig;
pub use domain::{
    AgeBand, NewProfile, Profile, ProfileId, ProfilePatch, Project, ProjectPatch,
    ProjectSnapshot, ProjectState, ProjectStatus, StationKey, TelemetryState, DEFAULT_PROFILE_ID,
};
pub use error::{ExportError, GenerationError, InvalidProjectFileError, StorageError};
pub use export::{export_project, import_project, ExportFile, EXPORT_SCHEMA_VERSION};
pub use listeners::SubscriptionId;
pub use llm::{
    EngineFactory, GenerateOptions, LlmSettingsStore, LoadedModel, ModelLoader,
    PerformanceModeId, StreamChunk, StubEngine, TextEngine,
};
pub use prompts::{build_station_prompt, StationPayload};
pub use security::{ChildModeGovernor, KeywordRedactor, TextSanitizer};
pub use storage::{KvStorage, LocalProjectStore, MemoryStorage, SledStorage};
pub use store::{
    Preferences, PreferencesStore, ProfileStore, ProjectStore, TelemetryStore, ThemeId,
    ThemeStore, TutorialStore,
};
pub use templates::{apply_template, templates, Template};
pub use workshop::Workshop;
