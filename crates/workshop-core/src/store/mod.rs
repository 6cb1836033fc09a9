//! Stateful stores over [`crate::storage::KvStorage`], each with synchronous subscribe/notify.

pub mod preferences;
pub mod profile;
pub mod project;
pub mod telemetry;
pub mod tutorial;

pub use preferences::{Preferences, PreferencesStore, ThemeId, ThemeStore};
pub use profile::ProfileStore;
pub use project::ProjectStore;
pub use telemetry::TelemetryStore;
pub use tutorial::{TutorialState, TutorialStore};
