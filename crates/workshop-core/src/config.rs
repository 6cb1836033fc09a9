//! Workshop configuration loaded from TOML and environment.
//!
//! | Key / Env | Default | Description |
//! |-----------|---------|-------------|
//! | `storage_path` / WORKSHOP__STORAGE_PATH | `./data/workshop` | Sled directory for all persisted state. |
//! | `model_id` / WORKSHOP__MODEL_ID | manifest default | Initial model when no LLM settings are stored. |
//! | `performance_mode` / WORKSHOP__PERFORMANCE_MODE | `balanced` | Initial performance mode (calm, balanced, adventure). |
//! | `generation_timeout_secs` / WORKSHOP__GENERATION_TIMEOUT_SECS | 15 | Wall-clock guard for one generation. |
//! | `incident_log_capacity` / WORKSHOP__INCIDENT_LOG_CAPACITY | 256 | Ring buffer size for AI incidents. |
//! | `adaptive_coaching` / WORKSHOP__ADAPTIVE_COACHING | true | Default for the adaptive-coaching preference. |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_STORAGE_PATH: &str = "./data/workshop";
const DEFAULT_CONFIG_PATH: &str = "config/workshop";

fn default_storage_path() -> String {
    DEFAULT_STORAGE_PATH.to_string()
}

fn default_performance_mode() -> String {
    "balanced".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    15
}

fn default_incident_log_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

/// Runtime configuration for a [`crate::Workshop`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkshopConfig {
    /// Directory of the sled database holding profiles, projects, telemetry and settings.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Model to use when no LLM settings have been persisted yet.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Performance mode id used when no LLM settings have been persisted yet.
    #[serde(default = "default_performance_mode")]
    pub performance_mode: String,
    /// Seconds a single generation may run before the harness falls back.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Maximum number of incidents kept in memory before the oldest is dropped.
    #[serde(default = "default_incident_log_capacity")]
    pub incident_log_capacity: usize,
    /// Whether adaptive coaching starts enabled for fresh preferences.
    #[serde(default = "default_true")]
    pub adaptive_coaching: bool,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            model_id: None,
            performance_mode: default_performance_mode(),
            generation_timeout_secs: default_generation_timeout_secs(),
            incident_log_capacity: default_incident_log_capacity(),
            adaptive_coaching: true,
        }
    }
}

impl WorkshopConfig {
    /// Load config from file and environment. Precedence: env `WORKSHOP__*` > file at
    /// `WORKSHOP_CONFIG` (or `config/workshop.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let config_path =
            std::env::var("WORKSHOP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load config from an explicit file (extension optional) layered under the environment.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("storage_path", DEFAULT_STORAGE_PATH)?
            .set_default("performance_mode", "balanced")?
            .set_default("generation_timeout_secs", 15_i64)?
            .set_default("incident_log_capacity", 256_i64)?
            .set_default("adaptive_coaching", true)?;

        let builder = builder.add_source(config::File::from(path).required(false));

        let built = builder
            .add_source(config::Environment::with_prefix("WORKSHOP").separator("__"))
            .build()?;

        let mut cfg: Self = built.try_deserialize()?;
        if cfg.incident_log_capacity == 0 {
            cfg.incident_log_capacity = default_incident_log_capacity();
        }
        tracing::debug!(
            target: "workshop::config",
            storage_path = %cfg.storage_path,
            performance_mode = %cfg.performance_mode,
            "Workshop config loaded"
        );
        Ok(cfg)
    }

    pub fn storage_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage_path)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = WorkshopConfig::default();
        assert_eq!(cfg.storage_path, "./data/workshop");
        assert_eq!(cfg.performance_mode, "balanced");
        assert_eq!(cfg.generation_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.incident_log_capacity, 256);
        assert!(cfg.adaptive_coaching);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workshop.toml");
        std::fs::write(
            &path,
            "storage_path = \"/tmp/lab\"\ngeneration_timeout_secs = 5\nperformance_mode = \"calm\"\n",
        )
        .unwrap();
        let cfg = WorkshopConfig::load_from(&path).unwrap();
        assert_eq!(cfg.storage_path, "/tmp/lab");
        assert_eq!(cfg.generation_timeout_secs, 5);
        assert_eq!(cfg.performance_mode, "calm");
        assert_eq!(cfg.incident_log_capacity, 256);
    }
}
