//! The Workshop: one storage backend, every store, and the AI provider wired together.
//!
//! Cross-store flows live here so their ordering is explicit. Switching profiles rescopes
//! telemetry and projects before the call returns.

use crate::ai::{AiProvider, CoachingContext, IncidentLog, PersonaRequest, SafeAiHarness, SafeAiResult};
use crate::config::WorkshopConfig;
use crate::domain::{NewProfile, Profile, Project, StationKey, StationShare};
use crate::error::{ExportError, InvalidProjectFileError, StorageError};
use crate::export::{self, ExportFile};
use crate::llm::{EngineFactory, LlmSettingsStore, ModelLoader, StubEngineFactory};
use crate::storage::{KvStorage, LocalProjectStore, MemoryStorage, SledStorage};
use crate::store::{
    Preferences, PreferencesStore, ProfileStore, ProjectStore, TelemetryStore, ThemeStore,
    TutorialStore,
};
use crate::templates;
use chrono::Utc;
use std::sync::Arc;

pub struct Workshop {
    config: WorkshopConfig,
    storage: Arc<dyn KvStorage>,
    profiles: Arc<ProfileStore>,
    telemetry: Arc<TelemetryStore>,
    projects: Arc<ProjectStore>,
    preferences: Arc<PreferencesStore>,
    theme: Arc<ThemeStore>,
    tutorial: Arc<TutorialStore>,
    llm_settings: Arc<LlmSettingsStore>,
    incidents: Arc<IncidentLog>,
    provider: AiProvider,
}

impl Workshop {
    /// Opens the sled database at `config.storage_path` and uses the stub engine.
    pub fn open(config: WorkshopConfig) -> Result<Self, StorageError> {
        let storage = SledStorage::open_path(config.storage_dir())?;
        Ok(Self::with_storage(config, Arc::new(storage)))
    }

    /// Ephemeral workshop backed by [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::with_storage(WorkshopConfig::default(), Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(config: WorkshopConfig, storage: Arc<dyn KvStorage>) -> Self {
        Self::with_engine(config, storage, Arc::new(StubEngineFactory))
    }

    pub fn with_engine(
        config: WorkshopConfig,
        storage: Arc<dyn KvStorage>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        let profiles = Arc::new(ProfileStore::new(storage.clone()));
        let active = profiles.active_profile_id();
        let telemetry = Arc::new(TelemetryStore::new(storage.clone(), &active));
        let projects = Arc::new(ProjectStore::new(
            LocalProjectStore::new(storage.clone()),
            telemetry.clone(),
            &active,
        ));
        let preferences = Arc::new(PreferencesStore::with_defaults(
            storage.clone(),
            Preferences {
                adaptive_coaching_enabled: config.adaptive_coaching,
                ..Default::default()
            },
        ));
        let llm_settings = Arc::new(LlmSettingsStore::with_fallback(
            storage.clone(),
            config.model_id.as_deref(),
            Some(config.performance_mode.as_str()),
        ));
        let incidents = Arc::new(IncidentLog::with_capacity(config.incident_log_capacity));
        let harness = Arc::new(
            SafeAiHarness::new(incidents.clone()).with_timeout(config.generation_timeout()),
        );
        let loader = Arc::new(ModelLoader::new(llm_settings.clone(), factory));

        tracing::info!(
            target: "workshop::store",
            profile_id = %active,
            projects = projects.projects().len(),
            "workshop opened"
        );

        Self {
            theme: Arc::new(ThemeStore::new(storage.clone())),
            tutorial: Arc::new(TutorialStore::new(storage.clone())),
            provider: AiProvider::new(loader, harness),
            config,
            storage,
            profiles,
            telemetry,
            projects,
            preferences,
            llm_settings,
            incidents,
        }
    }

    pub fn config(&self) -> &WorkshopConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn KvStorage> {
        &self.storage
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn telemetry(&self) -> &Arc<TelemetryStore> {
        &self.telemetry
    }

    pub fn projects(&self) -> &Arc<ProjectStore> {
        &self.projects
    }

    pub fn preferences(&self) -> &Arc<PreferencesStore> {
        &self.preferences
    }

    pub fn theme(&self) -> &Arc<ThemeStore> {
        &self.theme
    }

    pub fn tutorial(&self) -> &Arc<TutorialStore> {
        &self.tutorial
    }

    pub fn llm_settings(&self) -> &Arc<LlmSettingsStore> {
        &self.llm_settings
    }

    pub fn incidents(&self) -> &Arc<IncidentLog> {
        &self.incidents
    }

    pub fn provider(&self) -> &AiProvider {
        &self.provider
    }

    fn rescope(&self) {
        let active = self.profiles.active_profile_id();
        if active == self.projects.profile_id() && active == self.telemetry.active_profile_id() {
            return;
        }
        self.telemetry.switch_scope(&active);
        self.projects.switch_scope(&active);
        tracing::info!(target: "workshop::profiles", profile_id = %active, "profile scope switched");
    }

    /// Activates `profile_id` and reloads its telemetry and projects. False for unknown ids.
    pub fn switch_profile(&self, profile_id: &str) -> bool {
        if !self.profiles.set_active_profile_id(profile_id) {
            return false;
        }
        self.rescope();
        true
    }

    /// Creates a profile, which becomes active.
    pub fn create_profile(&self, payload: NewProfile) -> Profile {
        let profile = self.profiles.create_profile(payload);
        self.rescope();
        profile
    }

    pub fn delete_profile(&self, profile_id: &str) -> bool {
        let deleted = self.profiles.delete_profile(profile_id);
        if deleted {
            self.rescope();
        }
        deleted
    }

    pub fn start_session(&self) {
        self.telemetry.record_session();
    }

    pub fn visit_station(&self, station: StationKey) {
        self.telemetry.record_station_visit(station);
    }

    pub fn create_project(&self, name: &str) -> Project {
        self.projects.create_project(name)
    }

    pub fn apply_template(&self, template_id: &str) -> Option<Project> {
        templates::apply_template(&self.projects, template_id)
    }

    /// Advances the tutorial; finishing it counts in telemetry.
    pub fn next_tutorial_step(&self, total_steps: usize) -> bool {
        let completed = self.tutorial.next(total_steps);
        if completed {
            self.telemetry.record_tutorial_completed();
        }
        completed
    }

    pub fn complete_tutorial(&self) {
        self.tutorial.complete();
        self.telemetry.record_tutorial_completed();
    }

    pub fn export_project(&self, project_id: &str) -> Result<ExportFile, ExportError> {
        export::export_project(&self.projects, project_id)
    }

    /// Records a share of the project in the given format (e.g. `page`, `poster`).
    pub fn mark_shared(&self, project_id: &str, format: &str) -> Option<Project> {
        self.projects.update_project(
            project_id,
            crate::domain::ProjectPatch {
                share: Some(Some(StationShare {
                    last_export_at: Utc::now(),
                    last_format: format.to_string(),
                })),
                ..Default::default()
            },
        )
    }

    pub fn import_project(&self, bytes: &[u8]) -> Result<Project, InvalidProjectFileError> {
        export::import_project(&self.projects, bytes)
    }

    /// Persona-aware, governed generation for the active profile.
    pub async fn generate(&self, request: &PersonaRequest) -> SafeAiResult {
        let profile = self.profiles.active_profile();
        let telemetry = self.telemetry.state();
        let ctx = CoachingContext {
            profile: &profile,
            telemetry: &telemetry,
            adaptive_enabled: self.preferences.get().adaptive_coaching_enabled,
        };
        self.provider.generate_with_persona(request, &ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgeBand;

    fn new_profile(name: &str) -> NewProfile {
        NewProfile {
            display_name: Some(name.to_string()),
            age_band: Some(AgeBand::Tweens),
            ..Default::default()
        }
    }

    #[test]
    fn creating_profile_rescopes_projects() {
        let w = Workshop::in_memory();
        w.create_project("Default kite");
        let ada = w.create_profile(new_profile("Ada"));
        assert_eq!(w.projects().profile_id(), ada.id);
        assert!(w.projects().projects().is_empty());
        assert_eq!(w.telemetry().active_profile_id(), ada.id);
    }

    #[test]
    fn unknown_profile_switch_is_ignored() {
        let w = Workshop::in_memory();
        assert!(!w.switch_profile("profile_nobody"));
        assert_eq!(w.projects().profile_id(), crate::domain::DEFAULT_PROFILE_ID);
    }

    #[test]
    fn finishing_tutorial_counts_once() {
        let w = Workshop::in_memory();
        w.tutorial().start("intro");
        assert!(!w.next_tutorial_step(2));
        assert!(w.next_tutorial_step(2));
        assert_eq!(w.telemetry().state().completed_tutorials, 1);
    }

    #[test]
    fn mark_shared_stamps_share_slice() {
        let w = Workshop::in_memory();
        let p = w.create_project("Poster");
        let shared = w.mark_shared(&p.id, "poster").unwrap();
        assert_eq!(shared.share.unwrap().last_format, "poster");
    }

    #[tokio::test]
    async fn generate_uses_active_profile() {
        let w = Workshop::in_memory();
        let result = w
            .generate(&PersonaRequest::new(StationKey::Idea, "a paper boat"))
            .await;
        assert!(!result.text.is_empty());
        assert!(!result.tokens.is_empty());
    }
}
