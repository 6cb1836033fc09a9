//! Profile-scoped project store.
//!
//! Holds the projects of exactly one profile in memory. [`ProjectStore::switch_scope`] is the
//! only transition: it clears the map and reloads the other profile's projects and selection
//! before returning. Every write goes through to [`LocalProjectStore`] and then notifies.

use crate::domain::{
    clamp_idea, clamp_project_name, new_id, Project, ProfileId, ProjectPatch, ProjectSnapshot,
    MAX_SNAPSHOTS,
};
use crate::listeners::{ListenerSet, SubscriptionId};
use crate::storage::{LocalProjectStore, MAX_STORED_PROJECTS};
use crate::store::TelemetryStore;
use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct ProjectScope {
    profile_id: ProfileId,
    projects: Vec<Project>,
    selected: Option<String>,
}

impl ProjectScope {
    fn position(&self, id: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.id == id)
    }

    /// Inserts or replaces, then drops the oldest projects beyond the storage cap.
    /// Returns the ids that were dropped.
    fn upsert(&mut self, project: Project) -> Vec<String> {
        match self.position(&project.id) {
            Some(i) => self.projects[i] = project,
            None => self.projects.push(project),
        }
        let excess = self.projects.len().saturating_sub(MAX_STORED_PROJECTS);
        let evicted: Vec<String> = self.projects.drain(..excess).map(|p| p.id).collect();
        if self
            .selected
            .as_ref()
            .is_some_and(|id| evicted.contains(id))
        {
            self.selected = None;
        }
        evicted
    }
}

pub struct ProjectStore {
    storage: LocalProjectStore,
    telemetry: Arc<TelemetryStore>,
    scope: RwLock<ProjectScope>,
    listeners: ListenerSet,
}

impl ProjectStore {
    pub fn new(
        storage: LocalProjectStore,
        telemetry: Arc<TelemetryStore>,
        profile_id: &str,
    ) -> Self {
        let store = Self {
            storage,
            telemetry,
            scope: RwLock::new(ProjectScope::default()),
            listeners: ListenerSet::new(),
        };
        store.load_scope(profile_id);
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, ProjectScope> {
        self.scope.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProjectScope> {
        self.scope.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_scope(&self, profile_id: &str) {
        let projects = self.storage.load_projects_for_profile(profile_id);
        let selected = self.storage.get_active_project_id(profile_id);
        tracing::debug!(
            target: "workshop::store",
            profile_id,
            count = projects.len(),
            selected = selected.as_deref().unwrap_or("none"),
            "project scope loaded"
        );
        *self.write() = ProjectScope {
            profile_id: profile_id.to_string(),
            projects,
            selected,
        };
    }

    /// Drops the in-memory projects and loads `profile_id`'s from storage.
    pub fn switch_scope(&self, profile_id: &str) {
        self.load_scope(profile_id);
        self.listeners.notify();
    }

    pub fn profile_id(&self) -> ProfileId {
        self.read().profile_id.clone()
    }

    /// Projects of the current profile in insertion order.
    pub fn projects(&self) -> Vec<Project> {
        self.read().projects.clone()
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.read().projects.iter().find(|p| p.id == id).cloned()
    }

    pub fn selected_project_id(&self) -> Option<String> {
        self.read().selected.clone()
    }

    pub fn selected_project(&self) -> Option<Project> {
        let scope = self.read();
        let id = scope.selected.as_deref()?;
        scope.projects.iter().find(|p| p.id == id).cloned()
    }

    /// Sets (or clears) the selection and persists it for the current profile.
    pub fn select_project(&self, id: Option<&str>) {
        let profile_id = {
            let mut scope = self.write();
            scope.selected = id.map(str::to_string);
            scope.profile_id.clone()
        };
        if !self.storage.set_active_project_id(&profile_id, id) {
            tracing::warn!(target: "workshop::store", profile_id = %profile_id, "failed to persist selected project");
        }
        self.listeners.notify();
    }

    fn register(&self, mut project: Project) -> Project {
        let (profile_id, evicted, selection_dropped) = {
            let mut scope = self.write();
            project.profile_id = scope.profile_id.clone();
            let had_selection = scope.selected.is_some();
            let evicted = scope.upsert(project.clone());
            let selection_dropped = had_selection && scope.selected.is_none();
            (scope.profile_id.clone(), evicted, selection_dropped)
        };
        if !evicted.is_empty() {
            tracing::debug!(target: "workshop::store", profile_id = %profile_id, dropped = evicted.len(), "oldest projects dropped from scope");
        }
        if selection_dropped && !self.storage.set_active_project_id(&profile_id, None) {
            tracing::warn!(target: "workshop::store", profile_id = %profile_id, "failed to clear selected project");
        }
        self.listeners.notify();
        if !self.storage.save_project(&profile_id, &project) {
            tracing::warn!(target: "workshop::store", project_id = %project.id, "failed to save project");
        }
        project
    }

    /// Creates, persists and selects a new project, counting it in telemetry.
    pub fn create_project(&self, name: &str) -> Project {
        let project = Project::new(&self.profile_id(), name);
        let project = self.register(project);
        self.telemetry.record_project_created();
        self.select_project(Some(&project.id));
        tracing::info!(target: "workshop::store", project_id = %project.id, "project created");
        project
    }

    /// Inserts a project assembled elsewhere (import, templates) as if newly created.
    ///
    /// The project keeps its id; callers are expected to have generated a fresh one.
    pub fn register_imported_project(&self, project: Project) -> Project {
        self.register(project)
    }

    /// Merges `patch` into the project. Returns `None` if the id is unknown.
    ///
    /// The idea and name limits are re-applied, and `profile_id`/`updated_at` are re-stamped.
    pub fn update_project(&self, id: &str, patch: ProjectPatch) -> Option<Project> {
        let mut project = self.get(id)?;
        let ProjectPatch {
            name,
            title,
            description,
            goal,
            idea,
            status,
            current_station,
            steps,
            reflections,
            tests,
            archives,
            memory,
            reflect,
            share,
            tags,
        } = patch;

        if let Some(title) = title {
            project.title = title;
        }
        if let Some(description) = description {
            project.description = description;
        }
        if let Some(goal) = goal {
            project.goal = goal;
        }
        if let Some(status) = status {
            project.status = status;
        }
        if let Some(station) = current_station {
            project.current_station = station;
        }
        if let Some(steps) = steps {
            project.steps = steps;
        }
        if let Some(reflections) = reflections {
            project.reflections = reflections;
        }
        if let Some(tests) = tests {
            project.tests = tests;
        }
        if let Some(archives) = archives {
            project.archives = archives;
        }
        if let Some(memory) = memory {
            project.memory = memory;
        }
        if let Some(reflect) = reflect {
            project.reflect = reflect;
        }
        if let Some(share) = share {
            project.share = share;
        }
        if let Some(tags) = tags {
            project.tags = tags;
        }
        project.idea = clamp_idea(idea.unwrap_or_else(|| project.idea.take()));
        project.name = clamp_project_name(Some(name.as_deref().unwrap_or(&project.name)));
        project.restamp_children();
        project.updated_at = Utc::now();

        Some(self.register(project))
    }

    /// Removes the project; clears the selection if it pointed at it.
    pub fn delete_project(&self, id: &str) -> bool {
        let (profile_id, was_selected) = {
            let mut scope = self.write();
            let Some(i) = scope.position(id) else {
                return false;
            };
            scope.projects.remove(i);
            let was_selected = scope.selected.as_deref() == Some(id);
            (scope.profile_id.clone(), was_selected)
        };
        if !self.storage.delete_project(&profile_id, id) {
            tracing::warn!(target: "workshop::store", project_id = id, "failed to delete stored project");
        }
        if was_selected {
            self.select_project(None);
        } else {
            self.listeners.notify();
        }
        true
    }

    /// Captures the project's current fields. The oldest snapshots beyond [`MAX_SNAPSHOTS`] are dropped.
    pub fn add_snapshot(&self, project_id: &str, label: &str) -> Option<ProjectSnapshot> {
        let mut project = self.get(project_id)?;
        let label = label.trim();
        let snapshot = ProjectSnapshot {
            id: new_id("snapshot"),
            label: if label.is_empty() {
                "Snapshot".to_string()
            } else {
                label.to_string()
            },
            created_at: Utc::now(),
            project_state: project.state(),
        };
        project.snapshots.push(snapshot.clone());
        if project.snapshots.len() > MAX_SNAPSHOTS {
            let excess = project.snapshots.len() - MAX_SNAPSHOTS;
            project.snapshots.drain(..excess);
        }
        project.updated_at = Utc::now();
        self.register(project);
        Some(snapshot)
    }

    /// Replaces the project's fields with the snapshot's; the snapshot list is kept.
    pub fn restore_snapshot(&self, project_id: &str, snapshot_id: &str) -> Option<Project> {
        let project = self.get(project_id)?;
        let snapshot = project.snapshots.iter().find(|s| s.id == snapshot_id)?;
        let patch = ProjectPatch::from_state(&snapshot.project_state);
        tracing::debug!(target: "workshop::store", project_id, snapshot_id, "restoring snapshot");
        self.update_project(project_id, patch)
    }

    /// Seeds a new, selected project named "{label} branch" from a snapshot.
    ///
    /// The source project is left untouched; every owned entity gets a fresh id.
    pub fn branch_from_snapshot(&self, project_id: &str, snapshot_id: &str) -> Option<Project> {
        let source = self.get(project_id)?;
        let snapshot = source.snapshots.iter().find(|s| s.id == snapshot_id)?.clone();
        let branch_label = format!("{} branch", snapshot.label);

        let branch = self.create_project(&branch_label);
        let mut patch = ProjectPatch::from_state(&snapshot.project_state);
        patch.name = Some(branch_label.clone());
        patch.title = Some(Some(
            snapshot
                .project_state
                .title
                .clone()
                .unwrap_or(branch_label),
        ));
        if snapshot.project_state.description.is_empty() {
            patch.description = Some(source.description.clone());
        }
        let mut branched = self.update_project(&branch.id, patch)?;
        branched.regenerate_child_ids();
        let branched = self.register(branched);
        self.select_project(Some(&branched.id));
        Some(branched)
    }

    pub fn subscribe<F: Fn() + Send + Sync + 'static>(&self, listener: F) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProjectStatus, StationIdea, Step, StepStatus, DEFAULT_PROFILE_ID};
    use crate::storage::{KvStorage, MemoryStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> (Arc<dyn KvStorage>, Arc<TelemetryStore>, ProjectStore) {
        let storage: Arc<dyn KvStorage> = Arc::new(MemoryStorage::new());
        let telemetry = Arc::new(TelemetryStore::new(storage.clone(), DEFAULT_PROFILE_ID));
        let projects = ProjectStore::new(
            LocalProjectStore::new(storage.clone()),
            telemetry.clone(),
            DEFAULT_PROFILE_ID,
        );
        (storage, telemetry, projects)
    }

    fn step(project_id: &str, title: &str) -> Step {
        let now = Utc::now();
        Step {
            id: new_id("step"),
            project_id: project_id.to_string(),
            title: title.to_string(),
            summary: None,
            status: StepStatus::Todo,
            order: 0,
            origin_station: None,
            acceptance_criteria: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_selects_and_counts() {
        let (_, telemetry, s) = store();
        let p = s.create_project("Kite");
        assert_eq!(p.name, "Kite");
        assert_eq!(p.title.as_deref(), Some("Kite"));
        assert_eq!(s.selected_project_id().as_deref(), Some(p.id.as_str()));
        assert_eq!(telemetry.state().total_projects_created, 1);
    }

    #[test]
    fn blank_name_falls_back() {
        let (_, _, s) = store();
        assert_eq!(s.create_project("").name, "Untitled Project");
    }

    #[test]
    fn update_unknown_id_is_none() {
        let (_, _, s) = store();
        assert!(s.update_project("project_missing", ProjectPatch::default()).is_none());
    }

    #[test]
    fn update_reclamps_idea_and_notifies() {
        let (_, _, s) = store();
        let p = s.create_project("Boat");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        s.subscribe(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let updated = s
            .update_project(
                &p.id,
                ProjectPatch {
                    idea: Some(Some(StationIdea {
                        title: String::new(),
                        ..Default::default()
                    })),
                    status: Some(ProjectStatus::InProgress),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.idea.unwrap().title, "Untitled Idea");
        assert_eq!(updated.status, ProjectStatus::InProgress);
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn delete_clears_selection() {
        let (_, _, s) = store();
        let p = s.create_project("Gone");
        assert!(s.delete_project(&p.id));
        assert!(s.selected_project().is_none());
        assert!(!s.delete_project(&p.id));
    }

    #[test]
    fn restore_brings_back_snapshot_fields() {
        let (_, _, s) = store();
        let p = s.create_project("Rocket");
        s.update_project(
            &p.id,
            ProjectPatch {
                steps: Some(vec![step(&p.id, "Draw fins")]),
                ..Default::default()
            },
        );
        let snap = s.add_snapshot(&p.id, "v1").unwrap();
        s.update_project(
            &p.id,
            ProjectPatch {
                steps: Some(Vec::new()),
                description: Some("changed".into()),
                ..Default::default()
            },
        );
        let restored = s.restore_snapshot(&p.id, &snap.id).unwrap();
        assert_eq!(restored.steps.len(), 1);
        assert_eq!(restored.description, "");
        assert_eq!(restored.snapshots.len(), 1);
    }

    #[test]
    fn branch_is_new_selected_project_with_fresh_ids() {
        let (_, _, s) = store();
        let p = s.create_project("Castle");
        let p = s
            .update_project(
                &p.id,
                ProjectPatch {
                    description: Some("stone walls".into()),
                    steps: Some(vec![step(&p.id, "Stack blocks")]),
                    ..Default::default()
                },
            )
            .unwrap();
        let snap = s.add_snapshot(&p.id, "Walls").unwrap();
        let branch = s.branch_from_snapshot(&p.id, &snap.id).unwrap();

        assert_ne!(branch.id, p.id);
        assert_eq!(branch.name, "Walls branch");
        assert_eq!(branch.title.as_deref(), Some("Castle"));
        assert_eq!(branch.description, "stone walls");
        assert_eq!(branch.steps[0].title, "Stack blocks");
        assert_ne!(branch.steps[0].id, p.steps[0].id);
        assert_eq!(branch.steps[0].project_id, branch.id);
        assert_eq!(s.selected_project_id().as_deref(), Some(branch.id.as_str()));
        assert_eq!(s.get(&p.id).unwrap().steps[0].id, p.steps[0].id);
    }

    #[test]
    fn switch_scope_reloads_other_profile() {
        let (storage, telemetry, s) = store();
        let kite = s.create_project("Kite");

        telemetry.switch_scope("profile_b");
        s.switch_scope("profile_b");
        assert!(s.projects().is_empty());
        assert!(s.selected_project().is_none());
        let boat = s.create_project("Boat");
        assert_eq!(boat.profile_id, "profile_b");

        s.switch_scope(DEFAULT_PROFILE_ID);
        let names: Vec<String> = s.projects().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Kite"]);
        assert_eq!(s.selected_project_id().as_deref(), Some(kite.id.as_str()));

        let reopened = ProjectStore::new(
            LocalProjectStore::new(storage),
            telemetry,
            "profile_b",
        );
        assert_eq!(reopened.projects()[0].id, boat.id);
    }

    #[test]
    fn scope_matches_storage_past_the_project_cap() {
        let (storage, _, s) = store();
        let ids: Vec<String> = (0..=MAX_STORED_PROJECTS)
            .map(|i| s.create_project(&format!("p{i}")).id)
            .collect();

        assert_eq!(s.projects().len(), MAX_STORED_PROJECTS);
        assert!(s.get(&ids[0]).is_none());
        assert!(s.update_project(&ids[0], ProjectPatch::default()).is_none());

        s.update_project(&ids[1], ProjectPatch::default()).unwrap();
        let stored: Vec<String> = LocalProjectStore::new(storage)
            .load_projects_for_profile(DEFAULT_PROFILE_ID)
            .into_iter()
            .map(|p| p.id)
            .collect();
        let in_memory: Vec<String> = s.projects().into_iter().map(|p| p.id).collect();
        assert_eq!(stored, in_memory);
        assert_eq!(stored, ids[1..].to_vec());
    }
}
