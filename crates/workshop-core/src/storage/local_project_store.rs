//! Project records in key-value storage, partitioned by profile.
//!
//! Layout: `workshop.projects` holds `{ "<profileId>": [Project, ...] }`. Older builds stored
//! a bare array; that shape is read as the default profile's bucket. The active project id
//! of each profile is a raw string under `workshop.activeProjectId.<profileId>`.

use super::{read_raw, read_value, remove_key, write_json, write_raw, KvStorage};
use crate::domain::{Project, ProfileId, DEFAULT_PROFILE_ID};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PROJECTS_KEY: &str = "workshop.projects";
const ACTIVE_KEY_PREFIX: &str = "workshop.activeProjectId";
/// Projects kept per profile; the oldest are dropped on save.
pub const MAX_STORED_PROJECTS: usize = 50;

type ProjectsByProfile = BTreeMap<ProfileId, Vec<Value>>;

#[derive(Clone)]
pub struct LocalProjectStore {
    storage: Arc<dyn KvStorage>,
}

fn active_key_for_profile(profile_id: &str) -> String {
    format!("{}.{}", ACTIVE_KEY_PREFIX, profile_id)
}

impl LocalProjectStore {
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        Self { storage }
    }

    fn load_bucket(&self) -> ProjectsByProfile {
        let mut normalized = ProjectsByProfile::new();
        match read_value(self.storage.as_ref(), PROJECTS_KEY) {
            Some(Value::Array(legacy)) => {
                normalized.insert(DEFAULT_PROFILE_ID.to_string(), legacy);
            }
            Some(Value::Object(map)) => {
                for (profile_id, value) in map {
                    if let Value::Array(records) = value {
                        normalized.insert(profile_id, records);
                    }
                }
            }
            _ => {}
        }
        normalized
    }

    fn persist(&self, bucket: &ProjectsByProfile) -> bool {
        write_json(self.storage.as_ref(), PROJECTS_KEY, bucket)
    }

    /// The profile's projects in stored order, each stamped with `profile_id`.
    ///
    /// Records that no longer decode are skipped.
    pub fn load_projects_for_profile(&self, profile_id: &str) -> Vec<Project> {
        let mut bucket = self.load_bucket();
        let records = bucket.remove(profile_id).unwrap_or_default();
        records
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Project>(raw) {
                Ok(mut project) => {
                    project.profile_id = profile_id.to_string();
                    project.restamp_children();
                    Some(project)
                }
                Err(e) => {
                    tracing::warn!(target: "workshop::store", profile_id, error = %e, "skipping unreadable project record");
                    None
                }
            })
            .collect()
    }

    /// Inserts or replaces the project (matched by id), re-applying text limits, then prunes the oldest.
    pub fn save_project(&self, profile_id: &str, project: &Project) -> bool {
        let mut entry = project.clone();
        entry.apply_limits();
        entry.profile_id = profile_id.to_string();
        let value = match serde_json::to_value(&entry) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "workshop::store", project_id = %project.id, error = %e, "project not serializable");
                return false;
            }
        };

        let mut bucket = self.load_bucket();
        let records = bucket.entry(profile_id.to_string()).or_default();
        let existing = records
            .iter()
            .position(|r| r.get("id").and_then(Value::as_str) == Some(project.id.as_str()));
        match existing {
            Some(i) => records[i] = value,
            None => records.push(value),
        }
        if records.len() > MAX_STORED_PROJECTS {
            let excess = records.len() - MAX_STORED_PROJECTS;
            records.drain(..excess);
            tracing::debug!(target: "workshop::store", profile_id, dropped = excess, "pruned oldest projects");
        }
        self.persist(&bucket)
    }

    pub fn delete_project(&self, profile_id: &str, id: &str) -> bool {
        let mut bucket = self.load_bucket();
        let records = bucket.entry(profile_id.to_string()).or_default();
        records.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        self.persist(&bucket)
    }

    pub fn get_active_project_id(&self, profile_id: &str) -> Option<String> {
        read_raw(self.storage.as_ref(), &active_key_for_profile(profile_id)).filter(|s| !s.is_empty())
    }

    /// `None` clears the stored selection.
    pub fn set_active_project_id(&self, profile_id: &str, id: Option<&str>) -> bool {
        let key = active_key_for_profile(profile_id);
        match id {
            Some(id) => write_raw(self.storage.as_ref(), &key, id),
            None => remove_key(self.storage.as_ref(), &key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationIdea;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, LocalProjectStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), LocalProjectStore::new(storage))
    }

    #[test]
    fn projects_are_partitioned_by_profile() {
        let (_, s) = store();
        s.save_project("a", &Project::new("a", "Kite"));
        s.save_project("b", &Project::new("b", "Boat"));
        let a = s.load_projects_for_profile("a");
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].name, "Kite");
        assert_eq!(s.load_projects_for_profile("b")[0].name, "Boat");
        assert!(s.load_projects_for_profile("c").is_empty());
    }

    #[test]
    fn legacy_array_loads_into_default_profile() {
        let (storage, s) = store();
        let p = Project::new("", "Legacy");
        let raw = serde_json::to_string(&vec![p]).unwrap();
        storage.set(PROJECTS_KEY, &raw).unwrap();
        let loaded = s.load_projects_for_profile(DEFAULT_PROFILE_ID);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].profile_id, DEFAULT_PROFILE_ID);
    }

    #[test]
    fn save_clamps_idea_and_prunes_oldest() {
        let (_, s) = store();
        let mut first = Project::new("a", "first");
        first.idea = Some(StationIdea {
            title: "x".repeat(100),
            ..Default::default()
        });
        s.save_project("a", &first);
        assert_eq!(
            s.load_projects_for_profile("a")[0].idea.as_ref().unwrap().title.len(),
            60
        );
        for i in 0..MAX_STORED_PROJECTS {
            s.save_project("a", &Project::new("a", &format!("p{i}")));
        }
        let loaded = s.load_projects_for_profile("a");
        assert_eq!(loaded.len(), MAX_STORED_PROJECTS);
        assert!(loaded.iter().all(|p| p.id != first.id));
    }

    #[test]
    fn malformed_storage_reads_empty() {
        let (storage, s) = store();
        storage.set(PROJECTS_KEY, "not json").unwrap();
        assert!(s.load_projects_for_profile(DEFAULT_PROFILE_ID).is_empty());
    }

    #[test]
    fn active_project_id_round_trip() {
        let (_, s) = store();
        assert!(s.get_active_project_id("a").is_none());
        s.set_active_project_id("a", Some("project_1"));
        assert_eq!(s.get_active_project_id("a").as_deref(), Some("project_1"));
        s.set_active_project_id("a", None);
        assert!(s.get_active_project_id("a").is_none());
    }
}
