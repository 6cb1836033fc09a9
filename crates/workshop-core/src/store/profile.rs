//! Profiles and the active profile.
//!
//! The default profile always exists and cannot be deleted. The active id is stored as a
//! raw string and falls back to the default profile when it names an unknown profile.

use crate::domain::{NewProfile, Profile, ProfileId, ProfilePatch, DEFAULT_PROFILE_ID};
use crate::listeners::{ListenerSet, SubscriptionId};
use crate::storage::{read_raw, read_value, write_json, write_raw, KvStorage};
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

pub const PROFILES_KEY: &str = "workshop.profiles";
pub const ACTIVE_PROFILE_KEY: &str = "workshop.activeProfileId";

#[derive(Debug, Clone)]
struct ProfileState {
    profiles: Vec<Profile>,
    active_id: ProfileId,
}

pub struct ProfileStore {
    storage: Arc<dyn KvStorage>,
    state: RwLock<ProfileState>,
    listeners: ListenerSet,
}

fn ensure_default_profile(mut profiles: Vec<Profile>) -> Vec<Profile> {
    if !profiles.iter().any(Profile::is_default) {
        profiles.insert(0, Profile::default_profile());
    }
    profiles
}

impl ProfileStore {
    /// Loads profiles, inserting the default profile when missing, and persists the normalised state.
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        let stored: Vec<Profile> = match read_value(storage.as_ref(), PROFILES_KEY) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        };
        let profiles = ensure_default_profile(stored);
        let active_id = read_raw(storage.as_ref(), ACTIVE_PROFILE_KEY)
            .filter(|id| profiles.iter().any(|p| &p.id == id))
            .unwrap_or_else(|| DEFAULT_PROFILE_ID.to_string());

        write_json(storage.as_ref(), PROFILES_KEY, &profiles);
        write_raw(storage.as_ref(), ACTIVE_PROFILE_KEY, &active_id);
        tracing::debug!(target: "workshop::profiles", count = profiles.len(), active = %active_id, "profiles loaded");

        Self {
            storage,
            state: RwLock::new(ProfileState {
                profiles,
                active_id,
            }),
            listeners: ListenerSet::new(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ProfileState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ProfileState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_profiles(&self, profiles: &[Profile]) {
        write_json(self.storage.as_ref(), PROFILES_KEY, profiles);
    }

    pub fn profiles(&self) -> Vec<Profile> {
        self.read().profiles.clone()
    }

    pub fn get(&self, id: &str) -> Option<Profile> {
        self.read().profiles.iter().find(|p| p.id == id).cloned()
    }

    pub fn active_profile_id(&self) -> ProfileId {
        self.read().active_id.clone()
    }

    /// The active profile, or a fresh default profile if it has gone missing.
    pub fn active_profile(&self) -> Profile {
        let state = self.read();
        state
            .profiles
            .iter()
            .find(|p| p.id == state.active_id)
            .cloned()
            .unwrap_or_else(Profile::default_profile)
    }

    pub fn subscribe<F: Fn() + Send + Sync + 'static>(&self, listener: F) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Creates a profile and makes it active.
    pub fn create_profile(&self, payload: NewProfile) -> Profile {
        let profile = Profile::build(payload, None);
        {
            let mut state = self.write();
            state.profiles.push(profile.clone());
            self.persist_profiles(&state.profiles);
        }
        tracing::info!(target: "workshop::profiles", profile_id = %profile.id, "profile created");
        self.set_active_profile_id(&profile.id);
        profile
    }

    /// `None` when the id is unknown.
    pub fn update_profile(&self, id: &str, patch: ProfilePatch) -> Option<Profile> {
        let updated = {
            let mut state = self.write();
            let existing = state.profiles.iter_mut().find(|p| p.id == id)?;
            if let Some(name) = patch.display_name {
                let trimmed = name.trim();
                if !trimmed.is_empty() {
                    existing.display_name = trimmed.to_string();
                }
            }
            if let Some(age_band) = patch.age_band {
                existing.age_band = age_band;
            }
            if patch.avatar_id.is_some() {
                existing.avatar_id = patch.avatar_id;
            }
            if patch.color.is_some() {
                existing.color = patch.color;
            }
            existing.updated_at = Utc::now();
            let updated = existing.clone();
            self.persist_profiles(&state.profiles);
            updated
        };
        self.listeners.notify();
        Some(updated)
    }

    /// Refuses the default profile and unknown ids. Deleting the active profile activates another one.
    pub fn delete_profile(&self, id: &str) -> bool {
        if id == DEFAULT_PROFILE_ID {
            return false;
        }
        let fallback = {
            let mut state = self.write();
            let before = state.profiles.len();
            state.profiles.retain(|p| p.id != id);
            if state.profiles.len() == before {
                return false;
            }
            let profiles = ensure_default_profile(std::mem::take(&mut state.profiles));
            state.profiles = profiles;
            self.persist_profiles(&state.profiles);
            if state.active_id == id {
                state.profiles.first().map(|p| p.id.clone())
            } else {
                None
            }
        };
        tracing::info!(target: "workshop::profiles", profile_id = id, "profile deleted");
        match fallback {
            Some(next) => {
                self.set_active_profile_id(&next);
            }
            None => self.listeners.notify(),
        }
        true
    }

    /// Ignored (returns false) for unknown ids.
    pub fn set_active_profile_id(&self, id: &str) -> bool {
        {
            let mut state = self.write();
            if !state.profiles.iter().any(|p| p.id == id) {
                return false;
            }
            state.active_id = id.to_string();
        }
        write_raw(self.storage.as_ref(), ACTIVE_PROFILE_KEY, id);
        self.listeners.notify();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgeBand;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, ProfileStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), ProfileStore::new(storage))
    }

    #[test]
    fn default_profile_always_exists() {
        let (_, s) = store();
        assert_eq!(s.profiles().len(), 1);
        assert_eq!(s.active_profile_id(), DEFAULT_PROFILE_ID);
        assert!(!s.delete_profile(DEFAULT_PROFILE_ID));
    }

    #[test]
    fn created_profile_becomes_active_and_persists() {
        let (storage, s) = store();
        let p = s.create_profile(NewProfile {
            display_name: Some("Ada".into()),
            age_band: Some(AgeBand::Tweens),
            ..Default::default()
        });
        assert_eq!(s.active_profile_id(), p.id);

        let reopened = ProfileStore::new(storage);
        assert_eq!(reopened.active_profile_id(), p.id);
        assert_eq!(reopened.get(&p.id).unwrap().age_band, AgeBand::Tweens);
    }

    #[test]
    fn deleting_active_profile_falls_back() {
        let (_, s) = store();
        let p = s.create_profile(NewProfile::default());
        assert!(s.delete_profile(&p.id));
        assert_eq!(s.active_profile_id(), DEFAULT_PROFILE_ID);
        assert!(!s.delete_profile(&p.id));
    }

    #[test]
    fn delete_notifies_and_persists_active_choice() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (storage, s) = store();
        let ada = s.create_profile(NewProfile::default());
        let bo = s.create_profile(NewProfile::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        s.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(s.delete_profile(&ada.id));
        assert_eq!(s.active_profile_id(), bo.id);
        assert!(calls.load(Ordering::SeqCst) >= 1);

        let before = calls.load(Ordering::SeqCst);
        assert!(s.delete_profile(&bo.id));
        assert!(calls.load(Ordering::SeqCst) > before);
        assert_eq!(ProfileStore::new(storage).active_profile_id(), DEFAULT_PROFILE_ID);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let (_, s) = store();
        assert!(!s.set_active_profile_id("profile_missing"));
        assert!(s.update_profile("profile_missing", ProfilePatch::default()).is_none());
    }

    #[test]
    fn stale_active_id_falls_back_to_default() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(ACTIVE_PROFILE_KEY, "profile_gone").unwrap();
        storage.set(PROFILES_KEY, "{broken").unwrap();
        let s = ProfileStore::new(storage);
        assert_eq!(s.active_profile_id(), DEFAULT_PROFILE_ID);
    }
}
