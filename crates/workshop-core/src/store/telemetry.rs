//! Per-profile telemetry counters.
//!
//! Stored as `{ "<profileId>": TelemetryState }` under [`TELEMETRY_KEY`]. A bare state from
//! older builds is read as the default profile's. Recording is a no-op while the active
//! profile's telemetry is disabled.

use crate::domain::{ProfileId, StationKey, TelemetryState, DEFAULT_PROFILE_ID};
use crate::listeners::{ListenerSet, SubscriptionId};
use crate::storage::{read_value, write_json, KvStorage};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const TELEMETRY_KEY: &str = "workshop.telemetry";

type TelemetryByProfile = BTreeMap<ProfileId, TelemetryState>;

pub struct TelemetryStore {
    storage: Arc<dyn KvStorage>,
    active_profile: RwLock<ProfileId>,
    listeners: ListenerSet,
}

impl TelemetryStore {
    /// Scoped to `profile_id`; the default profile's state is created if missing.
    pub fn new(storage: Arc<dyn KvStorage>, profile_id: &str) -> Self {
        let store = Self {
            storage,
            active_profile: RwLock::new(profile_id.to_string()),
            listeners: ListenerSet::new(),
        };
        let mut all = store.load_all();
        let mut changed = false;
        for id in [DEFAULT_PROFILE_ID, profile_id] {
            if !all.contains_key(id) {
                all.insert(id.to_string(), TelemetryState::default());
                changed = true;
            }
        }
        if changed {
            store.persist(&all);
        }
        store
    }

    fn load_all(&self) -> TelemetryByProfile {
        let mut normalized = TelemetryByProfile::new();
        let Some(raw) = read_value(self.storage.as_ref(), TELEMETRY_KEY) else {
            return normalized;
        };
        if let Some(legacy) = TelemetryState::from_value(&raw) {
            normalized.insert(DEFAULT_PROFILE_ID.to_string(), legacy);
            return normalized;
        }
        if let Value::Object(map) = raw {
            for (profile_id, value) in map {
                if let Some(state) = TelemetryState::from_value(&value) {
                    normalized.insert(profile_id, state);
                }
            }
        }
        normalized
    }

    fn persist(&self, all: &TelemetryByProfile) {
        write_json(self.storage.as_ref(), TELEMETRY_KEY, all);
    }

    pub fn active_profile_id(&self) -> ProfileId {
        self.active_profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rescopes to another profile, creating its state if needed.
    pub fn switch_scope(&self, profile_id: &str) {
        *self
            .active_profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = profile_id.to_string();
        self.ensure_profile_state(profile_id);
        tracing::debug!(target: "workshop::telemetry", profile_id, "telemetry scope switched");
        self.listeners.notify();
    }

    fn ensure_profile_state(&self, profile_id: &str) -> TelemetryState {
        let mut all = self.load_all();
        if let Some(state) = all.get(profile_id) {
            return state.clone();
        }
        let state = TelemetryState::default();
        all.insert(profile_id.to_string(), state.clone());
        self.persist(&all);
        state
    }

    fn update_profile_state(&self, profile_id: &str, next: TelemetryState) {
        let mut all = self.load_all();
        all.insert(profile_id.to_string(), next);
        self.persist(&all);
        self.listeners.notify();
    }

    fn with_telemetry<F: FnOnce(&mut TelemetryState)>(&self, mutator: F) {
        let profile_id = self.active_profile_id();
        let mut state = self.ensure_profile_state(&profile_id);
        if !state.enabled {
            return;
        }
        mutator(&mut state);
        self.update_profile_state(&profile_id, state);
    }

    /// The active profile's counters.
    pub fn state(&self) -> TelemetryState {
        self.ensure_profile_state(&self.active_profile_id())
    }

    pub fn state_for(&self, profile_id: &str) -> Option<TelemetryState> {
        self.load_all().remove(profile_id)
    }

    /// Sums over every profile. `enabled` is true if any profile is enabled.
    pub fn aggregated_state(&self) -> TelemetryState {
        let mut aggregate = TelemetryState {
            enabled: false,
            ..Default::default()
        };
        for state in self.load_all().values() {
            aggregate.total_projects_created += state.total_projects_created;
            aggregate.total_sessions += state.total_sessions;
            aggregate.completed_tutorials += state.completed_tutorials;
            aggregate.enabled |= state.enabled;
            aggregate.last_reset_at = aggregate.last_reset_at.or(state.last_reset_at);
            for (station, count) in aggregate.station_visit_counts.iter_mut() {
                *count += state.visits(*station);
            }
        }
        aggregate
    }

    pub fn subscribe<F: Fn() + Send + Sync + 'static>(&self, listener: F) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn record_project_created(&self) {
        self.with_telemetry(|s| s.total_projects_created += 1);
    }

    pub fn record_session(&self) {
        self.with_telemetry(|s| s.total_sessions += 1);
    }

    pub fn record_station_visit(&self, station: StationKey) {
        self.with_telemetry(|s| *s.station_visit_counts.entry(station).or_insert(0) += 1);
    }

    pub fn record_tutorial_completed(&self) {
        self.with_telemetry(|s| s.completed_tutorials += 1);
    }

    /// Zeroes the active profile's counters, keeping its enabled flag.
    pub fn reset(&self) {
        let profile_id = self.active_profile_id();
        let prev = self.ensure_profile_state(&profile_id);
        self.update_profile_state(
            &profile_id,
            TelemetryState {
                enabled: prev.enabled,
                last_reset_at: Some(Utc::now()),
                ..Default::default()
            },
        );
        tracing::info!(target: "workshop::telemetry", profile_id = %profile_id, "telemetry reset");
    }

    pub fn set_enabled(&self, enabled: bool) {
        let profile_id = self.active_profile_id();
        let mut state = self.ensure_profile_state(&profile_id);
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        self.update_profile_state(&profile_id, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn counters_are_scoped_per_profile() {
        let storage = Arc::new(MemoryStorage::new());
        let t = TelemetryStore::new(storage, DEFAULT_PROFILE_ID);
        t.record_project_created();
        t.record_station_visit(StationKey::Build);
        t.switch_scope("profile_b");
        t.record_session();
        assert_eq!(t.state().total_sessions, 1);
        assert_eq!(t.state().total_projects_created, 0);

        let agg = t.aggregated_state();
        assert_eq!(agg.total_projects_created, 1);
        assert_eq!(agg.total_sessions, 1);
        assert_eq!(agg.visits(StationKey::Build), 1);
        assert!(agg.enabled);
    }

    #[test]
    fn disabled_telemetry_ignores_records_and_reset_keeps_flag() {
        let t = TelemetryStore::new(Arc::new(MemoryStorage::new()), DEFAULT_PROFILE_ID);
        t.record_session();
        t.set_enabled(false);
        t.record_session();
        assert_eq!(t.state().total_sessions, 1);
        t.reset();
        let state = t.state();
        assert_eq!(state.total_sessions, 0);
        assert!(!state.enabled);
        assert!(state.last_reset_at.is_some());
    }

    #[test]
    fn legacy_flat_state_migrates_to_default_profile() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(TELEMETRY_KEY, r#"{"totalProjectsCreated":4,"totalSessions":2}"#)
            .unwrap();
        let t = TelemetryStore::new(storage, DEFAULT_PROFILE_ID);
        assert_eq!(t.state().total_projects_created, 4);
        assert_eq!(t.state().station_visit_counts.len(), 7);
    }
}
