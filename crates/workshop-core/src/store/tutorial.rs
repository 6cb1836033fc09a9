//! Guided tutorial progress.

use crate::listeners::{ListenerSet, SubscriptionId};
use crate::storage::{read_value, write_json, KvStorage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

pub const TUTORIAL_KEY: &str = "workshop.tutorial";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorialState {
    pub active_tutorial_id: Option<String>,
    pub current_step_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

pub struct TutorialStore {
    storage: Arc<dyn KvStorage>,
    state: RwLock<TutorialState>,
    listeners: ListenerSet,
}

impl TutorialStore {
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        let state = read_value(storage.as_ref(), TUTORIAL_KEY)
            .and_then(|raw| serde_json::from_value(raw).ok())
            .unwrap_or_default();
        Self {
            storage,
            state: RwLock::new(state),
            listeners: ListenerSet::new(),
        }
    }

    pub fn state(&self) -> TutorialState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_state(&self, next: TutorialState) {
        write_json(self.storage.as_ref(), TUTORIAL_KEY, &next);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.listeners.notify();
    }

    pub fn start(&self, tutorial_id: &str) {
        self.update_state(TutorialState {
            active_tutorial_id: Some(tutorial_id.to_string()),
            current_step_index: 0,
            completed_at: None,
        });
    }

    pub fn reset(&self, tutorial_id: &str) {
        self.start(tutorial_id);
    }

    pub fn complete(&self) {
        self.update_state(TutorialState {
            active_tutorial_id: None,
            current_step_index: 0,
            completed_at: Some(Utc::now()),
        });
    }

    /// Advances one step; completes the tutorial when `total_steps` is reached.
    ///
    /// Returns true when this call completed the tutorial.
    pub fn next(&self, total_steps: usize) -> bool {
        let current = self.state();
        if current.active_tutorial_id.is_none() {
            return false;
        }
        let next_index = current.current_step_index + 1;
        if next_index >= total_steps {
            self.complete();
            return true;
        }
        self.update_state(TutorialState {
            current_step_index: next_index,
            ..current
        });
        false
    }

    pub fn prev(&self) {
        let current = self.state();
        if current.active_tutorial_id.is_none() {
            return;
        }
        self.update_state(TutorialState {
            current_step_index: current.current_step_index.saturating_sub(1),
            ..current
        });
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
    use crate::storage::MemoryStorage;

    #[test]
    fn steps_advance_and_complete() {
        let t = TutorialStore::new(Arc::new(MemoryStorage::new()));
        assert!(!t.next(3));
        t.start("robot_dog_comic");
        assert!(!t.next(3));
        t.prev();
        t.prev();
        assert_eq!(t.state().current_step_index, 0);
        assert!(!t.next(2));
        assert!(t.next(2));
        let state = t.state();
        assert!(state.active_tutorial_id.is_none());
        assert!(state.completed_at.is_some());
    }

    #[test]
    fn malformed_state_reads_default() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TUTORIAL_KEY, "[1,2]").unwrap();
        assert_eq!(TutorialStore::new(storage).state(), TutorialState::default());
    }
}
