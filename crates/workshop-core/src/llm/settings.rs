//! Persisted model choice and performance mode.
//!
//! Stored as `{ "modelId", "performanceModeId" }` under [`LLM_SETTINGS_KEY`]. Unknown ids
//! are normalised to the defaults on every read and write. Each committed change bumps a
//! revision counter that the [`super::ModelLoader`] uses to drop its cached model.

use super::manifest::{
    calculate_token_cap, default_model_choice, find_model_choice, PerformanceModeId,
};
use crate::listeners::{ListenerSet, SubscriptionId};
use crate::storage::{read_value, write_json, KvStorage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub const LLM_SETTINGS_KEY: &str = "workshop.llm.settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    pub model_id: String,
    pub performance_mode_id: PerformanceModeId,
    pub token_cap: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self::normalize(None, None)
    }
}

impl LlmSettings {
    fn normalize(model_id: Option<&str>, mode: Option<&str>) -> Self {
        let model = model_id
            .and_then(find_model_choice)
            .unwrap_or_else(default_model_choice);
        let mode = mode
            .and_then(PerformanceModeId::parse)
            .unwrap_or_default();
        Self {
            model_id: model.id.clone(),
            performance_mode_id: mode,
            token_cap: calculate_token_cap(&model.id, mode),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings<'a> {
    model_id: &'a str,
    performance_mode_id: PerformanceModeId,
}

pub struct LlmSettingsStore {
    storage: Arc<dyn KvStorage>,
    state: RwLock<LlmSettings>,
    revision: AtomicU64,
    listeners: ListenerSet,
}

impl LlmSettingsStore {
    /// Loads stored settings, or the catalogue defaults when nothing valid is stored.
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        Self::with_fallback(storage, None, None)
    }

    /// Like [`LlmSettingsStore::new`] but uses the given ids when storage is empty.
    pub fn with_fallback(
        storage: Arc<dyn KvStorage>,
        model_id: Option<&str>,
        performance_mode: Option<&str>,
    ) -> Self {
        let state = match read_value(storage.as_ref(), LLM_SETTINGS_KEY) {
            Some(raw) if raw.is_object() => LlmSettings::normalize(
                raw.get("modelId").and_then(|v| v.as_str()).or(model_id),
                raw.get("performanceModeId")
                    .and_then(|v| v.as_str())
                    .or(performance_mode),
            ),
            _ => LlmSettings::normalize(model_id, performance_mode),
        };
        Self {
            storage,
            state: RwLock::new(state),
            revision: AtomicU64::new(0),
            listeners: ListenerSet::new(),
        }
    }

    pub fn get(&self) -> LlmSettings {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Incremented on every committed change.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn subscribe<F: Fn() + Send + Sync + 'static>(&self, listener: F) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Unknown model ids fall back to the default model.
    pub fn set_model_choice(&self, model_id: &str) {
        let mode = self.get().performance_mode_id;
        self.commit(LlmSettings::normalize(Some(model_id), Some(mode.as_str())));
    }

    pub fn set_performance_mode(&self, mode: PerformanceModeId) {
        let current = self.get();
        self.commit(LlmSettings::normalize(
            Some(&current.model_id),
            Some(mode.as_str()),
        ));
    }

    fn commit(&self, next: LlmSettings) {
        write_json(
            self.storage.as_ref(),
            LLM_SETTINGS_KEY,
            &StoredSettings {
                model_id: &next.model_id,
                performance_mode_id: next.performance_mode_id,
            },
        );
        tracing::info!(
            target: "workshop::llm",
            model_id = %next.model_id,
            mode = next.performance_mode_id.as_str(),
            token_cap = next.token_cap,
            "LLM settings updated"
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.revision.fetch_add(1, Ordering::AcqRel);
        self.listeners.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn defaults_when_storage_is_empty() {
        let s = LlmSettingsStore::new(Arc::new(MemoryStorage::new()));
        let state = s.get();
        assert_eq!(state.model_id, "Phi-3-mini-4k-instruct-q4");
        assert_eq!(state.performance_mode_id, PerformanceModeId::Balanced);
        assert_eq!(state.token_cap, 1024);
    }

    #[test]
    fn unknown_ids_normalise_and_changes_persist() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(LLM_SETTINGS_KEY, r#"{"modelId":"nope","performanceModeId":"turbo"}"#)
            .unwrap();
        let s = LlmSettingsStore::new(storage.clone());
        assert_eq!(s.get(), LlmSettings::default());

        s.set_model_choice("TinyLlama-1.1B-chat-q4");
        s.set_performance_mode(PerformanceModeId::Calm);
        assert_eq!(s.revision(), 2);

        let reopened = LlmSettingsStore::new(storage);
        let state = reopened.get();
        assert_eq!(state.model_id, "TinyLlama-1.1B-chat-q4");
        assert_eq!(state.performance_mode_id, PerformanceModeId::Calm);
        assert_eq!(state.token_cap, 384);
    }
}
