//! User preferences and the visual theme choice.

use crate::listeners::{ListenerSet, SubscriptionId};
use crate::storage::{read_raw, read_value, write_json, write_raw, KvStorage};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

pub const PREFERENCES_KEY: &str = "workshop.preferences";
pub const THEME_KEY: &str = "workshop.theme";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub locale: String,
    pub larger_text: bool,
    pub extra_labels: bool,
    pub adaptive_coaching_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            larger_text: false,
            extra_labels: false,
            adaptive_coaching_enabled: true,
        }
    }
}

impl Preferences {
    /// Starts from `base` and overlays every well-typed field found in `raw`.
    fn merge(base: Preferences, raw: &serde_json::Value) -> Self {
        let mut out = base;
        if let Some(locale) = raw.get("locale").and_then(|v| v.as_str()) {
            if !locale.trim().is_empty() {
                out.locale = locale.to_string();
            }
        }
        if let Some(v) = raw.get("largerText").and_then(|v| v.as_bool()) {
            out.larger_text = v;
        }
        if let Some(v) = raw.get("extraLabels").and_then(|v| v.as_bool()) {
            out.extra_labels = v;
        }
        if let Some(v) = raw.get("adaptiveCoachingEnabled").and_then(|v| v.as_bool()) {
            out.adaptive_coaching_enabled = v;
        }
        out
    }
}

pub struct PreferencesStore {
    storage: Arc<dyn KvStorage>,
    state: RwLock<Preferences>,
    listeners: ListenerSet,
}

impl PreferencesStore {
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        Self::with_defaults(storage, Preferences::default())
    }

    /// `defaults` fill any field that is missing or malformed in storage.
    pub fn with_defaults(storage: Arc<dyn KvStorage>, defaults: Preferences) -> Self {
        let state = match read_value(storage.as_ref(), PREFERENCES_KEY) {
            Some(raw) if raw.is_object() => Preferences::merge(defaults, &raw),
            _ => defaults,
        };
        Self {
            storage,
            state: RwLock::new(state),
            listeners: ListenerSet::new(),
        }
    }

    pub fn get(&self) -> Preferences {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `f` to a copy, then persists and notifies.
    pub fn update<F: FnOnce(&mut Preferences)>(&self, f: F) -> Preferences {
        let next = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state);
            state.clone()
        };
        write_json(self.storage.as_ref(), PREFERENCES_KEY, &next);
        self.listeners.notify();
        next
    }

    pub fn subscribe<F: Fn() + Send + Sync + 'static>(&self, listener: F) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    #[default]
    Starship,
    Forge,
    Tower,
}

impl ThemeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeId::Starship => "starship",
            ThemeId::Forge => "forge",
            ThemeId::Tower => "tower",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "starship" => Some(Self::Starship),
            "forge" => Some(Self::Forge),
            "tower" => Some(Self::Tower),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeId::Starship => "Starship Shipyard",
            ThemeId::Forge => "Dwarven Forge",
            ThemeId::Tower => "Wizard Tower",
        }
    }
}

/// Theme id stored as a raw string.
pub struct ThemeStore {
    storage: Arc<dyn KvStorage>,
    active: RwLock<ThemeId>,
    listeners: ListenerSet,
}

impl ThemeStore {
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        let active = read_raw(storage.as_ref(), THEME_KEY)
            .and_then(|raw| ThemeId::parse(&raw))
            .unwrap_or_default();
        Self {
            storage,
            active: RwLock::new(active),
            listeners: ListenerSet::new(),
        }
    }

    pub fn theme(&self) -> ThemeId {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// No-op when `id` is already active.
    pub fn set_theme(&self, id: ThemeId) {
        {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            if *active == id {
                return;
            }
            *active = id;
        }
        write_raw(self.storage.as_ref(), THEME_KEY, id.as_str());
        self.listeners.notify();
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
    fn partial_preferences_merge_over_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(PREFERENCES_KEY, r#"{"largerText":true,"locale":42}"#)
            .unwrap();
        let prefs = PreferencesStore::new(storage).get();
        assert!(prefs.larger_text);
        assert_eq!(prefs.locale, "en");
        assert!(prefs.adaptive_coaching_enabled);
    }

    #[test]
    fn preference_updates_persist() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PreferencesStore::new(storage.clone());
        store.update(|p| p.adaptive_coaching_enabled = false);
        assert!(!PreferencesStore::new(storage).get().adaptive_coaching_enabled);
    }

    #[test]
    fn unknown_theme_falls_back_to_starship() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(THEME_KEY, "castle").unwrap();
        let themes = ThemeStore::new(storage.clone());
        assert_eq!(themes.theme(), ThemeId::Starship);
        themes.set_theme(ThemeId::Tower);
        assert_eq!(ThemeStore::new(storage).theme(), ThemeId::Tower);
    }
}
