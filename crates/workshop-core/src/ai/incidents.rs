//! Bounded in-memory log of harness fallbacks.
//!
//! Holds at most `capacity` incidents; the oldest is dropped when a new one arrives.
//! [`IncidentLog::flush`] drains the buffer for export.

use crate::domain::{new_id, StationKey};
use crate::listeners::{ListenerSet, SubscriptionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_INCIDENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Timeout,
    InvalidShape,
    Redaction,
    Other,
}

impl IncidentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentCategory::Timeout => "timeout",
            IncidentCategory::InvalidShape => "invalid_shape",
            IncidentCategory::Redaction => "redaction",
            IncidentCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiIncident {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<StationKey>,
    pub category: IncidentCategory,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct IncidentLog {
    capacity: usize,
    entries: Mutex<VecDeque<AiIncident>>,
    listeners: ListenerSet,
}

impl Default for IncidentLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INCIDENT_CAPACITY)
    }
}

impl IncidentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_INCIDENT_CAPACITY))),
            listeners: ListenerSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn log(
        &self,
        station: Option<StationKey>,
        category: IncidentCategory,
        description: Option<String>,
    ) -> AiIncident {
        let record = AiIncident {
            id: new_id("aiincident"),
            station,
            category,
            timestamp: Utc::now(),
            description,
        };
        tracing::warn!(
            target: "workshop::incidents",
            category = category.as_str(),
            station = station.map(|s| s.as_str()).unwrap_or("none"),
            description = record.description.as_deref().unwrap_or(""),
            "AI incident recorded"
        );
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(record.clone());
        }
        self.listeners.notify();
        record
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<AiIncident> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.listeners.notify();
    }

    /// Removes and returns every incident, oldest first.
    pub fn flush(&self) -> Vec<AiIncident> {
        let drained: Vec<AiIncident> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if !drained.is_empty() {
            tracing::debug!(target: "workshop::incidents", count = drained.len(), "incident log flushed");
            self.listeners.notify();
        }
        drained
    }

    pub fn subscribe<F: Fn() + Send + Sync + 'static>(&self, listener: F) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
