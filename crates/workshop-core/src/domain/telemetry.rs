//! Per-profile usage counters that feed adaptive coaching.

use super::project::StationKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type StationVisitCounts = BTreeMap<StationKey, u64>;

/// Every station mapped to zero.
pub fn empty_visit_counts() -> StationVisitCounts {
    StationKey::all().into_iter().map(|k| (k, 0)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryState {
    pub total_projects_created: u64,
    pub total_sessions: u64,
    pub station_visit_counts: StationVisitCounts,
    pub completed_tutorials: u64,
    pub enabled: bool,
    pub last_reset_at: Option<DateTime<Utc>>,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self {
            total_projects_created: 0,
            total_sessions: 0,
            station_visit_counts: empty_visit_counts(),
            completed_tutorials: 0,
            enabled: true,
            last_reset_at: None,
        }
    }
}

fn count(value: Option<&Value>) -> Option<u64> {
    let v = value?;
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
}

impl TelemetryState {
    /// Lenient decode of one stored state.
    ///
    /// Returns `None` unless both `totalProjectsCreated` and `totalSessions` are numbers.
    /// Missing or negative station counts become zero; unknown stations are ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let total_projects_created = count(obj.get("totalProjectsCreated"))?;
        let total_sessions = count(obj.get("totalSessions"))?;
        let mut station_visit_counts = empty_visit_counts();
        if let Some(counts) = obj.get("stationVisitCounts").and_then(Value::as_object) {
            for (key, slot) in station_visit_counts.iter_mut() {
                if let Some(n) = count(counts.get(key.as_str())) {
                    *slot = n;
                }
            }
        }
        let last_reset_at = obj
            .get("lastResetAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        Some(Self {
            total_projects_created,
            total_sessions,
            station_visit_counts,
            completed_tutorials: count(obj.get("completedTutorials")).unwrap_or(0),
            enabled: obj.get("enabled").and_then(Value::as_bool).unwrap_or(true),
            last_reset_at,
        })
    }

    pub fn visits(&self, station: StationKey) -> u64 {
        self.station_visit_counts.get(&station).copied().unwrap_or(0)
    }

    /// Mean visit count across all stations.
    pub fn average_visits(&self) -> f64 {
        let stations = StationKey::all();
        let total: u64 = stations.iter().map(|k| self.visits(*k)).sum();
        total as f64 / stations.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_state_has_every_station() {
        let state = TelemetryState::default();
        assert_eq!(state.station_visit_counts.len(), 7);
        assert!(state.enabled);
    }

    #[test]
    fn lenient_decode_fills_missing_counts() {
        let raw = json!({
            "totalProjectsCreated": 2,
            "totalSessions": 5,
            "stationVisitCounts": { "idea": 3, "build": -1, "lobby": 9 }
        });
        let state = TelemetryState::from_value(&raw).unwrap();
        assert_eq!(state.visits(StationKey::Idea), 3);
        assert_eq!(state.visits(StationKey::Build), 0);
        assert_eq!(state.visits(StationKey::Replay), 0);
        assert!(state.enabled);
    }

    #[test]
    fn rejects_values_without_totals() {
        assert!(TelemetryState::from_value(&json!({ "totalSessions": 1 })).is_none());
        assert!(TelemetryState::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn serializes_station_keys_as_snake_case() {
        let v = serde_json::to_value(TelemetryState::default()).unwrap();
        assert_eq!(v["stationVisitCounts"]["reflect"], 0);
        assert_eq!(v["lastResetAt"], Value::Null);
    }
}
