//! Wire shape of a `.workshop.json` file (schema `1.0`).
//!
//! Nested entities carry no storage ids; enum-like fields and dates are plain strings so an
//! import can repair bad values instead of rejecting the whole file.

use crate::domain::{Goal, StationIdea};
use serde::{Deserialize, Serialize};

pub const EXPORT_SCHEMA_VERSION: &str = "1.0";
pub const CREATION_LAB_SIGNATURE: &str = "Created in the MythologIQ Creation Lab";
pub const EXPORT_FILE_SUFFIX: &str = ".workshop.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedReflection {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedTest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedArchive {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedMemoryEntry {
    #[serde(default)]
    pub proud_of: String,
    #[serde(default)]
    pub lesson: String,
    #[serde(default)]
    pub next_time: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedReflectSnapshot {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportedStationMemory {
    #[serde(default)]
    pub entries: Vec<ExportedMemoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportedStationReflect {
    #[serde(default)]
    pub snapshots: Vec<ExportedReflectSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedShare {
    #[serde(default)]
    pub last_export_at: Option<String>,
    #[serde(default)]
    pub last_format: String,
}

/// Project fields captured by a snapshot, in the same forgiving shape as the project itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportedProjectState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idea: Option<StationIdea>,
    pub status: String,
    pub current_station: String,
    pub steps: Vec<ExportedStep>,
    pub reflections: Vec<ExportedReflection>,
    pub tests: Vec<ExportedTest>,
    pub archives: Vec<ExportedArchive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<ExportedStationMemory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflect: Option<ExportedStationReflect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<ExportedShare>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub project_state: ExportedProjectState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedProject {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<StationIdea>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_station: String,
    #[serde(default)]
    pub steps: Vec<ExportedStep>,
    #[serde(default)]
    pub reflections: Vec<ExportedReflection>,
    #[serde(default)]
    pub tests: Vec<ExportedTest>,
    #[serde(default)]
    pub archives: Vec<ExportedArchive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<ExportedStationMemory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflect: Option<ExportedStationReflect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ExportedShare>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<ExportedSnapshot>>,
}

/// Top-level envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExportV1 {
    pub schema_version: String,
    pub exported_at: String,
    pub creation_lab_signature: String,
    pub project: ExportedProject,
}

/// A serialized export ready to be written to disk or handed to a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

impl ExportFile {
    pub const MIME_TYPE: &'static str = "application/json";

    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_bytes()
    }
}
