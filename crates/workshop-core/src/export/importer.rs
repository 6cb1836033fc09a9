//! Reading `.workshop.json` files back into the project store.
//!
//! Only schema `1.0` is accepted. Every internal id is regenerated, bad dates become "now",
//! and unknown enum values fall back (`status` → draft, `currentStation` → idea). All
//! failures surface as one [`InvalidProjectFileError`] whose message can be shown as-is.

use super::types::*;
use crate::domain::{
    clamp_idea, new_id, timestamp_or_now, ArchiveEntry, MemoryEntry, Project, ProjectSnapshot,
    ProjectState, ProjectStatus, ReflectSnapshot, Reflection, ReflectionTag, StationKey,
    StationMemory, StationReflect, StationShare, Step, StepStatus, TestOutcome, TestResult,
    MAX_SNAPSHOTS,
};
use crate::error::InvalidProjectFileError;
use crate::store::ProjectStore;
use serde_json::Value;

pub const UNREADABLE_FILE: &str = "Unable to read this project file.";
pub const NOT_A_PROJECT: &str = "This file does not look like a Workshop project.";
pub const UNSUPPORTED_VERSION: &str = "Unsupported project file version.";
pub const MISSING_NAME: &str = "Project name is missing.";
const IMPORTED_PROJECT_NAME: &str = "Imported project";

/// Validates the envelope and returns its project section.
pub fn parse_project_file(bytes: &[u8]) -> Result<ExportedProject, InvalidProjectFileError> {
    let text =
        std::str::from_utf8(bytes).map_err(|_| InvalidProjectFileError::new(UNREADABLE_FILE))?;
    let value: Value =
        serde_json::from_str(text).map_err(|_| InvalidProjectFileError::new(UNREADABLE_FILE))?;
    let Value::Object(envelope) = value else {
        return Err(InvalidProjectFileError::new(NOT_A_PROJECT));
    };
    if envelope.get("schemaVersion").and_then(Value::as_str) != Some(EXPORT_SCHEMA_VERSION) {
        return Err(InvalidProjectFileError::new(UNSUPPORTED_VERSION));
    }
    let project = envelope.get("project").cloned().unwrap_or(Value::Null);
    if !project.get("name").is_some_and(Value::is_string) {
        return Err(InvalidProjectFileError::new(MISSING_NAME));
    }
    serde_json::from_value(project).map_err(|e| {
        tracing::debug!(target: "workshop::export", error = %e, "project section has the wrong shape");
        InvalidProjectFileError::new(UNREADABLE_FILE)
    })
}

fn import_steps(entries: Vec<ExportedStep>, project_id: &str) -> Vec<Step> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| Step {
            id: new_id("step"),
            project_id: project_id.to_string(),
            title: if entry.title.is_empty() {
                format!("Step {}", index + 1)
            } else {
                entry.title
            },
            summary: entry.summary,
            status: StepStatus::parse(&entry.status).unwrap_or_default(),
            order: entry.order.unwrap_or(index as i64),
            origin_station: entry.origin_station.as_deref().and_then(StationKey::parse),
            acceptance_criteria: entry.acceptance_criteria,
            notes: entry.notes,
            created_at: timestamp_or_now(entry.created_at.as_deref()),
            updated_at: timestamp_or_now(entry.updated_at.as_deref()),
        })
        .collect()
}

fn import_reflections(entries: Vec<ExportedReflection>, project_id: &str) -> Vec<Reflection> {
    entries
        .into_iter()
        .map(|entry| Reflection {
            id: new_id("reflection"),
            project_id: project_id.to_string(),
            tag: ReflectionTag::parse(&entry.tag).unwrap_or_default(),
            note: entry.note,
            created_at: timestamp_or_now(entry.created_at.as_deref()),
        })
        .collect()
}

fn import_tests(entries: Vec<ExportedTest>, project_id: &str) -> Vec<TestResult> {
    entries
        .into_iter()
        .map(|entry| TestResult {
            id: new_id("test"),
            project_id: project_id.to_string(),
            question: entry.question,
            outcome: TestOutcome::parse(&entry.outcome).unwrap_or_default(),
            note: entry.note,
            created_at: timestamp_or_now(entry.created_at.as_deref()),
        })
        .collect()
}

fn import_archives(entries: Vec<ExportedArchive>, project_id: &str) -> Vec<ArchiveEntry> {
    entries
        .into_iter()
        .map(|entry| ArchiveEntry {
            id: new_id("archive"),
            project_id: project_id.to_string(),
            label: entry.label,
            summary: entry.summary,
            snapshot: entry.snapshot,
            created_at: timestamp_or_now(entry.created_at.as_deref()),
        })
        .collect()
}

fn import_memory(memory: Option<ExportedStationMemory>, project_id: &str) -> Option<StationMemory> {
    let memory = memory.filter(|m| !m.entries.is_empty())?;
    Some(StationMemory {
        entries: memory
            .entries
            .into_iter()
            .map(|entry| MemoryEntry {
                id: new_id("memory"),
                project_id: project_id.to_string(),
                proud_of: entry.proud_of,
                lesson: entry.lesson,
                next_time: entry.next_time,
                created_at: timestamp_or_now(entry.created_at.as_deref()),
            })
            .collect(),
    })
}

fn import_reflect(reflect: Option<ExportedStationReflect>) -> Option<StationReflect> {
    let reflect = reflect.filter(|r| !r.snapshots.is_empty())?;
    Some(StationReflect {
        snapshots: reflect
            .snapshots
            .into_iter()
            .map(|entry| ReflectSnapshot {
                id: new_id("reflect"),
                tags: entry.tags,
                notes: entry.notes,
                created_at: timestamp_or_now(entry.created_at.as_deref()),
            })
            .collect(),
    })
}

fn import_share(share: Option<ExportedShare>) -> Option<StationShare> {
    share.map(|s| StationShare {
        last_export_at: timestamp_or_now(s.last_export_at.as_deref()),
        last_format: s.last_format,
    })
}

/// Repairs a snapshot's captured state the same way as the project itself.
fn import_state(state: ExportedProjectState, project_id: &str) -> ProjectState {
    ProjectState {
        title: state.title,
        description: state.description,
        goal: state.goal,
        idea: clamp_idea(state.idea),
        status: ProjectStatus::parse(&state.status).unwrap_or_default(),
        current_station: StationKey::parse(&state.current_station).unwrap_or_default(),
        steps: import_steps(state.steps, project_id),
        reflections: import_reflections(state.reflections, project_id),
        tests: import_tests(state.tests, project_id),
        archives: import_archives(state.archives, project_id),
        memory: import_memory(state.memory, project_id),
        reflect: import_reflect(state.reflect),
        share: import_share(state.share),
        tags: state.tags,
        created_at: state.created_at.as_deref().map(|ts| timestamp_or_now(Some(ts))),
        updated_at: state.updated_at.as_deref().map(|ts| timestamp_or_now(Some(ts))),
        name: state.name,
    }
}

fn import_snapshots(entries: Vec<ExportedSnapshot>, project_id: &str) -> Vec<ProjectSnapshot> {
    let skip = entries.len().saturating_sub(MAX_SNAPSHOTS);
    entries
        .into_iter()
        .skip(skip)
        .map(|entry| {
            let label = entry
                .label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or("Snapshot")
                .to_string();
            ProjectSnapshot {
                id: new_id("snapshot"),
                label,
                created_at: timestamp_or_now(entry.created_at.as_deref()),
                project_state: import_state(entry.project_state, project_id),
            }
        })
        .collect()
}

/// Assembles a fresh project (new ids throughout) from an exported one.
pub fn build_project_from_export(exported: ExportedProject, profile_id: &str) -> Project {
    let project_id = new_id("project");
    let name = match exported.name.trim() {
        "" => IMPORTED_PROJECT_NAME.to_string(),
        trimmed => trimmed.to_string(),
    };
    let mut project = Project {
        profile_id: profile_id.to_string(),
        title: exported.title.or_else(|| Some(exported.name.clone())),
        name,
        description: exported.description.unwrap_or_default(),
        goal: exported.goal,
        idea: exported.idea,
        status: ProjectStatus::parse(&exported.status).unwrap_or_default(),
        current_station: StationKey::parse(&exported.current_station).unwrap_or_default(),
        steps: import_steps(exported.steps, &project_id),
        reflections: import_reflections(exported.reflections, &project_id),
        tests: import_tests(exported.tests, &project_id),
        archives: import_archives(exported.archives, &project_id),
        memory: import_memory(exported.memory, &project_id),
        reflect: import_reflect(exported.reflect),
        share: import_share(exported.share),
        tags: exported.tags.unwrap_or_default(),
        created_at: timestamp_or_now(exported.created_at.as_deref()),
        updated_at: timestamp_or_now(exported.updated_at.as_deref()),
        snapshots: import_snapshots(exported.snapshots.unwrap_or_default(), &project_id),
        id: project_id,
    };
    project.apply_limits();
    project
}

/// Parses, validates and registers an exported project as a new, selected project.
pub fn import_project(store: &ProjectStore, bytes: &[u8]) -> Result<Project, InvalidProjectFileError> {
    let exported = parse_project_file(bytes).map_err(|e| {
        tracing::warn!(target: "workshop::export", error = %e, "project import rejected");
        e
    })?;
    let source_id = exported.id.clone();
    let project = build_project_from_export(exported, &store.profile_id());
    let registered = store.register_imported_project(project);
    store.select_project(Some(&registered.id));
    tracing::info!(
        target: "workshop::export",
        source_id = %source_id,
        project_id = %registered.id,
        "project imported"
    );
    Ok(registered)
}
