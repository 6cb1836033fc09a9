//! Building `.workshop.json` files from stored projects.

use super::types::*;
use crate::domain::{
    ArchiveEntry, Project, ProjectSnapshot, ProjectState, Reflection, StationMemory,
    StationReflect, StationShare, Step, TestResult,
};
use crate::error::ExportError;
use crate::store::ProjectStore;
use chrono::{DateTime, SecondsFormat, Utc};

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// File-name stem for a project: ASCII word characters, spaces and dashes survive;
/// whitespace runs become `_`. Empty results fall back to `"project"`.
pub fn ensure_slug(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let slug = kept.split_whitespace().collect::<Vec<_>>().join("_");
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

fn export_step(step: &Step) -> ExportedStep {
    ExportedStep {
        source_id: Some(step.id.clone()),
        title: step.title.clone(),
        summary: step.summary.clone(),
        status: step.status.as_str().to_string(),
        order: Some(step.order),
        origin_station: step.origin_station.map(|s| s.as_str().to_string()),
        acceptance_criteria: step.acceptance_criteria.clone(),
        notes: step.notes.clone(),
        created_at: Some(format_timestamp(&step.created_at)),
        updated_at: Some(format_timestamp(&step.updated_at)),
    }
}

fn export_reflection(entry: &Reflection) -> ExportedReflection {
    ExportedReflection {
        tag: entry.tag.as_str().to_string(),
        note: entry.note.clone(),
        created_at: Some(format_timestamp(&entry.created_at)),
    }
}

fn export_test(entry: &TestResult) -> ExportedTest {
    ExportedTest {
        question: entry.question.clone(),
        outcome: entry.outcome.as_str().to_string(),
        note: entry.note.clone(),
        created_at: Some(format_timestamp(&entry.created_at)),
    }
}

fn export_archive(entry: &ArchiveEntry) -> ExportedArchive {
    ExportedArchive {
        label: entry.label.clone(),
        summary: entry.summary.clone(),
        snapshot: entry.snapshot.clone(),
        created_at: Some(format_timestamp(&entry.created_at)),
    }
}

fn export_memory(memory: Option<&StationMemory>) -> Option<ExportedStationMemory> {
    let memory = memory.filter(|m| !m.entries.is_empty())?;
    Some(ExportedStationMemory {
        entries: memory
            .entries
            .iter()
            .map(|e| ExportedMemoryEntry {
                proud_of: e.proud_of.clone(),
                lesson: e.lesson.clone(),
                next_time: e.next_time.clone(),
                created_at: Some(format_timestamp(&e.created_at)),
            })
            .collect(),
    })
}

fn export_reflect(reflect: Option<&StationReflect>) -> Option<ExportedStationReflect> {
    let reflect = reflect.filter(|r| !r.snapshots.is_empty())?;
    Some(ExportedStationReflect {
        snapshots: reflect
            .snapshots
            .iter()
            .map(|s| ExportedReflectSnapshot {
                tags: s.tags.clone(),
                notes: s.notes.clone(),
                created_at: Some(format_timestamp(&s.created_at)),
            })
            .collect(),
    })
}

fn export_share(share: Option<&StationShare>) -> Option<ExportedShare> {
    share.map(|s| ExportedShare {
        last_export_at: Some(format_timestamp(&s.last_export_at)),
        last_format: s.last_format.clone(),
    })
}

fn export_state(state: &ProjectState) -> ExportedProjectState {
    ExportedProjectState {
        name: state.name.clone(),
        title: state.title.clone(),
        description: state.description.clone(),
        goal: state.goal.clone(),
        idea: state.idea.clone(),
        status: state.status.as_str().to_string(),
        current_station: state.current_station.as_str().to_string(),
        steps: state.steps.iter().map(export_step).collect(),
        reflections: state.reflections.iter().map(export_reflection).collect(),
        tests: state.tests.iter().map(export_test).collect(),
        archives: state.archives.iter().map(export_archive).collect(),
        memory: export_memory(state.memory.as_ref()),
        reflect: export_reflect(state.reflect.as_ref()),
        share: export_share(state.share.as_ref()),
        tags: state.tags.clone(),
        created_at: state.created_at.as_ref().map(format_timestamp),
        updated_at: state.updated_at.as_ref().map(format_timestamp),
    }
}

fn export_snapshot(snapshot: &ProjectSnapshot) -> ExportedSnapshot {
    ExportedSnapshot {
        label: Some(snapshot.label.clone()),
        created_at: Some(format_timestamp(&snapshot.created_at)),
        project_state: export_state(&snapshot.project_state),
    }
}

pub fn build_exported_project(project: &Project) -> ExportedProject {
    ExportedProject {
        id: project.id.clone(),
        name: project.name.clone(),
        title: project.title.clone(),
        description: Some(project.description.clone()),
        goal: project.goal.clone(),
        idea: project.idea.clone(),
        status: project.status.as_str().to_string(),
        current_station: project.current_station.as_str().to_string(),
        steps: project.steps.iter().map(export_step).collect(),
        reflections: project.reflections.iter().map(export_reflection).collect(),
        tests: project.tests.iter().map(export_test).collect(),
        archives: project.archives.iter().map(export_archive).collect(),
        memory: export_memory(project.memory.as_ref()),
        reflect: export_reflect(project.reflect.as_ref()),
        share: export_share(project.share.as_ref()),
        tags: Some(project.tags.clone()),
        created_at: Some(format_timestamp(&project.created_at)),
        updated_at: Some(format_timestamp(&project.updated_at)),
        snapshots: Some(project.snapshots.iter().map(export_snapshot).collect()),
    }
}

/// Wraps a project in the versioned envelope, stamped with the current time.
pub fn build_export(project: &Project) -> ProjectExportV1 {
    ProjectExportV1 {
        schema_version: EXPORT_SCHEMA_VERSION.to_string(),
        exported_at: format_timestamp(&Utc::now()),
        creation_lab_signature: CREATION_LAB_SIGNATURE.to_string(),
        project: build_exported_project(project),
    }
}

/// Serializes a project as pretty-printed JSON named `{slug}.workshop.json`.
pub fn export_project_file(project: &Project) -> Result<ExportFile, ExportError> {
    let contents = serde_json::to_string_pretty(&build_export(project))?;
    let file_name = format!("{}{}", ensure_slug(&project.name), EXPORT_FILE_SUFFIX);
    tracing::info!(
        target: "workshop::export",
        project_id = %project.id,
        file_name = %file_name,
        bytes = contents.len(),
        "project exported"
    );
    Ok(ExportFile {
        file_name,
        contents,
    })
}

/// Exports a project of the store's current profile.
pub fn export_project(store: &ProjectStore, project_id: &str) -> Result<ExportFile, ExportError> {
    let project = store
        .get(project_id)
        .ok_or_else(|| ExportError::ProjectNotFound(project_id.to_string()))?;
    export_project_file(&project)
}
