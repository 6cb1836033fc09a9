//! Project model: stations, lifecycle, per-station slices, and snapshots.
//!
//! Persisted JSON uses camelCase field names so data written by earlier builds of the
//! Workshop (which shared the same storage layout) loads unchanged.

use super::id::new_id;
use super::profile::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MAX_PROJECT_NAME: usize = 512;
pub const MAX_IDEA_TITLE: usize = 60;
pub const MAX_IDEA_MISSION: usize = 400;
pub const MAX_IDEA_GOAL: usize = 200;
pub const MAX_IDEA_STEPS: usize = 3;
pub const MAX_IDEA_STEP_LENGTH: usize = 140;
/// Snapshots kept per project; the oldest is evicted first.
pub const MAX_SNAPSHOTS: usize = 10;

const UNTITLED_PROJECT: &str = "Untitled Project";
const UNTITLED_IDEA: &str = "Untitled Idea";

// ---------------------------------------------------------------------------
// Stations
// ---------------------------------------------------------------------------

/// One stage of the guided project workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKey {
    #[default]
    Idea,
    Build,
    Test,
    Memory,
    Reflect,
    Share,
    Replay,
}

impl StationKey {
    pub fn all() -> [Self; 7] {
        [
            Self::Idea,
            Self::Build,
            Self::Test,
            Self::Memory,
            Self::Reflect,
            Self::Share,
            Self::Replay,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StationKey::Idea => "idea",
            StationKey::Build => "build",
            StationKey::Test => "test",
            StationKey::Memory => "memory",
            StationKey::Reflect => "reflect",
            StationKey::Share => "share",
            StationKey::Replay => "replay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.as_str() == s.trim())
    }

    /// Station name shown on the ship map.
    pub fn display_name(&self) -> &'static str {
        match self {
            StationKey::Idea => "Design Dock",
            StationKey::Build => "Assembly Bay",
            StationKey::Test => "Diagnostics Corridor",
            StationKey::Memory => "Stellar Archive",
            StationKey::Reflect => "Orbiter Bridge",
            StationKey::Share => "Broadcast Deck",
            StationKey::Replay => "Time Tunnels",
        }
    }

    pub fn theme_name(&self) -> &'static str {
        match self {
            StationKey::Idea => "Idea Station",
            StationKey::Build => "Build Station",
            StationKey::Test => "Test Station",
            StationKey::Memory => "Memory Station",
            StationKey::Reflect => "Reflect Station",
            StationKey::Share => "Share Station",
            StationKey::Replay => "Replay Station",
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    InProgress,
    Paused,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn all() -> [Self; 5] {
        [
            Self::Draft,
            Self::InProgress,
            Self::Paused,
            Self::Completed,
            Self::Archived,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.as_str() == s.trim())
    }
}

// ---------------------------------------------------------------------------
// Owned entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Todo,
    #[serde(alias = "active")]
    InProgress,
    Blocked,
    Done,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Todo => "todo",
            StepStatus::InProgress => "in_progress",
            StepStatus::Blocked => "blocked",
            StepStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "todo" => Some(Self::Todo),
            "in_progress" | "active" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// A tiny, doable action in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_station: Option<StationKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionTag {
    Breakthrough,
    Confusion,
    #[default]
    Reminder,
}

impl ReflectionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectionTag::Breakthrough => "breakthrough",
            ReflectionTag::Confusion => "confusion",
            ReflectionTag::Reminder => "reminder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "breakthrough" => Some(Self::Breakthrough),
            "confusion" => Some(Self::Confusion),
            "reminder" => Some(Self::Reminder),
            _ => None,
        }
    }
}

/// Tagged insight from the Reflect/Memory/Replay stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub tag: ReflectionTag,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Pass,
    #[default]
    NeedsWork,
    Skip,
}

impl TestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestOutcome::Pass => "pass",
            TestOutcome::NeedsWork => "needs_work",
            TestOutcome::Skip => "skip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "pass" => Some(Self::Pass),
            "needs_work" => Some(Self::NeedsWork),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Quick check logged at the Diagnostics Corridor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    pub project_id: String,
    pub question: String,
    #[serde(default)]
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Checkpoint captured by the Memory/Replay stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: String,
    pub project_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Station slices
// ---------------------------------------------------------------------------

/// Idea Station inputs. Limits are re-applied on every write (see [`clamp_idea`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationIdea {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub starter_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(default)]
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub proud_of: String,
    #[serde(default)]
    pub lesson: String,
    #[serde(default)]
    pub next_time: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StationMemory {
    #[serde(default)]
    pub entries: Vec<MemoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectSnapshot {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StationReflect {
    #[serde(default)]
    pub snapshots: Vec<ReflectSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationShare {
    pub last_export_at: DateTime<Utc>,
    pub last_format: String,
}

// ---------------------------------------------------------------------------
// Project, state, snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub profile_id: ProfileId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<StationIdea>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub current_station: StationKey,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
    #[serde(default)]
    pub tests: Vec<TestResult>,
    #[serde(default)]
    pub archives: Vec<ArchiveEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<StationMemory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflect: Option<StationReflect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<StationShare>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub snapshots: Vec<ProjectSnapshot>,
}

/// Field-level copy of a project, excluding its id, owner and snapshot list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idea: Option<StationIdea>,
    pub status: ProjectStatus,
    pub current_station: StationKey,
    pub steps: Vec<Step>,
    pub reflections: Vec<Reflection>,
    pub tests: Vec<TestResult>,
    pub archives: Vec<ArchiveEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<StationMemory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflect: Option<StationReflect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<StationShare>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub project_state: ProjectState,
}

/// Partial update for [`crate::ProjectStore::update_project`].
///
/// Outer `None` leaves a field untouched. For optional slices the inner `Option` sets or
/// clears the slice, so `idea: Some(None)` removes the idea.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub title: Option<Option<String>>,
    pub description: Option<String>,
    pub goal: Option<Option<Goal>>,
    pub idea: Option<Option<StationIdea>>,
    pub status: Option<ProjectStatus>,
    pub current_station: Option<StationKey>,
    pub steps: Option<Vec<Step>>,
    pub reflections: Option<Vec<Reflection>>,
    pub tests: Option<Vec<TestResult>>,
    pub archives: Option<Vec<ArchiveEntry>>,
    pub memory: Option<Option<StationMemory>>,
    pub reflect: Option<Option<StationReflect>>,
    pub share: Option<Option<StationShare>>,
    pub tags: Option<Vec<String>>,
}

impl ProjectPatch {
    /// A patch that overwrites every field with the snapshot's state (restore semantics).
    pub fn from_state(state: &ProjectState) -> Self {
        Self {
            name: Some(state.name.clone()),
            title: Some(state.title.clone()),
            description: Some(state.description.clone()),
            goal: Some(state.goal.clone()),
            idea: Some(state.idea.clone()),
            status: Some(state.status),
            current_station: Some(state.current_station),
            steps: Some(state.steps.clone()),
            reflections: Some(state.reflections.clone()),
            tests: Some(state.tests.clone()),
            archives: Some(state.archives.clone()),
            memory: Some(state.memory.clone()),
            reflect: Some(state.reflect.clone()),
            share: Some(state.share.clone()),
            tags: Some(state.tags.clone()),
        }
    }
}

impl Project {
    /// A fresh project at the Idea station with empty slices.
    pub fn new(profile_id: &str, name: &str) -> Self {
        let now = Utc::now();
        let name = clamp_project_name(Some(name));
        Self {
            id: new_id("project"),
            profile_id: profile_id.to_string(),
            title: Some(name.clone()),
            name,
            description: String::new(),
            goal: None,
            idea: None,
            status: ProjectStatus::Draft,
            current_station: StationKey::Idea,
            steps: Vec::new(),
            reflections: Vec::new(),
            tests: Vec::new(),
            archives: Vec::new(),
            memory: None,
            reflect: None,
            share: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            snapshots: Vec::new(),
        }
    }

    /// Deep copy of the project's fields without the snapshot list.
    pub fn state(&self) -> ProjectState {
        ProjectState {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            goal: self.goal.clone(),
            idea: clamp_idea(self.idea.clone()),
            status: self.status,
            current_station: self.current_station,
            steps: self.steps.clone(),
            reflections: self.reflections.clone(),
            tests: self.tests.clone(),
            archives: self.archives.clone(),
            memory: self.memory.clone(),
            reflect: self.reflect.clone(),
            share: self.share.clone(),
            tags: self.tags.clone(),
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }

    /// Re-applies the name and Idea Station limits in place.
    pub fn apply_limits(&mut self) {
        self.name = clamp_project_name(Some(&self.name));
        self.idea = clamp_idea(self.idea.take());
    }

    /// Points every owned entity at this project's id.
    pub fn restamp_children(&mut self) {
        let id = self.id.clone();
        for s in &mut self.steps {
            s.project_id = id.clone();
        }
        for r in &mut self.reflections {
            r.project_id = id.clone();
        }
        for t in &mut self.tests {
            t.project_id = id.clone();
        }
        for a in &mut self.archives {
            a.project_id = id.clone();
        }
        if let Some(memory) = self.memory.as_mut() {
            for e in &mut memory.entries {
                e.project_id = id.clone();
            }
        }
    }

    /// Gives every owned entity (and every project snapshot) a fresh id.
    pub fn regenerate_child_ids(&mut self) {
        for s in &mut self.steps {
            s.id = new_id("step");
        }
        for r in &mut self.reflections {
            r.id = new_id("reflection");
        }
        for t in &mut self.tests {
            t.id = new_id("test");
        }
        for a in &mut self.archives {
            a.id = new_id("archive");
        }
        if let Some(memory) = self.memory.as_mut() {
            for e in &mut memory.entries {
                e.id = new_id("memory");
            }
        }
        if let Some(reflect) = self.reflect.as_mut() {
            for s in &mut reflect.snapshots {
                s.id = new_id("reflect");
            }
        }
        for s in &mut self.snapshots {
            s.id = new_id("snapshot");
        }
        self.restamp_children();
    }
}

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

/// Truncates to at most `max` characters (not bytes).
pub fn clamp_text(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

pub fn clamp_project_name(name: Option<&str>) -> String {
    let clamped = clamp_text(name.unwrap_or_default(), MAX_PROJECT_NAME);
    if clamped.is_empty() {
        UNTITLED_PROJECT.to_string()
    } else {
        clamped
    }
}

/// Parses an RFC 3339 timestamp; anything missing or unparseable becomes "now".
pub fn timestamp_or_now(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Applies the Idea Station limits: title/mission/goal lengths, at most three non-empty starter steps.
pub fn clamp_idea(idea: Option<StationIdea>) -> Option<StationIdea> {
    let idea = idea?;
    let starter_steps = idea
        .starter_steps
        .iter()
        .take(MAX_IDEA_STEPS)
        .map(|s| clamp_text(s, MAX_IDEA_STEP_LENGTH))
        .filter(|s| !s.is_empty())
        .collect();
    let title = clamp_text(&idea.title, MAX_IDEA_TITLE);
    Some(StationIdea {
        title: if title.is_empty() {
            UNTITLED_IDEA.to_string()
        } else {
            title
        },
        mission: clamp_text(&idea.mission, MAX_IDEA_MISSION),
        goal: clamp_text(&idea.goal, MAX_IDEA_GOAL),
        starter_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_text_counts_characters() {
        assert_eq!(clamp_text("héllo", 2), "hé");
        assert_eq!(clamp_text("abc", 10), "abc");
    }

    #[test]
    fn idea_limits_are_applied() {
        let idea = StationIdea {
            title: "t".repeat(80),
            mission: "m".repeat(500),
            goal: "g".repeat(250),
            starter_steps: vec!["a".repeat(200), String::new(), "b".into(), "c".into()],
        };
        let clamped = clamp_idea(Some(idea)).unwrap();
        assert_eq!(clamped.title.chars().count(), MAX_IDEA_TITLE);
        assert_eq!(clamped.mission.chars().count(), MAX_IDEA_MISSION);
        assert_eq!(clamped.goal.chars().count(), MAX_IDEA_GOAL);
        // The empty entry is inside the first three and is dropped; "c" is past the cap.
        assert_eq!(clamped.starter_steps.len(), 2);
        assert_eq!(clamped.starter_steps[0].chars().count(), MAX_IDEA_STEP_LENGTH);
    }

    #[test]
    fn empty_idea_title_falls_back() {
        let clamped = clamp_idea(Some(StationIdea::default())).unwrap();
        assert_eq!(clamped.title, "Untitled Idea");
    }

    #[test]
    fn new_project_starts_at_idea_station() {
        let p = Project::new("profile-default", "");
        assert_eq!(p.name, "Untitled Project");
        assert_eq!(p.current_station, StationKey::Idea);
        assert_eq!(p.status, ProjectStatus::Draft);
        assert!(p.snapshots.is_empty());
    }

    #[test]
    fn legacy_step_status_alias_is_accepted() {
        let raw = r#"{"id":"s","projectId":"p","title":"x","status":"active","order":0,
            "createdAt":"2025-01-01T00:00:00.000Z","updatedAt":"2025-01-01T00:00:00.000Z"}"#;
        let step: Step = serde_json::from_str(raw).unwrap();
        assert_eq!(step.status, StepStatus::InProgress);
    }

    #[test]
    fn station_keys_round_trip_through_strings() {
        for key in StationKey::all() {
            assert_eq!(StationKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(StationKey::parse("lobby"), None);
    }
}
