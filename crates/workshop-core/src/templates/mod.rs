//! Built-in starter templates and content packs.
//!
//! [`apply_template`] creates a project through the store (so it is selected and counted in
//! telemetry) and then seeds it with the template payload.

use crate::domain::{
    new_id, timestamp_or_now, ArchiveEntry, Goal, MemoryEntry, Project, ProjectPatch,
    ProjectStatus, ReflectSnapshot, Reflection, ReflectionTag, StationIdea, StationKey,
    StationMemory, StationReflect, StationShare, Step, StepStatus, TestOutcome, TestResult,
};
use crate::store::ProjectStore;
use chrono::Utc;
use once_cell::sync::Lazy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPack {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const CONTENT_PACKS: [ContentPack; 3] = [
    ContentPack {
        id: "story_pack",
        name: "Story Pack",
        description: "Whimsical narrative starters for guided dramas.",
    },
    ContentPack {
        id: "adventure_pack",
        name: "Adventure Pack",
        description: "Playful quests that pair idea prompts with simple steps.",
    },
    ContentPack {
        id: "science_pack",
        name: "Science Pack",
        description: "Curated experiments that keep curiosity safe and grounded.",
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateStep {
    pub title: String,
    pub summary: Option<String>,
    pub status: Option<StepStatus>,
    pub order: Option<i64>,
    pub origin_station: Option<StationKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTest {
    pub question: String,
    pub outcome: TestOutcome,
    pub note: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMemoryEntry {
    pub proud_of: String,
    pub lesson: String,
    pub next_time: String,
}

/// Fields copied onto the new project. Empty lists leave the project's own (empty) lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePayload {
    pub description: Option<String>,
    pub goal: Option<Goal>,
    pub idea: Option<StationIdea>,
    pub steps: Vec<TemplateStep>,
    pub reflections: Vec<(ReflectionTag, String)>,
    pub tests: Vec<TemplateTest>,
    pub archives: Vec<(String, Option<String>)>,
    pub memory: Vec<TemplateMemoryEntry>,
    pub reflect: Vec<(Vec<String>, String)>,
    pub share: Option<StationShare>,
    pub tags: Vec<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: &'static str,
    pub pack_id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub recommended_stations: Vec<StationKey>,
    pub payload: TemplatePayload,
}

fn idea(title: &str, mission: &str, goal: &str, steps: [&str; 3]) -> Option<StationIdea> {
    Some(StationIdea {
        title: title.to_string(),
        mission: mission.to_string(),
        goal: goal.to_string(),
        starter_steps: steps.iter().map(|s| s.to_string()).collect(),
    })
}

fn todo_step(title: &str, summary: &str, order: i64) -> TemplateStep {
    TemplateStep {
        title: title.to_string(),
        summary: Some(summary.to_string()),
        status: Some(StepStatus::Todo),
        order: Some(order),
        origin_station: None,
    }
}

fn tags(values: [&str; 3]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

static TEMPLATES: Lazy<Vec<Template>> = Lazy::new(|| {
    vec![
        Template {
            id: "robot_dog_comic",
            pack_id: "story_pack",
            display_name: "Robot Dog Comic",
            description: "Build a friendly robot dog comic that introduces a new hero.",
            recommended_stations: vec![StationKey::Idea, StationKey::Build],
            payload: TemplatePayload {
                description: Some(
                    "A short comic idea about a robot dog who learns your favorite snacks.".into(),
                ),
                idea: idea(
                    "Robot Dog Comic",
                    "Design a robot dog hero and imagine one mini adventure.",
                    "Help the robot dog solve a problem using kindness and curiosity.",
                    [
                        "Sketch your robot dog hero.",
                        "Write a mission for the robot dog.",
                        "Plan three panels for your story.",
                    ],
                ),
                steps: vec![
                    todo_step("Draw the robot dog", "Create a sketch of the hero using bold shapes.", 0),
                    todo_step(
                        "Write the storyline",
                        "Dream up a short adventure with a clear beginning and end.",
                        1,
                    ),
                    todo_step(
                        "Color and share",
                        "Add color or stickers, then show the comic to a friend or adult.",
                        2,
                    ),
                ],
                tags: tags(["story", "robot", "comic"]),
                ..Default::default()
            },
        },
        Template {
            id: "tiny_game_concept",
            pack_id: "adventure_pack",
            display_name: "Tiny Game Concept",
            description: "Design a tiny game or play scene with one fun rule.",
            recommended_stations: vec![StationKey::Idea, StationKey::Build],
            payload: TemplatePayload {
                description: Some("A small game idea with one challenge and one victory.".into()),
                idea: idea(
                    "Tiny Game Concept",
                    "Explain how a player wins and what makes the game fun.",
                    "Outline a simple set of rules that keeps the game safe and friendly.",
                    [
                        "Think of a goal for the player.",
                        "List one simple rule.",
                        "Add a win celebration twist.",
                    ],
                ),
                steps: vec![
                    todo_step(
                        "Define the challenge",
                        "Describe the mini quest the player will accomplish.",
                        0,
                    ),
                    todo_step(
                        "Clarify the rules",
                        "Set a calm, friendly rule so everyone can play safely.",
                        1,
                    ),
                ],
                tags: tags(["game", "play", "tiny"]),
                ..Default::default()
            },
        },
        Template {
            id: "science_experiment_log",
            pack_id: "science_pack",
            display_name: "Science Experiment Log",
            description: "Capture a simple science experiment with observations and questions.",
            recommended_stations: vec![StationKey::Test, StationKey::Memory],
            payload: TemplatePayload {
                description: Some(
                    "Plan a short experiment by recording materials, steps, and what you notice."
                        .into(),
                ),
                idea: idea(
                    "Science Experiment Log",
                    "Pick one safe experiment and write down what you expect to see.",
                    "Observe carefully, note what changes, and wonder why things happen.",
                    [
                        "Choose a safe material (water, paper, magnets).",
                        "Predict what will change.",
                        "Set up the experiment and watch.",
                    ],
                ),
                tests: vec![TemplateTest {
                    question: "What did you notice after the experiment?".into(),
                    outcome: TestOutcome::NeedsWork,
                    note: Some("Remember to describe the small changes.".into()),
                    created_at: Some("2025-01-01T00:00:00.000Z".into()),
                }],
                memory: vec![TemplateMemoryEntry {
                    proud_of: "Staying safe with the setup.".into(),
                    lesson: "Small changes can still be interesting.".into(),
                    next_time: "Try a different object and compare.".into(),
                }],
                tags: tags(["science", "experiment", "log"]),
                ..Default::default()
            },
        },
    ]
});

pub fn templates() -> &'static [Template] {
    &TEMPLATES
}

pub fn find_template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

pub fn content_pack(id: &str) -> Option<&'static ContentPack> {
    CONTENT_PACKS.iter().find(|p| p.id == id)
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn seed_patch(payload: &TemplatePayload, project_id: &str) -> ProjectPatch {
    let now = Utc::now();
    let steps = payload
        .steps
        .iter()
        .enumerate()
        .map(|(index, entry)| Step {
            id: new_id("step"),
            project_id: project_id.to_string(),
            title: if entry.title.is_empty() {
                format!("Step {}", index + 1)
            } else {
                entry.title.clone()
            },
            summary: entry.summary.clone(),
            status: entry.status.unwrap_or_default(),
            order: entry.order.unwrap_or(index as i64),
            origin_station: entry.origin_station,
            acceptance_criteria: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .collect();
    let reflections = payload
        .reflections
        .iter()
        .map(|(tag, note)| Reflection {
            id: new_id("reflection"),
            project_id: project_id.to_string(),
            tag: *tag,
            note: note.clone(),
            created_at: now,
        })
        .collect();
    let tests = payload
        .tests
        .iter()
        .map(|entry| TestResult {
            id: new_id("test"),
            project_id: project_id.to_string(),
            question: entry.question.clone(),
            outcome: entry.outcome,
            note: entry.note.clone(),
            created_at: timestamp_or_now(entry.created_at.as_deref()),
        })
        .collect();
    let archives = payload
        .archives
        .iter()
        .map(|(label, summary)| ArchiveEntry {
            id: new_id("archive"),
            project_id: project_id.to_string(),
            label: label.clone(),
            summary: summary.clone(),
            snapshot: None,
            created_at: now,
        })
        .collect();
    let memory = non_empty(payload.memory.clone()).map(|entries| StationMemory {
        entries: entries
            .into_iter()
            .map(|entry| MemoryEntry {
                id: new_id("memory"),
                project_id: project_id.to_string(),
                proud_of: entry.proud_of,
                lesson: entry.lesson,
                next_time: entry.next_time,
                created_at: now,
            })
            .collect(),
    });
    let reflect = non_empty(payload.reflect.clone()).map(|snapshots| StationReflect {
        snapshots: snapshots
            .into_iter()
            .map(|(tags, notes)| ReflectSnapshot {
                id: new_id("reflect"),
                tags,
                notes,
                created_at: now,
            })
            .collect(),
    });

    ProjectPatch {
        description: payload.description.clone(),
        goal: payload.goal.clone().map(Some),
        idea: payload.idea.clone().map(Some),
        steps: non_empty(steps),
        reflections: non_empty(reflections),
        tests: non_empty(tests),
        archives: non_empty(archives),
        memory: memory.map(Some),
        reflect: reflect.map(Some),
        share: payload.share.clone().map(Some),
        tags: non_empty(payload.tags.clone()),
        status: payload.status,
        ..Default::default()
    }
}

/// Creates a selected project named after the template and seeds it. `None` for unknown ids.
pub fn apply_template(store: &ProjectStore, template_id: &str) -> Option<Project> {
    let Some(template) = find_template(template_id) else {
        tracing::warn!(target: "workshop::store", template_id, "template not found");
        return None;
    };
    let project = store.create_project(template.display_name);
    let patch = seed_patch(&template.payload, &project.id);
    let seeded = store.update_project(&project.id, patch).unwrap_or(project);
    tracing::info!(target: "workshop::store", template_id, project_id = %seeded.id, "template applied");
    Some(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_PROFILE_ID;
    use crate::storage::{KvStorage, LocalProjectStore, MemoryStorage};
    use crate::store::TelemetryStore;
    use std::sync::Arc;

    fn project_store() -> ProjectStore {
        let storage: Arc<dyn KvStorage> = Arc::new(MemoryStorage::new());
        let telemetry = Arc::new(TelemetryStore::new(storage.clone(), DEFAULT_PROFILE_ID));
        ProjectStore::new(LocalProjectStore::new(storage), telemetry, DEFAULT_PROFILE_ID)
    }

    #[test]
    fn every_template_belongs_to_a_pack() {
        assert_eq!(templates().len(), 3);
        for t in templates() {
            assert!(content_pack(t.pack_id).is_some(), "{} has no pack", t.id);
        }
    }

    #[test]
    fn science_template_seeds_tests_and_memory() {
        let store = project_store();
        let project = apply_template(&store, "science_experiment_log").unwrap();
        assert_eq!(project.name, "Science Experiment Log");
        assert_eq!(project.tests.len(), 1);
        assert_eq!(project.tests[0].project_id, project.id);
        assert_eq!(project.memory.as_ref().unwrap().entries.len(), 1);
        assert_eq!(project.idea.as_ref().unwrap().starter_steps.len(), 3);
        assert!(project.steps.is_empty());
        assert_eq!(store.selected_project_id().as_deref(), Some(project.id.as_str()));
    }

    #[test]
    fn comic_template_seeds_ordered_steps() {
        let store = project_store();
        let project = apply_template(&store, "robot_dog_comic").unwrap();
        let titles: Vec<&str> = project.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Draw the robot dog", "Write the storyline", "Color and share"]
        );
        assert_eq!(project.tags, vec!["story", "robot", "comic"]);
    }

    #[test]
    fn unknown_template_is_none() {
        assert!(apply_template(&project_store(), "moon_base").is_none());
    }
}
