//! Plain data types: profiles, projects, telemetry.

pub mod id;
pub mod profile;
pub mod project;
pub mod telemetry;

pub use id::new_id;
pub use profile::{AgeBand, NewProfile, Profile, ProfileId, ProfilePatch, DEFAULT_PROFILE_ID};
pub use project::{
    clamp_idea, clamp_project_name, clamp_text, ArchiveEntry, Goal, MemoryEntry, Project,
    ProjectPatch, ProjectSnapshot, ProjectState, ProjectStatus, Reflection, ReflectionTag,
    ReflectSnapshot, StationIdea, StationKey, StationMemory, StationReflect, StationShare, Step,
    StepStatus, TestOutcome, TestResult, timestamp_or_now, MAX_SNAPSHOTS,
};
pub use telemetry::{empty_visit_counts, StationVisitCounts, TelemetryState};
