//! Safety-governed generation: harness, incidents, personas, adaptive coaching.

pub mod adaptive;
pub mod harness;
pub mod incidents;
pub mod persona;
pub mod provider;

pub use adaptive::{build_adaptive_adjustments, experience_score, AdaptiveAdjustments};
pub use harness::{
    SafeAiHarness, SafeAiRequest, SafeAiResult, FALLBACK_MESSAGE, MAX_RESPONSE_LENGTH,
};
pub use incidents::{AiIncident, IncidentCategory, IncidentLog, DEFAULT_INCIDENT_CAPACITY};
pub use persona::{build_persona_system_prompt, persona_for_station, personas, Persona};
pub use provider::{prepare_request, AiProvider, CoachingContext, PersonaRequest};
