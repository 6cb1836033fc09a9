//! Adaptive coaching: per-request adjustments from age band and usage.
//!
//! Pure and deterministic over its inputs.

use super::persona::Persona;
use crate::domain::{AgeBand, Profile, StationKey, TelemetryState};

const ADDITION_PREFIX: &str = "Adaptive coaching: ";
const FAMILIARITY_RATIO: f64 = 0.75;
const REFLECTION_VISIT_THRESHOLD: u64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveAdjustments {
    pub system_prompt_addition: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// `projects × 3 + sessions`.
pub fn experience_score(telemetry: &TelemetryState) -> u64 {
    telemetry.total_projects_created * 3 + telemetry.total_sessions
}

pub fn determine_max_tokens(telemetry: &TelemetryState) -> usize {
    match experience_score(telemetry) {
        s if s >= 25 => 150,
        s if s >= 15 => 140,
        s if s >= 8 => 130,
        _ => 110,
    }
}

pub fn determine_temperature(age_band: AgeBand) -> f32 {
    match age_band {
        AgeBand::Teens => 0.8,
        AgeBand::Tweens => 0.75,
        AgeBand::YoungCreators => 0.7,
        AgeBand::Toddlers => 0.65,
    }
}

fn age_band_hint(age_band: AgeBand) -> &'static str {
    match age_band {
        AgeBand::Toddlers => "Use playful, concrete language and keep suggestions very brief.",
        AgeBand::YoungCreators => "Stay encouraging with one clear next step and a calm tone.",
        AgeBand::Tweens | AgeBand::Teens => {
            "Balance friendly storytelling with optional deeper prompts."
        }
    }
}

fn station_hint(telemetry: &TelemetryState, station: StationKey) -> &'static str {
    let visits = telemetry.visits(station) as f64;
    let average = telemetry.average_visits().max(1.0);
    if visits < average * FAMILIARITY_RATIO {
        "Start with a quick reminder of this station's purpose."
    } else {
        "Link the response to what they already explored here."
    }
}

fn reflection_hint(telemetry: &TelemetryState) -> &'static str {
    if telemetry.visits(StationKey::Reflect) >= REFLECTION_VISIT_THRESHOLD {
        "Invite them to mention a recent reflection insight."
    } else {
        "Suggest a gentle reflection before moving on."
    }
}

pub fn build_adaptive_adjustments(
    persona: &Persona,
    profile: &Profile,
    telemetry: &TelemetryState,
) -> AdaptiveAdjustments {
    let hints = [
        age_band_hint(profile.age_band),
        station_hint(telemetry, persona.station_key),
        reflection_hint(telemetry),
    ];
    AdaptiveAdjustments {
        system_prompt_addition: format!("{}{}", ADDITION_PREFIX, hints.join(" ")),
        max_tokens: determine_max_tokens(telemetry),
        temperature: determine_temperature(profile.age_band),
    }
}
