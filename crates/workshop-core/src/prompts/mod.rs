//! Prompt templates for station-scoped generation.

pub mod station;

pub use station::{
    build_station_prompt, idea_limits_line, station_description, StationPayload,
    CREATIVITY_BOUNDARY_HIGHLIGHTS,
    SAFETY_CONTRACT_HIGHLIGHTS,
};
