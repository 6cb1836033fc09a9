//! Station prompt composition.
//!
//! The composed prompt always opens with the safety contract, then the creativity boundary,
//! then station context and the caller's system prompt, and ends with the user's input.
//! Sections are separated by a blank line.

use crate::domain::project::{
    MAX_IDEA_GOAL, MAX_IDEA_MISSION, MAX_IDEA_STEPS, MAX_IDEA_STEP_LENGTH, MAX_IDEA_TITLE,
};
use crate::domain::StationKey;

/// Rules restated to the model before anything else.
pub const SAFETY_CONTRACT_HIGHLIGHTS: [&str; 4] = [
    "No self-harm, violence, abuse, or illegal activity; redirect gently if something unsafe appears.",
    "Maintain a warm, encouraging tone and celebrate effort while avoiding shaming or scolding.",
    "Protect privacy by avoiding personal identifiers and refusing to act as a medical, legal, or authoritative expert.",
    "Offer compassionate refusals when required and encourage asking a trusted adult for help when needed.",
];

/// Workshop limits in plain language.
pub const CREATIVITY_BOUNDARY_HIGHLIGHTS: [&str; 4] = [
    "Turn big imaginations into small, finishable slices that a child can actually try today.",
    "Base suggestions on low-tech tools (paper, pencils, basic craft supplies, simple digital tools).",
    "Limit output to a few concrete, actionable steps and avoid branching into long, unfocused narratives.",
    "Encourage honesty about what can be done now and remind children it is ok to revisit ideas later.",
];

const SECTION_SEPARATOR: &str = "\n\n";

/// The Idea Station limits as the model should read them.
pub fn idea_limits_line() -> String {
    format!(
        "Idea limits: title up to {MAX_IDEA_TITLE} characters, mission up to {MAX_IDEA_MISSION}, \
         goal up to {MAX_IDEA_GOAL}, and at most {MAX_IDEA_STEPS} starter steps of up to \
         {MAX_IDEA_STEP_LENGTH} characters each."
    )
}

pub fn station_description(station: StationKey) -> &'static str {
    match station {
        StationKey::Idea => "Idea Station (Design Dock): turn a vague wish into a small mission with a short title, mission, and goal.",
        StationKey::Build => "Build Station (Assembly Bay): focus on one active step, explain tools, celebrate small finishes.",
        StationKey::Test => "Test Station (Diagnostics Corridor): ask one question, harvest up to five observations framed as discoveries.",
        StationKey::Memory => "Memory Station (Stellar Archive): capture a win, a lesson, and a next-time intention with calm tone.",
        StationKey::Reflect => "Reflect Station (Orbiter Bridge): notice patterns with gentle tags and short future-focused notes.",
        StationKey::Share => "Share Station (Broadcast Deck): package an artifact for a safe audience in a bounded format.",
        StationKey::Replay => "Replay Station (Time Tunnels): revisit one snapshot at a time, create branches deliberately.",
    }
}

/// Caller-supplied parts of a station prompt.
#[derive(Debug, Clone, Default)]
pub struct StationPayload {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl StationPayload {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

fn section(heading: &str, lines: &[&str]) -> String {
    std::iter::once(heading)
        .chain(lines.iter().copied())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Deterministic: the same station and payload always produce the same string.
pub fn build_station_prompt(station: StationKey, payload: &StationPayload) -> String {
    let safety = section(
        "### Safety Contract Reminder",
        &std::iter::once("Apply the following rules before answering:")
            .chain(SAFETY_CONTRACT_HIGHLIGHTS)
            .collect::<Vec<_>>(),
    );
    let limits = idea_limits_line();
    let mut creativity_lines = vec!["Keep the Workshop constraints in mind for every step:"];
    for line in CREATIVITY_BOUNDARY_HIGHLIGHTS {
        creativity_lines.push(line);
    }
    creativity_lines.push(limits.as_str());
    let creativity = section("### Creativity Boundary Reminder", &creativity_lines);
    let context_heading = format!("### Station Context ({})", station.as_str());
    let station_section = section(
        &context_heading,
        &[
            station_description(station),
            "### Station System Prompt",
            payload.system_prompt.trim(),
        ],
    );
    let user = section("### User Input", &[payload.user_prompt.trim()]);

    [safety, creativity, station_section, user].join(SECTION_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_appear_in_fixed_order() {
        let prompt = build_station_prompt(
            StationKey::Build,
            &StationPayload::new("  Be a helper.  ", "How do I start?"),
        );
        let safety = prompt.find("### Safety Contract Reminder").unwrap();
        let creativity = prompt.find("### Creativity Boundary Reminder").unwrap();
        let context = prompt.find("### Station Context (build)").unwrap();
        let system = prompt.find("### Station System Prompt").unwrap();
        let user = prompt.find("### User Input").unwrap();
        assert!(safety < creativity && creativity < context && context < system && system < user);
        assert!(prompt.starts_with("### Safety Contract Reminder"));
        assert!(prompt.ends_with("### User Input\n\nHow do I start?"));
        assert!(prompt.contains("### Station System Prompt\n\nBe a helper."));
    }

    #[test]
    fn creativity_block_states_idea_limits() {
        let prompt = build_station_prompt(StationKey::Idea, &StationPayload::new("", "a kite"));
        let creativity = prompt.find("### Creativity Boundary Reminder").unwrap();
        let context = prompt.find("### Station Context (idea)").unwrap();
        let block = &prompt[creativity..context];
        for needle in ["title up to 60", "mission up to 400", "goal up to 200", "at most 3 starter steps", "up to 140 characters"] {
            assert!(block.contains(needle), "missing {needle:?} in {block:?}");
        }
    }

    #[test]
    fn every_station_has_a_description() {
        for key in StationKey::all() {
            assert!(station_description(key).contains(key.display_name()));
        }
    }
}
