//! Persona-aware generation: persona prompt, adaptive coaching, station prompt, safe harness.

use super::adaptive::build_adaptive_adjustments;
use super::harness::{SafeAiHarness, SafeAiRequest, SafeAiResult};
use super::persona::{build_persona_system_prompt, persona_for_station};
use crate::domain::{Profile, StationKey, TelemetryState};
use crate::llm::{ModelLoader, StreamChunk};
use crate::prompts::{build_station_prompt, StationPayload};
use futures_util::stream::{self, Stream, StreamExt};
use std::sync::Arc;

/// What the caller asks for at a station.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaRequest {
    pub user_prompt: String,
    pub station_key: Option<StationKey>,
    pub action: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl PersonaRequest {
    pub fn new(station: StationKey, user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            station_key: Some(station),
            ..Default::default()
        }
    }
}

/// Who is asking, for adaptive coaching.
#[derive(Debug, Clone, Copy)]
pub struct CoachingContext<'a> {
    pub profile: &'a Profile,
    pub telemetry: &'a TelemetryState,
    pub adaptive_enabled: bool,
}

/// Turns a persona request into the harness request.
///
/// System prompt pieces are the caller's prompt, the persona prompt and (when enabled) the
/// adaptive addition, joined by blank lines. Adaptive token and temperature values apply
/// only where the caller left them unset.
pub fn prepare_request(request: &PersonaRequest, ctx: &CoachingContext<'_>) -> SafeAiRequest {
    let persona = persona_for_station(request.station_key);
    let persona_prompt = build_persona_system_prompt(request.station_key, request.action.as_deref());
    let adjustments = ctx
        .adaptive_enabled
        .then(|| build_adaptive_adjustments(persona, ctx.profile, ctx.telemetry));

    let pieces: Vec<&str> = [
        request.system_prompt.as_deref(),
        Some(persona_prompt.as_str()),
        adjustments.as_ref().map(|a| a.system_prompt_addition.as_str()),
    ]
    .into_iter()
    .flatten()
    .filter(|p| !p.trim().is_empty())
    .collect();
    let combined_system = pieces.join("\n\n");

    let station = persona.station_key;
    let prompt = build_station_prompt(
        station,
        &StationPayload::new(combined_system, request.user_prompt.clone()),
    );

    SafeAiRequest {
        prompt,
        station_key: Some(station),
        intent: request.action.clone(),
        system_prompt: None,
        max_tokens: request
            .max_tokens
            .or_else(|| adjustments.as_ref().map(|a| a.max_tokens)),
        temperature: request
            .temperature
            .or_else(|| adjustments.as_ref().map(|a| a.temperature)),
    }
}

pub struct AiProvider {
    loader: Arc<ModelLoader>,
    harness: Arc<SafeAiHarness>,
}

impl AiProvider {
    pub fn new(loader: Arc<ModelLoader>, harness: Arc<SafeAiHarness>) -> Self {
        Self { loader, harness }
    }

    pub fn loader(&self) -> &Arc<ModelLoader> {
        &self.loader
    }

    pub fn harness(&self) -> &Arc<SafeAiHarness> {
        &self.harness
    }

    /// Always returns displayable text: a governed answer or the fallback message.
    pub async fn generate_with_persona(
        &self,
        request: &PersonaRequest,
        ctx: &CoachingContext<'_>,
    ) -> SafeAiResult {
        let safe_request = prepare_request(request, ctx);
        match self.loader.load_model(None).await {
            Ok(model) => self.harness.generate_safe_result(&model, &safe_request).await,
            Err(e) => self.harness.fallback_for_error(safe_request.station_key, &e),
        }
    }

    /// [`AiProvider::generate_with_persona`] as word chunks ending with the done sentinel.
    pub fn stream_with_persona<'a>(
        &'a self,
        request: &'a PersonaRequest,
        ctx: &'a CoachingContext<'a>,
    ) -> impl Stream<Item = StreamChunk> + Send + 'a {
        stream::once(self.generate_with_persona(request, ctx)).flat_map(|result| {
            stream::iter(
                result
                    .tokens
                    .into_iter()
                    .map(StreamChunk::token)
                    .chain(std::iter::once(StreamChunk::done())),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgeBand;

    fn ctx<'a>(profile: &'a Profile, telemetry: &'a TelemetryState, adaptive: bool) -> CoachingContext<'a> {
        CoachingContext {
            profile,
            telemetry,
            adaptive_enabled: adaptive,
        }
    }

    #[test]
    fn adaptive_values_fill_only_unset_fields() {
        let mut profile = Profile::default_profile();
        profile.age_band = AgeBand::Tweens;
        let telemetry = TelemetryState::default();
        let mut request = PersonaRequest::new(StationKey::Idea, "a robot dog");
        request.max_tokens = Some(42);

        let prepared = prepare_request(&request, &ctx(&profile, &telemetry, true));
        assert_eq!(prepared.max_tokens, Some(42));
        assert_eq!(prepared.temperature, Some(0.75));
        assert!(prepared.prompt.contains("Adaptive coaching:"));
        assert!(prepared.prompt.starts_with("### Safety Contract Reminder"));
        assert!(prepared.prompt.ends_with("a robot dog"));
    }

    #[test]
    fn disabled_coaching_leaves_request_untouched() {
        let profile = Profile::default_profile();
        let telemetry = TelemetryState::default();
        let mut request = PersonaRequest::new(StationKey::Share, "my comic");
        request.system_prompt = Some("Keep it short.".into());
        let prepared = prepare_request(&request, &ctx(&profile, &telemetry, false));
        assert_eq!(prepared.max_tokens, None);
        assert_eq!(prepared.temperature, None);
        assert!(!prepared.prompt.contains("Adaptive coaching:"));
        let caller = prepared.prompt.find("Keep it short.").unwrap();
        let persona = prepared.prompt.find("Station: Broadcast Deck Curator").unwrap();
        assert!(caller < persona);
    }
}
