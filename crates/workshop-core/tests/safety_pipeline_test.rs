//! Integration test: governed generation from model stream to displayable text.
//!
//! Verifies that:
//! 1. The governor redacts every deny-list occurrence and keeps at most three short sentences.
//! 2. A failing engine, a failing model load, and a stalled engine each yield the fallback
//!    plus exactly one `timeout` incident.
//! 3. Whitespace-only output yields the fallback with an `invalid_shape` incident.
//! 4. Adaptive coaching maps 5 projects / 4 sessions to 140 tokens.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use workshop_core::ai::persona_for_station;
use workshop_core::llm::{default_model_choice, ModelChoice, TokenStream};
use workshop_core::security::{clamp_reading_level, redact_disallowed_content, DISALLOWED_TERMS};
use workshop_core::{
    build_adaptive_adjustments, AgeBand, AiProvider, CoachingContext, EngineFactory,
    GenerateOptions, GenerationError, IncidentCategory, IncidentLog, LlmSettingsStore,
    LoadedModel, MemoryStorage, ModelLoader, PersonaRequest, Profile, SafeAiHarness,
    SafeAiRequest, StationKey, TelemetryState, TextEngine, FALLBACK_MESSAGE,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct FailingEngine;

impl TextEngine for FailingEngine {
    fn generate(&self, _prompt: &str, _opts: &GenerateOptions) -> TokenStream {
        let items: Vec<Result<String, GenerationError>> = vec![
            Ok("partial".to_string()),
            Err(GenerationError::Engine("device lost".into())),
        ];
        stream::iter(items).boxed()
    }
}

struct BlankEngine;

impl TextEngine for BlankEngine {
    fn generate(&self, _prompt: &str, _opts: &GenerateOptions) -> TokenStream {
        let items: Vec<Result<String, GenerationError>> =
            vec![Ok(String::new()), Ok("   ".into()), Ok("\n".into())];
        stream::iter(items).boxed()
    }
}

struct StalledEngine;

impl TextEngine for StalledEngine {
    fn generate(&self, _prompt: &str, _opts: &GenerateOptions) -> TokenStream {
        stream::once(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, GenerationError>("late".to_string())
        })
        .boxed()
    }
}

struct UnavailableFactory;

#[async_trait::async_trait]
impl EngineFactory for UnavailableFactory {
    async fn create(&self, model: &ModelChoice) -> Result<Arc<dyn TextEngine>, GenerationError> {
        Err(GenerationError::ModelUnavailable(model.id.clone()))
    }
}

fn model(engine: Arc<dyn TextEngine>) -> LoadedModel {
    LoadedModel::new(default_model_choice().clone(), 1024, engine)
}

#[test]
fn redaction_leaves_no_denied_term() {
    let inputs = [
        "weapon weapon WEAPON",
        "no violence, never Violence.",
        "a killer kite that could kill boredom",
        "talk about self-harm and suicide prevention",
    ];
    for input in inputs {
        let out = redact_disallowed_content(input).to_lowercase();
        for term in DISALLOWED_TERMS {
            assert!(!out.contains(term), "{term:?} survived in {out:?}");
        }
        assert!(out.contains("[filtered]"));
    }
}

#[test]
fn reading_level_bounds_hold() {
    let long_sentence = "word ".repeat(60);
    let inputs = [
        "One. Two. Three. Four. Five.".to_string(),
        format!("{long_sentence}. Short one! Another? And more. Last."),
        "Wow!!! Really??? Yes... Okay. Done.".to_string(),
    ];
    for input in &inputs {
        let out = clamp_reading_level(input);
        let terminators = out.matches(['.', '!', '?']).count();
        assert!(terminators <= 3, "too many sentences in {out:?}");
        for fragment in out.split(". ") {
            let body = fragment.trim_end_matches('.').trim_end_matches('…');
            assert!(body.chars().count() <= 120, "fragment too long: {fragment:?}");
        }
    }
}

#[tokio::test]
async fn failing_engine_falls_back_with_one_timeout_incident() {
    init_tracing();
    let log = Arc::new(IncidentLog::new());
    let harness = SafeAiHarness::new(log.clone());
    let request = SafeAiRequest::new("build a raft").for_station(StationKey::Build);

    let result = harness
        .generate_safe_result(&model(Arc::new(FailingEngine)), &request)
        .await;

    assert_eq!(result.text, FALLBACK_MESSAGE);
    let incidents = log.list();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].category, IncidentCategory::Timeout);
    assert_eq!(incidents[0].station, Some(StationKey::Build));
}

#[tokio::test]
async fn blank_output_is_invalid_shape() {
    init_tracing();
    let log = Arc::new(IncidentLog::new());
    let harness = SafeAiHarness::new(log.clone());

    let result = harness
        .generate_safe_result(&model(Arc::new(BlankEngine)), &SafeAiRequest::new("anything"))
        .await;

    assert!(result.is_fallback());
    assert!(!result.tokens.is_empty());
    let incidents = log.list();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].category, IncidentCategory::InvalidShape);
}

#[tokio::test]
async fn stalled_engine_hits_wall_clock_guard() {
    let log = Arc::new(IncidentLog::new());
    let harness = SafeAiHarness::new(log.clone()).with_timeout(Duration::from_millis(50));

    let result = harness
        .generate_safe_result(&model(Arc::new(StalledEngine)), &SafeAiRequest::new("wait"))
        .await;

    assert!(result.is_fallback());
    assert_eq!(log.len(), 1);
    assert_eq!(log.list()[0].category, IncidentCategory::Timeout);
}

#[tokio::test]
async fn model_load_failure_falls_back() {
    let storage = Arc::new(MemoryStorage::new());
    let settings = Arc::new(LlmSettingsStore::new(storage));
    let loader = Arc::new(ModelLoader::new(settings, Arc::new(UnavailableFactory)));
    let log = Arc::new(IncidentLog::new());
    let provider = AiProvider::new(loader, Arc::new(SafeAiHarness::new(log.clone())));

    let profile = Profile::default_profile();
    let telemetry = TelemetryState::default();
    let ctx = CoachingContext {
        profile: &profile,
        telemetry: &telemetry,
        adaptive_enabled: true,
    };
    let result = provider
        .generate_with_persona(&PersonaRequest::new(StationKey::Idea, "a kite"), &ctx)
        .await;

    assert_eq!(result.text, FALLBACK_MESSAGE);
    assert_eq!(log.len(), 1);
    assert_eq!(log.list()[0].category, IncidentCategory::Timeout);
}

#[test]
fn adaptive_tokens_for_five_projects_four_sessions() {
    let telemetry = TelemetryState {
        total_projects_created: 5,
        total_sessions: 4,
        ..Default::default()
    };
    for band in AgeBand::all() {
        let mut profile = Profile::default_profile();
        profile.age_band = band;
        let adjustments = build_adaptive_adjustments(
            persona_for_station(Some(StationKey::Build)),
            &profile,
            &telemetry,
        );
        assert_eq!(adjustments.max_tokens, 140);
    }
}
