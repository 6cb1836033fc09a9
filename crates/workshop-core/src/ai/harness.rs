//! Safe AI harness: the only path from a model to the UI.
//!
//! Drains a [`LoadedModel`] stream under a wall-clock guard and a token budget, joins the
//! tokens, runs the sanitizer, and caps the length. Empty output, output the sanitizer wipes
//! out, an engine error and a timeout all produce the same fixed fallback message plus one
//! incident. Callers never see an error or an empty result.

use super::incidents::{IncidentCategory, IncidentLog};
use crate::domain::StationKey;
use crate::error::GenerationError;
use crate::llm::{GenerateOptions, LoadedModel, StreamChunk};
use crate::security::{ChildModeGovernor, TextSanitizer};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const FALLBACK_MESSAGE: &str = "Let's try again together. Can you describe that another way?";
pub const MAX_RESPONSE_LENGTH: usize = 1024;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeAiRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_key: Option<StationKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl SafeAiRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn for_station(mut self, station: StationKey) -> Self {
        self.station_key = Some(station);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeAiResult {
    pub text: String,
    pub tokens: Vec<String>,
}

impl SafeAiResult {
    pub fn is_fallback(&self) -> bool {
        self.text == FALLBACK_MESSAGE
    }
}

fn chunk_text(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn compose_prompt(request: &SafeAiRequest) -> String {
    match request.system_prompt.as_deref().map(str::trim) {
        Some(system) if !system.is_empty() => format!("{}\n\n{}", system, request.prompt),
        _ => request.prompt.clone(),
    }
}

fn truncate_response(text: String) -> String {
    match text.char_indices().nth(MAX_RESPONSE_LENGTH) {
        Some((byte_idx, _)) => format!("{}...", text[..byte_idx].trim()),
        None => text,
    }
}

pub struct SafeAiHarness {
    sanitizer: Arc<dyn TextSanitizer>,
    incidents: Arc<IncidentLog>,
    timeout: Duration,
}

impl SafeAiHarness {
    /// Harness using the child-mode governor and the default 15 s guard.
    pub fn new(incidents: Arc<IncidentLog>) -> Self {
        Self {
            sanitizer: Arc::new(ChildModeGovernor::new()),
            incidents,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn TextSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn incidents(&self) -> &Arc<IncidentLog> {
        &self.incidents
    }

    fn fallback(
        &self,
        station: Option<StationKey>,
        category: IncidentCategory,
        description: impl Into<String>,
    ) -> SafeAiResult {
        self.incidents
            .log(station, category, Some(description.into()));
        SafeAiResult {
            text: FALLBACK_MESSAGE.to_string(),
            tokens: chunk_text(FALLBACK_MESSAGE),
        }
    }

    /// Fallback for a failure that happened before generation started (e.g. the model could not load).
    pub fn fallback_for_error(
        &self,
        station: Option<StationKey>,
        error: &GenerationError,
    ) -> SafeAiResult {
        tracing::warn!(target: "workshop::harness", error = %error, "generation failed before streaming");
        self.fallback(station, IncidentCategory::Timeout, error.to_string())
    }

    /// Consumes the stream, checking the wall-clock guard and the token budget per chunk.
    async fn drain(
        &self,
        loader: &LoadedModel,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<Vec<String>, GenerationError> {
        let budget = loader.allowed_tokens(opts);
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut stream = loader.generate(prompt, opts);
        let mut tokens = Vec::new();
        loop {
            let next = match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    return Err(GenerationError::Timeout(
                        started.elapsed().as_millis() as u64,
                    ))
                }
            };
            match next {
                None => break,
                Some(Err(e)) => return Err(e),
                Some(Ok(chunk)) => {
                    if chunk.done || chunk.token.is_empty() {
                        continue;
                    }
                    tokens.push(chunk.token);
                    if tokens.len() >= budget {
                        break;
                    }
                }
            }
        }
        Ok(tokens)
    }

    pub async fn generate_safe_result(
        &self,
        loader: &LoadedModel,
        request: &SafeAiRequest,
    ) -> SafeAiResult {
        let station = request.station_key;
        let prompt = compose_prompt(request);
        let opts = GenerateOptions {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system_prompt: None,
        };

        let tokens = match self.drain(loader, &prompt, &opts).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(target: "workshop::harness", error = %e, category = "timeout", "falling back");
                return self.fallback(station, IncidentCategory::Timeout, e.to_string());
            }
        };

        let aggregated = tokens.join(" ");
        let aggregated = aggregated.trim();
        if aggregated.is_empty() {
            tracing::warn!(target: "workshop::harness", category = "invalid_shape", "model returned empty output");
            return self.fallback(station, IncidentCategory::InvalidShape, "Model returned empty output");
        }

        let sanitized = self.sanitizer.sanitize(aggregated);
        let sanitized = sanitized.trim();
        if sanitized.is_empty() {
            tracing::warn!(target: "workshop::harness", category = "redaction", "governor removed all content");
            return self.fallback(station, IncidentCategory::Redaction, "Governor removed all content");
        }

        let truncated = truncate_response(sanitized.to_string());
        let output_tokens = chunk_text(&truncated);
        if output_tokens.is_empty() {
            return self.fallback(
                station,
                IncidentCategory::InvalidShape,
                "Sanitized response contained no tokens",
            );
        }
        tracing::debug!(
            target: "workshop::harness",
            station = station.map(|s| s.as_str()).unwrap_or("none"),
            tokens = output_tokens.len(),
            "safe result produced"
        );
        SafeAiResult {
            text: truncated,
            tokens: output_tokens,
        }
    }

    /// The safe result re-emitted as word chunks, ending with the done sentinel.
    pub fn safe_stream<'a>(
        &'a self,
        loader: &'a LoadedModel,
        request: &'a SafeAiRequest,
    ) -> impl Stream<Item = StreamChunk> + Send + 'a {
        stream::once(self.generate_safe_result(loader, request)).flat_map(|result| {
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
    use crate::llm::{default_model_choice, StubEngine, TextEngine, TokenStream};

    struct Scripted(Vec<&'static str>);

    impl TextEngine for Scripted {
        fn generate(&self, _prompt: &str, _opts: &GenerateOptions) -> TokenStream {
            let items: Vec<Result<String, GenerationError>> =
                self.0.iter().map(|t| Ok(t.to_string())).collect();
            stream::iter(items).boxed()
        }
    }

    fn model(engine: Arc<dyn TextEngine>) -> LoadedModel {
        LoadedModel::new(default_model_choice().clone(), 1024, engine)
    }

    #[test]
    fn long_responses_are_capped_with_ellipsis() {
        let out = truncate_response("b".repeat(2000));
        assert_eq!(out.chars().count(), MAX_RESPONSE_LENGTH + 3);
        assert!(out.ends_with("..."));
    }

    #[tokio::test]
    async fn stub_echo_is_governed() {
        let harness = SafeAiHarness::new(Arc::new(IncidentLog::new()));
        let loader = model(Arc::new(StubEngine));
        let result = harness
            .generate_safe_result(&loader, &SafeAiRequest::new("Don't stop building"))
            .await;
        assert_eq!(result.text, "do stop building.");
        assert_eq!(result.tokens, vec!["do", "stop", "building."]);
        assert!(harness.incidents().is_empty());
    }

    #[tokio::test]
    async fn fully_redacted_output_falls_back() {
        let log = Arc::new(IncidentLog::new());
        let harness = SafeAiHarness::new(log.clone());
        let loader = model(Arc::new(Scripted(vec!["...", "!!!"])));
        let result = harness
            .generate_safe_result(&loader, &SafeAiRequest::new("x"))
            .await;
        assert!(result.is_fallback());
        assert_eq!(log.list()[0].category, IncidentCategory::Redaction);
    }

    #[tokio::test]
    async fn safe_stream_ends_with_sentinel() {
        let harness = SafeAiHarness::new(Arc::new(IncidentLog::new()));
        let loader = model(Arc::new(StubEngine));
        let request = SafeAiRequest::new("make a kite");
        let chunks: Vec<StreamChunk> = harness.safe_stream(&loader, &request).collect().await;
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.last(), Some(&StreamChunk::done()));
    }
}
