//! Model loading and token streaming.
//!
//! A [`TextEngine`] produces raw tokens. [`LoadedModel::generate`] wraps it: every token is
//! scrubbed and tagged for uncertainty, at most `min(max_tokens, token_cap)` tokens pass,
//! and the stream always ends with exactly one `{ token: "", done: true }` chunk. An engine
//! error is forwarded once and ends the token phase.

use super::manifest::{calculate_token_cap, default_model_choice, find_model_choice, ModelChoice};
use super::settings::LlmSettingsStore;
use crate::error::GenerationError;
use crate::security::KeywordRedactor;
use async_trait::async_trait;
use futures_util::future::ready;
use futures_util::stream::{self, BoxStream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Upper bound on tokens the stub engine echoes back.
pub const STUB_MAX_TOKENS: usize = 64;

static UNCERTAINTY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(maybe|perhaps|not sure|guess)\b").ok());

/// Replaces deny-list terms with `[filtered]`.
pub fn scrub(text: &str) -> String {
    KeywordRedactor::shared().redact(text)
}

/// Appends `" (?)"` when the text hedges.
pub fn tag_uncertainty(text: &str) -> String {
    match UNCERTAINTY.as_ref() {
        Some(re) if re.is_match(text) => format!("{} (?)", text),
        _ => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub token: String,
    pub done: bool,
}

impl StreamChunk {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            done: false,
        }
    }

    /// The terminating sentinel.
    pub fn done() -> Self {
        Self {
            token: String::new(),
            done: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

pub type TokenStream = BoxStream<'static, Result<String, GenerationError>>;
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, GenerationError>>;

/// Something that turns a prompt into raw tokens.
pub trait TextEngine: Send + Sync {
    fn generate(&self, prompt: &str, opts: &GenerateOptions) -> TokenStream;
}

/// Prepares an engine for a catalogue model.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self, model: &ModelChoice) -> Result<Arc<dyn TextEngine>, GenerationError>;
}

/// Offline engine: echoes the scrubbed prompt word by word, up to [`STUB_MAX_TOKENS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StubEngine;

impl TextEngine for StubEngine {
    fn generate(&self, prompt: &str, _opts: &GenerateOptions) -> TokenStream {
        let tokens: Vec<Result<String, GenerationError>> = scrub(prompt)
            .split_whitespace()
            .take(STUB_MAX_TOKENS)
            .map(|t| Ok(t.to_string()))
            .collect();
        stream::iter(tokens).boxed()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StubEngineFactory;

#[async_trait]
impl EngineFactory for StubEngineFactory {
    async fn create(&self, _model: &ModelChoice) -> Result<Arc<dyn TextEngine>, GenerationError> {
        Ok(Arc::new(StubEngine))
    }
}

/// A model bound to its engine and token cap.
#[derive(Clone)]
pub struct LoadedModel {
    model: ModelChoice,
    token_cap: usize,
    engine: Arc<dyn TextEngine>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model.id)
            .field("token_cap", &self.token_cap)
            .finish()
    }
}

impl LoadedModel {
    pub fn new(model: ModelChoice, token_cap: usize, engine: Arc<dyn TextEngine>) -> Self {
        Self {
            model,
            token_cap,
            engine,
        }
    }

    pub fn model(&self) -> &ModelChoice {
        &self.model
    }

    pub fn token_cap(&self) -> usize {
        self.token_cap
    }

    /// Tokens allowed for one call.
    pub fn allowed_tokens(&self, opts: &GenerateOptions) -> usize {
        match opts.max_tokens {
            Some(n) if n > 0 => n.min(self.token_cap),
            _ => self.token_cap,
        }
    }

    pub fn generate(&self, prompt: &str, opts: &GenerateOptions) -> ChunkStream {
        let composed = match opts.system_prompt.as_deref() {
            Some(system) if !system.is_empty() => format!("{}\n{}", system, prompt),
            _ => prompt.to_string(),
        };
        let allowed = self.allowed_tokens(opts);

        // State: (tokens emitted, stream failed).
        let body = self
            .engine
            .generate(&composed, opts)
            .scan((0usize, false), move |(count, failed), item| {
                if *failed || *count >= allowed {
                    return ready(None);
                }
                let out = match item {
                    Ok(token) => {
                        *count += 1;
                        Ok(StreamChunk::token(tag_uncertainty(&scrub(&token))))
                    }
                    Err(e) => {
                        *failed = true;
                        Err(e)
                    }
                };
                ready(Some(out))
            });

        body.chain(stream::once(ready(Ok(StreamChunk::done()))))
            .boxed()
    }
}

struct CachedModel {
    revision: u64,
    model: Arc<LoadedModel>,
}

/// Resolves model ids against the catalogue and caches the last loaded model.
///
/// The cache is dropped whenever the settings store commits a change.
pub struct ModelLoader {
    settings: Arc<LlmSettingsStore>,
    factory: Arc<dyn EngineFactory>,
    cache: Mutex<Option<CachedModel>>,
}

impl ModelLoader {
    pub fn new(settings: Arc<LlmSettingsStore>, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            settings,
            factory,
            cache: Mutex::new(None),
        }
    }

    /// Loader backed by [`StubEngine`].
    pub fn stub(settings: Arc<LlmSettingsStore>) -> Self {
        Self::new(settings, Arc::new(StubEngineFactory))
    }

    pub fn settings(&self) -> &Arc<LlmSettingsStore> {
        &self.settings
    }

    /// Loads `model_id`, or the configured model when `None`. Unknown ids use the default model.
    pub async fn load_model(
        &self,
        model_id: Option<&str>,
    ) -> Result<Arc<LoadedModel>, GenerationError> {
        let settings = self.settings.get();
        let revision = self.settings.revision();
        let requested = model_id.unwrap_or(settings.model_id.as_str());
        let model = find_model_choice(requested).unwrap_or_else(default_model_choice);

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.revision == revision && cached.model.model.id == model.id {
                return Ok(cached.model.clone());
            }
        }

        let engine = self.factory.create(model).await?;
        let token_cap = calculate_token_cap(&model.id, settings.performance_mode_id);
        let loaded = Arc::new(LoadedModel::new(model.clone(), token_cap, engine));
        tracing::info!(
            target: "workshop::llm",
            model_id = %model.id,
            token_cap,
            "model loaded"
        );
        *cache = Some(CachedModel {
            revision,
            model: loaded.clone(),
        });
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    async fn collect(stream: ChunkStream) -> Vec<Result<StreamChunk, GenerationError>> {
        stream.collect().await
    }

    fn stub_model(cap: usize) -> LoadedModel {
        LoadedModel::new(default_model_choice().clone(), cap, Arc::new(StubEngine))
    }

    #[test]
    fn uncertainty_is_tagged() {
        assert_eq!(tag_uncertainty("Maybe"), "Maybe (?)");
        assert_eq!(tag_uncertainty("sure"), "sure");
    }

    #[tokio::test]
    async fn stream_ends_with_single_sentinel() {
        let model = stub_model(512);
        let chunks = collect(model.generate("hello there", &GenerateOptions::default())).await;
        let chunks: Vec<StreamChunk> = chunks.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.last(), Some(&StreamChunk::done()));
        assert_eq!(chunks.iter().filter(|c| c.done).count(), 1);
    }

    #[tokio::test]
    async fn token_budget_stops_early_but_keeps_sentinel() {
        let model = stub_model(512);
        let opts = GenerateOptions {
            max_tokens: Some(2),
            ..Default::default()
        };
        let chunks = collect(model.generate("one two three four", &opts)).await;
        assert_eq!(chunks.len(), 3);
        assert!(chunks[2].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn tokens_are_scrubbed_and_system_prompt_prefixed() {
        let model = stub_model(512);
        let opts = GenerateOptions {
            system_prompt: Some("maybe".into()),
            ..Default::default()
        };
        let chunks = collect(model.generate("weapon", &opts)).await;
        let tokens: Vec<String> = chunks.into_iter().map(|c| c.unwrap().token).collect();
        assert_eq!(tokens, vec!["maybe (?)", "[filtered]", ""]);
    }

    #[tokio::test]
    async fn stub_engine_caps_output() {
        let model = stub_model(512);
        let prompt = vec!["word"; 100].join(" ");
        let chunks = collect(model.generate(&prompt, &GenerateOptions::default())).await;
        assert_eq!(chunks.len(), STUB_MAX_TOKENS + 1);
    }

    #[tokio::test]
    async fn loader_caches_until_settings_change() {
        let settings = Arc::new(LlmSettingsStore::new(Arc::new(MemoryStorage::new())));
        let loader = ModelLoader::stub(settings.clone());
        let a = loader.load_model(None).await.unwrap();
        let b = loader.load_model(Some("not-a-model")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        settings.set_performance_mode(crate::llm::PerformanceModeId::Adventure);
        let c = loader.load_model(None).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.token_cap(), 1280);
    }
}
