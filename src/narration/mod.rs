//! Narration service — optional LLM phrasing for patient-facing text.
//!
//! Supports:
//! - **Anthropic**: Messages API over plain HTTP
//! - **OpenAI**: Chat Completions API over plain HTTP
//!
//! Narration is strictly cosmetic. Every call site pairs `generate` with a
//! fixed fallback string through [`narrate_or`], so a missing key, a dead
//! network or a slow provider never changes intake behavior beyond the
//! wording of a prompt.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicNarrator;
pub use openai::OpenAiNarrator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::NarrationError;

/// Token cap for a single narration completion. Prompts here are one short
/// paragraph; anything longer is provider misbehavior.
pub(crate) const NARRATION_MAX_TOKENS: u32 = 512;

/// A one-shot text generator.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Generate a completion for `context` under `system_prompt`.
    async fn generate(&self, system_prompt: &str, context: &str) -> Result<String, NarrationError>;
}

/// Supported narration backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationBackend {
    Anthropic,
    OpenAi,
}

impl NarrationBackend {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

/// Configuration for creating a narrator.
#[derive(Debug, Clone)]
pub struct NarrationConfig {
    pub backend: NarrationBackend,
    pub api_key: SecretString,
    pub model: String,
}

impl NarrationConfig {
    /// Builds the config from the environment. Returns `None` when no API
    /// key is set for the selected backend, which disables narration.
    ///
    /// Variables: `NARRATION_BACKEND` (`anthropic` or `openai`, default
    /// anthropic), `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`,
    /// `NARRATION_MODEL`.
    pub fn from_env() -> Option<Self> {
        let backend = match std::env::var("NARRATION_BACKEND").ok().as_deref() {
            Some("openai") => NarrationBackend::OpenAi,
            Some("anthropic") | None => NarrationBackend::Anthropic,
            Some(other) => {
                tracing::warn!(
                    backend = other,
                    "Unknown narration backend, defaulting to anthropic"
                );
                NarrationBackend::Anthropic
            }
        };

        let key_var = match backend {
            NarrationBackend::Anthropic => "ANTHROPIC_API_KEY",
            NarrationBackend::OpenAi => "OPENAI_API_KEY",
        };
        let api_key = std::env::var(key_var).ok().filter(|k| !k.is_empty())?;

        let model = std::env::var("NARRATION_MODEL")
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| backend.default_model().to_string());

        Some(Self {
            backend,
            api_key: SecretString::from(api_key),
            model,
        })
    }
}

/// Create a narrator from configuration.
pub fn create_narrator(config: &NarrationConfig) -> Arc<dyn Narrator> {
    match config.backend {
        NarrationBackend::Anthropic => {
            tracing::info!("Narration via Anthropic (model: {})", config.model);
            Arc::new(AnthropicNarrator::new(config.api_key.clone(), &config.model))
        }
        NarrationBackend::OpenAi => {
            tracing::info!("Narration via OpenAI (model: {})", config.model);
            Arc::new(OpenAiNarrator::new(config.api_key.clone(), &config.model))
        }
    }
}

/// Narrator used when no backend is configured. Always errors, so every
/// call site falls back to its fixed string.
pub struct DisabledNarrator;

#[async_trait]
impl Narrator for DisabledNarrator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _: &str, _: &str) -> Result<String, NarrationError> {
        Err(NarrationError::Disabled)
    }
}

/// Run one narration call with a hard timeout, falling back to `fallback`
/// on error, timeout, or an empty completion.
pub async fn narrate_or(
    narrator: &dyn Narrator,
    timeout: Duration,
    system_prompt: &str,
    context: &str,
    fallback: &str,
) -> String {
    match tokio::time::timeout(timeout, narrator.generate(system_prompt, context)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => {
            tracing::warn!(
                provider = narrator.name(),
                "Narration returned empty text, using fallback"
            );
            fallback.to_string()
        }
        Ok(Err(NarrationError::Disabled)) => fallback.to_string(),
        Ok(Err(e)) => {
            tracing::warn!(
                provider = narrator.name(),
                error = %e,
                "Narration failed, using fallback"
            );
            fallback.to_string()
        }
        Err(_) => {
            tracing::warn!(
                provider = narrator.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Narration timed out, using fallback"
            );
            fallback.to_string()
        }
    }
}
