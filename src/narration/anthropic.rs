//! Anthropic Messages API adapter.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::NarrationError;
use crate::narration::{NARRATION_MAX_TOKENS, Narrator};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicNarrator {
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl AnthropicNarrator {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Narrator for AnthropicNarrator {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
    ) -> Result<String, NarrationError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": NARRATION_MAX_TOKENS,
            "system": system_prompt,
            "messages": [{ "role": "user", "content": context }],
        });

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| NarrationError::RequestFailed {
                provider: "anthropic".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(NarrationError::RequestFailed {
                provider: "anthropic".into(),
                reason: format!("{status}: {detail}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| NarrationError::InvalidResponse {
                provider: "anthropic".into(),
                reason: e.to_string(),
            })?;

        data.get("content")
            .and_then(serde_json::Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find_map(|b| b.get("text").and_then(serde_json::Value::as_str))
            })
            .map(str::to_string)
            .ok_or_else(|| NarrationError::InvalidResponse {
                provider: "anthropic".into(),
                reason: "no text block in response".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrator_name() {
        let narrator = AnthropicNarrator::new(SecretString::from("test-key"), "claude-3-5-haiku-latest");
        assert_eq!(narrator.name(), "anthropic");
    }

    #[tokio::test]
    async fn generate_with_fake_key_fails() {
        // Either the request never leaves (no network) or the API rejects
        // the key. Both surface as an error, never a completion.
        let narrator = AnthropicNarrator::new(SecretString::from("test-key"), "claude-3-5-haiku-latest");
        let result = narrator.generate("You are a greeter.", "Say hello.").await;
        assert!(result.is_err());
    }
}
