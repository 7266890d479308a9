//! OpenAI Chat Completions API adapter.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::NarrationError;
use crate::narration::{NARRATION_MAX_TOKENS, Narrator};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiNarrator {
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl OpenAiNarrator {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Narrator for OpenAiNarrator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
    ) -> Result<String, NarrationError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": NARRATION_MAX_TOKENS,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": context },
            ],
        });

        let resp = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NarrationError::RequestFailed {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(NarrationError::RequestFailed {
                provider: "openai".into(),
                reason: format!("{status}: {detail}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| NarrationError::InvalidResponse {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        data.get("choices")
            .and_then(serde_json::Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|c| c.pointer("/message/content"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| NarrationError::InvalidResponse {
                provider: "openai".into(),
                reason: "no message content in response".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrator_name() {
        let narrator = OpenAiNarrator::new(SecretString::from("sk-test"), "gpt-4o-mini");
        assert_eq!(narrator.name(), "openai");
    }

    #[tokio::test]
    async fn generate_with_fake_key_fails() {
        let narrator = OpenAiNarrator::new(SecretString::from("sk-test"), "gpt-4o-mini");
        let result = narrator.generate("You are a greeter.", "Say hello.").await;
        assert!(result.is_err());
    }
}
