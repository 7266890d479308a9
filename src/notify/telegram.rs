//! Telegram notifier — posts intake records to a care-team chat.
//!
//! Sends the HTML rendering first (Telegram's HTML parse mode matches the
//! record's escaped markup), with a plain-text retry if that is rejected.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::normalize::{render_html, render_text};
use crate::notify::Notifier;
use crate::session::model::IntakeRecord;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram notifier — delivers records to a fixed chat via the Bot API.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: reqwest::Client::new(),
        }
    }

    /// Build from environment variables.
    /// Returns `None` if `TELEGRAM_BOT_TOKEN` or `TELEGRAM_CHAT_ID` is not
    /// set (notifier disabled).
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .filter(|s| !s.is_empty())?;
        Some(Self::new(bot_token, chat_id))
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Send a text message, splitting at Telegram's 4096 char limit.
    async fn send_chunks(&self, text: &str, parse_mode: Option<&str>) -> Result<(), NotifyError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);

        for chunk in &chunks {
            self.send_chunk(chunk, parse_mode).await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars).
    async fn send_chunk(&self, text: &str, parse_mode: Option<&str>) -> Result<(), NotifyError> {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = serde_json::Value::String(mode.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(NotifyError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, record: &IntakeRecord) -> Result<(), NotifyError> {
        let html = render_html(record);
        match self.send_chunks(&html, Some("HTML")).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    record_id = %record.id,
                    "Telegram HTML send failed ({e}); retrying as plain text"
                );
                self.send_chunks(&render_text(record), None).await
            }
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split a message into chunks that fit Telegram's character limit.
/// Prefers newline splits, then spaces, then cuts at the last char
/// boundary inside the limit. Record text can carry multibyte characters,
/// so the hard cut must never land inside one.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        let window = &remaining[..cut];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            // A split at 0 would make no progress
            .filter(|&at| at > 0)
            .unwrap_or(cut);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
