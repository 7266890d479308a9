//! Twilio notifier — SMS (or a voice call) to an on-call number.
//!
//! SMS carries the plain-text record rendering, capped at Twilio's body
//! limit. Voice mode places a call that reads a short summary instead.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::NotifyError;
use crate::normalize::{escape_markup, render_text};
use crate::notify::Notifier;
use crate::session::model::IntakeRecord;

/// Twilio rejects message bodies over 1600 characters.
const SMS_MAX_LENGTH: usize = 1600;

/// Twilio notifier — delivers records to a single on-call number.
pub struct TwilioNotifier {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    to_number: String,
    voice: bool,
    client: reqwest::Client,
}

impl TwilioNotifier {
    pub fn new(
        account_sid: String,
        auth_token: SecretString,
        from_number: String,
        to_number: String,
        voice: bool,
    ) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            to_number,
            voice,
            client: reqwest::Client::new(),
        }
    }

    /// Build from environment variables.
    /// Returns `None` if any of `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
    /// `TWILIO_FROM_NUMBER` or `TWILIO_TO_NUMBER` is not set (notifier
    /// disabled). Set `TWILIO_VOICE=1` to place a call instead of texting.
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .ok()
            .filter(|s| !s.is_empty())?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())?;
        let from_number = std::env::var("TWILIO_FROM_NUMBER")
            .ok()
            .filter(|s| !s.is_empty())?;
        let to_number = std::env::var("TWILIO_TO_NUMBER")
            .ok()
            .filter(|s| !s.is_empty())?;

        let voice = std::env::var("TWILIO_VOICE")
            .is_ok_and(|s| s == "1" || s.eq_ignore_ascii_case("true"));

        Some(Self::new(
            account_sid,
            SecretString::from(auth_token),
            from_number,
            to_number,
            voice,
        ))
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/{endpoint}.json",
            self.account_sid
        )
    }

    /// POST a form to the Twilio REST API with basic auth.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(form)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed {
                name: "twilio".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(NotifyError::SendFailed {
                name: "twilio".into(),
                reason: format!("Twilio returned {status}: {err}"),
            });
        }

        Ok(())
    }

    async fn send_sms(&self, record: &IntakeRecord) -> Result<(), NotifyError> {
        let body = truncate_to(&render_text(record), SMS_MAX_LENGTH);
        self.post_form(
            &self.api_url("Messages"),
            &[
                ("To", self.to_number.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", body.as_str()),
            ],
        )
        .await
    }

    async fn place_call(&self, record: &IntakeRecord) -> Result<(), NotifyError> {
        let twiml = format!(
            "<Response><Say>{}</Say></Response>",
            escape_markup(&spoken_summary(record))
        );
        self.post_form(
            &self.api_url("Calls"),
            &[
                ("To", self.to_number.as_str()),
                ("From", self.from_number.as_str()),
                ("Twiml", twiml.as_str()),
            ],
        )
        .await
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn deliver(&self, record: &IntakeRecord) -> Result<(), NotifyError> {
        if self.voice {
            self.place_call(record).await
        } else {
            self.send_sms(record).await
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Short summary read aloud in voice mode.
fn spoken_summary(record: &IntakeRecord) -> String {
    format!(
        "New intake submission from {}. Reported symptoms: {}.",
        record.patient_name,
        record.symptoms.join(", ")
    )
}

/// Truncate to a byte limit without splitting a UTF-8 character.
fn truncate_to(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

// ── Tests ───────────────────────────────────────────────────────────
