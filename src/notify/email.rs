//! Email notifier — SMTP delivery to a care-team inbox via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::NotifyError;
use crate::normalize::render_text;
use crate::notify::Notifier;
use crate::session::model::IntakeRecord;

// ── Configuration ───────────────────────────────────────────────────

/// Email notifier configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub to_address: String,
}

impl EmailConfig {
    /// Build config from environment variables.
    /// Returns `None` if `EMAIL_SMTP_HOST` or `EMAIL_CARE_TEAM` is not set
    /// (notifier disabled).
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("EMAIL_SMTP_HOST").ok()?;
        let to_address = std::env::var("EMAIL_CARE_TEAM").ok()?;

        let smtp_port: u16 = std::env::var("EMAIL_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("EMAIL_USERNAME").unwrap_or_default();
        let password = std::env::var("EMAIL_PASSWORD").unwrap_or_default();
        let from_address = std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            to_address,
        })
    }
}

// ── Notifier ────────────────────────────────────────────────────────

/// Email notifier — SMTP (outbound only).
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Build from environment variables; `None` when not configured.
    pub fn from_env() -> Option<Self> {
        EmailConfig::from_env().map(Self::new)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, record: &IntakeRecord) -> Result<(), NotifyError> {
        let config = self.config.clone();
        let subject = format!("New intake: {}", record.patient_name);
        let body = render_text(record);

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || send_email(&config, &subject, &body))
            .await
            .map_err(|e| NotifyError::SendFailed {
                name: "email".into(),
                reason: format!("send task panicked: {e}"),
            })?
    }
}

/// Send an email via SMTP (blocking — run in spawn_blocking).
fn send_email(config: &EmailConfig, subject: &str, body: &str) -> Result<(), NotifyError> {
    let creds = Credentials::new(config.username.clone(), config.password.clone());

    let transport = SmtpTransport::relay(&config.smtp_host)
        .map_err(|e| NotifyError::SendFailed {
            name: "email".into(),
            reason: format!("SMTP relay error: {e}"),
        })?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    let email = Message::builder()
        .from(config.from_address.parse().map_err(|e| {
            NotifyError::SendFailed {
                name: "email".into(),
                reason: format!("Invalid from address: {e}"),
            }
        })?)
        .to(config.to_address.parse().map_err(|e| {
            NotifyError::SendFailed {
                name: "email".into(),
                reason: format!("Invalid to address: {e}"),
            }
        })?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| NotifyError::SendFailed {
            name: "email".into(),
            reason: format!("Failed to build email: {e}"),
        })?;

    transport.send(&email).map_err(|e| NotifyError::SendFailed {
        name: "email".into(),
        reason: format!("SMTP send failed: {e}"),
    })?;

    tracing::info!("Intake email sent to {}", config.to_address);
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::ResponseEntry;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.invalid".into(),
            smtp_port: 587,
            username: "clinic".into(),
            password: "pass".into(),
            from_address: "clinic@test.com".into(),
            to_address: "care-team@test.com".into(),
        }
    }

    fn sample_record() -> IntakeRecord {
        IntakeRecord {
            id: Uuid::new_v4(),
            patient_name: "Alice".into(),
            patient_email: "alice@example.com".into(),
            symptoms: vec!["Fever".into()],
            responses: vec![ResponseEntry {
                question: "How high?".into(),
                answer: "39C".into(),
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn email_notifier_name() {
        let n = EmailNotifier::new(sample_config());
        assert_eq!(n.name(), "email");
    }

    #[test]
    fn config_from_env_returns_none_when_no_host() {
        // SAFETY: This test runs in isolation; no other thread reads EMAIL_SMTP_HOST concurrently.
        unsafe { std::env::remove_var("EMAIL_SMTP_HOST") };
        assert!(EmailConfig::from_env().is_none());
    }

    #[tokio::test]
    async fn deliver_with_unreachable_smtp_fails() {
        let n = EmailNotifier::new(sample_config());
        let result = n.deliver(&sample_record()).await;
        assert!(result.is_err());
    }
}
