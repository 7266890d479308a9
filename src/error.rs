//! Error types for the intake service.

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Rule table error: {0}")]
    RuleTable(#[from] RuleTableError),

    #[error("Narration error: {0}")]
    Narration(#[from] NarrationError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Caller-visible intake errors. No variant ever advances a session's step.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid request field {field}: {message}")]
    InvalidRequest { field: String, message: String },

    #[error("Session {id} not found")]
    SessionNotFound { id: Uuid },

    #[error("Session {id} is in step {actual}, expected {expected}")]
    StepMismatch {
        id: Uuid,
        expected: String,
        actual: String,
    },

    #[error("Session {id} is already submitted")]
    SessionClosed { id: Uuid },
}

impl IntakeError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Rule-table load errors. Fatal at startup; the table is never reloaded.
#[derive(Debug, thiserror::Error)]
pub enum RuleTableError {
    #[error("Failed to read rule file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rule file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid rule for symptom {symptom:?}: {message}")]
    Invalid { symptom: String, message: String },
}

/// Narration provider errors. Always recovered with a fallback string.
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Narration is not configured")]
    Disabled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Notification delivery errors. Logged by the sink, never user-facing.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to deliver via {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
