//! Configuration types.

use std::time::Duration;

/// Service configuration. Every field has an `INTAKE_*` environment
/// override; `Default` carries the local-development values.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Path to the symptom rule file loaded at startup.
    pub rules_path: String,
    /// Path to the local database file.
    pub db_path: String,
    /// Idle timeout (unsubmitted sessions are pruned after this duration).
    pub session_idle_timeout: Duration,
    /// Retention window for submitted sessions before pruning.
    pub submitted_retention: Duration,
    /// Interval between session garbage-collection sweeps.
    pub sweep_interval: Duration,
    /// Upper bound on a single narration call before the fallback is used.
    pub narration_timeout: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            rules_path: "./data/symptom-rules.json".to_string(),
            db_path: "./data/intake.db".to_string(),
            session_idle_timeout: Duration::from_secs(1800), // 30 minutes
            submitted_retention: Duration::from_secs(300),   // 5 minutes
            sweep_interval: Duration::from_secs(60),
            narration_timeout: Duration::from_secs(8),
        }
    }
}

impl IntakeConfig {
    /// Builds the config from `INTAKE_*` environment variables, falling
    /// back to the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("INTAKE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            rules_path: std::env::var("INTAKE_RULES_PATH").unwrap_or(defaults.rules_path),
            db_path: std::env::var("INTAKE_DB_PATH").unwrap_or(defaults.db_path),
            session_idle_timeout: env_secs("INTAKE_SESSION_IDLE_SECS")
                .unwrap_or(defaults.session_idle_timeout),
            submitted_retention: env_secs("INTAKE_SUBMITTED_RETENTION_SECS")
                .unwrap_or(defaults.submitted_retention),
            sweep_interval: env_secs("INTAKE_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            narration_timeout: env_secs("INTAKE_NARRATION_TIMEOUT_SECS")
                .unwrap_or(defaults.narration_timeout),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
