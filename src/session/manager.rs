//! IntakeManager — coordinates sessions, the rule table, narration, and
//! the record sink.
//!
//! Every operation locks exactly one session for its duration, validates
//! the session is at the expected step, mutates, and advances. Failed
//! validation never advances a step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::IntakeError;
use crate::narration::{Narrator, narrate_or};
use crate::normalize::normalize;
use crate::rules::{FollowUpForm, RuleTable, aggregate};
use crate::session::model::{IntakeSession, PatientDetails, plausible_email};
use crate::session::prompts::{
    FALLBACK_FOLLOW_UP_INTRO, FALLBACK_GREETING, follow_up_intro_context, follow_up_intro_prompt,
    greeting_context, greeting_prompt,
};
use crate::session::registry::{SessionHandle, SessionRegistry};
use crate::session::state::IntakeStep;
use crate::sink::{RecordSink, spawn_commit};

// ── Request/response payloads ───────────────────────────────────────

/// Response to starting a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginResponse {
    pub session_id: Uuid,
    pub step: IntakeStep,
    pub greeting: String,
}

/// Patient contact details for the collect-details step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsResponse {
    pub step: IntakeStep,
    /// Symptom catalog the patient picks from, in rule-file order.
    pub symptoms: Vec<String>,
}

/// Symptoms selected by the patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomsRequest {
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomsResponse {
    pub step: IntakeStep,
    pub intro: String,
    pub form: FollowUpForm,
}

/// Answers keyed by question text. Partial batches are merged; the step
/// only advances once every form question has been submitted at least once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswersRequest {
    pub responses: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswersResponse {
    pub step: IntakeStep,
    pub record_id: Uuid,
    pub message: String,
}

/// Snapshot of a session for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub step: IntakeStep,
    pub selected_symptoms: Vec<String>,
    pub answered: usize,
    pub total_questions: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Manager ─────────────────────────────────────────────────────────

/// Drives the intake flow from greeting to committed record.
pub struct IntakeManager {
    rules: Arc<RuleTable>,
    narrator: Arc<dyn Narrator>,
    sink: Arc<RecordSink>,
    sessions: Arc<SessionRegistry>,
    narration_timeout: Duration,
}

impl IntakeManager {
    pub fn new(
        rules: Arc<RuleTable>,
        narrator: Arc<dyn Narrator>,
        sink: Arc<RecordSink>,
        sessions: Arc<SessionRegistry>,
        narration_timeout: Duration,
    ) -> Self {
        Self {
            rules,
            narrator,
            sink,
            sessions,
            narration_timeout,
        }
    }

    /// Start a new session: narrate the greeting, register the session,
    /// and move it to the details step.
    pub async fn begin(&self) -> BeginResponse {
        let greeting = narrate_or(
            self.narrator.as_ref(),
            self.narration_timeout,
            &greeting_prompt(),
            &greeting_context(),
            FALLBACK_GREETING,
        )
        .await;

        let mut session = IntakeSession::new();
        let id = session.id;
        let _ = session.advance();
        let step = session.step;
        self.sessions.insert(session).await;
        info!(session_id = %id, "Intake session started");

        BeginResponse {
            session_id: id,
            step,
            greeting,
        }
    }

    /// Record the patient's name and email, then open symptom selection.
    pub async fn submit_details(
        &self,
        id: Uuid,
        req: DetailsRequest,
    ) -> Result<DetailsResponse, IntakeError> {
        let handle = self.fetch(id).await?;
        let mut session = handle.lock().await;
        ensure_step(&session, IntakeStep::CollectDetails)?;

        let name = req.name.trim();
        if name.is_empty() {
            return Err(IntakeError::invalid("name", "name must not be empty"));
        }
        let email = req.email.trim();
        if !plausible_email(email) {
            return Err(IntakeError::invalid(
                "email",
                "email address does not look valid",
            ));
        }

        session.details = Some(PatientDetails {
            name: name.to_string(),
            email: email.to_string(),
        });
        let _ = session.advance();
        info!(session_id = %id, "Patient details recorded");

        Ok(DetailsResponse {
            step: session.step,
            symptoms: self.rules.symptom_names(),
        })
    }

    /// Aggregate the follow-up form for the selected symptoms and open the
    /// follow-up step.
    pub async fn select_symptoms(
        &self,
        id: Uuid,
        req: SymptomsRequest,
    ) -> Result<SymptomsResponse, IntakeError> {
        let handle = self.fetch(id).await?;
        let mut session = handle.lock().await;
        ensure_step(&session, IntakeStep::SymptomSelection)?;

        let form = aggregate(&self.rules, &req.symptoms)?;
        debug!(
            session_id = %id,
            symptoms = req.symptoms.len(),
            questions = form.question_count(),
            "Follow-up form aggregated"
        );

        session.selected_symptoms = req.symptoms;
        session.follow_up_form = Some(form.clone());
        let _ = session.advance();

        let intro = narrate_or(
            self.narrator.as_ref(),
            self.narration_timeout,
            &follow_up_intro_prompt(),
            &follow_up_intro_context(&session.selected_symptoms, &form),
            FALLBACK_FOLLOW_UP_INTRO,
        )
        .await;

        Ok(SymptomsResponse {
            step: session.step,
            intro,
            form,
        })
    }

    /// Merge answers into the session; once every form question is covered,
    /// normalize and hand the record to the sink in the background.
    pub async fn submit_answers(
        &self,
        id: Uuid,
        req: AnswersRequest,
    ) -> Result<AnswersResponse, IntakeError> {
        let handle = self.fetch(id).await?;
        let mut session = handle.lock().await;
        ensure_step(&session, IntakeStep::FollowUp)?;

        session.record_answers(req.responses);

        let missing = session.missing_questions();
        if !missing.is_empty() {
            return Err(IntakeError::invalid(
                "responses",
                format!(
                    "{} question(s) still unanswered, starting with {:?}",
                    missing.len(),
                    missing[0]
                ),
            ));
        }

        let record = normalize(&session)?;
        let _ = session.advance();
        info!(session_id = %id, record_id = %record.id, "Intake submitted");

        let record_id = record.id;
        spawn_commit(Arc::clone(&self.sink), record);

        Ok(AnswersResponse {
            step: session.step,
            record_id,
            message: "Thank you. Your intake has been sent to the care team.".to_string(),
        })
    }

    /// Current snapshot of a session. Works at every step, including after
    /// submission.
    pub async fn status(&self, id: Uuid) -> Result<StatusResponse, IntakeError> {
        let handle = self.fetch(id).await?;
        let session = handle.lock().await;

        let total_questions = session
            .follow_up_form
            .as_ref()
            .map(FollowUpForm::question_count)
            .unwrap_or(0);
        let answered = total_questions.saturating_sub(session.missing_questions().len());

        Ok(StatusResponse {
            session_id: session.id,
            step: session.step,
            selected_symptoms: session.selected_symptoms.clone(),
            answered,
            total_questions,
            created_at: session.created_at,
            updated_at: session.updated_at,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<SessionHandle, IntakeError> {
        self.sessions
            .get(id)
            .await
            .ok_or(IntakeError::SessionNotFound { id })
    }
}

/// Reject a request aimed at the wrong step. Submitted sessions report as
/// closed rather than mismatched.
fn ensure_step(session: &IntakeSession, expected: IntakeStep) -> Result<(), IntakeError> {
    if session.step == expected {
        return Ok(());
    }
    if session.step == IntakeStep::Submitted {
        return Err(IntakeError::SessionClosed { id: session.id });
    }
    Err(IntakeError::StepMismatch {
        id: session.id,
        expected: expected.to_string(),
        actual: session.step.to_string(),
    })
}
