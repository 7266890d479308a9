//! Intake session and record data models.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::FollowUpForm;
use crate::session::state::IntakeStep;

/// Patient identity collected in the details step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub name: String,
    pub email: String,
}

/// One intake conversation. Owned exclusively by its session lock; all
/// mutation goes through the manager's transition operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeSession {
    pub id: Uuid,
    pub step: IntakeStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PatientDetails>,
    /// Symptoms as submitted, caller order.
    pub selected_symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_form: Option<FollowUpForm>,
    /// Raw answers keyed by question text. May hold keys outside the form;
    /// the normalizer projects onto the form's question set.
    pub responses: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntakeSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            step: IntakeStep::default(),
            details: None,
            selected_symptoms: Vec::new(),
            follow_up_form: None,
            responses: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to the next step in the linear progression. Returns `None` at
    /// the terminal step.
    pub fn advance(&mut self) -> Option<IntakeStep> {
        let next = self.step.next()?;
        self.step = next;
        self.touch();
        Some(next)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Merge a batch of answers into the session. Later submissions
    /// overwrite earlier answers for the same question.
    pub fn record_answers(&mut self, answers: HashMap<String, String>) {
        self.responses.extend(answers);
        self.touch();
    }

    /// Form questions with no recorded answer key, in presentation order.
    /// An empty-string answer counts as recorded (it becomes the sentinel
    /// at normalization).
    pub fn missing_questions(&self) -> Vec<String> {
        let Some(form) = &self.follow_up_form else {
            return Vec::new();
        };
        form.questions()
            .filter(|q| !self.responses.contains_key(*q))
            .map(String::from)
            .collect()
    }
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Light syntactic plausibility check, not RFC validation: one `@` with a
/// non-empty local part and a dotted domain.
pub fn plausible_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    re.is_match(email)
}

/// One normalized question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub question: String,
    pub answer: String,
}

/// The canonical submission record handed to the sink. Answers are raw
/// patient text (or the not-answered sentinel); markup escaping happens in
/// the notification renderings, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    /// Matches the originating session id.
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub symptoms: Vec<String>,
    /// Question/answer pairs in form presentation order. The question set
    /// is exactly the aggregated form's question set.
    pub responses: Vec<ResponseEntry>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl IntakeRecord {
    pub fn answer(&self, question: &str) -> Option<&str> {
        self.responses
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.answer.as_str())
    }
}
