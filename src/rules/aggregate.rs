//! Follow-up question aggregation.
//!
//! Turns a selected symptom list into a single ordered form: sections appear
//! in the order a selected symptom first contributes them, questions keep
//! first-occurrence order within their section, and symptoms without a rule
//! contribute nothing. The function is pure over the rule table, so equal
//! selections always produce equal forms.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IntakeError;
use crate::rules::table::RuleTable;

/// One section of the aggregated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSection {
    pub name: String,
    pub questions: Vec<String>,
}

/// The aggregated follow-up form presented to the patient.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowUpForm {
    pub sections: Vec<FormSection>,
}

impl FollowUpForm {
    /// All questions in presentation order (section order, then question
    /// order within the section).
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter().map(String::as_str))
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.questions.is_empty())
    }
}

/// Builds the follow-up form for a symptom selection.
///
/// An empty selection is rejected; unknown symptoms are silently skipped, so
/// a selection of only unknown symptoms yields an empty form, not an error.
/// Within a section, a question contributed by several symptoms appears once,
/// at the position of its first contribution.
pub fn aggregate(table: &RuleTable, selected: &[String]) -> Result<FollowUpForm, IntakeError> {
    if selected.is_empty() {
        return Err(IntakeError::invalid(
            "symptoms",
            "select at least one symptom",
        ));
    }

    let mut form = FollowUpForm::default();
    for symptom in selected {
        let Some(rule) = table.lookup(symptom) else {
            debug!(symptom = %symptom, "No rule for selected symptom, skipping");
            continue;
        };
        for section in &rule.sections {
            let pos = match form.sections.iter().position(|s| s.name == section.name) {
                Some(pos) => pos,
                None => {
                    form.sections.push(FormSection {
                        name: section.name.clone(),
                        questions: Vec::new(),
                    });
                    form.sections.len() - 1
                }
            };
            let target = &mut form.sections[pos];
            for question in &section.questions {
                if !target.questions.iter().any(|q| q == question) {
                    target.questions.push(question.clone());
                }
            }
        }
    }
    Ok(form)
}
