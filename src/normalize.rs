//! Submission normalization and record renderings.
//!
//! `normalize` turns a completed session into the canonical `IntakeRecord`:
//! every question of the aggregated form appears exactly once, unanswered or
//! blank questions carry the `NOT_ANSWERED` sentinel, and answer text is
//! stored raw. Markup escaping happens only in the renderings used by
//! notification channels, never in the stored record.

use chrono::Utc;

use crate::error::IntakeError;
use crate::session::model::{IntakeRecord, IntakeSession, ResponseEntry};

/// Sentinel stored for questions the patient left blank or never answered.
pub const NOT_ANSWERED: &str = "Not Answered";

/// Builds the canonical record for a session that has finished the
/// follow-up step.
///
/// The record's question set is exactly the form's question set, in form
/// order: answers for questions outside the form are dropped, and questions
/// without a usable answer get the sentinel. A session without collected
/// details or an aggregated form cannot be normalized; the caller keeps the
/// session where it is and reports the error.
pub fn normalize(session: &IntakeSession) -> Result<IntakeRecord, IntakeError> {
    let details = session
        .details
        .as_ref()
        .ok_or_else(|| IntakeError::invalid("details", "patient details have not been collected"))?;
    let form = session
        .follow_up_form
        .as_ref()
        .ok_or_else(|| IntakeError::invalid("form", "no follow-up form has been generated"))?;

    let responses = form
        .questions()
        .map(|question| {
            let answer = match session.responses.get(question) {
                Some(raw) if !raw.trim().is_empty() => raw.clone(),
                _ => NOT_ANSWERED.to_string(),
            };
            ResponseEntry {
                question: question.to_string(),
                answer,
            }
        })
        .collect();

    Ok(IntakeRecord {
        id: session.id,
        patient_name: details.name.clone(),
        patient_email: details.email.clone(),
        symptoms: session.selected_symptoms.clone(),
        responses,
        created_at: Utc::now(),
    })
}

/// Escapes `&`, `<` and `>` for markup-formatted renderings.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML rendering for markup-capable channels. All record text is escaped.
pub fn render_html(record: &IntakeRecord) -> String {
    let mut lines = vec![
        "<b>New intake submission</b>".to_string(),
        format!(
            "<b>Patient:</b> {} ({})",
            escape_markup(&record.patient_name),
            escape_markup(&record.patient_email)
        ),
        format!(
            "<b>Symptoms:</b> {}",
            escape_markup(&record.symptoms.join(", "))
        ),
    ];
    for entry in &record.responses {
        lines.push(format!(
            "<b>{}</b> {}",
            escape_markup(&entry.question),
            escape_markup(&entry.answer)
        ));
    }
    lines.push(format!(
        "Ref {} · {}",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.join("\n")
}

/// Plain-text rendering for channels without markup. Text stays raw.
pub fn render_text(record: &IntakeRecord) -> String {
    let mut lines = vec![
        "New intake submission".to_string(),
        format!(
            "Patient: {} ({})",
            record.patient_name, record.patient_email
        ),
        format!("Symptoms: {}", record.symptoms.join(", ")),
    ];
    for entry in &record.responses {
        lines.push(format!("{} {}", entry.question, entry.answer));
    }
    lines.push(format!(
        "Ref {} · {}",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::rules::{FollowUpForm, FormSection};
    use crate::session::model::PatientDetails;

    fn ready_session() -> IntakeSession {
        let mut session = IntakeSession::new();
        session.details = Some(PatientDetails {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        });
        session.selected_symptoms = vec!["Chest Pain".into()];
        session.follow_up_form = Some(FollowUpForm {
            sections: vec![FormSection {
                name: "Cardiac History".into(),
                questions: vec![
                    "Pain duration?".into(),
                    "Pain triggers?".into(),
                    "At rest or exertion?".into(),
                ],
            }],
        });
        session
    }

    #[test]
    fn blank_answer_becomes_sentinel() {
        let mut session = ready_session();
        session.record_answers(HashMap::from([
            ("Pain duration?".to_string(), String::new()),
            ("Pain triggers?".to_string(), "stairs".to_string()),
            ("At rest or exertion?".to_string(), "   ".to_string()),
        ]));

        let record = normalize(&session).unwrap();
        assert_eq!(record.answer("Pain duration?"), Some(NOT_ANSWERED));
        assert_eq!(record.answer("Pain triggers?"), Some("stairs"));
        assert_eq!(record.answer("At rest or exertion?"), Some(NOT_ANSWERED));
    }

    #[test]
    fn absent_answer_becomes_sentinel() {
        let session = ready_session();
        let record = normalize(&session).unwrap();
        assert!(record.responses.iter().all(|e| e.answer == NOT_ANSWERED));
    }

    #[test]
    fn record_questions_match_form_exactly_and_in_order() {
        let mut session = ready_session();
        session.record_answers(HashMap::from([
            ("Pain duration?".to_string(), "two days".to_string()),
            // Not a form question; must not reach the record
            ("Favorite color?".to_string(), "green".to_string()),
        ]));

        let record = normalize(&session).unwrap();
        let questions: Vec<&str> = record.responses.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(
            questions,
            vec!["Pain duration?", "Pain triggers?", "At rest or exertion?"]
        );
        assert_eq!(record.answer("Favorite color?"), None);
    }

    #[test]
    fn record_keeps_raw_answer_text() {
        let mut session = ready_session();
        session.record_answers(HashMap::from([(
            "Pain duration?".to_string(),
            "worse when <lying down> & standing".to_string(),
        )]));

        let record = normalize(&session).unwrap();
        assert_eq!(
            record.answer("Pain duration?"),
            Some("worse when <lying down> & standing")
        );
    }

    #[test]
    fn normalize_requires_details_and_form() {
        let mut session = IntakeSession::new();
        assert!(matches!(
            normalize(&session),
            Err(IntakeError::InvalidRequest { .. })
        ));

        session.details = Some(PatientDetails {
            name: "Bob".into(),
            email: "bob@example.com".into(),
        });
        let err = normalize(&session).unwrap_err();
        match err {
            IntakeError::InvalidRequest { field, .. } => assert_eq!(field, "form"),
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn escape_markup_escapes_the_three_metacharacters() {
        assert_eq!(
            escape_markup("a < b & c > d"),
            "a &lt; b &amp; c &gt; d"
        );
        assert_eq!(escape_markup("plain text"), "plain text");
        assert_eq!(escape_markup("&&"), "&amp;&amp;");
    }

    #[test]
    fn html_rendering_escapes_record_text() {
        let mut session = ready_session();
        session.record_answers(HashMap::from([(
            "Pain duration?".to_string(),
            "<2 days & nights>".to_string(),
        )]));
        let record = normalize(&session).unwrap();

        let html = render_html(&record);
        assert!(html.contains("&lt;2 days &amp; nights&gt;"));
        assert!(!html.contains("<2 days"));
        assert!(html.contains("<b>Pain duration?</b>"));
    }

    #[test]
    fn text_rendering_keeps_raw_text() {
        let mut session = ready_session();
        session.record_answers(HashMap::from([(
            "Pain duration?".to_string(),
            "<2 days & nights>".to_string(),
        )]));
        let record = normalize(&session).unwrap();

        let text = render_text(&record);
        assert!(text.contains("<2 days & nights>"));
        assert!(!text.contains("&lt;"));
        assert!(text.contains("Alice (alice@example.com)"));
    }
}
