//! Narration prompts and fixed fallbacks for the patient-facing flow.
//!
//! Every narrated moment pairs a prompt with a literal fallback shown when
//! the narrator is disabled, slow, or failing. Fallbacks are complete
//! sentences a patient can act on without the narrated version.

use crate::rules::FollowUpForm;

/// Shown when the greeting narration is unavailable.
pub const FALLBACK_GREETING: &str = "Welcome to the clinic's online intake. I'll collect a few \
     details and some questions about your symptoms so the care team can prepare for your visit. \
     To start, please enter your name and email address.";

/// Shown when the follow-up intro narration is unavailable.
pub const FALLBACK_FOLLOW_UP_INTRO: &str = "Thanks. Based on the symptoms you selected, please \
     answer the follow-up questions below. You can leave a question blank if it doesn't apply.";

/// System prompt for the opening greeting.
pub fn greeting_prompt() -> String {
    "You are the front-desk assistant for a medical clinic's online intake form.

Write a short, warm greeting for a patient who just opened the form.
Guidelines:
- 2-3 sentences in plain language. No medical jargon.
- Explain that you'll collect a few details and some symptom questions so the care team can prepare.
- Close by asking for their name and email address.
- Never invent clinic names, wait times, or medical advice."
        .to_string()
}

/// Context for the greeting call.
pub fn greeting_context() -> String {
    "A patient has just started a new intake session.".to_string()
}

/// System prompt for the follow-up question intro.
pub fn follow_up_intro_prompt() -> String {
    "You are the front-desk assistant for a medical clinic's online intake form.

The patient has picked their symptoms and is about to answer follow-up questions.
Write 1-2 sentences introducing the question form.
Guidelines:
- Acknowledge the selected symptoms without diagnosing or alarming.
- Encourage complete answers, and mention that a question can be left blank if it doesn't apply.
- Never give medical advice."
        .to_string()
}

/// Context naming the selected symptoms and the size of the form.
pub fn follow_up_intro_context(symptoms: &[String], form: &FollowUpForm) -> String {
    format!(
        "Selected symptoms: {}. The form has {} follow-up question(s) across {} section(s).",
        symptoms.join(", "),
        form.question_count(),
        form.sections.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FormSection;

    #[test]
    fn greeting_prompt_asks_for_contact_details() {
        let prompt = greeting_prompt();
        assert!(prompt.contains("name"));
        assert!(prompt.contains("email"));
        assert!(prompt.contains("medical advice"));
    }

    #[test]
    fn follow_up_context_lists_symptoms_and_counts() {
        let form = FollowUpForm {
            sections: vec![FormSection {
                name: "Cardiac History".into(),
                questions: vec!["Pain duration?".into(), "Pain triggers?".into()],
            }],
        };
        let context =
            follow_up_intro_context(&["Chest Pain".to_string(), "Dizziness".to_string()], &form);
        assert!(context.contains("Chest Pain, Dizziness"));
        assert!(context.contains("2 follow-up question(s)"));
        assert!(context.contains("1 section(s)"));
    }

    #[test]
    fn fallbacks_are_patient_ready() {
        assert!(!FALLBACK_GREETING.is_empty());
        assert!(!FALLBACK_FOLLOW_UP_INTRO.is_empty());
        // Fallbacks go out unescaped, so they must carry no markup
        for fallback in [FALLBACK_GREETING, FALLBACK_FOLLOW_UP_INTRO] {
            assert!(!fallback.contains('<'));
            assert!(!fallback.contains('&'));
        }
    }
}
