//! Intake state machine — tracks which step a session is in.

use serde::{Deserialize, Serialize};

/// The steps of the intake conversation.
///
/// Progresses linearly: Greeting → CollectDetails → SymptomSelection →
/// FollowUp → Submitted. Submitted is terminal; a submitted session only
/// ever answers that it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    Greeting,
    CollectDetails,
    SymptomSelection,
    FollowUp,
    Submitted,
}

impl IntakeStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: IntakeStep) -> bool {
        use IntakeStep::*;
        matches!(
            (self, target),
            (Greeting, CollectDetails)
                | (CollectDetails, SymptomSelection)
                | (SymptomSelection, FollowUp)
                | (FollowUp, Submitted)
        )
    }

    /// Whether this step is terminal (the intake is submitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<IntakeStep> {
        use IntakeStep::*;
        match self {
            Greeting => Some(CollectDetails),
            CollectDetails => Some(SymptomSelection),
            SymptomSelection => Some(FollowUp),
            FollowUp => Some(Submitted),
            Submitted => None,
        }
    }
}

impl Default for IntakeStep {
    fn default() -> Self {
        Self::Greeting
    }
}

impl std::fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::CollectDetails => "collect_details",
            Self::SymptomSelection => "symptom_selection",
            Self::FollowUp => "follow_up",
            Self::Submitted => "submitted",
        };
        write!(f, "{s}")
    }
}
