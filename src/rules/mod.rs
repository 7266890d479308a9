//! Symptom rules — the static rule table and the form aggregator.
//!
//! The rule table is read once at startup and never mutated; every other
//! component sees it through a shared reference. Aggregation over it is a
//! pure function, so a given symptom selection always produces the same
//! follow-up form.

pub mod aggregate;
pub mod table;

pub use aggregate::{FollowUpForm, FormSection, aggregate};
pub use table::{RuleSection, RuleTable, SymptomRule};
