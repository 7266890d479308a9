//! Clinic Intake — patient intake questionnaire service.

pub mod config;
pub mod error;
pub mod narration;
pub mod normalize;
pub mod notify;
pub mod rules;
pub mod session;
pub mod sink;
pub mod store;
