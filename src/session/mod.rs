//! Intake session flow — state machine, registry, manager, and REST routes.
//!
//! A session walks a patient through four steps: greeting, contact details,
//! symptom selection, and follow-up questions. The flow is strictly linear
//! and ends with a committed intake record.

pub mod manager;
pub mod model;
pub mod prompts;
pub mod registry;
pub mod routes;
pub mod state;

pub use manager::IntakeManager;
pub use model::{IntakeRecord, IntakeSession, PatientDetails, ResponseEntry};
pub use registry::{SessionRegistry, spawn_sweep_task};
pub use routes::{ApiState, intake_routes};
pub use state::IntakeStep;
