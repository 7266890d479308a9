//! Outbound notification adapters for committed intake records.
//!
//! Each adapter is configured from environment variables and disabled
//! (not constructed) when its variables are absent. Delivery failures
//! are logged by the sink and never surface to the patient-facing flow.

pub mod email;
pub mod sms;
pub mod telegram;

pub use email::{EmailConfig, EmailNotifier};
pub use sms::TwilioNotifier;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::session::model::IntakeRecord;

/// A delivery target for committed intake records.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short adapter name used in logs.
    fn name(&self) -> &str;

    /// Deliver a committed record to this target.
    async fn deliver(&self, record: &IntakeRecord) -> Result<(), NotifyError>;
}
