//! Unified `Database` trait — single async interface for persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::session::model::IntakeRecord;

/// Backend-agnostic database trait covering intake records.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Insert a completed intake record.
    async fn insert_record(&self, record: &IntakeRecord) -> Result<(), DatabaseError>;

    /// Get a record by ID.
    async fn get_record(&self, id: Uuid) -> Result<Option<IntakeRecord>, DatabaseError>;

    /// List records, most recently submitted first.
    async fn list_records(&self, limit: usize) -> Result<Vec<IntakeRecord>, DatabaseError>;
}
