//! Record sink — persists committed records and fans out notifications.
//!
//! The database write is authoritative. Notifier failures are logged per
//! adapter and swallowed, so a dead Telegram token or SMTP outage never
//! reaches the patient-facing flow.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::notify::Notifier;
use crate::session::model::IntakeRecord;
use crate::store::Database;

/// Commits finished intake records: database insert, then notifier fan-out.
pub struct RecordSink {
    db: Arc<dyn Database>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl RecordSink {
    pub fn new(db: Arc<dyn Database>, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { db, notifiers }
    }

    /// Persist a record and notify every configured target.
    pub async fn commit(&self, record: &IntakeRecord) -> Result<(), DatabaseError> {
        self.db.insert_record(record).await?;
        info!(record_id = %record.id, "Intake record committed");

        let deliveries = self.notifiers.iter().map(|n| {
            let n = Arc::clone(n);
            async move { (n.name().to_string(), n.deliver(record).await) }
        });

        for (name, result) in futures::future::join_all(deliveries).await {
            match result {
                Ok(()) => {
                    debug!(notifier = %name, record_id = %record.id, "Notification delivered");
                }
                Err(e) => {
                    warn!(notifier = %name, record_id = %record.id, "Notification failed: {e}");
                }
            }
        }

        Ok(())
    }
}

/// Spawn a background commit so the caller never waits on delivery.
pub fn spawn_commit(sink: Arc<RecordSink>, record: IntakeRecord) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.commit(&record).await {
            tracing::error!(record_id = %record.id, "Failed to commit intake record: {e}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::session::model::ResponseEntry;
    use crate::store::LibSqlBackend;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct CountingNotifier {
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&self, _record: &IntakeRecord) -> Result<(), NotifyError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _record: &IntakeRecord) -> Result<(), NotifyError> {
            Err(NotifyError::SendFailed {
                name: "failing".into(),
                reason: "always fails".into(),
            })
        }
    }

    fn sample_record() -> IntakeRecord {
        IntakeRecord {
            id: Uuid::new_v4(),
            patient_name: "Alice".into(),
            patient_email: "alice@example.com".into(),
            symptoms: vec!["Headache".into()],
            responses: vec![ResponseEntry {
                question: "How long?".into(),
                answer: "two days".into(),
            }],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn commit_persists_and_notifies() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let counting = Arc::new(CountingNotifier {
            delivered: AtomicUsize::new(0),
        });
        let sink = RecordSink::new(
            Arc::clone(&db),
            vec![Arc::clone(&counting) as Arc<dyn Notifier>],
        );

        let record = sample_record();
        sink.commit(&record).await.unwrap();

        assert!(db.get_record(record.id).await.unwrap().is_some());
        assert_eq!(counting.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_notifier_does_not_fail_commit() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sink = RecordSink::new(Arc::clone(&db), vec![Arc::new(FailingNotifier)]);

        let record = sample_record();
        sink.commit(&record).await.unwrap();
        assert!(db.get_record(record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_commit_reports_database_error() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sink = RecordSink::new(Arc::clone(&db), vec![]);

        let record = sample_record();
        sink.commit(&record).await.unwrap();
        assert!(sink.commit(&record).await.is_err());
    }

    #[tokio::test]
    async fn spawn_commit_completes_in_background() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sink = Arc::new(RecordSink::new(Arc::clone(&db), vec![]));

        let record = sample_record();
        let id = record.id;
        spawn_commit(sink, record).await.unwrap();

        assert!(db.get_record(id).await.unwrap().is_some());
    }
}
