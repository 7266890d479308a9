//! Session registry — in-memory store of live intake sessions.
//!
//! Each session sits behind its own async mutex, so the handler serving a
//! request is the single writer for that session. A background sweep task
//! prunes sessions by age.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::model::IntakeSession;
use crate::session::state::IntakeStep;

/// Shared handle to a single session.
pub type SessionHandle = Arc<Mutex<IntakeSession>>;

/// In-memory registry of live sessions keyed by id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    /// Create a new registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Register a session and return its handle.
    pub async fn insert(&self, session: IntakeSession) -> SessionHandle {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        debug!(session_id = %id, "Session registered");
        handle
    }

    /// Look up a session by id.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).map(Arc::clone)
    }

    /// Get the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove a session outright.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drop sessions whose last activity is older than the cutoffs.
    ///
    /// Unfinished sessions expire after `idle_timeout`. Submitted sessions
    /// are kept for `submitted_retention` so a final status poll still
    /// resolves. Sessions currently locked by a request are skipped until
    /// the next sweep. Returns the number of sessions removed.
    pub async fn sweep(&self, idle_timeout: Duration, submitted_retention: Duration) -> usize {
        let now = Utc::now();
        let idle_cutoff =
            chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);
        let retention_cutoff =
            chrono::Duration::from_std(submitted_retention).unwrap_or(chrono::Duration::MAX);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, handle| {
            let Ok(session) = handle.try_lock() else {
                return true;
            };
            let age = now - session.updated_at;
            let expired = if session.step == IntakeStep::Submitted {
                age > retention_cutoff
            } else {
                age > idle_cutoff
            };
            if expired {
                debug!(session_id = %id, step = %session.step, "Session expired");
            }
            !expired
        });

        let removed = before - sessions.len();
        if removed > 0 {
            info!(count = removed, "Swept expired sessions");
        }
        removed
    }
}

/// Spawn a background task that periodically sweeps expired sessions.
pub fn spawn_sweep_task(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    idle_timeout: Duration,
    submitted_retention: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            registry.sweep(idle_timeout, submitted_retention).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);
    const FIVE_MIN: Duration = Duration::from_secs(300);

    fn session_idle_for(minutes: i64) -> IntakeSession {
        let mut session = IntakeSession::new();
        session.updated_at = Utc::now() - chrono::Duration::minutes(minutes);
        session
    }

    #[tokio::test]
    async fn insert_and_get() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let session = IntakeSession::new();
        let id = session.id;
        registry.insert(session).await;

        assert_eq!(registry.len().await, 1);
        let handle = registry.get(id).await.unwrap();
        assert_eq!(handle.lock().await.id, id);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let registry = SessionRegistry::new();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn remove_session() {
        let registry = SessionRegistry::new();
        let session = IntakeSession::new();
        let id = session.id;
        registry.insert(session).await;

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_idle_sessions() {
        let registry = SessionRegistry::new();
        registry.insert(session_idle_for(90)).await;
        registry.insert(session_idle_for(1)).await;

        let removed = registry.sweep(HOUR, FIVE_MIN).await;
        assert_eq!(removed, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_sessions() {
        let registry = SessionRegistry::new();
        registry.insert(session_idle_for(0)).await;

        assert_eq!(registry.sweep(HOUR, FIVE_MIN).await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn submitted_sessions_use_the_shorter_retention() {
        let registry = SessionRegistry::new();
        let mut submitted = session_idle_for(10);
        submitted.step = IntakeStep::Submitted;
        registry.insert(submitted).await;

        // 10 minutes idle: under the hour idle cutoff, over the 5 minute retention
        let removed = registry.sweep(HOUR, FIVE_MIN).await;
        assert_eq!(removed, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_skips_locked_sessions() {
        let registry = SessionRegistry::new();
        let session = session_idle_for(90);
        let id = session.id;
        let handle = registry.insert(session).await;

        let guard = handle.lock().await;
        assert_eq!(registry.sweep(HOUR, FIVE_MIN).await, 0);
        assert!(registry.get(id).await.is_some());
        drop(guard);

        assert_eq!(registry.sweep(HOUR, FIVE_MIN).await, 1);
        assert!(registry.get(id).await.is_none());
    }
}
