//! Per-browser-session registry.
//!
//! Each session owns one `SessionController` behind an async mutex. A request
//! that finds the mutex held is answered with `Busy` instead of waiting, and
//! turns run on their own task so a dropped HTTP request never leaves a
//! controller half way through a turn.
//!
//! Sessions that see no request for `SessionLimits::idle_ttl` are dropped by
//! `evict_idle`, closing their database connection.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dbchat_core::gateway::{ConnectionCredentials, ConnectionSummary, DatabaseGateway};
use dbchat_core::llm::LlmClient;
use dbchat_core::session::{SessionController, SessionOptions, SessionState, TurnOutcome};
use dbchat_core::sql_policy::SqlPolicy;
use dbchat_core::{ConversationTurn, SessionError, Transcript};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::SessionSnapshot;

pub struct SessionEntry {
    id: Uuid,
    created_at: DateTime<Utc>,
    controller: Arc<Mutex<SessionController>>,
    /// Snapshot taken when the controller was last locked, served while
    /// the lock is held.
    in_flight: RwLock<Option<SessionSnapshot>>,
    last_active: RwLock<Instant>,
}

impl SessionEntry {
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&self) {
        *write_lock(&self.last_active) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        read_lock(&self.last_active).elapsed()
    }

    /// Current view of the session. While a turn holds the controller the
    /// snapshot recorded when it started is returned.
    pub fn snapshot(&self) -> SessionSnapshot {
        match self.controller.try_lock() {
            Ok(controller) => self.snapshot_of(&controller, controller.state()),
            Err(_) => match read_lock(&self.in_flight).clone() {
                Some(snapshot) => snapshot,
                None => SessionSnapshot {
                    id: self.id,
                    created_at: self.created_at,
                    state: SessionState::AwaitingSql,
                    connection: None,
                    transcript: Transcript::new(),
                },
            },
        }
    }

    pub async fn connect(
        self: &Arc<Self>,
        credentials: ConnectionCredentials,
    ) -> ApiResult<ConnectionSummary> {
        let mut controller = self.acquire()?;
        *write_lock(&self.in_flight) = Some(self.snapshot_of(&controller, controller.state()));

        let task = tokio::spawn(async move { controller.connect(&credentials).await });
        let summary = join(task).await;
        self.touch();
        let summary = summary??;
        tracing::info!(session = %self.id, database = %summary.database, "Session connected");
        Ok(summary)
    }

    pub async fn send_message(
        self: &Arc<Self>,
        content: String,
    ) -> ApiResult<(TurnOutcome, Transcript)> {
        let mut controller = self.acquire()?;
        if controller.state() == SessionState::Disconnected {
            return Err(SessionError::NotConnected.into());
        }

        let mut pending = self.snapshot_of(&controller, SessionState::AwaitingSql);
        pending
            .transcript
            .push(ConversationTurn::human(content.as_str()));
        *write_lock(&self.in_flight) = Some(pending);

        let task = tokio::spawn(async move {
            let result = controller.send_message(&content).await;
            result.map(|outcome| (outcome, controller.transcript().clone()))
        });

        let finished = join(task).await;
        self.touch();
        match finished? {
            Ok(done) => Ok(done),
            Err(e) => {
                tracing::warn!(session = %self.id, code = e.code(), "Turn failed: {}", e);
                Err(e.into())
            }
        }
    }

    fn acquire(&self) -> Result<OwnedMutexGuard<SessionController>, SessionError> {
        Arc::clone(&self.controller)
            .try_lock_owned()
            .map_err(|_| SessionError::Busy)
    }

    fn snapshot_of(&self, controller: &SessionController, state: SessionState) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            state,
            connection: controller.connection(),
            transcript: controller.transcript().clone(),
        }
    }
}

async fn join<T>(task: tokio::task::JoinHandle<T>) -> ApiResult<T> {
    task.await
        .map_err(|e| ApiError::Internal(format!("Session task failed: {}", e)))
}

#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

/// Builds controllers with shared collaborators and tracks them by id.
pub struct SessionRegistry {
    gateway: Arc<dyn DatabaseGateway>,
    llm: Arc<dyn LlmClient>,
    sql_policy: Arc<dyn SqlPolicy>,
    options: SessionOptions,
    limits: SessionLimits,
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new(
        gateway: Arc<dyn DatabaseGateway>,
        llm: Arc<dyn LlmClient>,
        sql_policy: Arc<dyn SqlPolicy>,
        options: SessionOptions,
        limits: SessionLimits,
    ) -> Self {
        Self {
            gateway,
            llm,
            sql_policy,
            options,
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Fails with `Unavailable` once `max_sessions` live sessions exist and
    /// none of them is idle.
    pub fn create(&self) -> ApiResult<Arc<SessionEntry>> {
        if self.len() >= self.limits.max_sessions {
            self.evict_idle();
            if self.len() >= self.limits.max_sessions {
                tracing::warn!(max = self.limits.max_sessions, "Session limit reached");
                return Err(ApiError::Unavailable(
                    "Too many open sessions, try again later".to_string(),
                ));
            }
        }

        let controller = SessionController::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.llm),
            self.options.clone(),
        )
        .with_sql_policy(Arc::clone(&self.sql_policy));

        let entry = Arc::new(SessionEntry {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            controller: Arc::new(Mutex::new(controller)),
            in_flight: RwLock::new(None),
            last_active: RwLock::new(Instant::now()),
        });
        write_lock(&self.sessions).insert(entry.id, Arc::clone(&entry));
        tracing::info!(session = %entry.id, "Session created");
        Ok(entry)
    }

    /// Look up a session and mark it active.
    pub fn get(&self, id: Uuid) -> ApiResult<Arc<SessionEntry>> {
        let entry = read_lock(&self.sessions)
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))?;
        entry.touch();
        Ok(entry)
    }

    /// Drop sessions idle for at least `idle_ttl`. Sessions with a turn or
    /// connect in flight are kept. Returns how many were dropped.
    pub fn evict_idle(&self) -> usize {
        let idle_ttl = self.limits.idle_ttl;
        let mut sessions = write_lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let expired = entry.idle_for() >= idle_ttl && entry.controller.try_lock().is_ok();
            if expired {
                tracing::info!(session = %id, "Session expired");
            }
            !expired
        });
        before - sessions.len()
    }

    /// Forget the session. A turn still running finishes on its task and the
    /// database handle is released with the controller.
    pub fn remove(&self, id: Uuid) -> ApiResult<()> {
        match write_lock(&self.sessions).remove(&id) {
            Some(_) => {
                tracing::info!(session = %id, "Session removed");
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("Session {} not found", id))),
        }
    }

    pub fn len(&self) -> usize {
        read_lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.sessions).is_empty()
    }

    pub fn sql_policy_name(&self) -> &'static str {
        self.sql_policy.name()
    }

    pub fn llm_label(&self) -> String {
        self.llm.describe()
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbchat_ai::FakeLlmClient;
    use dbchat_core::sql_policy::TrustGeneratedSql;
    use dbchat_storage_sql::SqlGateway;

    fn registry(idle_ttl: Duration, max_sessions: usize) -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(SqlGateway::default()),
            Arc::new(FakeLlmClient::new()),
            Arc::new(TrustGeneratedSql),
            SessionOptions::default(),
            SessionLimits {
                idle_ttl,
                max_sessions,
            },
        )
    }

    #[tokio::test]
    async fn test_idle_session_is_evicted_with_its_connection() {
        let registry = registry(Duration::ZERO, 10);
        let entry = registry.create().unwrap();
        let id = entry.id();
        entry
            .connect(ConnectionCredentials::sqlite(":memory:"))
            .await
            .unwrap();
        assert!(entry.snapshot().connection.is_some());

        let released = Arc::downgrade(&entry);
        drop(entry);

        assert_eq!(registry.evict_idle(), 1);
        assert!(released.upgrade().is_none());
        assert!(matches!(registry.get(id), Err(ApiError::NotFound(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_recently_used_session_is_kept() {
        let registry = registry(Duration::from_secs(3600), 10);
        let entry = registry.create().unwrap();

        assert_eq!(registry.evict_idle(), 0);
        assert!(registry.get(entry.id()).is_ok());
    }

    #[test]
    fn test_session_with_work_in_flight_is_kept() {
        let registry = registry(Duration::ZERO, 10);
        let entry = registry.create().unwrap();
        let _turn = Arc::clone(&entry.controller).try_lock_owned().unwrap();

        assert_eq!(registry.evict_idle(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_session_limit() {
        let full = registry(Duration::from_secs(3600), 1);
        full.create().unwrap();
        assert!(matches!(full.create(), Err(ApiError::Unavailable(_))));
        assert_eq!(full.len(), 1);

        // Idle sessions make room for new ones.
        let recycling = registry(Duration::ZERO, 1);
        let first = recycling.create().unwrap().id();
        let second = recycling.create().unwrap().id();
        assert_ne!(first, second);
        assert!(recycling.get(first).is_err());
        assert!(recycling.get(second).is_ok());
    }
}
