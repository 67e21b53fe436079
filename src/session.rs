//! Per-visitor session contexts and their lifecycle

use crate::dataset::feature_columns;
use crate::history::HistoryStore;
use crate::metrics::DashboardMetrics;
use crate::types::patient::PatientRecord;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use tracing::{debug, info};
use uuid::Uuid;

/// Cosmetic colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// The two navigation pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Prediction,
    About,
}

/// Everything one visitor accumulates between requests
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: Uuid,
    pub theme: Theme,
    pub page: Page,
    /// Column shown in the distribution chart
    pub histogram_feature: &'static str,
    /// Last submitted form values, used to prefill the form
    pub form: PatientRecord,
    pub history: HistoryStore,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            theme: Theme::default(),
            page: Page::default(),
            histogram_feature: feature_columns()[0],
            form: PatientRecord::default(),
            history: HistoryStore::new(),
            created_at: now,
            last_seen: now,
        }
    }

    /// Select the histogram column; unknown names are ignored
    pub fn select_feature(&mut self, name: &str) -> bool {
        match feature_columns().iter().find(|c| **c == name) {
            Some(column) => {
                self.histogram_feature = *column;
                true
            }
            None => false,
        }
    }

    fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_seen
    }
}

/// Shared handle to one session; its lock serializes that session's events
pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// Owns all live sessions.
///
/// A session is created on first visit, and destroyed either explicitly or
/// by [`SessionStore::sweep_idle`]. The store lock only guards the map; each
/// session has its own lock, so sessions are served independently.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    idle_timeout: Duration,
    metrics: Arc<DashboardMetrics>,
}

impl SessionStore {
    pub fn new(idle_timeout_secs: u64, metrics: Arc<DashboardMetrics>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: Duration::seconds(idle_timeout_secs as i64),
            metrics,
        }
    }

    /// Handle for the session `id`, creating a fresh session when `id` is
    /// absent or unknown. Returns the session id actually used.
    pub fn checkout(&self, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        if let Some(id) = id {
            let sessions = match self.sessions.read() {
                Ok(sessions) => sessions,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(handle) = sessions.get(&id) {
                return (id, handle.clone());
            }
        }

        let mut sessions = match self.sessions.write() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = match id {
            Some(id) if sessions.contains_key(&id) => id,
            _ => Uuid::new_v4(),
        };
        let handle = sessions.entry(id).or_insert_with(|| {
            self.metrics.record_session_started();
            info!(session = %id, "Session started");
            Arc::new(Mutex::new(SessionContext::new(id)))
        });
        (id, handle.clone())
    }

    /// Run `f` against the session for `id` (see [`SessionStore::checkout`]).
    ///
    /// Only that session is locked while `f` runs.
    pub fn with_session<T>(
        &self,
        id: Option<Uuid>,
        f: impl FnOnce(&mut SessionContext) -> T,
    ) -> (Uuid, T) {
        let (id, handle) = self.checkout(id);
        let mut session = match handle.lock() {
            Ok(session) => session,
            Err(poisoned) => poisoned.into_inner(),
        };
        session.touch();
        let result = f(&mut *session);
        session.touch();
        (id, result)
    }

    /// Destroy a session. Returns whether it existed.
    pub fn end(&self, id: Uuid) -> bool {
        let removed = match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(&id).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(&id).is_some(),
        };
        if removed {
            self.metrics.record_sessions_ended(1);
            info!(session = %id, "Session ended");
        }
        removed
    }

    /// Drop sessions idle for longer than the timeout; returns how many
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Utc::now())
    }

    fn sweep_idle_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = match self.sessions.write() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = sessions.len();
        // A session busy with an event is not idle
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.idle_for(now) <= self.idle_timeout,
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().idle_for(now) <= self.idle_timeout
            }
            Err(TryLockError::WouldBlock) => true,
        });
        let removed = before - sessions.len();

        if removed > 0 {
            self.metrics.record_sessions_ended(removed as u64);
            info!(removed, remaining = sessions.len(), "Expired idle sessions");
        } else {
            debug!(active = sessions.len(), "No idle sessions to expire");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodically expire idle sessions
    pub async fn run_sweeper(self: Arc<Self>, interval_secs: u64) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            self.sweep_idle();
        }
    }
}
