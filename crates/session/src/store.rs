use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::session::Session;

/// Per-key session lifecycle (§4.4, §5 concurrency model).
///
/// Each session is independently guarded by a [`tokio::sync::Mutex`] so one
/// request holds its session lock for the full duration of evaluation
/// (including `srai` recursion) while unrelated sessions proceed
/// concurrently. The map itself is behind a short-lived `std::sync::Mutex`
/// covering only lookup/insert/destroy, per spec.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<AsyncMutex<Session>>> {
        self.sessions.lock().expect("session map poisoned").get(id).cloned()
    }

    pub fn get_or_create(&self, id: &str) -> Arc<AsyncMutex<Session>> {
        self.get_or_create_with_bound(id, crate::session::DEFAULT_HISTORY_BOUND)
    }

    /// As [`Self::get_or_create`], but a freshly-created session uses
    /// `history_bound` instead of the default (§3, §4.4 — the bound is a
    /// configured engine tunable, not a hardcoded constant). Has no effect
    /// on a session that already exists.
    pub fn get_or_create_with_bound(&self, id: &str, history_bound: usize) -> Arc<AsyncMutex<Session>> {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session = id, "session created");
                Arc::new(AsyncMutex::new(Session::new(id).with_history_bound(history_bound)))
            })
            .clone()
    }

    /// Create a session with a fresh random identifier, for callers (like
    /// the Telegram bridge) that don't have a natural session key.
    pub fn create_anonymous(&self) -> Arc<AsyncMutex<Session>> {
        let id = uuid::Uuid::new_v4().to_string();
        self.get_or_create(&id)
    }

    pub fn destroy(&self, id: &str) -> bool {
        let removed = self.sessions.lock().expect("session map poisoned").remove(id).is_some();
        if removed {
            info!(session = id, "session destroyed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
