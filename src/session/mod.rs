// src/session/mod.rs — Process-wide session store
//
// Sessions are owned exclusively by this store and live only for the
// process lifetime. Expiry is opportunistic: a cleanup pass runs when the
// store grows past a threshold, not on a timer.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::agent::Agent;
use crate::infra::config::SessionConfig;
use crate::provider::Message;

pub struct Session {
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Bound at creation so tool wiring and model config are fixed for
    /// the session's lifetime.
    pub agent: Arc<Agent>,
}

impl Session {
    fn new(agent: Arc<Agent>) -> Self {
        let now = Utc::now();
        Self {
            history: Vec::new(),
            created_at: now,
            last_active: now,
            agent,
        }
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    max_history: usize,
    idle_timeout: Duration,
    cleanup_threshold: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_history: config.max_history,
            idle_timeout: Duration::seconds(config.idle_timeout_seconds),
            cleanup_threshold: config.cleanup_threshold,
        }
    }

    /// Fetch the session for `key`, creating it (with a freshly bound
    /// agent) on first sight. Creation is first-writer-wins: it happens
    /// under the store lock, so a concurrent first request for the same
    /// key reuses the winner's session.
    ///
    /// Returns the agent handle and a history snapshot so no lock is held
    /// across the LLM round-trip.
    pub fn get_or_create(
        &self,
        key: &str,
        make_agent: impl FnOnce() -> Agent,
    ) -> (Arc<Agent>, Vec<Message>) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if sessions.len() > self.cleanup_threshold {
            let removed = Self::purge_idle(&mut sessions, self.idle_timeout, Utc::now());
            if removed > 0 {
                tracing::info!(removed, remaining = sessions.len(), "Purged idle sessions");
            }
        }

        let session = sessions.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(session = %key, "Creating session");
            Session::new(Arc::new(make_agent()))
        });
        session.last_active = Utc::now();
        if session.history.len() > self.max_history {
            let excess = session.history.len() - self.max_history;
            session.history.drain(..excess);
        }

        (session.agent.clone(), session.history.clone())
    }

    /// Append a completed turn. Oldest entries are dropped once the
    /// history exceeds the cap, preserving order. Concurrent turns on one
    /// key append last-writer-wins.
    pub fn append_turn(&self, key: &str, user: Message, assistant: Message) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let Some(session) = sessions.get_mut(key) else {
            // Session was purged mid-turn; nothing to record against
            tracing::warn!(session = %key, "Append for unknown session, dropping turn");
            return;
        };
        session.history.push(user);
        session.history.push(assistant);
        if session.history.len() > self.max_history {
            let excess = session.history.len() - self.max_history;
            session.history.drain(..excess);
        }
        session.last_active = Utc::now();
    }

    /// Remove sessions idle longer than the timeout. Best-effort leak
    /// guard; also invoked from `get_or_create` past the size threshold.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    /// Deterministic seam: cleanup pass at an explicit instant.
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Self::purge_idle(&mut sessions, self.idle_timeout, now)
    }

    fn purge_idle(
        sessions: &mut HashMap<String, Session>,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_active <= idle_timeout);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
