//! Process-wide session store: opaque tokens mapping to `{ user_id,
//! username, logged_in }`, evicted periodically. A `DashMap` guarding a
//! concurrent table, with random IDs handed out on insert and simple
//! insert/get/remove methods, the same idiom used for handle tables
//! elsewhere in this workspace.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use strongbox_core::token::random_alphanumeric;

const SESSION_TOKEN_LENGTH: usize = 32;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub logged_in: bool,
    created_at: Instant,
}

pub struct SessionStore {
    sessions: DashMap<SessionToken, Session>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    #[must_use]
    pub fn create(&self, user_id: i64, username: String) -> SessionToken {
        let token = random_alphanumeric(SESSION_TOKEN_LENGTH);
        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                username,
                logged_in: true,
                created_at: Instant::now(),
            },
        );
        token
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|entry| entry.clone())
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.remove(token);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict sessions older than `ttl`. Intended to be called periodically
    /// by a background task in `strongbox-server`.
    pub fn sweep_expired(&self, ttl: Duration) {
        let now = Instant::now();
        self.sessions
            .retain(|_, session| now.duration_since(session.created_at) < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_round_trips() {
        let store = SessionStore::new();
        let token = store.create(7, "alice".to_string());
        let session = store.get(&token).expect("session should exist");
        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "alice");
        assert!(session.logged_in);
    }

    #[test]
    fn revoke_removes_session() {
        let store = SessionStore::new();
        let token = store.create(1, "bob".to_string());
        store.revoke(&token);
        assert!(store.get(&token).is_none());
    }

    #[test]
    fn sweep_evicts_only_expired() {
        let store = SessionStore::new();
        let token = store.create(1, "carol".to_string());
        store.sweep_expired(Duration::from_secs(3600));
        assert!(store.get(&token).is_some());

        store.sweep_expired(Duration::from_secs(0));
        assert!(store.get(&token).is_none());
    }
}
