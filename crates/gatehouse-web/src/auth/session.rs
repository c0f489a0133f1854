use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// A signed-in session, keyed by its opaque token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub created_at: Instant,
    /// Wall-clock issue time in seconds since the epoch, for clients.
    pub issued_at: u64,
}

pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Opens a session for `user_id` and returns its token.
    pub fn create(&self, user_id: &str) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let session = Session {
            user_id: user_id.to_string(),
            created_at: Instant::now(),
            issued_at: unix_now(),
        };
        self.sessions.insert(token.clone(), session);
        tracing::debug!(user_id, store_size = self.sessions.len(), "session created");
        token
    }

    /// Live session for `token`; an expired one is removed on the way.
    pub fn get(&self, token: &str) -> Option<Session> {
        let entry = self.sessions.get(token)?;
        if entry.created_at.elapsed() > self.ttl {
            drop(entry);
            self.sessions.remove(token);
            tracing::debug!("session expired");
            return None;
        }
        Some(entry.clone())
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Seconds since the epoch at which `session` stops being valid.
    pub fn expires_at(&self, session: &Session) -> u64 {
        session.issued_at.saturating_add(self.ttl.as_secs())
    }

    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.created_at.elapsed() <= ttl);
        before.saturating_sub(self.sessions.len())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
