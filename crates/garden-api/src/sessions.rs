use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use garden_types::models::Role;

/// One issued bearer token's server-side record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    /// Identity by username string; there is no numeric user id on a session.
    pub username: String,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("missing bearer token")]
    Missing,
    #[error("unknown or expired token")]
    Unknown,
    #[error("{actual} session cannot access {required} resources")]
    RoleMismatch { required: Role, actual: Role },
}

/// Longest lifetime a session can be issued with (ten years).
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Process-wide token table. Constructed once and shared through `AppState`.
pub struct SessionManager {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    /// `ttl` is clamped to [`MAX_TTL`].
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(MAX_TTL),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, role: Role, username: &str) -> String {
        self.issue_at(role, username, Instant::now())
    }

    pub fn issue_at(&self, role: Role, username: &str, now: Instant) -> String {
        let token = garden_crypto::generate_token();
        let session = Session {
            role,
            username: username.to_string(),
            issued_at: now,
            expires_at: now.checked_add(self.ttl).unwrap_or(now),
        };
        self.lock().insert(token.clone(), session);
        token
    }

    /// Resolve a presented token, optionally requiring a role.
    pub fn authenticate(
        &self,
        token: Option<&str>,
        required: Option<Role>,
    ) -> Result<Session, SessionError> {
        self.authenticate_at(token, required, Instant::now())
    }

    pub fn authenticate_at(
        &self,
        token: Option<&str>,
        required: Option<Role>,
        now: Instant,
    ) -> Result<Session, SessionError> {
        let token = token.ok_or(SessionError::Missing)?;

        let session = {
            let mut sessions = self.lock();
            let live = sessions.get(token).filter(|s| s.expires_at > now).cloned();
            if live.is_none() {
                sessions.remove(token);
            }
            live
        }
        .ok_or(SessionError::Unknown)?;

        match required {
            Some(role) if role != session.role => Err(SessionError::RoleMismatch {
                required: role,
                actual: session.role,
            }),
            _ => Ok(session),
        }
    }

    /// Forget a token. Returns false if it was not live.
    pub fn revoke(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
