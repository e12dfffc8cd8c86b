//! Throttles for unauthenticated mutation endpoints.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Login,
    Register,
    AdminLogin,
    SecretLogin,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::AdminLogin => "admin_login",
            Self::SecretLogin => "secret_login",
        }
    }
}

impl fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sliding-window attempt counter keyed by (client IP, action).
///
/// Rejected attempts are not recorded, so a caller hammering the endpoint
/// regains access as soon as its oldest accepted attempt leaves the window.
pub struct LoginLimiter {
    window: Duration,
    max_attempts: usize,
    attempts: Mutex<HashMap<(String, RateLimitAction), VecDeque<Instant>>>,
}

impl LoginLimiter {
    pub fn new(window: Duration, max_attempts: usize) -> Self {
        Self {
            window,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn allow(&self, subject: &str, action: RateLimitAction) -> bool {
        self.allow_at(subject, action, Instant::now())
    }

    pub fn allow_at(&self, subject: &str, action: RateLimitAction, now: Instant) -> bool {
        let mut attempts = lock(&self.attempts);
        let recent = attempts.entry((subject.to_string(), action)).or_default();

        while let Some(&oldest) = recent.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            recent.pop_front();
        }

        if recent.len() >= self.max_attempts {
            return false;
        }
        recent.push_back(now);
        true
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Forget keys whose every attempt has left the window.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut attempts = lock(&self.attempts);
        let before = attempts.len();
        attempts.retain(|_, recent| {
            recent.retain(|&t| now.saturating_duration_since(t) < self.window);
            !recent.is_empty()
        });
        before - attempts.len()
    }

    pub fn tracked_keys(&self) -> usize {
        lock(&self.attempts).len()
    }
}

/// Single-slot per-IP cooldown for anonymous guestbook posts.
pub struct PostCooldown {
    cooldown: Duration,
    last_accepted: Mutex<HashMap<String, Instant>>,
}

impl PostCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn try_acquire(&self, subject: &str) -> bool {
        self.try_acquire_at(subject, Instant::now())
    }

    /// Accept and stamp `now` if the previous accepted post is older than the
    /// cooldown. Check and stamp happen under one lock.
    pub fn try_acquire_at(&self, subject: &str, now: Instant) -> bool {
        let mut last = lock(&self.last_accepted);
        if let Some(&prev) = last.get(subject) {
            if now.saturating_duration_since(prev) < self.cooldown {
                return false;
            }
        }
        last.insert(subject.to_string(), now);
        true
    }

    /// Give back a slot taken at `stamped_at` whose post was never stored.
    /// A newer stamp for the same subject is left alone.
    pub fn release(&self, subject: &str, stamped_at: Instant) {
        let mut last = lock(&self.last_accepted);
        if last.get(subject) == Some(&stamped_at) {
            last.remove(subject);
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut last = lock(&self.last_accepted);
        let before = last.len();
        last.retain(|_, &mut t| now.saturating_duration_since(t) < self.cooldown);
        before - last.len()
    }

    pub fn tracked_keys(&self) -> usize {
        lock(&self.last_accepted).len()
    }
}
