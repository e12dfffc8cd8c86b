use std::sync::Arc;
use std::time::Duration;

use garden_db::Database;
use garden_types::models::AuthMode;

use crate::error::ApiResult;
use crate::rate_limit::{LoginLimiter, PostCooldown};
use crate::sessions::SessionManager;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub mode: AuthMode,
    pub sessions: SessionManager,
    pub login_limiter: LoginLimiter,
    pub post_cooldown: PostCooldown,
}

/// Tunables for the in-memory session and throttle tables.
#[derive(Debug, Clone)]
pub struct Limits {
    pub session_ttl: Duration,
    pub login_window: Duration,
    pub login_max_attempts: usize,
    pub public_cooldown: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(7 * 24 * 3600),
            login_window: Duration::from_secs(60),
            login_max_attempts: 8,
            public_cooldown: Duration::from_secs(12),
        }
    }
}

impl AppStateInner {
    pub fn new(db: Database, mode: AuthMode, limits: &Limits) -> AppState {
        Arc::new(Self {
            db,
            mode,
            sessions: SessionManager::new(limits.session_ttl),
            login_limiter: LoginLimiter::new(limits.login_window, limits.login_max_attempts),
            post_cooldown: PostCooldown::new(limits.public_cooldown),
        })
    }
}

/// Run blocking work (SQLite, scrypt) off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let out = tokio::task::spawn_blocking(move || f(&state.db)).await??;
    Ok(out)
}
