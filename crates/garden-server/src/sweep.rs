use std::time::Duration;

use tracing::debug;

use garden_api::AppState;

/// Periodically drop expired sessions and idle throttle entries so the
/// in-memory tables stay bounded.
pub async fn run_sweep_loop(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately; nothing has expired yet.
    interval.tick().await;

    loop {
        interval.tick().await;
        sweep_once(&state);
    }
}

fn sweep_once(state: &AppState) -> (usize, usize, usize) {
    let sessions = state.sessions.sweep();
    let attempts = state.login_limiter.sweep();
    let cooldowns = state.post_cooldown.sweep();

    if sessions + attempts + cooldowns > 0 {
        debug!(
            "Sweep: dropped {} sessions, {} login keys, {} cooldown keys",
            sessions, attempts, cooldowns
        );
    }
    (sessions, attempts, cooldowns)
}
