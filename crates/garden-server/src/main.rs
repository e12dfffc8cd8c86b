mod config;
mod sweep;

use std::net::SocketAddr;

use tracing::{info, warn};

use garden_api::AppStateInner;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "garden_server=debug,garden_api=debug,garden_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = garden_db::Database::open(&config.db_path)?;
    garden_api::seed(&db, &config.seed)?;
    if config.seed.uses_default_credentials() {
        warn!(
            "Default admin password or diary passphrase in use; set GARDEN_ADMIN_PASSWORD and GARDEN_SECRET_PASSPHRASE before first start"
        );
    }

    let state = AppStateInner::new(db, config.mode, &config.limits);
    tokio::spawn(sweep::run_sweep_loop(state.clone(), config.sweep_interval));

    let app = garden_api::router(state);

    info!("Garden listening on {} ({} mode)", config.addr, config.mode);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
