mod config;

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nothingfeed_api::rate_limit;
use nothingfeed_api::session::SessionConfig;
use nothingfeed_api::{AppStateInner, router};
use nothingfeed_db::Database;

use crate::config::Config;

/// How often idle rate-limit entries are pruned (10 minutes).
const RATE_LIMIT_CLEANUP_SECS: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nothingfeed=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    // Shared state
    let state = AppStateInner::new(
        db,
        SessionConfig::new(config.session_secret.clone(), config.production),
        config.max_text_length,
        config.trust_proxy,
    );

    tokio::spawn(rate_limit::run_cleanup_loop(state.clone(), RATE_LIMIT_CLEANUP_SECS));

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    if config.trust_proxy {
        info!("Rate limits keyed on forwarded client addresses");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "NothingFeed listening on {} ({})",
        addr,
        if config.production { "production" } else { "development" }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

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
