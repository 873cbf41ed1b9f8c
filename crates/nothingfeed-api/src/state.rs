use std::sync::Arc;

use tracing::error;

use nothingfeed_db::Database;

use crate::error::ApiError;
use crate::rate_limit::RateLimiter;
use crate::session::SessionConfig;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session: SessionConfig,
    pub limiter: RateLimiter,
    /// Longest accepted compose text, in characters.
    pub max_text_length: usize,
    /// Key rate limits on `X-Forwarded-For`/`X-Real-IP` instead of the peer.
    /// Only safe behind a proxy that overwrites those headers.
    pub trust_proxy: bool,
}

impl AppStateInner {
    pub fn new(
        db: Database,
        session: SessionConfig,
        max_text_length: usize,
        trust_proxy: bool,
    ) -> AppState {
        Arc::new(Self {
            db,
            session,
            limiter: RateLimiter::new(),
            max_text_length,
            trust_proxy,
        })
    }
}

/// Run blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}
