use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Instants older than this are dropped by [`RateLimiter::cleanup`].
const RETENTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub window: Duration,
    pub max_requests: usize,
}

impl RatePolicy {
    /// 100 requests per 15 minutes.
    pub const STANDARD: Self = Self {
        window: Duration::from_secs(15 * 60),
        max_requests: 100,
    };

    /// 10 requests per 15 minutes, for credential endpoints.
    pub const AUTH: Self = Self {
        window: Duration::from_secs(15 * 60),
        max_requests: 10,
    };
}

/// Per-client sliding window over request instants.
///
/// Process-local: with several server instances each one counts separately.
#[derive(Default)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allowed(&self, key: &str, policy: RatePolicy) -> bool {
        self.is_allowed_at(key, policy, Instant::now())
    }

    /// Records the request when it is allowed; rejected requests are not
    /// counted against the window.
    pub fn is_allowed_at(&self, key: &str, policy: RatePolicy, now: Instant) -> bool {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let window_start = now.checked_sub(policy.window);

        let entry = requests.entry(key.to_string()).or_default();
        entry.retain(|t| window_start.is_none_or(|start| *t > start));

        if entry.len() >= policy.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    /// Drop instants older than an hour and forget idle clients.
    /// Returns how many clients were forgotten.
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(cutoff) = now.checked_sub(RETENTION) else {
            return 0;
        };

        let before = requests.len();
        requests.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        before - requests.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Background task that prunes the limiter on an interval.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let forgotten = state.limiter.cleanup();
        if forgotten > 0 {
            info!("Rate limiter: forgot {} idle clients", forgotten);
        }
    }
}

/// Client key: the peer address, or `"unknown"` without one.
///
/// With `trust_proxy`, the first `X-Forwarded-For` hop and then `X-Real-IP`
/// take precedence over the peer.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let peer_ip = || peer.map(|addr| addr.ip().to_string());
    if !trust_proxy {
        return peer_ip().unwrap_or_else(|| "unknown".to_string());
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(peer_ip)
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(
    state: &AppState,
    policy: RatePolicy,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), peer, state.trust_proxy);

    if !state.limiter.is_allowed(&key, policy) {
        warn!(client = %key, path = %req.uri().path(), "Rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }

    debug!(client = %key, "Rate limit check passed");
    Ok(next.run(req).await)
}

pub async fn limit_standard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(&state, RatePolicy::STANDARD, req, next).await
}

pub async fn limit_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(&state, RatePolicy::AUTH, req, next).await
}
