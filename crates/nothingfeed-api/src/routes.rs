use axum::{
    Json, Router, middleware,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::rate_limit::{limit_auth, limit_standard};
use crate::state::AppState;
use crate::{auth, compose, feed, profile};

/// The full API. Transport layers (CORS, tracing) are added by the server.
pub fn router(state: AppState) -> Router {
    let credential_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .layer(middleware::from_fn_with_state(state.clone(), limit_auth));

    let public_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/api/feed", get(feed::get_feed))
        .route("/api/profile/{handle}", get(profile::get_profile))
        .route("/health", get(health));

    let compose_routes = Router::new()
        .route("/api/compose", post(compose::compose))
        .layer(middleware::from_fn_with_state(state.clone(), limit_standard));

    let protected_routes = Router::new()
        .merge(compose_routes)
        .route("/api/auth/update-handle", post(auth::update_handle))
        .route("/api/auth/delete-account", delete(auth::delete_account))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(credential_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
