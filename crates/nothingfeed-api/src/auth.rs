use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use tracing::{info, warn};
use uuid::Uuid;

use nothingfeed_db::format_timestamp;
use nothingfeed_db::models::HandleUpdate;
use nothingfeed_types::api::{
    Claims, LoginRequest, LoginResponse, MeResponse, MessageResponse, RegisterRequest,
    RegisterResponse, RegisteredUser, UpdateHandleRequest,
};

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};
use crate::validation;

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

fn invalid_credentials() -> ApiError {
    ApiError::BadRequest("Invalid credentials".to_string())
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let handle = req.handle.trim().to_lowercase();
    validation::registration(&email, &req.password, &handle)?;

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let created = {
        let (email, handle) = (email.clone(), handle.clone());
        let created_at = format_timestamp(chrono::Utc::now());
        run_db(&state, move |db| {
            db.create_user(&user_id.to_string(), &email, &handle, &password_hash, &created_at)
        })
        .await?
    };

    // Same answer for a taken email and a taken handle.
    if !created {
        return Err(ApiError::BadRequest("Registration not possible".to_string()));
    }

    info!(user_id = %user_id, handle = %handle, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".to_string(),
            user: RegisteredUser {
                id: user_id,
                email,
                handle,
            },
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    // Malformed logins get the same answer as wrong passwords.
    let Ok(Json(req)) = payload else {
        return Err(invalid_credentials());
    };
    let email = req.email.trim().to_lowercase();
    if !validation::is_email(&email) || req.password.is_empty() {
        return Err(invalid_credentials());
    }

    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "Failed login");
        return Err(invalid_credentials());
    }

    let user = convert::session_user(user);
    let cookie = state.session.login_cookie(user.id)?;
    info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user,
        }),
    ))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (jar.remove(state.session.logout_cookie()), message("Logout successful"))
}

/// GET /api/me: who the session belongs to, if anyone.
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let logged_out = MeResponse {
        is_logged_in: false,
        user: None,
    };

    let Some(claims) = state.session.claims(&jar) else {
        return Ok((jar, Json(logged_out)));
    };

    let user_id = claims.sub.to_string();
    let Some(user) = run_db(&state, move |db| db.get_user_by_id(&user_id)).await? else {
        // Account is gone; drop the stale session.
        return Ok((jar.remove(state.session.logout_cookie()), Json(logged_out)));
    };

    Ok((
        jar,
        Json(MeResponse {
            is_logged_in: true,
            user: Some(convert::session_user(user)),
        }),
    ))
}

/// POST /api/auth/update-handle
pub async fn update_handle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateHandleRequest>, ApiError>,
) -> ApiResult<Json<MessageResponse>> {
    let handle = req.handle.trim().to_lowercase();
    validation::handle_change(&handle)?;

    let user_id = claims.sub.to_string();
    let new_handle = handle.clone();
    let outcome = run_db(&state, move |db| db.update_handle(&user_id, &new_handle)).await?;

    match outcome {
        HandleUpdate::Updated => {
            info!(user_id = %claims.sub, handle = %handle, "Handle updated");
            Ok(message("Username updated successfully"))
        }
        HandleUpdate::Taken => Err(ApiError::BadRequest("Username is already taken".to_string())),
        HandleUpdate::UserMissing => Err(ApiError::Unauthorized),
    }
}

/// DELETE /api/auth/delete-account: removes the user, their totals and
/// every deletion they made, then ends the session.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();
    let removed = run_db(&state, move |db| db.delete_user(&user_id)).await?;

    if !removed {
        return Err(ApiError::Unauthorized);
    }

    info!(user_id = %claims.sub, "Account deleted");
    Ok((
        jar.remove(state.session.logout_cookie()),
        message("Account deleted successfully"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }
}
