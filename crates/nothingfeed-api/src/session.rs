use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use nothingfeed_types::api::Claims;

pub const SESSION_COOKIE: &str = "nothingfeed-session";

const SESSION_DAYS: i64 = 7;

/// Signs and reads the session cookie. The cookie holds an HS256 token whose
/// only claim besides expiry is the user id.
#[derive(Clone)]
pub struct SessionConfig {
    secret: String,
    /// Production mode: `Secure` and `SameSite=Strict`.
    secure: bool,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>, secure: bool) -> Self {
        Self {
            secret: secret.into(),
            secure,
        }
    }

    pub fn create_token(&self, user_id: Uuid) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id,
            exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()
        .map(|data| data.claims)
    }

    /// Cookie carrying a fresh session for `user_id`.
    pub fn login_cookie(&self, user_id: Uuid) -> anyhow::Result<Cookie<'static>> {
        let token = self.create_token(user_id)?;
        Ok(Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .path("/")
            .secure(self.secure)
            .same_site(if self.secure { SameSite::Strict } else { SameSite::Lax })
            .max_age(time::Duration::days(SESSION_DAYS))
            .build())
    }

    /// Cookie that makes the browser drop the session.
    pub fn logout_cookie(&self) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }

    /// Valid claims from the request's cookies, if any.
    pub fn claims(&self, jar: &CookieJar) -> Option<Claims> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| self.verify_token(cookie.value()))
    }
}
