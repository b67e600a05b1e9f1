// src/auth.rs
//! Password hashing and cookie sessions.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{TimeDelta, Utc};
use cookie::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Session, User},
    state::{SharedState, State},
    store::StoreError,
};

pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Error, Debug)]
#[error("password hashing failed: {0}")]
pub struct HashError(argon2::password_hash::Error);

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(HashError)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Opens a session for `user` and attaches its cookie to `jar`.
pub async fn login(state: &State, jar: CookieJar, user: &User) -> Result<CookieJar, StoreError> {
    let now = Utc::now();
    let purged = state.store.purge_expired_sessions(now).await?;
    if purged > 0 {
        debug!(purged, "Purged expired sessions");
    }

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        expires_at: now + TimeDelta::hours(state.config.session_ttl_hours),
    };
    state.store.create_session(&session).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies)
        .max_age(Duration::hours(state.config.session_ttl_hours));
    Ok(jar.add(cookie))
}

/// Drops the session referenced by the cookie, if any, and expires the cookie.
pub async fn logout(state: &State, jar: CookieJar) -> Result<CookieJar, StoreError> {
    if let Some(id) = session_id(&jar) {
        state.store.delete_session(id).await?;
    }
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    Ok(jar.remove(cookie))
}

fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// The logged-in user, if the request carries a live session.
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn username(&self) -> Option<String> {
        self.0.as_ref().map(|user| user.username.clone())
    }
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(id) = session_id(&jar) else {
            return Ok(CurrentUser(None));
        };
        let Some(session) = state.store.find_session(id).await? else {
            return Ok(CurrentUser(None));
        };
        if session.is_expired(Utc::now()) {
            debug!(session = %session.id, "Dropping expired session");
            state.store.delete_session(session.id).await?;
            return Ok(CurrentUser(None));
        }

        Ok(CurrentUser(state.store.get_user(session.user_id).await?))
    }
}
