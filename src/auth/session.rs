//! Session management
//!
//! Sessions are persisted server-side in the database and referenced by an
//! opaque random token held in a cookie, so they survive process restarts.
//! Only the keyed HMAC digest of the token is stored; the cookie value
//! itself never reaches the database.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::data::{Database, SessionRecord, User};
use crate::error::AppError;

/// Cookie holding the opaque session token
pub const SESSION_COOKIE: &str = "sid";

const SESSION_TOKEN_HASH_PREFIX: &str = "hmac:";

/// Generate a new opaque session token
pub fn generate_session_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Keyed hash of a session token, used as the storage key
pub fn hash_session_token(token: &str, secret: &str) -> Result<String, AppError> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(token.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(format!(
        "{}{}",
        SESSION_TOKEN_HASH_PREFIX,
        URL_SAFE_NO_PAD.encode(digest)
    ))
}

/// Build the session cookie
///
/// No max-age: the cookie lives for the browser session, while the
/// server-side row carries the authoritative expiry.
pub fn build_session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Removal cookie clearing the session token on the client
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Create a new anonymous session row
///
/// # Returns
/// The cookie token referencing the new row
pub async fn establish_session(
    db: &Database,
    secret: &str,
    max_age_seconds: i64,
) -> Result<String, AppError> {
    let token = generate_session_token();
    let now = Utc::now();
    let record = SessionRecord {
        id: hash_session_token(&token, secret)?,
        user_id: None,
        created_at: now,
        expires_at: now + Duration::seconds(max_age_seconds),
    };

    db.insert_session(&record).await?;
    crate::metrics::SESSIONS_ESTABLISHED_TOTAL.inc();

    Ok(token)
}

/// Resolve a cookie token to its live session row
///
/// Unknown and expired tokens resolve to `None`, never an error.
pub async fn resolve_session(
    db: &Database,
    secret: &str,
    token: &str,
) -> Result<Option<SessionRecord>, AppError> {
    let id = hash_session_token(token, secret)?;
    let Some(record) = db.get_session(&id).await? else {
        return Ok(None);
    };

    if record.is_expired() {
        return Ok(None);
    }

    Ok(Some(record))
}

/// Load the user attached to a session, if any
///
/// A dangling user reference (record deleted externally) resolves to
/// `None`; the request is simply unauthenticated.
pub async fn session_user(
    db: &Database,
    record: &SessionRecord,
) -> Result<Option<User>, AppError> {
    match record.user_id.as_deref() {
        Some(user_id) => db.get_user_by_id(user_id).await,
        None => Ok(None),
    }
}
