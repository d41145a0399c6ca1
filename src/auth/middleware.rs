//! Session middleware and extractors
//!
//! Restores session state for every request and exposes the attached
//! user to handlers.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::session::{self, SESSION_COOKIE};
use crate::AppState;
use crate::data::{SessionRecord, User};
use crate::error::AppError;

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

/// Handle to the request's session row
///
/// Inserted into request extensions by `session_layer`; handlers take it
/// as an extractor to attach or detach a user.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub record: SessionRecord,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session layer not applied")))
    }
}

/// Middleware establishing a session for every request
///
/// Restores the session referenced by the cookie, or creates a fresh
/// anonymous row and sets the cookie on the response. Sessions exist
/// before authentication; login only attaches a user to one.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let secret = &state.config.auth.session_secret;

    let existing = match extract_session_token(request.headers()) {
        Some(token) => session::resolve_session(&state.db, secret, &token).await?,
        None => None,
    };

    let (record, fresh_token) = match existing {
        Some(record) => (record, None),
        None => {
            let token =
                session::establish_session(&state.db, secret, state.config.auth.session_max_age)
                    .await?;
            let record = session::resolve_session(&state.db, secret, &token)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("freshly established session not found"))
                })?;
            (record, Some(token))
        }
    };

    request.extensions_mut().insert(SessionHandle { record });

    let response = next.run(request).await;

    // A fresh session also means a fresh cookie on the way out.
    match fresh_token {
        Some(token) => {
            let cookie =
                session::build_session_cookie(&token, state.config.should_use_secure_cookies());
            Ok((CookieJar::new().add(cookie), response).into_response())
        }
        None => Ok(response),
    }
}

/// Optional current user extractor
///
/// Returns None if the session carries no live user, instead of error;
/// handlers decide how to respond to unauthenticated requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let record = match parts.extensions.get::<SessionHandle>() {
            Some(handle) => Some(handle.record.clone()),
            None => match extract_session_token(&parts.headers) {
                Some(token) => session::resolve_session(
                    &app_state.db,
                    &app_state.config.auth.session_secret,
                    &token,
                )
                .await
                .ok()
                .flatten(),
                None => None,
            },
        };

        let user = match record {
            Some(record) => session::session_user(&app_state.db, &record)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(MaybeUser(user))
    }
}
