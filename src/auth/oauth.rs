//! Google OAuth flow
//!
//! Authorization code flow with the `profile` scope. Token exchange and
//! profile fetch go through the endpoints in configuration, so tests can
//! point them at a stub provider.

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Deserialize;

use super::middleware::SessionHandle;
use super::session;
use super::strategy::{AuthStrategy, GoogleProfile, OAuthStrategy};
use crate::AppState;
use crate::data::User;
use crate::error::AppError;
use crate::metrics::AUTH_ATTEMPTS_TOTAL;

const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - GET /auth/google - Redirect to Google
/// - GET /auth/google/callback - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/logout", post(logout))
}

// =============================================================================
// Login Page
// =============================================================================

/// GET /login
///
/// Renders a simple login page with a local credentials form and a
/// Google sign-in link. Also the redirect target for failed OAuth
/// callbacks.
async fn login_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - Gatehouse</title></head>
        <body>
            <h1>Gatehouse</h1>
            <form method="post" action="/login">
                <input name="username" placeholder="username">
                <input name="password" type="password" placeholder="password">
                <button type="submit">Sign in</button>
            </form>
            <a href="/auth/google">Sign in with Google</a>
        </body>
        </html>
    "#,
    )
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /auth/google
///
/// Redirects user to the Google authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to Google with client_id, redirect_uri, scope, state
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let google = &state.config.auth.google;
    let csrf_state = generate_csrf_state();

    let mut authorize_url = url::Url::parse(&google.authorize_endpoint)
        .map_err(|e| AppError::Config(format!("invalid authorize endpoint: {e}")))?;
    authorize_url
        .query_pairs_mut()
        .append_pair("client_id", &google.client_id)
        .append_pair("redirect_uri", &google.callback_url)
        .append_pair("response_type", "code")
        .append_pair("scope", "profile")
        .append_pair("state", &csrf_state);

    let state_cookie = build_state_cookie(&csrf_state, state.config.should_use_secure_cookies());

    Ok((
        jar.add(state_cookie),
        Redirect::to(authorize_url.as_str()),
    ))
}

/// Query parameters from the Google callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    /// Set instead of `code` when the user denied consent
    error: Option<String>,
}

/// Google token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// GET /auth/google/callback
///
/// Completes the OAuth flow. On success the linked user is attached to
/// the session and the client is sent to /profile; any failure in the
/// flow falls back to a redirect to /login.
async fn google_callback(
    State(state): State<AppState>,
    session: SessionHandle,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(clear_state_cookie());

    match complete_google_flow(&state, &session, expected_state.as_deref(), &query).await {
        Ok(user) => {
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["google", "success"])
                .inc();
            tracing::info!(username = %user.username, "Google login succeeded");
            Ok((jar, Redirect::to("/profile")))
        }
        Err(error) => {
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["google", "failure"])
                .inc();
            tracing::warn!(error = %error, "Google OAuth callback failed");
            Ok((jar, Redirect::to("/login")))
        }
    }
}

/// Run the callback steps: CSRF check, code exchange, profile fetch,
/// find-or-create linking, session attachment.
async fn complete_google_flow(
    state: &AppState,
    session: &SessionHandle,
    expected_state: Option<&str>,
    query: &CallbackQuery,
) -> Result<User, AppError> {
    if let Some(error) = &query.error {
        return Err(AppError::OAuth(format!("provider returned error: {error}")));
    }

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::OAuth("callback missing authorization code".to_string()))?;
    let returned_state = query
        .state
        .as_deref()
        .ok_or_else(|| AppError::OAuth("callback missing state parameter".to_string()))?;
    let expected = expected_state
        .ok_or_else(|| AppError::OAuth("missing oauth_state cookie".to_string()))?;
    if returned_state != expected {
        return Err(AppError::OAuth("state parameter mismatch".to_string()));
    }

    let access_token = exchange_code(state, code).await?;
    let profile = fetch_profile(state, &access_token).await?;

    let user = OAuthStrategy { db: &state.db }.authenticate(profile).await?;
    state
        .db
        .attach_session_user(&session.record.id, &user.id)
        .await?;

    Ok(user)
}

/// Exchange the authorization code for an access token
async fn exchange_code(state: &AppState, code: &str) -> Result<String, AppError> {
    let google = &state.config.auth.google;

    let response = state
        .http_client
        .post(&google.token_endpoint)
        .form(&[
            ("code", code),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", google.callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::OAuth(format!(
            "token exchange failed with status {}",
            response.status()
        )));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

/// Fetch the userinfo profile with the access token
async fn fetch_profile(state: &AppState, access_token: &str) -> Result<GoogleProfile, AppError> {
    let response = state
        .http_client
        .get(&state.config.auth.google.userinfo_endpoint)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::OAuth(format!(
            "userinfo fetch failed with status {}",
            response.status()
        )));
    }

    let profile: GoogleProfile = response.json().await?;
    Ok(profile)
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Destroys the session row, clears the cookie, and redirects to login.
async fn logout(
    State(state): State<AppState>,
    session: SessionHandle,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_session(&session.record.id).await?;
    let jar = jar.remove(session::clear_session_cookie());

    Ok((jar, Redirect::to("/login")))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn build_state_cookie(value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, "")).path("/").build()
}
