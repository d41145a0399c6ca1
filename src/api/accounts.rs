//! Registration and local login endpoints

use axum::{
    Form, Router,
    extract::State,
    response::{Json, Redirect},
    routing::{get, post},
};
use serde::Deserialize;

use crate::AppState;
use crate::auth::{
    AuthStrategy, LocalCredentials, LocalStrategy, SessionHandle, register_local_user,
};
use crate::error::AppError;
use crate::metrics::{AUTH_ATTEMPTS_TOTAL, USERS_TOTAL};

/// Create account router
///
/// Routes:
/// - POST /register - Local registration
/// - POST /login - Local login
/// - GET /login-success, /login-failure - Login acknowledgments
pub fn account_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/login-success", get(login_success))
        .route("/login-failure", get(login_failure))
}

/// Registration form fields
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// POST /register
///
/// Creates a local user. Failures surface the underlying error message
/// to the client unchanged.
async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = register_local_user(&state.db, &form.username, &form.email, &form.password).await?;
    USERS_TOTAL.inc();
    tracing::info!(username = %user.username, "User registered");

    Ok(Json(serde_json::json!({ "message": "Successful" })))
}

/// Login form fields
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// POST /login
///
/// Authenticates with the local strategy. Authentication failures
/// redirect to /login-failure; on success the user is attached to the
/// session and the client is sent to /login-success. Only non-auth
/// errors propagate as HTTP errors.
async fn login(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let strategy = LocalStrategy { db: &state.db };
    let credentials = LocalCredentials {
        username: form.username,
        password: form.password,
    };

    match strategy.authenticate(credentials).await {
        Ok(user) => {
            state
                .db
                .attach_session_user(&session.record.id, &user.id)
                .await?;
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["local", "success"])
                .inc();
            tracing::info!(username = %user.username, "Login succeeded");
            Ok(Redirect::to("/login-success"))
        }
        Err(AppError::UserNotFound | AppError::PasswordMismatch) => {
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["local", "failure"])
                .inc();
            Ok(Redirect::to("/login-failure"))
        }
        Err(error) => Err(error),
    }
}

/// GET /login-success
async fn login_success() -> &'static str {
    "Login Attempt was successful."
}

/// GET /login-failure
async fn login_failure() -> &'static str {
    "Login Attempt Failed."
}
