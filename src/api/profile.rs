//! Profile endpoint

use axum::{Router, response::Json, routing::get};

use crate::AppState;
use crate::auth::MaybeUser;

/// Create profile router
pub fn profile_router() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}

/// GET /profile
///
/// Responds 200 whether or not a user is attached; the body states the
/// authentication outcome.
async fn profile(MaybeUser(user): MaybeUser) -> Json<serde_json::Value> {
    match user {
        Some(user) => Json(serde_json::json!({
            "message": format!("You made it to the secured profie {}", user.username),
        })),
        None => Json(serde_json::json!({
            "message": "You are not authenticated",
        })),
    }
}
