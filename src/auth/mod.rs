//! Authentication
//!
//! Handles:
//! - Local username/password strategy
//! - Google OAuth flow
//! - Server-side session management

mod middleware;
mod oauth;
pub mod password;
pub mod session;
mod strategy;

pub use middleware::{MaybeUser, SessionHandle, session_layer};
pub use oauth::auth_router;
pub use strategy::{
    AuthStrategy, GoogleProfile, LocalCredentials, LocalStrategy, OAuthStrategy,
    register_local_user,
};
