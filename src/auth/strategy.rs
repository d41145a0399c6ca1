//! Authentication strategies
//!
//! Each strategy resolves credentials to a full `User` record. Strategies
//! are constructed and selected explicitly per route; there is no runtime
//! registry of strategies looked up by name.

use axum::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::password;
use crate::data::{Database, EntityId, User};
use crate::error::AppError;

/// Username/password pair for the local strategy
#[derive(Debug, Clone)]
pub struct LocalCredentials {
    pub username: String,
    pub password: String,
}

/// Profile returned by the Google userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Provider-issued subject identifier
    pub id: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

impl GoogleProfile {
    /// Username for a newly linked user: given and family name
    /// concatenated, no separator.
    pub fn derived_username(&self) -> String {
        format!(
            "{}{}",
            self.given_name.as_deref().unwrap_or(""),
            self.family_name.as_deref().unwrap_or("")
        )
    }
}

/// A way of resolving credentials to a user
#[async_trait]
pub trait AuthStrategy {
    type Credentials: Send;

    /// Resolve credentials to a user, or fail with an authentication error
    async fn authenticate(&self, credentials: Self::Credentials) -> Result<User, AppError>;
}

// =============================================================================
// Local strategy
// =============================================================================

/// Username/password verification against the user store
pub struct LocalStrategy<'a> {
    pub db: &'a Database,
}

#[async_trait]
impl AuthStrategy for LocalStrategy<'_> {
    type Credentials = LocalCredentials;

    /// Look up the user by username and verify the password against the
    /// stored credential.
    ///
    /// # Errors
    /// `UserNotFound` if no record matches the username,
    /// `PasswordMismatch` if verification fails (also for records that
    /// carry no password credential, e.g. OAuth-only users).
    async fn authenticate(&self, credentials: LocalCredentials) -> Result<User, AppError> {
        let user = self
            .db
            .get_user_by_username(&credentials.username)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let verified = user
            .password_hash
            .as_deref()
            .map(|hash| password::verify_password(hash, &credentials.password))
            .unwrap_or(false);

        if !verified {
            return Err(AppError::PasswordMismatch);
        }

        Ok(user)
    }
}

/// Registration primitive for the local strategy
///
/// Hashes the password and inserts the user row. A uniqueness violation
/// (username or email taken) surfaces as `UserCreationFailed`.
pub async fn register_local_user(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let password_hash = password::hash_password(password)?;
    let now = Utc::now();
    let user = User {
        id: EntityId::new().0,
        username: username.to_string(),
        email: Some(email.to_string()),
        google_id: None,
        password_hash: Some(password_hash),
        created_at: now,
        updated_at: now,
    };

    db.insert_user(&user).await?;
    Ok(user)
}

// =============================================================================
// OAuth strategy
// =============================================================================

/// Find-or-create linking of a provider profile to the user store
pub struct OAuthStrategy<'a> {
    pub db: &'a Database,
}

#[async_trait]
impl AuthStrategy for OAuthStrategy<'_> {
    type Credentials = GoogleProfile;

    /// Return the user linked to the profile's external identifier,
    /// creating one on first sight.
    ///
    /// Derived-username collisions are not disambiguated; the insert
    /// fails with `UserCreationFailed` and the caller reports it.
    async fn authenticate(&self, profile: GoogleProfile) -> Result<User, AppError> {
        if let Some(user) = self.db.get_user_by_google_id(&profile.id).await? {
            return Ok(user);
        }

        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            username: profile.derived_username(),
            email: None,
            google_id: Some(profile.id),
            password_hash: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_user(&user).await?;
        crate::metrics::USERS_TOTAL.inc();
        tracing::info!(
            username = %user.username,
            "Linked new user from Google profile"
        );

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (db, temp_dir)
    }

    fn profile(id: &str, given: &str, family: &str) -> GoogleProfile {
        GoogleProfile {
            id: id.to_string(),
            given_name: Some(given.to_string()),
            family_name: Some(family.to_string()),
        }
    }

    #[tokio::test]
    async fn local_register_then_authenticate() {
        let (db, _temp_dir) = create_test_db().await;

        register_local_user(&db, "alice", "a@b.com", "pw123")
            .await
            .unwrap();

        let user = LocalStrategy { db: &db }
            .authenticate(LocalCredentials {
                username: "alice".to_string(),
                password: "pw123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn local_unknown_username_is_user_not_found() {
        let (db, _temp_dir) = create_test_db().await;

        let error = LocalStrategy { db: &db }
            .authenticate(LocalCredentials {
                username: "ghost".to_string(),
                password: "pw123".to_string(),
            })
            .await
            .expect_err("unknown user must fail");
        assert!(matches!(error, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn local_wrong_password_is_mismatch() {
        let (db, _temp_dir) = create_test_db().await;

        register_local_user(&db, "alice", "a@b.com", "pw123")
            .await
            .unwrap();

        let error = LocalStrategy { db: &db }
            .authenticate(LocalCredentials {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .expect_err("wrong password must fail");
        assert!(matches!(error, AppError::PasswordMismatch));
    }

    #[tokio::test]
    async fn local_oauth_only_user_has_no_password() {
        let (db, _temp_dir) = create_test_db().await;

        OAuthStrategy { db: &db }
            .authenticate(profile("g-1", "Jane", "Doe"))
            .await
            .unwrap();

        let error = LocalStrategy { db: &db }
            .authenticate(LocalCredentials {
                username: "JaneDoe".to_string(),
                password: "anything".to_string(),
            })
            .await
            .expect_err("password login for OAuth-only user must fail");
        assert!(matches!(error, AppError::PasswordMismatch));
    }

    #[tokio::test]
    async fn register_duplicate_username_fails() {
        let (db, _temp_dir) = create_test_db().await;

        register_local_user(&db, "alice", "a@b.com", "pw123")
            .await
            .unwrap();

        let error = register_local_user(&db, "alice", "c@d.com", "pw456")
            .await
            .expect_err("second registration with same username must fail");
        assert!(matches!(error, AppError::UserCreationFailed(_)));
    }

    #[tokio::test]
    async fn oauth_link_creates_exactly_one_user() {
        let (db, _temp_dir) = create_test_db().await;

        let first = OAuthStrategy { db: &db }
            .authenticate(profile("g-42", "Jane", "Doe"))
            .await
            .unwrap();
        assert_eq!(first.username, "JaneDoe");
        assert_eq!(first.google_id, Some("g-42".to_string()));
        assert_eq!(db.count_users().await.unwrap(), 1);

        // Repeated callback with the same external identifier reuses the
        // existing record.
        let second = OAuthStrategy { db: &db }
            .authenticate(profile("g-42", "Jane", "Doe"))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn oauth_derived_username_collision_fails() {
        let (db, _temp_dir) = create_test_db().await;

        register_local_user(&db, "JaneDoe", "jane@b.com", "pw123")
            .await
            .unwrap();

        let error = OAuthStrategy { db: &db }
            .authenticate(profile("g-77", "Jane", "Doe"))
            .await
            .expect_err("derived username collision must fail");
        assert!(matches!(error, AppError::UserCreationFailed(_)));
    }
}
