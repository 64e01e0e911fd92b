//! User accounts and session credentials.
//!
//! - [`AccountService`] registers users and checks logins
//! - [`TokenIssuer`] issues the JWT bearer tokens handed out on login
//! - [`CsrfGuard`] issues the anti-forgery tokens required on mutating requests
//! - [`PasswordHasher`] wraps Argon2id

mod csrf;
mod password;
mod token;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;
use crate::storage::{Collection, ObjectStore};

pub use csrf::{CsrfGuard, CSRF_HEADER, DEFAULT_CSRF_TTL};
pub use password::{HashCost, PasswordHasher};
pub use token::{Claims, Principal, ShareMode, TokenIssuer, DEFAULT_TOKEN_TTL};

/// Stored user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User fields safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Canonical form of an email address: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Document id of a user: hex SHA-256 of the normalized email.
///
/// Keying users by email makes the uniqueness check a single lookup.
fn user_key(email: &str) -> String {
    hex::encode(Sha256::digest(normalize_email(email).as_bytes()))
}

/// Registration and login.
pub struct AccountService<S: ObjectStore> {
    users: Collection<User, S>,
    hasher: PasswordHasher,
    registrations: Mutex<()>,
}

impl<S: ObjectStore> AccountService<S> {
    pub fn new(store: Arc<S>, hasher: PasswordHasher) -> Self {
        Self {
            users: Collection::new(store, "users"),
            hasher,
            registrations: Mutex::new(()),
        }
    }

    /// Register a new user.
    ///
    /// Fails with [`AuthError::MissingCredentials`] when email or password is
    /// blank and [`AuthError::UserExists`] when the email is taken.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let key = user_key(&email);

        // Serialise check-then-insert so concurrent sign-ups cannot both win
        let _guard = self.registrations.lock().await;

        if self.users.contains(&key).await? {
            debug!(email = %email, "Registration rejected: email taken");
            return Err(AuthError::UserExists);
        }

        let password_hash = self.hasher.spawn_hash(password).await?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            password_hash,
            created_at: Utc::now(),
        };
        self.users.put(&key, &user).await?;

        info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Check credentials and return the user.
    ///
    /// Unknown emails and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = self
            .find(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.spawn_verify(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Look a user up by email.
    pub async fn find(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(&user_key(email)).await?)
    }
}
