//! JWT bearer tokens.
//!
//! Two kinds of token are issued, both HS256-signed with the server secret:
//!
//! - **User tokens** after a successful login. `sub` is the user id.
//! - **Guest tokens** after a share link is opened. `sub` is
//!   `share:<share-id>` and the token is bound to a single album and a
//!   [`ShareMode`].

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default lifetime of issued tokens (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

const GUEST_SUBJECT_PREFIX: &str = "share:";

/// What a share-link guest may do with the album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// Browse and download
    #[default]
    View,
    /// Browse, download and upload photos
    Add,
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ShareMode>,
}

/// Identity established from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Registered user
    User { id: String, email: String },
    /// Visitor who opened a share link
    Guest {
        album_id: String,
        share_id: String,
        mode: ShareMode,
    },
}

impl Principal {
    /// The user id, for registered users only.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Principal::User { id, .. } => Some(id),
            Principal::Guest { .. } => None,
        }
    }

    /// Require a registered user, rejecting guests.
    pub fn require_user(&self) -> Result<(&str, &str), AuthError> {
        match self {
            Principal::User { id, email } => Ok((id, email)),
            Principal::Guest { .. } => Err(AuthError::Forbidden(
                "share-link visitors cannot perform this action".to_string(),
            )),
        }
    }
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            ttl,
        }
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for a registered user.
    pub fn issue_user(&self, user_id: &str, email: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        self.sign(&Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            album: None,
            mode: None,
        })
    }

    /// Issue a token scoped to one album for a share-link visitor.
    pub fn issue_guest(
        &self,
        album_id: &str,
        share_id: &str,
        mode: ShareMode,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        self.sign(&Claims {
            sub: format!("{}{}", GUEST_SUBJECT_PREFIX, share_id),
            email: String::new(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            album: Some(album_id.to_string()),
            mode: Some(mode),
        })
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    /// Verify a token and work out who is calling.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.decode_claims(token)?;

        if let Some(share_id) = claims.sub.strip_prefix(GUEST_SUBJECT_PREFIX) {
            return match (claims.album, claims.mode) {
                (Some(album_id), Some(mode)) => Ok(Principal::Guest {
                    album_id,
                    share_id: share_id.to_string(),
                    mode,
                }),
                _ => Err(AuthError::InvalidToken(
                    "guest token without album scope".to_string(),
                )),
            };
        }

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(Principal::User {
            id: claims.sub,
            email: claims.email,
        })
    }
}
