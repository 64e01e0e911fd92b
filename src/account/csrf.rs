//! Stateless CSRF tokens.
//!
//! A token is `<nonce>.<expiry>.<signature>` where
//!
//! ```text
//! signature = HMAC-SHA256(secret, "csrf:{nonce}:{expiry}")
//! ```
//!
//! Clients fetch one from `GET /auth/csrf` and echo it in the `X-CSRF-Token`
//! header of every mutating request. Verification needs no server-side state
//! and compares signatures in constant time.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the CSRF token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Default CSRF token lifetime (2 hours).
pub const DEFAULT_CSRF_TTL: Duration = Duration::from_secs(7200);

/// Issues and verifies CSRF tokens.
#[derive(Clone)]
pub struct CsrfGuard {
    secret_key: Vec<u8>,
    ttl: Duration,
}

impl CsrfGuard {
    pub fn new(secret_key: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl,
        }
    }

    /// Issue a fresh token valid for the configured TTL.
    pub fn issue(&self) -> String {
        let expiry = Utc::now().timestamp() + self.ttl.as_secs() as i64;
        self.issue_with_expiry(&Uuid::new_v4().simple().to_string(), expiry)
    }

    /// Issue a token with an explicit nonce and expiry timestamp.
    pub fn issue_with_expiry(&self, nonce: &str, expiry: i64) -> String {
        format!("{}.{}.{}", nonce, expiry, self.signature(nonce, expiry))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> Result<(), AuthError> {
        let mut parts = token.splitn(3, '.');
        let (nonce, expiry, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(e), Some(s)) if !n.is_empty() => (n, e, s),
            _ => return Err(AuthError::InvalidCsrf),
        };

        let expiry: i64 = expiry.parse().map_err(|_| AuthError::InvalidCsrf)?;
        if Utc::now().timestamp() > expiry {
            return Err(AuthError::InvalidCsrf);
        }

        let provided = hex::decode(signature).map_err(|_| AuthError::InvalidCsrf)?;
        let expected =
            hex::decode(self.signature(nonce, expiry)).map_err(|_| AuthError::InvalidCsrf)?;

        if provided.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidCsrf)
        }
    }

    fn signature(&self, nonce: &str, expiry: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(format!("csrf:{}:{}", nonce, expiry).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
