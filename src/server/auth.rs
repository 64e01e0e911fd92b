//! Bearer-token and CSRF extractors, and the `/auth/*` handlers.
//!
//! # Request Authentication
//!
//! Protected handlers take an [`AuthUser`], which reads the bearer token from
//!
//! ```text
//! Authorization: Bearer <jwt>
//! ```
//!
//! or, for links that cannot carry headers (`/download-all`), from the
//! `access_token` query parameter. Mutating handlers also take a
//! [`CsrfChecked`], which requires an `X-CSRF-Token` header obtained from
//! `GET /auth/csrf`.

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::form_urlencoded;

use super::extract::JsonBody;
use super::handlers::AppState;
use crate::account::{Principal, PublicUser, CSRF_HEADER};
use crate::error::AuthError;
use crate::storage::ObjectStore;

/// Query parameter accepted in place of the Authorization header.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

// =============================================================================
// Extractors
// =============================================================================

/// The verified caller of a protected endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub Principal);

impl AuthUser {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

/// Pull the bearer token out of the Authorization header or the query.
pub fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme
                .eq_ignore_ascii_case("bearer")
                .then(|| token.trim().to_string())
        })
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        let query = parts.uri.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == ACCESS_TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty())
    })
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
    S: ObjectStore + 'static,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        Ok(AuthUser(state.tokens.verify(&token)?))
    }
}

/// Marker extractor: the request carried a valid CSRF token (or CSRF
/// checking is disabled).
#[derive(Debug, Clone, Copy)]
pub struct CsrfChecked;

impl<S> FromRequestParts<AppState<S>> for CsrfChecked
where
    S: ObjectStore + 'static,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        if !state.csrf_enabled {
            return Ok(CsrfChecked);
        }
        let token = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingCsrf)?;
        state.csrf.verify(token)?;
        Ok(CsrfChecked)
    }
}

// =============================================================================
// Request and Response Types
// =============================================================================

/// `POST /auth/register` body. Missing fields read as empty so they are
/// reported as missing credentials rather than a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `POST /auth/login` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub user: RegisteredUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: Option<String>,
    /// Token lifetime in seconds
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfResponse {
    pub csrf_token: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /auth/csrf`: issue a CSRF token.
pub async fn csrf_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(CsrfResponse {
            csrf_token: state.csrf.issue(),
        }),
    )
}

/// `POST /auth/register`
///
/// - `201 Created`: `{"success": true, "user": {"email", "name"}}`
/// - `400 Bad Request`: missing email/password, or email already registered
pub async fn register_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .accounts
        .register(&request.email, &request.password, request.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            user: RegisteredUser {
                email: user.email,
                name: user.name,
            },
        }),
    ))
}

/// `POST /auth/login`
///
/// - `200 OK`: `{"success": true, "token": "<jwt>", "expiresIn": 3600}`
/// - `400 Bad Request`: missing email/password
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn login_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let user = state
        .accounts
        .login(&request.email, &request.password)
        .await?;
    let token = state.tokens.issue_user(&user.id, &user.email)?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        success: true,
        token: Some(token),
        expires_in: state.tokens.ttl().as_secs(),
    }))
}

/// `GET /auth/me`: the logged-in user.
pub async fn me_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let (user_id, email) = principal.require_user()?;
    let user = state
        .accounts
        .find(email)
        .await?
        .filter(|user| user.id == user_id)
        .ok_or_else(|| AuthError::InvalidToken("account no longer exists".to_string()))?;
    Ok(Json(PublicUser::from(&user)))
}

// =============================================================================
// Tests
// =============================================================================
