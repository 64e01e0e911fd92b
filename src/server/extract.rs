//! Request extractors with JSON error bodies.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, OptionalFromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::handlers::ErrorResponse;

/// `Json<T>` whose rejection is a `400 invalid_request` error body instead
/// of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match <Json<T> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// `Option<JsonBody<T>>` is `None` when the request has no `Content-Type`
/// or an empty body. A body that is present but malformed is still rejected
/// with `400 invalid_request`.
impl<S, T> OptionalFromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let Some(content_type) = req.headers().get(header::CONTENT_TYPE).cloned() else {
            return Ok(None);
        };

        let bytes = <Bytes as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|e| invalid_request(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let mut req = Request::new(Body::from(bytes));
        req.headers_mut().insert(header::CONTENT_TYPE, content_type);
        <Self as FromRequest<S>>::from_request(req, state)
            .await
            .map(Some)
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected a JSON body with Content-Type: application/json".to_string()
        }
        other => other.body_text(),
    };
    invalid_request(message)
}

fn invalid_request(message: String) -> Response {
    debug!("Rejected JSON body: {}", message);

    let status = StatusCode::BAD_REQUEST;
    (
        status,
        Json(ErrorResponse::with_status("invalid_request", message, status)),
    )
        .into_response()
}
