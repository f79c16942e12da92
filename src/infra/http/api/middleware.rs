use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::api_keys::ApiAuthError;

use super::error::ApiError;
use super::state::ApiState;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn api_auth(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers());

    match state.api_key.verify(token.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(ApiAuthError::Missing) => ApiError::unauthorized("API key required").into_response(),
        Err(ApiAuthError::Invalid) => ApiError::unauthorized("API key rejected").into_response(),
    }
}

/// `X-API-Key` wins; `Authorization: Bearer <key>` is accepted as a fallback.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
            raw.strip_prefix("Bearer ").map(str::to_string)
        })
}
