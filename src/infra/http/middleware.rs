use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::api::handlers::CACHE_STATUS_HEADER;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Reuse a caller-supplied `x-request-id` when it is short visible ASCII,
    /// otherwise mint a fresh one.
    fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { request_id }
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_headers(request.headers());
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// What the access log records about one finished post request.
struct Outcome {
    method: Method,
    uri: Uri,
    status: StatusCode,
    elapsed_ms: u128,
    request_id: String,
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let outcome = Outcome {
        method,
        uri,
        status: response.status(),
        elapsed_ms: start.elapsed().as_millis(),
        request_id,
    };

    if outcome.status.is_client_error() || outcome.status.is_server_error() {
        let report = response.extensions_mut().remove::<ErrorReport>();
        log_failure(&outcome, report);
    } else {
        let cache = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        debug!(
            target = "postwell::http::response",
            status = outcome.status.as_u16(),
            method = %outcome.method,
            path = %outcome.uri.path(),
            elapsed_ms = outcome.elapsed_ms,
            cache,
            request_id = %outcome.request_id,
            "request served",
        );
    }

    response
}

fn log_failure(outcome: &Outcome, report: Option<ErrorReport>) {
    let (source, messages) = report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = messages
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if outcome.status.is_server_error() {
        error!(
            target = "postwell::http::response",
            status = outcome.status.as_u16(),
            method = %outcome.method,
            path = %outcome.uri.path(),
            query = outcome.uri.query().unwrap_or(""),
            elapsed_ms = outcome.elapsed_ms,
            source,
            detail,
            chain = ?messages,
            request_id = %outcome.request_id,
            "request failed",
        );
    } else {
        // 401s land here too; the presented key is never logged.
        warn!(
            target = "postwell::http::response",
            status = outcome.status.as_u16(),
            method = %outcome.method,
            path = %outcome.uri.path(),
            query = outcome.uri.query().unwrap_or(""),
            elapsed_ms = outcome.elapsed_ms,
            source,
            detail,
            request_id = %outcome.request_id,
            "client request error",
        );
    }
}
