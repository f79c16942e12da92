use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use postwell_api_types::{HealthStatus, PostDocument, PostPayload};

use crate::application::pagination::PageQuery;
use crate::domain::posts::{PostDraft, PostId};

use super::error::ApiError;
use super::state::ApiState;

pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// -------- Posts --------
pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let listing = state.posts.list(&query).await?;

    let mut response = Response::new(Body::from(listing.body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(listing.cache.as_str()),
    );
    Ok(response)
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&raw_id)?;
    let post = state.posts.get(id).await?;
    Ok(Json(PostDocument::from(post)))
}

pub async fn create_post(
    State(state): State<ApiState>,
    payload: Result<Json<PostPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection_to_api)?;

    let post = state.posts.create(PostDraft::from(payload)).await?;

    Ok((StatusCode::CREATED, Json(PostDocument::from(post))))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<PostPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&raw_id)?;
    let Json(payload) = payload.map_err(json_rejection_to_api)?;

    let post = state.posts.update(id, PostDraft::from(payload)).await?;

    Ok(Json(PostDocument::from(post)))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&raw_id)?;
    state.posts.delete(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// -------- Health --------
pub async fn health(State(state): State<ApiState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        alive: true,
        posts: state.posts.count().await,
    })
}

fn parse_post_id(raw: &str) -> Result<PostId, ApiError> {
    raw.parse::<PostId>()
        .map_err(|err| ApiError::bad_request("invalid post id", Some(err.to_string())))
}

fn json_rejection_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("invalid request body", Some(rejection.body_text()))
}
