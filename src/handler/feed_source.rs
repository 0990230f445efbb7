use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use validator::Validate;

use crate::{
    AppState,
    dtos::{DataResponse, EnabledQuery, FeedSourcePatch, NewFeedSource},
    error::HttpError,
    storage::FeedSourceExt,
};

pub fn feed_source_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_feed_sources).post(create_feed_source))
        .route(
            "/{feed_id}",
            get(get_feed_source)
                .patch(update_feed_source)
                .delete(delete_feed_source),
        )
}

pub async fn get_feed_sources(
    Query(params): Query<EnabledQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let feeds = if params.enabled == Some(true) {
        app_state.storage.get_enabled_feed_sources().await?
    } else {
        app_state.storage.get_feed_sources().await?
    };

    Ok(Json(DataResponse::success(feeds)))
}

pub async fn get_feed_source(
    Path(feed_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let feed = app_state
        .storage
        .get_feed_source(feed_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Feed source not found"))?;

    Ok(Json(DataResponse::success(feed)))
}

pub async fn create_feed_source(
    State(app_state): State<AppState>,
    Json(body): Json<NewFeedSource>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let feed = app_state.storage.create_feed_source(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::success(feed))))
}

/// Also used by the fetcher to record `lastFetched`, counters and the last
/// error after each refresh.
pub async fn update_feed_source(
    Path(feed_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<FeedSourcePatch>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let feed = app_state
        .storage
        .update_feed_source(feed_id, body)
        .await?
        .ok_or_else(|| HttpError::not_found("Feed source not found"))?;

    Ok(Json(DataResponse::success(feed)))
}

pub async fn delete_feed_source(
    Path(feed_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    if !app_state.storage.delete_feed_source(feed_id).await? {
        return Err(HttpError::not_found("Feed source not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
