//! Activity log routes, mounted at `/api/activity`.
//!
//! The log is append-only from the API's point of view: entries can be read,
//! added and wiped as a whole, never edited.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use validator::Validate;

use crate::{
    AppState,
    dtos::{DataResponse, NewActivityLog, Response},
    error::HttpError,
    storage::ActivityLogExt,
};

pub fn activity_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_activity_logs)
                .post(create_activity_log)
                .delete(clear_activity_logs),
        )
        .route("/{log_id}", get(get_activity_log))
}

pub async fn get_activity_logs(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let logs = app_state.storage.get_activity_logs().await?;
    Ok(Json(DataResponse::success(logs)))
}

pub async fn get_activity_log(
    Path(log_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let log = app_state
        .storage
        .get_activity_log(log_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Activity log entry not found"))?;

    Ok(Json(DataResponse::success(log)))
}

/// The client picks `type`; the timestamp is always set by storage.
pub async fn create_activity_log(
    State(app_state): State<AppState>,
    Json(body): Json<NewActivityLog>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let log = app_state.storage.create_activity_log(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::success(log))))
}

pub async fn clear_activity_logs(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.storage.clear_activity_logs().await?;
    Ok(Json(Response::success("Activity log cleared.")))
}
