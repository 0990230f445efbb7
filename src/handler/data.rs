//! Backup records (`/api/backups`) and whole-dataset operations
//! (`/api/data`).
//!
//! A backup row only stores what the client hands over; producing the
//! snapshot is a separate `GET /api/data/export`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    AppState,
    dtos::{DataResponse, NewActivityLog, NewDataBackup, Response},
    error::HttpError,
    storage::{ActivityLogExt, DataExt},
};

pub fn backup_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_data_backups).post(create_data_backup))
        .route(
            "/{backup_id}",
            get(get_data_backup).delete(delete_data_backup),
        )
}

pub fn data_handler() -> Router<AppState> {
    Router::new()
        .route("/export", get(export_all_data))
        .route("/purge", post(purge_all_data))
}

pub async fn get_data_backups(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let backups = app_state.storage.get_data_backups().await?;
    Ok(Json(DataResponse::success(backups)))
}

pub async fn get_data_backup(
    Path(backup_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let backup = app_state
        .storage
        .get_data_backup(backup_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Backup not found"))?;

    Ok(Json(DataResponse::success(backup)))
}

pub async fn create_data_backup(
    State(app_state): State<AppState>,
    Json(body): Json<NewDataBackup>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let backup = app_state.storage.create_data_backup(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::success(backup))))
}

pub async fn delete_data_backup(
    Path(backup_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    if !app_state.storage.delete_data_backup(backup_id).await? {
        return Err(HttpError::not_found("Backup not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// The snapshot is returned as-is (not wrapped) so it can be saved and
/// re-read as a backup file.
pub async fn export_all_data(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let snapshot = app_state.storage.export_all_data().await?;
    Ok(Json(snapshot))
}

/// Wipes everything except users and settings.
pub async fn purge_all_data(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.storage.purge_all_data().await?;

    // Logged after the purge so the entry survives it.
    app_state
        .storage
        .create_activity_log(NewActivityLog::new("All data purged", "data"))
        .await?;

    Ok(Json(Response::success("All data purged.")))
}
