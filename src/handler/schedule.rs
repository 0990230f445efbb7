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
    dtos::{DataResponse, EnabledQuery, NewSchedule, SchedulePatch},
    error::HttpError,
    storage::ScheduleExt,
};

pub fn schedule_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_schedules).post(create_schedule))
        .route(
            "/{schedule_id}",
            get(get_schedule)
                .patch(update_schedule)
                .delete(delete_schedule),
        )
}

/// `?enabled=true` returns only the schedules the runner would consider.
pub async fn get_schedules(
    Query(params): Query<EnabledQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let schedules = if params.enabled == Some(true) {
        app_state.storage.get_enabled_schedules().await?
    } else {
        app_state.storage.get_schedules().await?
    };

    Ok(Json(DataResponse::success(schedules)))
}

pub async fn get_schedule(
    Path(schedule_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let schedule = app_state
        .storage
        .get_schedule(schedule_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Schedule not found"))?;

    Ok(Json(DataResponse::success(schedule)))
}

pub async fn create_schedule(
    State(app_state): State<AppState>,
    Json(body): Json<NewSchedule>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let schedule = app_state.storage.create_schedule(body).await?;
    tracing::info!(schedule_id = schedule.id, next_run = ?schedule.next_run, "Schedule created");

    Ok((StatusCode::CREATED, Json(DataResponse::success(schedule))))
}

/// Changing `frequency` or `time` recomputes `nextRun` from the merged
/// values. `lastRun` and `nextRun` themselves are owned by the runner.
pub async fn update_schedule(
    Path(schedule_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<SchedulePatch>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let schedule = app_state
        .storage
        .update_schedule(schedule_id, body)
        .await?
        .ok_or_else(|| HttpError::not_found("Schedule not found"))?;

    Ok(Json(DataResponse::success(schedule)))
}

pub async fn delete_schedule(
    Path(schedule_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    if !app_state.storage.delete_schedule(schedule_id).await? {
        return Err(HttpError::not_found("Schedule not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
