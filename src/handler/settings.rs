use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use validator::Validate;

use crate::{
    AppState,
    dtos::{DataResponse, SettingsPatch},
    error::HttpError,
    scheduling::parse_time_of_day,
    storage::SettingsExt,
};

pub fn settings_handler() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

/// `data` is null until the settings have been saved once.
pub async fn get_settings(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let settings = app_state.storage.get_settings().await?;
    Ok(Json(DataResponse::success(settings)))
}

pub async fn update_settings(
    State(app_state): State<AppState>,
    Json(body): Json<SettingsPatch>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if let Some(time) = body.daily_schedule_time.as_deref() {
        parse_time_of_day(time).map_err(|e| HttpError::bad_request(e.to_string()))?;
    }

    let settings = app_state.storage.update_settings(body).await?;
    tracing::info!("Settings updated");

    Ok(Json(DataResponse::success(settings)))
}
