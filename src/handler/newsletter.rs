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
    dtos::{DataResponse, NewNewsletter, NewsletterPatch, NextIssueDto},
    error::HttpError,
    storage::{NewsletterExt, SocialMediaPostExt},
};

pub fn newsletter_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_newsletters).post(create_newsletter))
        .route("/latest", get(get_latest_newsletter))
        .route("/next-issue", get(get_next_issue_number))
        .route(
            "/{newsletter_id}",
            get(get_newsletter).patch(update_newsletter),
        )
        .route("/{newsletter_id}/social-posts", get(get_newsletter_social_posts))
}

pub async fn get_newsletters(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let newsletters = app_state.storage.get_newsletters().await?;
    Ok(Json(DataResponse::success(newsletters)))
}

pub async fn get_newsletter(
    Path(newsletter_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let newsletter = app_state
        .storage
        .get_newsletter(newsletter_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Newsletter not found"))?;

    Ok(Json(DataResponse::success(newsletter)))
}

pub async fn get_latest_newsletter(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let newsletter = app_state
        .storage
        .get_latest_newsletter()
        .await?
        .ok_or_else(|| HttpError::not_found("No newsletters yet"))?;

    Ok(Json(DataResponse::success(newsletter)))
}

/// Preview only. The number is assigned again at create time, so two
/// drafts opened side by side both see the same value here.
pub async fn get_next_issue_number(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let issue_number = app_state.storage.get_next_issue_number().await?;
    Ok(Json(DataResponse::success(NextIssueDto { issue_number })))
}

/// Any `issueNumber` in the body is ignored; storage assigns it.
/// Returns 409 once issue numbers are exhausted.
pub async fn create_newsletter(
    State(app_state): State<AppState>,
    Json(body): Json<NewNewsletter>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let newsletter = app_state.storage.create_newsletter(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::success(newsletter))))
}

/// Partial update. Omitted fields are kept, `null` clears a nullable field.
pub async fn update_newsletter(
    Path(newsletter_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<NewsletterPatch>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let newsletter = app_state
        .storage
        .update_newsletter(newsletter_id, body)
        .await?
        .ok_or_else(|| HttpError::not_found("Newsletter not found"))?;

    Ok(Json(DataResponse::success(newsletter)))
}

pub async fn get_newsletter_social_posts(
    Path(newsletter_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let posts = app_state
        .storage
        .get_social_media_posts_by_newsletter(newsletter_id)
        .await?;

    Ok(Json(DataResponse::success(posts)))
}
