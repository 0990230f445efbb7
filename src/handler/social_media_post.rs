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
    dtos::{DataResponse, NewSocialMediaPost, SocialMediaPostPatch},
    error::HttpError,
    storage::SocialMediaPostExt,
};

pub fn social_media_post_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_social_media_posts).post(create_social_media_post),
        )
        .route("/scheduled", get(get_scheduled_social_media_posts))
        .route(
            "/{post_id}",
            get(get_social_media_post)
                .patch(update_social_media_post)
                .delete(delete_social_media_post),
        )
}

pub async fn get_social_media_posts(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let posts = app_state.storage.get_social_media_posts().await?;
    Ok(Json(DataResponse::success(posts)))
}

pub async fn get_social_media_post(
    Path(post_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let post = app_state
        .storage
        .get_social_media_post(post_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Social media post not found"))?;

    Ok(Json(DataResponse::success(post)))
}

/// Queue view for the publishing worker: only posts still waiting to go out,
/// soonest first.
pub async fn get_scheduled_social_media_posts(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let posts = app_state.storage.get_scheduled_social_media_posts().await?;
    Ok(Json(DataResponse::success(posts)))
}

pub async fn create_social_media_post(
    State(app_state): State<AppState>,
    Json(body): Json<NewSocialMediaPost>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let post = app_state.storage.create_social_media_post(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::success(post))))
}

/// `newsletterId` is not checked against existing newsletters, so a post may
/// outlive the issue it was written for.
pub async fn update_social_media_post(
    Path(post_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<SocialMediaPostPatch>,
) -> Result<impl IntoResponse, HttpError> {
    let post = app_state
        .storage
        .update_social_media_post(post_id, body)
        .await?
        .ok_or_else(|| HttpError::not_found("Social media post not found"))?;

    Ok(Json(DataResponse::success(post)))
}

pub async fn delete_social_media_post(
    Path(post_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    if !app_state.storage.delete_social_media_post(post_id).await? {
        return Err(HttpError::not_found("Social media post not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
