use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use validator::Validate;

use crate::{
    AppState,
    dtos::{DataResponse, NewArticle, Response, SelectionDto},
    error::HttpError,
    storage::ArticleExt,
};

pub fn article_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_articles).post(create_article).delete(clear_articles),
        )
        .route("/{article_id}", get(get_article))
        .route("/{article_id}/selection", patch(update_article_selection))
}

pub async fn get_articles(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let articles = app_state.storage.get_articles().await?;
    Ok(Json(DataResponse::success(articles)))
}

pub async fn get_article(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let article = app_state
        .storage
        .get_article(article_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    Ok(Json(DataResponse::success(article)))
}

pub async fn create_article(
    State(app_state): State<AppState>,
    Json(body): Json<NewArticle>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let article = app_state.storage.create_article(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::success(article))))
}

pub async fn update_article_selection(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<SelectionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let article = app_state
        .storage
        .update_article_selection(article_id, body.selected)
        .await?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    Ok(Json(DataResponse::success(article)))
}

pub async fn clear_articles(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.storage.clear_articles().await?;
    Ok(Json(Response::success("All articles cleared.")))
}
