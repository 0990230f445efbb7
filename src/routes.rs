use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    dtos::HealthDto,
    handler::{
        activity::activity_handler,
        article::article_handler,
        data::{backup_handler, data_handler},
        feed_source::feed_source_handler,
        newsletter::newsletter_handler,
        schedule::schedule_handler,
        settings::settings_handler,
        social_media_post::social_media_post_handler,
    },
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .route("/health", get(health_check))
        .nest("/articles", article_handler())
        .nest("/newsletters", newsletter_handler())
        .nest("/settings", settings_handler())
        .nest("/activity", activity_handler())
        .nest("/schedules", schedule_handler())
        .nest("/social-posts", social_media_post_handler())
        .nest("/feeds", feed_source_handler())
        .nest("/backups", backup_handler())
        .nest("/data", data_handler())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}

async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(HealthDto {
        status: "ok".to_string(),
        backend: app_state.storage.backend_name().to_string(),
        schedule_runner: app_state.env.schedule_runner_enabled,
    })
}
