mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod models;
mod routes;
mod scheduler;
mod scheduling;
mod storage;
mod tracing_config;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use dotenv::dotenv;
use std::sync::Arc;
use storage::Storage;
use tower_http::cors::CorsLayer;
use tracing_config::init_tracing;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub storage: Arc<dyn Storage>,
}

#[tokio::main]
async fn main() {
    let _guard = init_tracing();

    dotenv().ok();

    let config = Config::init();

    let storage = storage::create_storage(&config).await;
    tracing::info!(backend = storage.backend_name(), "Storage ready");

    // Held for the lifetime of the server; dropping it stops the jobs.
    let _schedule_runner = if config.schedule_runner_enabled {
        match scheduler::start_schedule_runner(storage.clone()).await {
            Ok(sched) => {
                tracing::info!("Schedule runner started");
                Some(sched)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start schedule runner");
                None
            }
        }
    } else {
        tracing::info!("Schedule runner disabled");
        None
    };

    let mut cors = CorsLayer::new()
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);
    match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(frontend_url = %config.frontend_url, error = %e, "Invalid FRONTEND_URL, CORS origin not set")
        }
    }

    let port = config.port;
    let app_state = AppState {
        env: Arc::new(config),
        storage,
    };

    let app = routes::create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(port, error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", port);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
    }
}
