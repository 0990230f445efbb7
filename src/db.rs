use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

use crate::error::StorageError;
use crate::storage::Storage;

mod activity;
mod article;
mod data;
mod feed_source;
mod newsletter;
mod schedule;
mod settings;
mod social_media_post;
mod user;

/// PostgreSQL-backed implementation of the storage contract
///
/// Single statements rely on Postgres atomicity. Read-merge-write updates
/// and issue number assignment run inside a transaction.
#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    /// Open a pool and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(DBClient::new(pool))
    }
}

impl Storage for DBClient {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
