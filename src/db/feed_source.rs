use async_trait::async_trait;
use chrono::Utc;

use super::DBClient;
use crate::dtos::{FeedSourcePatch, NewFeedSource};
use crate::error::StorageError;
use crate::models::FeedSource;
use crate::storage::FeedSourceExt;

#[async_trait]
impl FeedSourceExt for DBClient {
    async fn get_feed_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        // "C" collation compares bytes, the same order `str::cmp` gives the
        // in-memory store.
        let feeds = sqlx::query_as::<_, FeedSource>(
            r#"SELECT * FROM feed_sources ORDER BY name COLLATE "C", id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    async fn get_feed_source(&self, id: i32) -> Result<Option<FeedSource>, StorageError> {
        let feed = sqlx::query_as::<_, FeedSource>("SELECT * FROM feed_sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(feed)
    }

    async fn create_feed_source(&self, feed: NewFeedSource) -> Result<FeedSource, StorageError> {
        let feed = feed.into_feed_source(0, Utc::now());

        let created = sqlx::query_as::<_, FeedSource>(
            r#"
            INSERT INTO feed_sources (
                name, url, enabled, refresh_interval, tags, last_fetched,
                article_count, error_count, last_error, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(feed.name)
        .bind(feed.url)
        .bind(feed.enabled)
        .bind(feed.refresh_interval)
        .bind(feed.tags)
        .bind(feed.last_fetched)
        .bind(feed.article_count)
        .bind(feed.error_count)
        .bind(feed.last_error)
        .bind(feed.created_at)
        .bind(feed.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Read-merge-write under `FOR UPDATE`; `updated_at` is bumped by the merge.
    async fn update_feed_source(
        &self,
        id: i32,
        patch: FeedSourcePatch,
    ) -> Result<Option<FeedSource>, StorageError> {
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query_as::<_, FeedSource>("SELECT * FROM feed_sources WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(mut feed) = existing else {
            return Ok(None);
        };
        patch.apply(&mut feed, Utc::now());

        let updated = sqlx::query_as::<_, FeedSource>(
            r#"
            UPDATE feed_sources
            SET name = $1, url = $2, enabled = $3, refresh_interval = $4, tags = $5,
                last_fetched = $6, article_count = $7, error_count = $8, last_error = $9,
                updated_at = $10
            WHERE id = $11
            RETURNING *
            "#,
        )
        .bind(feed.name)
        .bind(feed.url)
        .bind(feed.enabled)
        .bind(feed.refresh_interval)
        .bind(feed.tags)
        .bind(feed.last_fetched)
        .bind(feed.article_count)
        .bind(feed.error_count)
        .bind(feed.last_error)
        .bind(feed.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_feed_source(&self, id: i32) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM feed_sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_enabled_feed_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        let feeds = sqlx::query_as::<_, FeedSource>(
            r#"SELECT * FROM feed_sources WHERE enabled = TRUE ORDER BY name COLLATE "C", id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }
}
