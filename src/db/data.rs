use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

use super::DBClient;
use crate::dtos::NewDataBackup;
use crate::error::StorageError;
use crate::models::{DataBackup, ExportSnapshot};
use crate::storage::{
    ActivityLogExt, ArticleExt, DataExt, FeedSourceExt, NewsletterExt, ScheduleExt, SettingsExt,
    SocialMediaPostExt,
};

/// Tables emptied by a purge. Posts go before the newsletters they point at.
const PURGED_TABLES: [&str; 7] = [
    "social_media_posts",
    "newsletters",
    "articles",
    "activity_logs",
    "schedules",
    "feed_sources",
    "data_backups",
];

#[async_trait]
impl DataExt for DBClient {
    async fn create_data_backup(&self, backup: NewDataBackup) -> Result<DataBackup, StorageError> {
        let backup = backup.into_backup(0, Utc::now());

        let created = sqlx::query_as::<_, DataBackup>(
            r#"
            INSERT INTO data_backups (name, data, download_url, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(backup.name)
        .bind(backup.data)
        .bind(backup.download_url)
        .bind(backup.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_data_backups(&self) -> Result<Vec<DataBackup>, StorageError> {
        let backups = sqlx::query_as::<_, DataBackup>(
            "SELECT * FROM data_backups ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(backups)
    }

    async fn get_data_backup(&self, id: i32) -> Result<Option<DataBackup>, StorageError> {
        let backup = sqlx::query_as::<_, DataBackup>("SELECT * FROM data_backups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(backup)
    }

    async fn delete_data_backup(&self, id: i32) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM data_backups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn purge_all_data(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for table in PURGED_TABLES {
            let result = sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
            tracing::debug!(table, deleted = result.rows_affected(), "Purged table");
        }

        tx.commit().await?;
        tracing::info!("Purged all data");
        Ok(())
    }

    /// Reads run concurrently on separate pool connections; the snapshot is
    /// not isolated from writers that land in between.
    #[instrument(skip(self))]
    async fn export_all_data(&self) -> Result<ExportSnapshot, StorageError> {
        let (
            articles,
            newsletters,
            settings,
            activity_logs,
            schedules,
            social_media_posts,
            feed_sources,
            backups,
        ) = tokio::try_join!(
            self.get_articles(),
            self.get_newsletters(),
            self.get_settings(),
            self.get_activity_logs(),
            self.get_schedules(),
            self.get_social_media_posts(),
            self.get_feed_sources(),
            self.get_data_backups(),
        )?;

        Ok(ExportSnapshot {
            articles,
            newsletters,
            settings,
            activity_logs,
            schedules,
            social_media_posts,
            feed_sources,
            backups,
            exported_at: Utc::now(),
        })
    }
}
