use async_trait::async_trait;

use super::DBClient;
use crate::dtos::NewActivityLog;
use crate::error::StorageError;
use crate::models::ActivityLog;
use crate::storage::ActivityLogExt;

#[async_trait]
impl ActivityLogExt for DBClient {
    async fn get_activity_logs(&self) -> Result<Vec<ActivityLog>, StorageError> {
        // NULLS LAST matches treating a missing timestamp as the epoch
        let logs = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs ORDER BY timestamp DESC NULLS LAST, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn get_activity_log(&self, id: i32) -> Result<Option<ActivityLog>, StorageError> {
        let log = sqlx::query_as::<_, ActivityLog>("SELECT * FROM activity_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(log)
    }

    async fn create_activity_log(&self, log: NewActivityLog) -> Result<ActivityLog, StorageError> {
        let log = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (message, details, type)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(log.message)
        .bind(log.details)
        .bind(log.log_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    async fn clear_activity_logs(&self) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM activity_logs")
            .execute(&self.pool)
            .await?;

        tracing::info!(deleted = result.rows_affected(), "Cleared activity logs");
        Ok(())
    }
}
