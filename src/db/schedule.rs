use async_trait::async_trait;
use chrono::Utc;

use super::DBClient;
use crate::dtos::{NewSchedule, SchedulePatch};
use crate::error::StorageError;
use crate::models::Schedule;
use crate::storage::ScheduleExt;

#[async_trait]
impl ScheduleExt for DBClient {
    async fn get_schedules(&self) -> Result<Vec<Schedule>, StorageError> {
        // Byte order, matching the in-memory store regardless of the
        // database's default collation.
        let schedules =
            sqlx::query_as::<_, Schedule>(r#"SELECT * FROM schedules ORDER BY name COLLATE "C", id"#)
                .fetch_all(&self.pool)
                .await?;

        Ok(schedules)
    }

    async fn get_schedule(&self, id: i32) -> Result<Option<Schedule>, StorageError> {
        let schedule = sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(schedule)
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, StorageError> {
        // Rejects unsupported cadences before anything is written
        let schedule = schedule.into_schedule(0, Utc::now())?;

        let created = sqlx::query_as::<_, Schedule>(
            r#"
            INSERT INTO schedules (
                name, frequency, time, news_source_url, max_articles,
                auto_approve, enabled, last_run, next_run, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(schedule.name)
        .bind(schedule.frequency)
        .bind(schedule.time)
        .bind(schedule.news_source_url)
        .bind(schedule.max_articles)
        .bind(schedule.auto_approve)
        .bind(schedule.enabled)
        .bind(schedule.last_run)
        .bind(schedule.next_run)
        .bind(schedule.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_schedule(
        &self,
        id: i32,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, StorageError> {
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(mut schedule) = existing else {
            return Ok(None);
        };
        patch.apply(&mut schedule, Utc::now())?;

        let updated = sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules
            SET name = $1, frequency = $2, time = $3, news_source_url = $4, max_articles = $5,
                auto_approve = $6, enabled = $7, last_run = $8, next_run = $9
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(schedule.name)
        .bind(schedule.frequency)
        .bind(schedule.time)
        .bind(schedule.news_source_url)
        .bind(schedule.max_articles)
        .bind(schedule.auto_approve)
        .bind(schedule.enabled)
        .bind(schedule.last_run)
        .bind(schedule.next_run)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_schedule(&self, id: i32) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_enabled_schedules(&self) -> Result<Vec<Schedule>, StorageError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"SELECT * FROM schedules WHERE enabled = TRUE ORDER BY name COLLATE "C", id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(schedules)
    }
}
