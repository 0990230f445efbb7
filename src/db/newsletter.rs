use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgConnection;

use super::DBClient;
use crate::dtos::{NewNewsletter, NewsletterPatch};
use crate::error::StorageError;
use crate::models::{Newsletter, SETTINGS_ID};
use crate::storage::{NewsletterExt, resolve_next_issue_number};

/// Reads the latest issue and the configured start on `conn`, so callers
/// inside a transaction see their own lock.
async fn next_issue_number(conn: &mut PgConnection) -> Result<i32, StorageError> {
    let latest = sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(issue_number) FROM newsletters")
        .fetch_one(&mut *conn)
        .await?;

    let start = sqlx::query_scalar::<_, Option<i32>>(
        "SELECT issue_start_number FROM settings WHERE id = $1",
    )
    .bind(SETTINGS_ID)
    .fetch_optional(&mut *conn)
    .await?
    .flatten();

    resolve_next_issue_number(latest, start)
}

#[async_trait]
impl NewsletterExt for DBClient {
    async fn get_newsletters(&self) -> Result<Vec<Newsletter>, StorageError> {
        let newsletters =
            sqlx::query_as::<_, Newsletter>("SELECT * FROM newsletters ORDER BY issue_number DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(newsletters)
    }

    async fn get_newsletter(&self, id: i32) -> Result<Option<Newsletter>, StorageError> {
        let newsletter = sqlx::query_as::<_, Newsletter>("SELECT * FROM newsletters WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(newsletter)
    }

    async fn get_latest_newsletter(&self) -> Result<Option<Newsletter>, StorageError> {
        let newsletter = sqlx::query_as::<_, Newsletter>(
            "SELECT * FROM newsletters ORDER BY issue_number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(newsletter)
    }

    async fn create_newsletter(
        &self,
        newsletter: NewNewsletter,
    ) -> Result<Newsletter, StorageError> {
        let mut tx = self.pool.begin().await?;

        // Serialise concurrent creates so two editions can't read the same
        // MAX(issue_number). Readers are not blocked.
        sqlx::query("LOCK TABLE newsletters IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let issue_number = next_issue_number(&mut tx).await?;
        let newsletter = newsletter.into_newsletter(0, issue_number, Utc::now());

        let created = sqlx::query_as::<_, Newsletter>(
            r#"
            INSERT INTO newsletters (
                title, issue_number, content, status, frequency, schedule_time,
                approval_required, approval_email, approved_by, approved_at,
                html_content, beehiiv_id, beehiiv_url, word_count, generated_at, published_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(newsletter.title)
        .bind(newsletter.issue_number)
        .bind(newsletter.content)
        .bind(newsletter.status)
        .bind(newsletter.frequency)
        .bind(newsletter.schedule_time)
        .bind(newsletter.approval_required)
        .bind(newsletter.approval_email)
        .bind(newsletter.approved_by)
        .bind(newsletter.approved_at)
        .bind(newsletter.html_content)
        .bind(newsletter.beehiiv_id)
        .bind(newsletter.beehiiv_url)
        .bind(newsletter.word_count)
        .bind(newsletter.generated_at)
        .bind(newsletter.published_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            id = created.id,
            issue_number = created.issue_number,
            "Created newsletter"
        );
        Ok(created)
    }

    async fn update_newsletter(
        &self,
        id: i32,
        patch: NewsletterPatch,
    ) -> Result<Option<Newsletter>, StorageError> {
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query_as::<_, Newsletter>("SELECT * FROM newsletters WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(mut newsletter) = existing else {
            return Ok(None);
        };
        patch.apply(&mut newsletter);

        let updated = sqlx::query_as::<_, Newsletter>(
            r#"
            UPDATE newsletters
            SET title = $1, content = $2, status = $3, frequency = $4, schedule_time = $5,
                approval_required = $6, approval_email = $7, approved_by = $8, approved_at = $9,
                html_content = $10, beehiiv_id = $11, beehiiv_url = $12, word_count = $13,
                published_at = $14
            WHERE id = $15
            RETURNING *
            "#,
        )
        .bind(newsletter.title)
        .bind(newsletter.content)
        .bind(newsletter.status)
        .bind(newsletter.frequency)
        .bind(newsletter.schedule_time)
        .bind(newsletter.approval_required)
        .bind(newsletter.approval_email)
        .bind(newsletter.approved_by)
        .bind(newsletter.approved_at)
        .bind(newsletter.html_content)
        .bind(newsletter.beehiiv_id)
        .bind(newsletter.beehiiv_url)
        .bind(newsletter.word_count)
        .bind(newsletter.published_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn get_next_issue_number(&self) -> Result<i32, StorageError> {
        let mut conn = self.pool.acquire().await?;
        next_issue_number(&mut conn).await
    }
}
