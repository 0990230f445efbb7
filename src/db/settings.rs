use async_trait::async_trait;
use chrono::Utc;

use super::DBClient;
use crate::dtos::SettingsPatch;
use crate::error::StorageError;
use crate::models::{SETTINGS_ID, Settings};
use crate::storage::SettingsExt;

#[async_trait]
impl SettingsExt for DBClient {
    async fn get_settings(&self) -> Result<Option<Settings>, StorageError> {
        let settings = sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE id = $1")
            .bind(SETTINGS_ID)
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings)
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, StorageError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE has no row to lock before the first save, so two
        // first-time writers would both merge into the defaults and the
        // later one would drop the earlier one's fields. The table lock
        // queues writers; plain reads still go through.
        sqlx::query("LOCK TABLE settings IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE id = $1")
            .bind(SETTINGS_ID)
            .fetch_optional(&mut *tx)
            .await?;

        let mut settings = existing.unwrap_or_default();
        patch.apply(&mut settings, Utc::now());

        // Single upsert for both the first save and later ones.
        let saved = sqlx::query_as::<_, Settings>(
            r#"
            INSERT INTO settings (
                id, claude_api_key, claude_model, claude_temperature, claude_max_tokens,
                beehiiv_api_key, beehiiv_publication_id, newsletter_title, issue_start_number,
                default_news_source, sendgrid_api_key, approval_email, approval_required,
                daily_schedule_enabled, daily_schedule_time, auto_select_articles,
                max_daily_articles, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE SET
                claude_api_key = EXCLUDED.claude_api_key,
                claude_model = EXCLUDED.claude_model,
                claude_temperature = EXCLUDED.claude_temperature,
                claude_max_tokens = EXCLUDED.claude_max_tokens,
                beehiiv_api_key = EXCLUDED.beehiiv_api_key,
                beehiiv_publication_id = EXCLUDED.beehiiv_publication_id,
                newsletter_title = EXCLUDED.newsletter_title,
                issue_start_number = EXCLUDED.issue_start_number,
                default_news_source = EXCLUDED.default_news_source,
                sendgrid_api_key = EXCLUDED.sendgrid_api_key,
                approval_email = EXCLUDED.approval_email,
                approval_required = EXCLUDED.approval_required,
                daily_schedule_enabled = EXCLUDED.daily_schedule_enabled,
                daily_schedule_time = EXCLUDED.daily_schedule_time,
                auto_select_articles = EXCLUDED.auto_select_articles,
                max_daily_articles = EXCLUDED.max_daily_articles,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(settings.claude_api_key)
        .bind(settings.claude_model)
        .bind(settings.claude_temperature)
        .bind(settings.claude_max_tokens)
        .bind(settings.beehiiv_api_key)
        .bind(settings.beehiiv_publication_id)
        .bind(settings.newsletter_title)
        .bind(settings.issue_start_number)
        .bind(settings.default_news_source)
        .bind(settings.sendgrid_api_key)
        .bind(settings.approval_email)
        .bind(settings.approval_required)
        .bind(settings.daily_schedule_enabled)
        .bind(settings.daily_schedule_time)
        .bind(settings.auto_select_articles)
        .bind(settings.max_daily_articles)
        .bind(settings.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }
}
