use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::db::DBClient;
use crate::dtos::{
    FeedSourcePatch, NewActivityLog, NewArticle, NewDataBackup, NewFeedSource, NewNewsletter,
    NewSchedule, NewSocialMediaPost, NewUser, NewsletterPatch, SchedulePatch, SettingsPatch,
    SocialMediaPostPatch,
};
use crate::error::StorageError;
use crate::models::{
    ActivityLog, Article, DEFAULT_ISSUE_START_NUMBER, DataBackup, ExportSnapshot, FeedSource,
    Newsletter, Schedule, Settings, SocialMediaPost, User,
};

mod memory;
pub use memory::MemStorage;

// The storage contract, split per entity like the db layer.
// Both backends implement every trait; `Storage` ties them together so the
// process can hold a single `Arc<dyn Storage>`.

#[async_trait]
pub trait UserExt: Send + Sync {
    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;
}

#[async_trait]
pub trait ArticleExt: Send + Sync {
    /// Newest published first.
    async fn get_articles(&self) -> Result<Vec<Article>, StorageError>;
    async fn get_article(&self, id: i32) -> Result<Option<Article>, StorageError>;
    async fn create_article(&self, article: NewArticle) -> Result<Article, StorageError>;
    /// Flip only the selection flag. `Ok(None)` when the article is gone.
    async fn update_article_selection(
        &self,
        id: i32,
        selected: bool,
    ) -> Result<Option<Article>, StorageError>;
    async fn clear_articles(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait NewsletterExt: Send + Sync {
    /// Highest issue number first.
    async fn get_newsletters(&self) -> Result<Vec<Newsletter>, StorageError>;
    async fn get_newsletter(&self, id: i32) -> Result<Option<Newsletter>, StorageError>;
    async fn get_latest_newsletter(&self) -> Result<Option<Newsletter>, StorageError>;
    /// Assigns the next issue number atomically with the insert.
    async fn create_newsletter(&self, newsletter: NewNewsletter)
    -> Result<Newsletter, StorageError>;
    async fn update_newsletter(
        &self,
        id: i32,
        patch: NewsletterPatch,
    ) -> Result<Option<Newsletter>, StorageError>;
    async fn get_next_issue_number(&self) -> Result<i32, StorageError>;
}

#[async_trait]
pub trait SettingsExt: Send + Sync {
    async fn get_settings(&self) -> Result<Option<Settings>, StorageError>;
    /// Upsert: creates the singleton from defaults on first call, otherwise
    /// merges the supplied fields into the stored record.
    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, StorageError>;
}

#[async_trait]
pub trait ActivityLogExt: Send + Sync {
    /// Newest first; a missing timestamp sorts as the epoch.
    async fn get_activity_logs(&self) -> Result<Vec<ActivityLog>, StorageError>;
    async fn get_activity_log(&self, id: i32) -> Result<Option<ActivityLog>, StorageError>;
    async fn create_activity_log(&self, log: NewActivityLog) -> Result<ActivityLog, StorageError>;
    async fn clear_activity_logs(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ScheduleExt: Send + Sync {
    /// Ordered by name.
    async fn get_schedules(&self) -> Result<Vec<Schedule>, StorageError>;
    async fn get_schedule(&self, id: i32) -> Result<Option<Schedule>, StorageError>;
    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, StorageError>;
    async fn update_schedule(
        &self,
        id: i32,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, StorageError>;
    async fn delete_schedule(&self, id: i32) -> Result<bool, StorageError>;
    async fn get_enabled_schedules(&self) -> Result<Vec<Schedule>, StorageError>;
}

#[async_trait]
pub trait SocialMediaPostExt: Send + Sync {
    /// Latest `scheduled_for` first.
    async fn get_social_media_posts(&self) -> Result<Vec<SocialMediaPost>, StorageError>;
    async fn get_social_media_post(&self, id: i32)
    -> Result<Option<SocialMediaPost>, StorageError>;
    async fn get_social_media_posts_by_newsletter(
        &self,
        newsletter_id: i32,
    ) -> Result<Vec<SocialMediaPost>, StorageError>;
    async fn create_social_media_post(
        &self,
        post: NewSocialMediaPost,
    ) -> Result<SocialMediaPost, StorageError>;
    async fn update_social_media_post(
        &self,
        id: i32,
        patch: SocialMediaPostPatch,
    ) -> Result<Option<SocialMediaPost>, StorageError>;
    async fn delete_social_media_post(&self, id: i32) -> Result<bool, StorageError>;
    /// Posts still in "scheduled" status, soonest first.
    async fn get_scheduled_social_media_posts(&self)
    -> Result<Vec<SocialMediaPost>, StorageError>;
}

#[async_trait]
pub trait FeedSourceExt: Send + Sync {
    /// Ordered by name.
    async fn get_feed_sources(&self) -> Result<Vec<FeedSource>, StorageError>;
    async fn get_feed_source(&self, id: i32) -> Result<Option<FeedSource>, StorageError>;
    async fn create_feed_source(&self, feed: NewFeedSource) -> Result<FeedSource, StorageError>;
    async fn update_feed_source(
        &self,
        id: i32,
        patch: FeedSourcePatch,
    ) -> Result<Option<FeedSource>, StorageError>;
    async fn delete_feed_source(&self, id: i32) -> Result<bool, StorageError>;
    async fn get_enabled_feed_sources(&self) -> Result<Vec<FeedSource>, StorageError>;
}

#[async_trait]
pub trait DataExt: Send + Sync {
    async fn create_data_backup(&self, backup: NewDataBackup) -> Result<DataBackup, StorageError>;
    /// Newest first.
    async fn get_data_backups(&self) -> Result<Vec<DataBackup>, StorageError>;
    async fn get_data_backup(&self, id: i32) -> Result<Option<DataBackup>, StorageError>;
    async fn delete_data_backup(&self, id: i32) -> Result<bool, StorageError>;
    /// Empties every entity type except users and settings.
    async fn purge_all_data(&self) -> Result<(), StorageError>;
    async fn export_all_data(&self) -> Result<ExportSnapshot, StorageError>;
}

pub trait Storage:
    UserExt
    + ArticleExt
    + NewsletterExt
    + SettingsExt
    + ActivityLogExt
    + ScheduleExt
    + SocialMediaPostExt
    + FeedSourceExt
    + DataExt
{
    /// Short backend label for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}

/// Latest issue + 1, or the configured start number for the first issue.
///
/// Fails once the sequence has reached `i32::MAX` instead of wrapping, so
/// issue numbers stay strictly increasing.
pub fn resolve_next_issue_number(
    latest: Option<i32>,
    start: Option<i32>,
) -> Result<i32, StorageError> {
    match latest {
        Some(latest) => latest
            .checked_add(1)
            .ok_or(StorageError::IssueNumbersExhausted(latest)),
        None => Ok(start.unwrap_or(DEFAULT_ISSUE_START_NUMBER)),
    }
}

/// Pick the backend once at startup.
///
/// Mock mode or a missing `DATABASE_URL` select the in-memory store. A
/// database that can't be reached is logged and also falls back to memory,
/// so the dashboard still comes up.
pub async fn create_storage(config: &Config) -> Arc<dyn Storage> {
    if config.use_mock_db {
        tracing::info!("Using in-memory storage (mock mode)");
        return Arc::new(MemStorage::new());
    }

    let Some(database_url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set, using in-memory storage");
        return Arc::new(MemStorage::new());
    };

    match DBClient::connect(database_url, config.db_max_connections).await {
        Ok(db_client) => {
            tracing::info!("Using PostgreSQL storage");
            Arc::new(db_client)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Database not available, falling back to in-memory storage");
            Arc::new(MemStorage::new())
        }
    }
}
