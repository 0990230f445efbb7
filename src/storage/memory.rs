use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{
    ActivityLogExt, ArticleExt, DataExt, FeedSourceExt, NewsletterExt, ScheduleExt, SettingsExt,
    SocialMediaPostExt, Storage, UserExt, resolve_next_issue_number,
};
use crate::dtos::{
    FeedSourcePatch, NewActivityLog, NewArticle, NewDataBackup, NewFeedSource, NewNewsletter,
    NewSchedule, NewSocialMediaPost, NewUser, NewsletterPatch, SchedulePatch, SettingsPatch,
    SocialMediaPostPatch,
};
use crate::error::StorageError;
use crate::models::{
    ActivityLog, Article, DataBackup, ExportSnapshot, FeedSource, Newsletter,
    SOCIAL_POST_SCHEDULED, Schedule, Settings, SocialMediaPost, User,
};

/// Rows of one entity type keyed by id, with the id sequence that feeds them.
///
/// Clearing the rows does not rewind the sequence, so ids are never reused.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i32) -> T) -> T {
        let id = self.next_id;
        let row = build(id);
        self.rows.insert(id, row.clone());
        self.next_id += 1;
        row
    }

    /// The id is only consumed when `build` succeeds.
    fn try_insert_with<E>(&mut self, build: impl FnOnce(i32) -> Result<T, E>) -> Result<T, E> {
        let id = self.next_id;
        let row = build(id)?;
        self.rows.insert(id, row.clone());
        self.next_id += 1;
        Ok(row)
    }

    fn get(&self, id: i32) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn values(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    fn remove(&mut self, id: i32) -> bool {
        self.rows.remove(&id).is_some()
    }

    fn clear(&mut self) {
        self.rows.clear();
    }
}

#[derive(Debug, Default)]
struct MemTables {
    users: Table<User>,
    articles: Table<Article>,
    newsletters: Table<Newsletter>,
    settings: Option<Settings>,
    activity_logs: Table<ActivityLog>,
    schedules: Table<Schedule>,
    social_media_posts: Table<SocialMediaPost>,
    feed_sources: Table<FeedSource>,
    data_backups: Table<DataBackup>,
}

impl MemTables {
    fn articles(&self) -> Vec<Article> {
        let mut articles = self.articles.values();
        articles.sort_by(|a, b| b.published_date.cmp(&a.published_date));
        articles
    }

    fn newsletters(&self) -> Vec<Newsletter> {
        let mut newsletters = self.newsletters.values();
        newsletters.sort_by(|a, b| b.issue_number.cmp(&a.issue_number));
        newsletters
    }

    fn next_issue_number(&self) -> Result<i32, StorageError> {
        let latest = self
            .newsletters
            .rows
            .values()
            .map(|n| n.issue_number)
            .max();
        let start = self.settings.as_ref().and_then(|s| s.issue_start_number);
        resolve_next_issue_number(latest, start)
    }

    fn activity_logs(&self) -> Vec<ActivityLog> {
        let mut logs = self.activity_logs.values();
        logs.sort_by(|a, b| {
            let a_ts = a.timestamp.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let b_ts = b.timestamp.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            b_ts.cmp(&a_ts).then(b.id.cmp(&a.id))
        });
        logs
    }

    fn schedules(&self) -> Vec<Schedule> {
        let mut schedules = self.schedules.values();
        schedules.sort_by(|a, b| a.name.cmp(&b.name));
        schedules
    }

    fn social_media_posts(&self) -> Vec<SocialMediaPost> {
        let mut posts = self.social_media_posts.values();
        posts.sort_by(|a, b| b.scheduled_for.cmp(&a.scheduled_for));
        posts
    }

    fn feed_sources(&self) -> Vec<FeedSource> {
        let mut feeds = self.feed_sources.values();
        feeds.sort_by(|a, b| a.name.cmp(&b.name));
        feeds
    }

    fn data_backups(&self) -> Vec<DataBackup> {
        let mut backups = self.data_backups.values();
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        backups
    }
}

/// Map-backed store for development and tests
///
/// Every call takes the single table lock for its whole duration, so each
/// operation is atomic and `export_all_data` sees one consistent state.
/// Id sequences live in the instance; separate stores never share ids.
#[derive(Debug, Default)]
pub struct MemStorage {
    tables: Mutex<MemTables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a schedule row as-is, skipping the checks `create_schedule`
    /// runs. Lets tests hold rows a database could contain after manual edits.
    #[cfg(test)]
    pub(crate) async fn insert_schedule_row(&self, schedule: Schedule) -> Schedule {
        let mut tables = self.tables.lock().await;
        tables.schedules.insert_with(|id| Schedule { id, ..schedule })
    }
}

impl Storage for MemStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl UserExt for MemStorage {
    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError> {
        Ok(self.tables.lock().await.users.get(id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .rows
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.insert_with(|id| User {
            id,
            username: user.username,
            password: user.password,
        }))
    }
}

#[async_trait]
impl ArticleExt for MemStorage {
    async fn get_articles(&self) -> Result<Vec<Article>, StorageError> {
        Ok(self.tables.lock().await.articles())
    }

    async fn get_article(&self, id: i32) -> Result<Option<Article>, StorageError> {
        Ok(self.tables.lock().await.articles.get(id))
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        Ok(tables
            .articles
            .insert_with(|id| article.into_article(id, now)))
    }

    async fn update_article_selection(
        &self,
        id: i32,
        selected: bool,
    ) -> Result<Option<Article>, StorageError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.articles.rows.get_mut(&id).map(|article| {
            article.selected = selected;
            article.clone()
        }))
    }

    async fn clear_articles(&self) -> Result<(), StorageError> {
        self.tables.lock().await.articles.clear();
        Ok(())
    }
}

#[async_trait]
impl NewsletterExt for MemStorage {
    async fn get_newsletters(&self) -> Result<Vec<Newsletter>, StorageError> {
        Ok(self.tables.lock().await.newsletters())
    }

    async fn get_newsletter(&self, id: i32) -> Result<Option<Newsletter>, StorageError> {
        Ok(self.tables.lock().await.newsletters.get(id))
    }

    async fn get_latest_newsletter(&self) -> Result<Option<Newsletter>, StorageError> {
        Ok(self.tables.lock().await.newsletters().into_iter().next())
    }

    async fn create_newsletter(
        &self,
        newsletter: NewNewsletter,
    ) -> Result<Newsletter, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let issue_number = tables.next_issue_number()?;
        Ok(tables
            .newsletters
            .insert_with(|id| newsletter.into_newsletter(id, issue_number, now)))
    }

    async fn update_newsletter(
        &self,
        id: i32,
        patch: NewsletterPatch,
    ) -> Result<Option<Newsletter>, StorageError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.newsletters.rows.get_mut(&id).map(|newsletter| {
            patch.apply(newsletter);
            newsletter.clone()
        }))
    }

    async fn get_next_issue_number(&self) -> Result<i32, StorageError> {
        self.tables.lock().await.next_issue_number()
    }
}

#[async_trait]
impl SettingsExt for MemStorage {
    async fn get_settings(&self) -> Result<Option<Settings>, StorageError> {
        Ok(self.tables.lock().await.settings.clone())
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, StorageError> {
        let mut tables = self.tables.lock().await;
        let settings = tables.settings.get_or_insert_with(Settings::default);
        patch.apply(settings, Utc::now());
        Ok(settings.clone())
    }
}

#[async_trait]
impl ActivityLogExt for MemStorage {
    async fn get_activity_logs(&self) -> Result<Vec<ActivityLog>, StorageError> {
        Ok(self.tables.lock().await.activity_logs())
    }

    async fn get_activity_log(&self, id: i32) -> Result<Option<ActivityLog>, StorageError> {
        Ok(self.tables.lock().await.activity_logs.get(id))
    }

    async fn create_activity_log(&self, log: NewActivityLog) -> Result<ActivityLog, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        Ok(tables.activity_logs.insert_with(|id| ActivityLog {
            id,
            message: log.message,
            details: log.details,
            log_type: log.log_type,
            timestamp: Some(now),
        }))
    }

    async fn clear_activity_logs(&self) -> Result<(), StorageError> {
        self.tables.lock().await.activity_logs.clear();
        Ok(())
    }
}

#[async_trait]
impl ScheduleExt for MemStorage {
    async fn get_schedules(&self) -> Result<Vec<Schedule>, StorageError> {
        Ok(self.tables.lock().await.schedules())
    }

    async fn get_schedule(&self, id: i32) -> Result<Option<Schedule>, StorageError> {
        Ok(self.tables.lock().await.schedules.get(id))
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let created = tables
            .schedules
            .try_insert_with(|id| schedule.into_schedule(id, now))?;
        Ok(created)
    }

    async fn update_schedule(
        &self,
        id: i32,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, StorageError> {
        let mut tables = self.tables.lock().await;
        let Some(mut schedule) = tables.schedules.get(id) else {
            return Ok(None);
        };

        patch.apply(&mut schedule, Utc::now())?;
        tables.schedules.rows.insert(id, schedule.clone());
        Ok(Some(schedule))
    }

    async fn delete_schedule(&self, id: i32) -> Result<bool, StorageError> {
        Ok(self.tables.lock().await.schedules.remove(id))
    }

    async fn get_enabled_schedules(&self) -> Result<Vec<Schedule>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.schedules().into_iter().filter(|s| s.enabled).collect())
    }
}

#[async_trait]
impl SocialMediaPostExt for MemStorage {
    async fn get_social_media_posts(&self) -> Result<Vec<SocialMediaPost>, StorageError> {
        Ok(self.tables.lock().await.social_media_posts())
    }

    async fn get_social_media_post(
        &self,
        id: i32,
    ) -> Result<Option<SocialMediaPost>, StorageError> {
        Ok(self.tables.lock().await.social_media_posts.get(id))
    }

    async fn get_social_media_posts_by_newsletter(
        &self,
        newsletter_id: i32,
    ) -> Result<Vec<SocialMediaPost>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .social_media_posts()
            .into_iter()
            .filter(|post| post.newsletter_id == newsletter_id)
            .collect())
    }

    async fn create_social_media_post(
        &self,
        post: NewSocialMediaPost,
    ) -> Result<SocialMediaPost, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        Ok(tables
            .social_media_posts
            .insert_with(|id| post.into_post(id, now)))
    }

    async fn update_social_media_post(
        &self,
        id: i32,
        patch: SocialMediaPostPatch,
    ) -> Result<Option<SocialMediaPost>, StorageError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.social_media_posts.rows.get_mut(&id).map(|post| {
            patch.apply(post, Utc::now());
            post.clone()
        }))
    }

    async fn delete_social_media_post(&self, id: i32) -> Result<bool, StorageError> {
        Ok(self.tables.lock().await.social_media_posts.remove(id))
    }

    async fn get_scheduled_social_media_posts(
        &self,
    ) -> Result<Vec<SocialMediaPost>, StorageError> {
        let tables = self.tables.lock().await;
        let mut posts: Vec<SocialMediaPost> = tables
            .social_media_posts
            .values()
            .into_iter()
            .filter(|post| post.status == SOCIAL_POST_SCHEDULED)
            .collect();
        posts.sort_by(|a, b| a.scheduled_for.cmp(&b.scheduled_for));
        Ok(posts)
    }
}

#[async_trait]
impl FeedSourceExt for MemStorage {
    async fn get_feed_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        Ok(self.tables.lock().await.feed_sources())
    }

    async fn get_feed_source(&self, id: i32) -> Result<Option<FeedSource>, StorageError> {
        Ok(self.tables.lock().await.feed_sources.get(id))
    }

    async fn create_feed_source(&self, feed: NewFeedSource) -> Result<FeedSource, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        Ok(tables
            .feed_sources
            .insert_with(|id| feed.into_feed_source(id, now)))
    }

    async fn update_feed_source(
        &self,
        id: i32,
        patch: FeedSourcePatch,
    ) -> Result<Option<FeedSource>, StorageError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.feed_sources.rows.get_mut(&id).map(|feed| {
            patch.apply(feed, Utc::now());
            feed.clone()
        }))
    }

    async fn delete_feed_source(&self, id: i32) -> Result<bool, StorageError> {
        Ok(self.tables.lock().await.feed_sources.remove(id))
    }

    async fn get_enabled_feed_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .feed_sources()
            .into_iter()
            .filter(|feed| feed.enabled)
            .collect())
    }
}

#[async_trait]
impl DataExt for MemStorage {
    async fn create_data_backup(&self, backup: NewDataBackup) -> Result<DataBackup, StorageError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        Ok(tables
            .data_backups
            .insert_with(|id| backup.into_backup(id, now)))
    }

    async fn get_data_backups(&self) -> Result<Vec<DataBackup>, StorageError> {
        Ok(self.tables.lock().await.data_backups())
    }

    async fn get_data_backup(&self, id: i32) -> Result<Option<DataBackup>, StorageError> {
        Ok(self.tables.lock().await.data_backups.get(id))
    }

    async fn delete_data_backup(&self, id: i32) -> Result<bool, StorageError> {
        Ok(self.tables.lock().await.data_backups.remove(id))
    }

    async fn purge_all_data(&self) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables.articles.clear();
        tables.newsletters.clear();
        tables.activity_logs.clear();
        tables.schedules.clear();
        tables.social_media_posts.clear();
        tables.feed_sources.clear();
        tables.data_backups.clear();
        tracing::info!("Purged all data from in-memory storage");
        Ok(())
    }

    async fn export_all_data(&self) -> Result<ExportSnapshot, StorageError> {
        let tables = self.tables.lock().await;
        Ok(ExportSnapshot {
            articles: tables.articles(),
            newsletters: tables.newsletters(),
            settings: tables.settings.clone(),
            activity_logs: tables.activity_logs(),
            schedules: tables.schedules(),
            social_media_posts: tables.social_media_posts(),
            feed_sources: tables.feed_sources(),
            backups: tables.data_backups(),
            exported_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, NaiveTime, TimeZone, Weekday};
    use serde_json::json;

    fn article(title: &str, published: DateTime<Utc>) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            content: Some(format!("{title} body")),
            source: "Example Lab".to_string(),
            url: format!("https://example.com/{title}"),
            published_date: Some(published),
            selected: None,
        }
    }

    fn newsletter(title: &str) -> NewNewsletter {
        NewNewsletter {
            title: title.to_string(),
            content: "content".to_string(),
            ..Default::default()
        }
    }

    fn schedule(name: &str, frequency: &str, time: &str) -> NewSchedule {
        NewSchedule {
            name: name.to_string(),
            frequency: frequency.to_string(),
            time: time.to_string(),
            news_source_url: "https://example.com/feed".to_string(),
            ..Default::default()
        }
    }

    fn feed(name: &str, enabled: Option<bool>) -> NewFeedSource {
        NewFeedSource {
            name: name.to_string(),
            url: format!("https://{name}.example.com/rss"),
            enabled,
            ..Default::default()
        }
    }

    fn post(newsletter_id: i32, scheduled_for: DateTime<Utc>) -> NewSocialMediaPost {
        NewSocialMediaPost {
            newsletter_id,
            platform: "linkedin".to_string(),
            content: "New issue is out".to_string(),
            scheduled_for,
            ..Default::default()
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_users_round_trip() {
        let storage = MemStorage::new();
        let user = storage
            .create_user(NewUser {
                username: "operator".to_string(),
                password: "hashed".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(storage.get_user(1).await.unwrap(), Some(user.clone()));
        assert_eq!(
            storage.get_user_by_username("operator").await.unwrap(),
            Some(user)
        );
        assert_eq!(storage.get_user_by_username("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_articles_sorted_by_published_desc() {
        let storage = MemStorage::new();
        storage.create_article(article("middle", day(5))).await.unwrap();
        storage.create_article(article("oldest", day(1))).await.unwrap();
        storage.create_article(article("newest", day(9))).await.unwrap();

        let titles: Vec<String> = storage
            .get_articles()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn test_article_defaults() {
        let storage = MemStorage::new();
        let created = storage
            .create_article(NewArticle {
                title: "bare".to_string(),
                source: "Lab".to_string(),
                url: "https://example.com/bare".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!created.selected);
        assert_eq!(created.content, None);
        assert_eq!(created.published_date, created.fetched_at);
    }

    #[tokio::test]
    async fn test_update_article_selection_only_touches_flag() {
        let storage = MemStorage::new();
        let created = storage.create_article(article("a", day(2))).await.unwrap();

        let updated = storage
            .update_article_selection(created.id, true)
            .await
            .unwrap()
            .unwrap();

        assert!(updated.selected);
        assert_eq!(
            Article {
                selected: false,
                ..updated.clone()
            },
            created
        );
        assert_eq!(storage.get_article(created.id).await.unwrap(), Some(updated));
        assert_eq!(storage.update_article_selection(99, true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_articles_keeps_id_sequence() {
        let storage = MemStorage::new();
        storage.create_article(article("a", day(1))).await.unwrap();
        storage.create_article(article("b", day(2))).await.unwrap();
        storage.clear_articles().await.unwrap();

        assert!(storage.get_articles().await.unwrap().is_empty());
        let next = storage.create_article(article("c", day(3))).await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_stores_do_not_share_sequences() {
        let first = MemStorage::new();
        let second = MemStorage::new();
        first.create_article(article("a", day(1))).await.unwrap();
        first.create_article(article("b", day(1))).await.unwrap();

        let created = second.create_article(article("c", day(1))).await.unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn test_issue_numbers_are_sequential() {
        let storage = MemStorage::new();
        assert_eq!(storage.get_next_issue_number().await.unwrap(), 1);

        let first = storage.create_newsletter(newsletter("one")).await.unwrap();
        let second = storage.create_newsletter(newsletter("two")).await.unwrap();
        let third = storage.create_newsletter(newsletter("three")).await.unwrap();

        assert_eq!(first.issue_number, 1);
        assert_eq!(second.issue_number, 2);
        assert_eq!(third.issue_number, 3);
        assert_eq!(storage.get_next_issue_number().await.unwrap(), 4);

        let issues: Vec<i32> = storage
            .get_newsletters()
            .await
            .unwrap()
            .iter()
            .map(|n| n.issue_number)
            .collect();
        assert_eq!(issues, vec![3, 2, 1]);
        assert_eq!(
            storage.get_latest_newsletter().await.unwrap().map(|n| n.id),
            Some(third.id)
        );
    }

    #[tokio::test]
    async fn test_first_issue_uses_configured_start() {
        let storage = MemStorage::new();
        storage
            .update_settings(SettingsPatch {
                issue_start_number: Some(Some(50)),
                ..Default::default()
            })
            .await
            .unwrap();

        let first = storage.create_newsletter(newsletter("one")).await.unwrap();
        let second = storage.create_newsletter(newsletter("two")).await.unwrap();
        assert_eq!(first.issue_number, 50);
        assert_eq!(second.issue_number, 51);
    }

    #[tokio::test]
    async fn test_issue_numbers_stop_at_i32_max() {
        let storage = MemStorage::new();
        storage
            .update_settings(SettingsPatch {
                issue_start_number: Some(Some(i32::MAX)),
                ..Default::default()
            })
            .await
            .unwrap();

        let last = storage.create_newsletter(newsletter("last")).await.unwrap();
        assert_eq!(last.issue_number, i32::MAX);

        let err = storage
            .create_newsletter(newsletter("one too many"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::IssueNumbersExhausted(i32::MAX)));
        assert!(storage.get_next_issue_number().await.is_err());

        // nothing was stored for the rejected create
        assert_eq!(storage.get_newsletters().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_newsletter_merges_and_reports_missing() {
        let storage = MemStorage::new();
        let created = storage.create_newsletter(newsletter("one")).await.unwrap();

        let updated = storage
            .update_newsletter(
                created.id,
                NewsletterPatch {
                    status: Some("published".to_string()),
                    beehiiv_url: Some(Some("https://example.com/p/1".to_string())),
                    published_at: Some(Some(day(4))),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, "published");
        assert_eq!(updated.published_at, Some(day(4)));
        assert_eq!(updated.title, "one");
        assert_eq!(updated.issue_number, created.issue_number);
        assert_eq!(
            storage
                .update_newsletter(42, NewsletterPatch::default())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_settings_created_from_defaults_then_merged() {
        let storage = MemStorage::new();
        assert_eq!(storage.get_settings().await.unwrap(), None);

        let first = storage
            .update_settings(SettingsPatch {
                newsletter_title: Some(Some("Frontier Notes".to_string())),
                max_daily_articles: Some(12),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.claude_model.as_deref(), Some(crate::models::DEFAULT_AI_MODEL));
        assert_eq!(first.daily_schedule_time, "09:00");

        let second = storage
            .update_settings(SettingsPatch {
                approval_required: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert!(second.approval_required);
        assert_eq!(second.newsletter_title.as_deref(), Some("Frontier Notes"));
        assert_eq!(second.max_daily_articles, 12);
        assert_eq!(storage.get_settings().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_activity_logs_newest_first_and_clearable() {
        let storage = MemStorage::new();
        storage
            .create_activity_log(NewActivityLog::new("fetched", "fetch"))
            .await
            .unwrap();
        storage
            .create_activity_log(
                NewActivityLog::new("generated", "generate").with_details(json!({"issue": 1})),
            )
            .await
            .unwrap();

        let logs = storage.get_activity_logs().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "generated");
        assert_eq!(logs[0].details, Some(json!({"issue": 1})));
        assert_eq!(logs[1].message, "fetched");

        storage.clear_activity_logs().await.unwrap();
        assert!(storage.get_activity_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_timestamp_sorts_last() {
        let storage = MemStorage::new();
        let undated = storage
            .create_activity_log(NewActivityLog::new("undated", "system"))
            .await
            .unwrap();
        storage
            .create_activity_log(NewActivityLog::new("dated", "system"))
            .await
            .unwrap();
        storage
            .tables
            .lock()
            .await
            .activity_logs
            .rows
            .get_mut(&undated.id)
            .unwrap()
            .timestamp = None;

        let logs = storage.get_activity_logs().await.unwrap();
        assert_eq!(logs.last().map(|l| l.message.as_str()), Some("undated"));
    }

    #[tokio::test]
    async fn test_schedules_sorted_by_name_with_next_run() {
        let storage = MemStorage::new();
        let before = Utc::now();
        storage.create_schedule(schedule("weekly digest", "weekly", "08:00")).await.unwrap();
        storage.create_schedule(schedule("daily brief", "daily", "07:30")).await.unwrap();

        let schedules = storage.get_schedules().await.unwrap();
        let names: Vec<&str> = schedules.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["daily brief", "weekly digest"]);
        for s in &schedules {
            assert!(s.next_run.unwrap() > before);
            assert!(s.enabled);
        }
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_not_stored() {
        let storage = MemStorage::new();
        let err = storage
            .create_schedule(schedule("monthly", "monthly", "09:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidSchedule(_)));
        assert!(storage.get_schedules().await.unwrap().is_empty());

        let created = storage.create_schedule(schedule("ok", "daily", "09:00")).await.unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn test_update_schedule_recomputes_next_run() {
        let storage = MemStorage::new();
        let created = storage.create_schedule(schedule("s", "daily", "09:00")).await.unwrap();

        let updated = storage
            .update_schedule(
                created.id,
                SchedulePatch {
                    frequency: Some("weekly".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let next_run = updated.next_run.unwrap();
        assert_eq!(updated.frequency, "weekly");
        assert_eq!(next_run.weekday(), Weekday::Sun);
        assert_eq!(next_run.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(next_run > Utc::now());
    }

    #[tokio::test]
    async fn test_failed_schedule_update_leaves_row_untouched() {
        let storage = MemStorage::new();
        let created = storage.create_schedule(schedule("s", "daily", "09:00")).await.unwrap();

        let err = storage
            .update_schedule(
                created.id,
                SchedulePatch {
                    name: Some("renamed".to_string()),
                    time: Some("nine".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::InvalidSchedule(_)));
        assert_eq!(storage.get_schedule(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_delete_schedule_twice() {
        let storage = MemStorage::new();
        let created = storage.create_schedule(schedule("s", "daily", "09:00")).await.unwrap();

        assert!(storage.delete_schedule(created.id).await.unwrap());
        assert!(!storage.delete_schedule(created.id).await.unwrap());
        assert_eq!(
            storage
                .update_schedule(created.id, SchedulePatch::default())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_enabled_schedules_filter() {
        let storage = MemStorage::new();
        storage.create_schedule(schedule("on", "daily", "09:00")).await.unwrap();
        storage
            .create_schedule(NewSchedule {
                enabled: Some(false),
                ..schedule("off", "daily", "09:00")
            })
            .await
            .unwrap();

        let enabled = storage.get_enabled_schedules().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "on");
    }

    #[tokio::test]
    async fn test_social_posts_ordering_and_filters() {
        let storage = MemStorage::new();
        let early = storage.create_social_media_post(post(1, day(3))).await.unwrap();
        let late = storage.create_social_media_post(post(1, day(8))).await.unwrap();
        let other = storage.create_social_media_post(post(2, day(5))).await.unwrap();
        storage
            .update_social_media_post(
                other.id,
                SocialMediaPostPatch {
                    status: Some("posted".to_string()),
                    post_url: Some(Some("https://social.example.com/1".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let all: Vec<i32> = storage
            .get_social_media_posts()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(all, vec![late.id, other.id, early.id]);

        let pending: Vec<i32> = storage
            .get_scheduled_social_media_posts()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(pending, vec![early.id, late.id]);

        let for_first: Vec<i32> = storage
            .get_social_media_posts_by_newsletter(1)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(for_first, vec![late.id, early.id]);
    }

    #[tokio::test]
    async fn test_social_post_update_bumps_updated_at() {
        let storage = MemStorage::new();
        let created = storage.create_social_media_post(post(1, day(3))).await.unwrap();
        assert_eq!(created.status, SOCIAL_POST_SCHEDULED);
        assert!(created.hashtags.is_empty());

        let updated = storage
            .update_social_media_post(
                created.id,
                SocialMediaPostPatch {
                    hashtags: Some(vec!["#ai".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.hashtags, vec!["#ai".to_string()]);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.content, created.content);
        assert!(storage.delete_social_media_post(created.id).await.unwrap());
        assert!(!storage.delete_social_media_post(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_feed_sources_sorted_and_filtered() {
        let storage = MemStorage::new();
        storage.create_feed_source(feed("zeta", None)).await.unwrap();
        storage.create_feed_source(feed("alpha", Some(false))).await.unwrap();
        storage.create_feed_source(feed("mid", Some(true))).await.unwrap();

        let names: Vec<String> = storage
            .get_feed_sources()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);

        let enabled: Vec<String> = storage
            .get_enabled_feed_sources()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(enabled, vec!["mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_feed_source_update_and_delete() {
        let storage = MemStorage::new();
        let created = storage.create_feed_source(feed("lab", None)).await.unwrap();

        let updated = storage
            .update_feed_source(
                created.id,
                FeedSourcePatch {
                    article_count: Some(14),
                    error_count: Some(1),
                    last_error: Some(Some("timeout".to_string())),
                    last_fetched: Some(Some(day(6))),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.article_count, 14);
        assert_eq!(updated.last_error.as_deref(), Some("timeout"));
        assert_eq!(updated.url, created.url);

        assert!(storage.delete_feed_source(created.id).await.unwrap());
        assert_eq!(
            storage
                .update_feed_source(created.id, FeedSourcePatch::default())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_names_sort_bytewise() {
        let storage = MemStorage::new();
        for name in ["alpha", "Zeta", "beta"] {
            storage.create_feed_source(feed(name, None)).await.unwrap();
            storage
                .create_schedule(schedule(name, "daily", "09:00"))
                .await
                .unwrap();
        }

        // uppercase sorts before lowercase, unlike a locale collation
        let feeds: Vec<String> = storage
            .get_feed_sources()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(feeds, ["Zeta", "alpha", "beta"]);

        let schedules: Vec<String> = storage
            .get_schedules()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(schedules, ["Zeta", "alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_lookup_by_id_for_logs_posts_feeds_and_backups() {
        let storage = MemStorage::new();
        let log = storage
            .create_activity_log(NewActivityLog::new("Fetched 3 articles", "fetch"))
            .await
            .unwrap();
        let post = storage.create_social_media_post(post(1, day(3))).await.unwrap();
        let feed = storage.create_feed_source(feed("lab", None)).await.unwrap();
        let backup = storage
            .create_data_backup(NewDataBackup {
                name: "nightly".to_string(),
                data: json!({}),
            })
            .await
            .unwrap();

        assert_eq!(storage.get_activity_log(log.id).await.unwrap(), Some(log));
        assert_eq!(
            storage.get_social_media_post(post.id).await.unwrap(),
            Some(post)
        );
        assert_eq!(storage.get_feed_source(feed.id).await.unwrap(), Some(feed));
        assert_eq!(
            storage.get_data_backup(backup.id).await.unwrap(),
            Some(backup)
        );

        assert_eq!(storage.get_activity_log(99).await.unwrap(), None);
        assert_eq!(storage.get_social_media_post(99).await.unwrap(), None);
        assert_eq!(storage.get_feed_source(99).await.unwrap(), None);
        assert_eq!(storage.get_data_backup(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backups_newest_first() {
        let storage = MemStorage::new();
        let first = storage
            .create_data_backup(NewDataBackup {
                name: "first".to_string(),
                data: json!({"articles": []}),
            })
            .await
            .unwrap();
        let second = storage
            .create_data_backup(NewDataBackup {
                name: "second".to_string(),
                data: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(first.download_url, None);

        let ids: Vec<i32> = storage
            .get_data_backups()
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(storage.delete_data_backup(first.id).await.unwrap());
        assert!(!storage.delete_data_backup(first.id).await.unwrap());
    }

    async fn seeded() -> MemStorage {
        let storage = MemStorage::new();
        storage
            .create_user(NewUser {
                username: "operator".to_string(),
                password: "hashed".to_string(),
            })
            .await
            .unwrap();
        storage
            .update_settings(SettingsPatch {
                newsletter_title: Some(Some("Kept".to_string())),
                ..Default::default()
            })
            .await
            .unwrap();
        storage.create_article(article("a", day(1))).await.unwrap();
        let issue = storage.create_newsletter(newsletter("one")).await.unwrap();
        storage
            .create_activity_log(NewActivityLog::new("hello", "system"))
            .await
            .unwrap();
        storage.create_schedule(schedule("s", "daily", "09:00")).await.unwrap();
        storage
            .create_social_media_post(post(issue.id, day(2) + Duration::hours(1)))
            .await
            .unwrap();
        storage.create_feed_source(feed("lab", None)).await.unwrap();
        storage
            .create_data_backup(NewDataBackup {
                name: "b".to_string(),
                data: json!({}),
            })
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_purge_keeps_users_and_settings() {
        let storage = seeded().await;
        storage.purge_all_data().await.unwrap();

        assert!(storage.get_articles().await.unwrap().is_empty());
        assert!(storage.get_newsletters().await.unwrap().is_empty());
        assert!(storage.get_activity_logs().await.unwrap().is_empty());
        assert!(storage.get_schedules().await.unwrap().is_empty());
        assert!(storage.get_social_media_posts().await.unwrap().is_empty());
        assert!(storage.get_feed_sources().await.unwrap().is_empty());
        assert!(storage.get_data_backups().await.unwrap().is_empty());

        assert!(storage.get_user_by_username("operator").await.unwrap().is_some());
        assert_eq!(
            storage
                .get_settings()
                .await
                .unwrap()
                .and_then(|s| s.newsletter_title),
            Some("Kept".to_string())
        );
    }

    #[tokio::test]
    async fn test_export_contains_every_entity_type() {
        let storage = seeded().await;
        let snapshot = storage.export_all_data().await.unwrap();

        assert_eq!(snapshot.articles.len(), 1);
        assert_eq!(snapshot.newsletters.len(), 1);
        assert!(snapshot.settings.is_some());
        assert_eq!(snapshot.activity_logs.len(), 1);
        assert_eq!(snapshot.schedules.len(), 1);
        assert_eq!(snapshot.social_media_posts.len(), 1);
        assert_eq!(snapshot.feed_sources.len(), 1);
        assert_eq!(snapshot.backups.len(), 1);

        let value = serde_json::to_value(&snapshot).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 9);
        for key in [
            "articles",
            "newsletters",
            "settings",
            "activityLogs",
            "schedules",
            "socialMediaPosts",
            "feedSources",
            "backups",
            "exportedAt",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let exported_at = value["exportedAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(exported_at).is_ok());
    }
}
