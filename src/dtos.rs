use crate::models::{
    Article, DEFAULT_REFRESH_INTERVAL, DEFAULT_SCHEDULE_MAX_ARTICLES, DataBackup, FeedSource,
    Newsletter, SOCIAL_POST_SCHEDULED, Schedule, Settings, SocialMediaPost,
};
use crate::scheduling::{ScheduleError, calculate_next_run};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

// DTOs define what callers may send. Identity, timestamps owned by storage and
// issue numbers never appear here.
//
// Patch types distinguish "absent" from "explicit null" for nullable columns:
//   Option<Option<T>>: None = keep, Some(None) = clear, Some(Some(v)) = set

/// Deserialize a present field (including `null`) as `Some(..)`.
/// Combined with `#[serde(default)]` an absent field stays `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// ============================================================================
// Articles
// ============================================================================

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub content: Option<String>,
    #[validate(length(min = 1, message = "Source is required"))]
    pub source: String,
    #[validate(url(message = "Url is invalid"))]
    pub url: String,
    pub published_date: Option<DateTime<Utc>>,
    pub selected: Option<bool>,
}

impl NewArticle {
    pub fn into_article(self, id: i32, now: DateTime<Utc>) -> Article {
        Article {
            id,
            title: self.title,
            content: self.content,
            source: self.source,
            url: self.url,
            published_date: self.published_date.unwrap_or(now),
            selected: self.selected.unwrap_or(false),
            fetched_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDto {
    pub selected: bool,
}

// ============================================================================
// Newsletters
// ============================================================================

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNewsletter {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub content: String,
    pub status: Option<String>,
    pub frequency: Option<String>,
    pub schedule_time: Option<String>,
    pub approval_required: Option<bool>,
    #[validate(email(message = "Approval email is invalid"))]
    pub approval_email: Option<String>,
    pub approved_by: Option<String>,
    pub html_content: Option<String>,
    pub beehiiv_id: Option<String>,
    pub beehiiv_url: Option<String>,
    pub word_count: Option<i32>,
}

impl NewNewsletter {
    pub fn into_newsletter(self, id: i32, issue_number: i32, now: DateTime<Utc>) -> Newsletter {
        Newsletter {
            id,
            title: self.title,
            issue_number,
            content: self.content,
            status: self.status.unwrap_or_else(|| "draft".to_string()),
            frequency: self.frequency.unwrap_or_else(|| "manual".to_string()),
            schedule_time: self.schedule_time,
            approval_required: self.approval_required.unwrap_or(false),
            approval_email: self.approval_email,
            approved_by: self.approved_by,
            approved_at: None,
            html_content: self.html_content,
            beehiiv_id: self.beehiiv_id,
            beehiiv_url: self.beehiiv_url,
            word_count: self.word_count,
            generated_at: now,
            published_at: None,
        }
    }
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterPatch {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub schedule_time: Option<Option<String>>,
    pub approval_required: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub approval_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub approved_by: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub approved_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub html_content: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub beehiiv_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub beehiiv_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub word_count: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub published_at: Option<Option<DateTime<Utc>>>,
}

impl NewsletterPatch {
    pub fn apply(self, newsletter: &mut Newsletter) {
        merge(&mut newsletter.title, self.title);
        merge(&mut newsletter.content, self.content);
        merge(&mut newsletter.status, self.status);
        merge(&mut newsletter.frequency, self.frequency);
        merge(&mut newsletter.schedule_time, self.schedule_time);
        merge(&mut newsletter.approval_required, self.approval_required);
        merge(&mut newsletter.approval_email, self.approval_email);
        merge(&mut newsletter.approved_by, self.approved_by);
        merge(&mut newsletter.approved_at, self.approved_at);
        merge(&mut newsletter.html_content, self.html_content);
        merge(&mut newsletter.beehiiv_id, self.beehiiv_id);
        merge(&mut newsletter.beehiiv_url, self.beehiiv_url);
        merge(&mut newsletter.word_count, self.word_count);
        merge(&mut newsletter.published_at, self.published_at);
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub claude_api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub claude_model: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub claude_temperature: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub claude_max_tokens: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub beehiiv_api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub beehiiv_publication_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub newsletter_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 1, message = "Issue start number must be positive"))]
    pub issue_start_number: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub default_news_source: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sendgrid_api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub approval_email: Option<Option<String>>,
    pub approval_required: Option<bool>,
    pub daily_schedule_enabled: Option<bool>,
    pub daily_schedule_time: Option<String>,
    pub auto_select_articles: Option<bool>,
    #[validate(range(min = 1, message = "Max daily articles must be positive"))]
    pub max_daily_articles: Option<i32>,
}

impl SettingsPatch {
    pub fn apply(self, settings: &mut Settings, now: DateTime<Utc>) {
        merge(&mut settings.claude_api_key, self.claude_api_key);
        merge(&mut settings.claude_model, self.claude_model);
        merge(&mut settings.claude_temperature, self.claude_temperature);
        merge(&mut settings.claude_max_tokens, self.claude_max_tokens);
        merge(&mut settings.beehiiv_api_key, self.beehiiv_api_key);
        merge(&mut settings.beehiiv_publication_id, self.beehiiv_publication_id);
        merge(&mut settings.newsletter_title, self.newsletter_title);
        merge(&mut settings.issue_start_number, self.issue_start_number);
        merge(&mut settings.default_news_source, self.default_news_source);
        merge(&mut settings.sendgrid_api_key, self.sendgrid_api_key);
        merge(&mut settings.approval_email, self.approval_email);
        merge(&mut settings.approval_required, self.approval_required);
        merge(&mut settings.daily_schedule_enabled, self.daily_schedule_enabled);
        merge(&mut settings.daily_schedule_time, self.daily_schedule_time);
        merge(&mut settings.auto_select_articles, self.auto_select_articles);
        merge(&mut settings.max_daily_articles, self.max_daily_articles);
        settings.updated_at = now;
    }
}

// ============================================================================
// Activity logs
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityLog {
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    pub details: Option<Value>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Type is required"))]
    pub log_type: String,
}

impl NewActivityLog {
    pub fn new(message: impl Into<String>, log_type: impl Into<String>) -> Self {
        NewActivityLog {
            message: message.into(),
            details: None,
            log_type: log_type.into(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ============================================================================
// Schedules
// ============================================================================

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub frequency: String,
    pub time: String,
    #[validate(url(message = "News source url is invalid"))]
    pub news_source_url: String,
    pub max_articles: Option<i32>,
    pub auto_approve: Option<bool>,
    pub enabled: Option<bool>,
}

impl NewSchedule {
    pub fn into_schedule(self, id: i32, now: DateTime<Utc>) -> Result<Schedule, ScheduleError> {
        let next_run = calculate_next_run(&self.frequency, &self.time, now)?;

        Ok(Schedule {
            id,
            name: self.name,
            frequency: self.frequency,
            time: self.time,
            news_source_url: self.news_source_url,
            max_articles: Some(self.max_articles.unwrap_or(DEFAULT_SCHEDULE_MAX_ARTICLES)),
            auto_approve: self.auto_approve.unwrap_or(false),
            enabled: self.enabled.unwrap_or(true),
            last_run: None,
            next_run: Some(next_run),
            created_at: now,
        })
    }
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePatch {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub frequency: Option<String>,
    pub time: Option<String>,
    #[validate(url(message = "News source url is invalid"))]
    pub news_source_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_articles: Option<Option<i32>>,
    pub auto_approve: Option<bool>,
    pub enabled: Option<bool>,
    // Run bookkeeping is written by the schedule runner only; request bodies
    // cannot set it.
    #[serde(skip_deserializing)]
    pub last_run: Option<Option<DateTime<Utc>>>,
    #[serde(skip_deserializing)]
    pub next_run: Option<Option<DateTime<Utc>>>,
}

impl SchedulePatch {
    /// Merge into `schedule`. When cadence or time changes, `next_run` is
    /// recomputed from the merged values and wins over an explicit `next_run`.
    ///
    /// On error `schedule` may be partially updated; callers merge into a copy.
    pub fn apply(self, schedule: &mut Schedule, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        let recompute = self.frequency.is_some() || self.time.is_some();

        merge(&mut schedule.name, self.name);
        merge(&mut schedule.frequency, self.frequency);
        merge(&mut schedule.time, self.time);
        merge(&mut schedule.news_source_url, self.news_source_url);
        merge(&mut schedule.max_articles, self.max_articles);
        merge(&mut schedule.auto_approve, self.auto_approve);
        merge(&mut schedule.enabled, self.enabled);
        merge(&mut schedule.last_run, self.last_run);
        merge(&mut schedule.next_run, self.next_run);

        if recompute {
            schedule.next_run = Some(calculate_next_run(
                &schedule.frequency,
                &schedule.time,
                now,
            )?);
        }

        Ok(())
    }
}

// ============================================================================
// Social media posts
// ============================================================================

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSocialMediaPost {
    pub newsletter_id: i32,
    #[validate(length(min = 1, message = "Platform is required"))]
    pub platform: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub hashtags: Option<Vec<String>>,
    pub engagement_hook: Option<String>,
    pub call_to_action: Option<String>,
    pub status: Option<String>,
    pub scheduled_for: DateTime<Utc>,
}

impl NewSocialMediaPost {
    pub fn into_post(self, id: i32, now: DateTime<Utc>) -> SocialMediaPost {
        SocialMediaPost {
            id,
            newsletter_id: self.newsletter_id,
            platform: self.platform,
            content: self.content,
            hashtags: self.hashtags.unwrap_or_default(),
            engagement_hook: self.engagement_hook,
            call_to_action: self.call_to_action,
            status: self
                .status
                .unwrap_or_else(|| SOCIAL_POST_SCHEDULED.to_string()),
            scheduled_for: self.scheduled_for,
            post_url: None,
            engagement_stats: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaPostPatch {
    pub newsletter_id: Option<i32>,
    pub platform: Option<String>,
    pub content: Option<String>,
    pub hashtags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub engagement_hook: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub call_to_action: Option<Option<String>>,
    pub status: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub post_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub engagement_stats: Option<Option<Value>>,
}

impl SocialMediaPostPatch {
    pub fn apply(self, post: &mut SocialMediaPost, now: DateTime<Utc>) {
        merge(&mut post.newsletter_id, self.newsletter_id);
        merge(&mut post.platform, self.platform);
        merge(&mut post.content, self.content);
        merge(&mut post.hashtags, self.hashtags);
        merge(&mut post.engagement_hook, self.engagement_hook);
        merge(&mut post.call_to_action, self.call_to_action);
        merge(&mut post.status, self.status);
        merge(&mut post.scheduled_for, self.scheduled_for);
        merge(&mut post.post_url, self.post_url);
        merge(&mut post.engagement_stats, self.engagement_stats);
        post.updated_at = now;
    }
}

// ============================================================================
// Feed sources
// ============================================================================

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedSource {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(url(message = "Feed url is invalid"))]
    pub url: String,
    pub enabled: Option<bool>,
    #[validate(range(min = 1, message = "Refresh interval must be positive"))]
    pub refresh_interval: Option<i32>,
    pub tags: Option<Vec<String>>,
}

impl NewFeedSource {
    pub fn into_feed_source(self, id: i32, now: DateTime<Utc>) -> FeedSource {
        FeedSource {
            id,
            name: self.name,
            url: self.url,
            enabled: self.enabled.unwrap_or(true),
            refresh_interval: self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
            tags: self.tags.unwrap_or_default(),
            last_fetched: None,
            article_count: 0,
            error_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSourcePatch {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(url(message = "Feed url is invalid"))]
    pub url: Option<String>,
    pub enabled: Option<bool>,
    #[validate(range(min = 1, message = "Refresh interval must be positive"))]
    pub refresh_interval: Option<i32>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_fetched: Option<Option<DateTime<Utc>>>,
    pub article_count: Option<i32>,
    pub error_count: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_error: Option<Option<String>>,
}

impl FeedSourcePatch {
    pub fn apply(self, feed_source: &mut FeedSource, now: DateTime<Utc>) {
        merge(&mut feed_source.name, self.name);
        merge(&mut feed_source.url, self.url);
        merge(&mut feed_source.enabled, self.enabled);
        merge(&mut feed_source.refresh_interval, self.refresh_interval);
        merge(&mut feed_source.tags, self.tags);
        merge(&mut feed_source.last_fetched, self.last_fetched);
        merge(&mut feed_source.article_count, self.article_count);
        merge(&mut feed_source.error_count, self.error_count);
        merge(&mut feed_source.last_error, self.last_error);
        feed_source.updated_at = now;
    }
}

// ============================================================================
// Backups
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct NewDataBackup {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub data: Value,
}

impl NewDataBackup {
    pub fn into_backup(self, id: i32, now: DateTime<Utc>) -> DataBackup {
        DataBackup {
            id,
            name: self.name,
            data: self.data,
            download_url: None,
            created_at: now,
        }
    }
}

// ============================================================================
// Query & response DTOs
// ============================================================================

/// `?enabled=true` narrows list endpoints to enabled rows.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EnabledQuery {
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        DataResponse {
            status: "success".to_string(),
            data,
        }
    }
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
    pub message: String,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Response {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextIssueDto {
    pub issue_number: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub backend: String,
    pub schedule_runner: bool,
}
