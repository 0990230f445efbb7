use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dashboard operator account
///
/// Authentication lives outside this service, so the credential is stored as
/// whatever the caller hands over (normally an already-hashed password).
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
}

/// Candidate article pulled from a feed source
///
/// Only the `selected` flag changes after creation. Articles are removed in
/// bulk, never one by one.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub source: String,
    pub url: String,
    pub published_date: DateTime<Utc>,
    pub selected: bool,
    pub fetched_at: DateTime<Utc>,
}

/// One newsletter edition
///
/// `issue_number` is assigned by the storage layer and grows by one per
/// created edition. The status/frequency vocabulary belongs to the caller
/// ("draft", "pending_approval", "approved", "published", ...).
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    pub id: i32,
    pub title: String,
    pub issue_number: i32,
    pub content: String,
    pub status: String,
    pub frequency: String,
    pub schedule_time: Option<String>,
    pub approval_required: bool,
    pub approval_email: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub html_content: Option<String>,
    pub beehiiv_id: Option<String>,
    pub beehiiv_url: Option<String>,
    pub word_count: Option<i32>,
    pub generated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_AI_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_AI_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_AI_MAX_TOKENS: i32 = 4000;
pub const DEFAULT_NEWSLETTER_TITLE: &str = "AI Weekly";
pub const DEFAULT_ISSUE_START_NUMBER: i32 = 1;
pub const DEFAULT_DAILY_SCHEDULE_TIME: &str = "09:00";
pub const DEFAULT_MAX_DAILY_ARTICLES: i32 = 5;

/// Singleton settings record
///
/// There is at most one row (id = 1). It is created by the first
/// `update_settings` call, starting from [`Settings::default`].
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: i32,
    pub claude_api_key: Option<String>,
    pub claude_model: Option<String>,
    pub claude_temperature: Option<f64>,
    pub claude_max_tokens: Option<i32>,
    pub beehiiv_api_key: Option<String>,
    pub beehiiv_publication_id: Option<String>,
    pub newsletter_title: Option<String>,
    pub issue_start_number: Option<i32>,
    pub default_news_source: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub approval_email: Option<String>,
    pub approval_required: bool,
    pub daily_schedule_enabled: bool,
    pub daily_schedule_time: String,
    pub auto_select_articles: bool,
    pub max_daily_articles: i32,
    pub updated_at: DateTime<Utc>,
}

pub const SETTINGS_ID: i32 = 1;

impl Default for Settings {
    fn default() -> Self {
        Settings {
            id: SETTINGS_ID,
            claude_api_key: None,
            claude_model: Some(DEFAULT_AI_MODEL.to_string()),
            claude_temperature: Some(DEFAULT_AI_TEMPERATURE),
            claude_max_tokens: Some(DEFAULT_AI_MAX_TOKENS),
            beehiiv_api_key: None,
            beehiiv_publication_id: None,
            newsletter_title: Some(DEFAULT_NEWSLETTER_TITLE.to_string()),
            issue_start_number: Some(DEFAULT_ISSUE_START_NUMBER),
            default_news_source: None,
            sendgrid_api_key: None,
            approval_email: None,
            approval_required: false,
            daily_schedule_enabled: false,
            daily_schedule_time: DEFAULT_DAILY_SCHEDULE_TIME.to_string(),
            auto_select_articles: false,
            max_daily_articles: DEFAULT_MAX_DAILY_ARTICLES,
            updated_at: Utc::now(),
        }
    }
}

/// Append-only dashboard activity entry
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct ActivityLog {
    pub id: i32,
    pub message: String,
    pub details: Option<Value>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub log_type: String,
    pub timestamp: Option<DateTime<Utc>>,
}

pub const DEFAULT_SCHEDULE_MAX_ARTICLES: i32 = 5;

/// Recurring generation job
///
/// `next_run` is recomputed whenever `frequency` or `time` changes.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i32,
    pub name: String,
    pub frequency: String,
    pub time: String,
    pub news_source_url: String,
    pub max_articles: Option<i32>,
    pub auto_approve: bool,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub const SOCIAL_POST_SCHEDULED: &str = "scheduled";

/// Social media announcement tied to a newsletter
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaPost {
    pub id: i32,
    pub newsletter_id: i32,
    pub platform: String,
    pub content: String,
    pub hashtags: Vec<String>,
    pub engagement_hook: Option<String>,
    pub call_to_action: Option<String>,
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub post_url: Option<String>,
    pub engagement_stats: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_REFRESH_INTERVAL: i32 = 60;

/// Syndication feed polled for candidate articles
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    /// Polling interval in minutes.
    pub refresh_interval: i32,
    pub tags: Vec<String>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub article_count: i32,
    pub error_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored backup; `data` is opaque to this service.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataBackup {
    pub id: i32,
    pub name: String,
    pub data: Value,
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full dump of every mutable entity plus settings
///
/// Users are deliberately left out.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub articles: Vec<Article>,
    pub newsletters: Vec<Newsletter>,
    pub settings: Option<Settings>,
    pub activity_logs: Vec<ActivityLog>,
    pub schedules: Vec<Schedule>,
    pub social_media_posts: Vec<SocialMediaPost>,
    pub feed_sources: Vec<FeedSource>,
    pub backups: Vec<DataBackup>,
    pub exported_at: DateTime<Utc>,
}
