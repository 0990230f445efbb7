pub mod activity;
pub mod article;
pub mod data;
pub mod feed_source;
pub mod newsletter;
pub mod schedule;
pub mod settings;
pub mod social_media_post;
