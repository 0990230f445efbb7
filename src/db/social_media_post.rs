use async_trait::async_trait;
use chrono::Utc;

use super::DBClient;
use crate::dtos::{NewSocialMediaPost, SocialMediaPostPatch};
use crate::error::StorageError;
use crate::models::{SOCIAL_POST_SCHEDULED, SocialMediaPost};
use crate::storage::SocialMediaPostExt;

#[async_trait]
impl SocialMediaPostExt for DBClient {
    async fn get_social_media_posts(&self) -> Result<Vec<SocialMediaPost>, StorageError> {
        let posts = sqlx::query_as::<_, SocialMediaPost>(
            "SELECT * FROM social_media_posts ORDER BY scheduled_for DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn get_social_media_post(
        &self,
        id: i32,
    ) -> Result<Option<SocialMediaPost>, StorageError> {
        let post =
            sqlx::query_as::<_, SocialMediaPost>("SELECT * FROM social_media_posts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(post)
    }

    async fn get_social_media_posts_by_newsletter(
        &self,
        newsletter_id: i32,
    ) -> Result<Vec<SocialMediaPost>, StorageError> {
        let posts = sqlx::query_as::<_, SocialMediaPost>(
            r#"
            SELECT * FROM social_media_posts
            WHERE newsletter_id = $1
            ORDER BY scheduled_for DESC, id
            "#,
        )
        .bind(newsletter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn create_social_media_post(
        &self,
        post: NewSocialMediaPost,
    ) -> Result<SocialMediaPost, StorageError> {
        let post = post.into_post(0, Utc::now());

        let created = sqlx::query_as::<_, SocialMediaPost>(
            r#"
            INSERT INTO social_media_posts (
                newsletter_id, platform, content, hashtags, engagement_hook, call_to_action,
                status, scheduled_for, post_url, engagement_stats, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(post.newsletter_id)
        .bind(post.platform)
        .bind(post.content)
        // Vec<String> binds as TEXT[]
        .bind(post.hashtags)
        .bind(post.engagement_hook)
        .bind(post.call_to_action)
        .bind(post.status)
        .bind(post.scheduled_for)
        .bind(post.post_url)
        .bind(post.engagement_stats)
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_social_media_post(
        &self,
        id: i32,
        patch: SocialMediaPostPatch,
    ) -> Result<Option<SocialMediaPost>, StorageError> {
        // Lock the row, merge in Rust, write every column back. The merge is
        // the same `apply` the in-memory store runs.
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, SocialMediaPost>(
            "SELECT * FROM social_media_posts WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut post) = existing else {
            return Ok(None);
        };
        patch.apply(&mut post, Utc::now());

        let updated = sqlx::query_as::<_, SocialMediaPost>(
            r#"
            UPDATE social_media_posts
            SET newsletter_id = $1, platform = $2, content = $3, hashtags = $4,
                engagement_hook = $5, call_to_action = $6, status = $7, scheduled_for = $8,
                post_url = $9, engagement_stats = $10, updated_at = $11
            WHERE id = $12
            RETURNING *
            "#,
        )
        .bind(post.newsletter_id)
        .bind(post.platform)
        .bind(post.content)
        .bind(post.hashtags)
        .bind(post.engagement_hook)
        .bind(post.call_to_action)
        .bind(post.status)
        .bind(post.scheduled_for)
        .bind(post.post_url)
        .bind(post.engagement_stats)
        .bind(post.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_social_media_post(&self, id: i32) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM social_media_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_scheduled_social_media_posts(
        &self,
    ) -> Result<Vec<SocialMediaPost>, StorageError> {
        let posts = sqlx::query_as::<_, SocialMediaPost>(
            r#"
            SELECT * FROM social_media_posts
            WHERE status = $1
            ORDER BY scheduled_for ASC, id
            "#,
        )
        .bind(SOCIAL_POST_SCHEDULED)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
