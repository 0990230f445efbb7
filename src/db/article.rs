use async_trait::async_trait;
use chrono::Utc;

use super::DBClient;
use crate::dtos::NewArticle;
use crate::error::StorageError;
use crate::models::Article;
use crate::storage::ArticleExt;

#[async_trait]
impl ArticleExt for DBClient {
    async fn get_articles(&self) -> Result<Vec<Article>, StorageError> {
        // Equal publish dates keep insertion order, same as the in-memory store
        let articles = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles ORDER BY published_date DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    async fn get_article(&self, id: i32) -> Result<Option<Article>, StorageError> {
        let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(article)
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article, StorageError> {
        // id is assigned by the SERIAL column
        let article = article.into_article(0, Utc::now());

        let created = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (title, content, source, url, published_date, selected, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(article.title)
        .bind(article.content)
        .bind(article.source)
        .bind(article.url)
        .bind(article.published_date)
        .bind(article.selected)
        .bind(article.fetched_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_article_selection(
        &self,
        id: i32,
        selected: bool,
    ) -> Result<Option<Article>, StorageError> {
        // Single-column update, no read-merge-write needed.
        // fetch_optional: no row back means the article is gone.
        let article = sqlx::query_as::<_, Article>(
            "UPDATE articles SET selected = $1 WHERE id = $2 RETURNING *",
        )
        .bind(selected)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    async fn clear_articles(&self) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM articles")
            .execute(&self.pool)
            .await?;

        tracing::info!(deleted = result.rows_affected(), "Cleared articles");
        Ok(())
    }
}
