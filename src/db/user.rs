use async_trait::async_trait;

use super::DBClient;
use crate::dtos::NewUser;
use crate::error::StorageError;
use crate::models::User;
use crate::storage::UserExt;

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// `password` is stored as given; hashing is the caller's job.
    /// A taken username surfaces as a unique violation (`StorageError::Database`).
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password
            "#,
        )
        .bind(user.username)
        .bind(user.password)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
