use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError};
use crate::domain::entities::FollowRecord;

use super::PostgresRepositories;
use super::types::FollowRow;
use super::util::map_sqlx_error;

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn insert_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let row = sqlx::query_as::<_, FollowRow>(
            "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) \
             RETURNING id, user_id, author_id",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FollowRecord::from(row))
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
                .bind(user_id)
                .bind(author_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(found.is_some())
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
