use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::PostgresRepositories;
use super::types::CommentRow;
use super::util::map_sqlx_error;

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.text, c.created, \
     u.id AS author_id, u.username AS author_username, u.display_name AS author_display_name \
     FROM comments c \
     LEFT JOIN users u ON u.id = c.author_id ";

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created DESC, c.id DESC"
        ))
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn insert_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
