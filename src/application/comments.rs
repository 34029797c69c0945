use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo};
use crate::domain::entities::{CommentRecord, UserRecord};
use crate::domain::posts;

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    /// Comments under a post, newest first.
    pub async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, AppError> {
        Ok(self.comments.list_for_post(post_id).await?)
    }

    /// Add a comment. The target post must still exist; commenting on a
    /// deleted post is a not-found, not a silent drop.
    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, AppError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let text = posts::validate_text(text)?;

        let record = self
            .comments
            .insert_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                text,
            })
            .await?;
        metrics::counter!("piazza_comments_created_total").increment(1);
        Ok(record)
    }
}
