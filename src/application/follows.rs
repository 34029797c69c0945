use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Start following `author_username`. Idempotent: following someone
    /// twice keeps a single subscription. Following yourself is rejected.
    pub async fn follow(&self, user: &UserRecord, author_username: &str) -> Result<(), AppError> {
        let author = self
            .users
            .find_by_username(author_username)
            .await?
            .ok_or(AppError::NotFound)?;

        if author.id == user.id {
            return Err(AppError::Domain(DomainError::validation(
                "cannot follow yourself",
            )));
        }

        match self.follows.insert_follow(user.id, author.id).await {
            Ok(_) => Ok(()),
            Err(RepoError::Duplicate { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Stop following `author_username`. Unfollowing someone you never
    /// followed is a no-op.
    pub async fn unfollow(&self, user: &UserRecord, author_username: &str) -> Result<(), AppError> {
        let author = self
            .users
            .find_by_username(author_username)
            .await?
            .ok_or(AppError::NotFound)?;

        self.follows.delete_follow(user.id, author.id).await?;
        Ok(())
    }
}
