//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Selects which posts a feed query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post, newest first.
    All,
    /// Posts assigned to the group with this id.
    Group(Uuid),
    /// Posts written by the author with this id.
    Author(Uuid),
    /// Posts by every author this user follows.
    FollowedBy(Uuid),
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    /// `None` leaves the stored image untouched.
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    /// Page of posts matching `filter`, ordered newest first.
    async fn list_page(
        &self,
        filter: &PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments under a post, newest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn insert_comment(&self, params: CreateCommentParams)
        -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid)
        -> Result<FollowRecord, RepoError>;

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError>;

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError>;
}
