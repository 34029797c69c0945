use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::feed::record_to_card;
use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostFilter, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{PostRecord, UserRecord};
use crate::domain::posts;
use crate::presentation::views::{PostCard, PostFormContext, SelectOption};

/// Raw form input for both the create and the edit screen.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<Uuid>,
    /// Relative media path of a freshly stored upload, if any.
    pub image_path: Option<String>,
}

/// Everything the detail screen needs about one post.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub card: PostCard,
    pub author_post_count: usize,
}

/// Outcome of an edit attempt. Only the author may change a post; anyone
/// else is sent back to the read-only detail view rather than shown an
/// error page.
#[derive(Debug)]
pub enum EditOutcome {
    Updated(PostRecord),
    NotAuthor,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
        }
    }

    pub async fn detail(&self, id: Uuid) -> Result<PostDetail, AppError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let author_post_count = match &post.author {
            Some(author) => {
                let total = self
                    .posts
                    .count_posts(&PostFilter::Author(author.id))
                    .await?;
                usize::try_from(total).unwrap_or(usize::MAX)
            }
            None => 0,
        };

        let card = record_to_card(&post);
        Ok(PostDetail {
            post,
            card,
            author_post_count,
        })
    }

    pub async fn create(
        &self,
        author: &UserRecord,
        input: PostInput,
    ) -> Result<PostRecord, AppError> {
        let text = posts::validate_text(&input.text)?;
        let group_id = self.resolve_group(input.group_id).await?;

        let record = self
            .posts_write
            .create_post(CreatePostParams {
                author_id: author.id,
                text,
                group_id,
                image_path: input.image_path,
            })
            .await?;
        metrics::counter!("piazza_posts_created_total").increment(1);
        Ok(record)
    }

    pub async fn edit(
        &self,
        editor: &UserRecord,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<EditOutcome, AppError> {
        let existing = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let is_author = existing
            .author
            .as_ref()
            .is_some_and(|author| author.id == editor.id);
        if !is_author {
            return Ok(EditOutcome::NotAuthor);
        }

        let text = posts::validate_text(&input.text)?;
        let group_id = self.resolve_group(input.group_id).await?;

        let updated = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                group_id,
                image_path: input.image_path,
            })
            .await?;
        Ok(EditOutcome::Updated(updated))
    }

    /// Fetch a post record for re-rendering the edit form.
    pub async fn find_for_form(&self, id: Uuid) -> Result<Option<PostRecord>, AppError> {
        Ok(self.posts.find_by_id(id).await?)
    }

    /// Fetch a post for the pre-filled edit form, enforcing authorship.
    pub async fn load_for_edit(
        &self,
        editor: &UserRecord,
        post_id: Uuid,
    ) -> Result<Option<PostRecord>, AppError> {
        let existing = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let is_author = existing
            .author
            .as_ref()
            .is_some_and(|author| author.id == editor.id);
        Ok(is_author.then_some(existing))
    }

    /// Build the create/edit form context with the group dropdown populated.
    pub async fn form_context(
        &self,
        editing: Option<&PostRecord>,
        input: Option<&PostInput>,
        error: Option<String>,
    ) -> Result<PostFormContext, AppError> {
        let groups = self.groups.list_all().await?;

        let selected = input
            .and_then(|form| form.group_id)
            .or_else(|| editing.and_then(|post| post.group.as_ref().map(|group| group.id)));

        let group_options = groups
            .iter()
            .map(|group| SelectOption {
                value: group.id.to_string(),
                label: group.title.clone(),
                selected: selected == Some(group.id),
            })
            .collect();

        let text = input
            .map(|form| form.text.clone())
            .or_else(|| editing.map(|post| post.text.clone()))
            .unwrap_or_default();

        Ok(PostFormContext {
            is_edit: editing.is_some(),
            post_id: editing.map(|post| post.id.to_string()).unwrap_or_default(),
            text,
            group_options,
            text_error: error,
        })
    }

    async fn resolve_group(&self, group_id: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
        let Some(id) = group_id else {
            return Ok(None);
        };
        match self.groups.find_by_id(id).await? {
            Some(group) => Ok(Some(group.id)),
            None => Err(AppError::Repo(RepoError::InvalidInput {
                message: format!("group `{id}` does not exist"),
            })),
        }
    }
}
