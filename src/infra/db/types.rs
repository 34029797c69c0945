//! Row types bridging query results and domain records.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    AuthorRef, CommentRecord, FollowRecord, GroupRecord, GroupRef, PostRecord, UserRecord,
};

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct GroupRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        GroupRecord {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
        }
    }
}

/// Post row with the author and group joined in. Both joins are LEFT: a
/// deleted author or group leaves the post standing with the reference
/// nulled out.
#[derive(Debug, FromRow)]
pub(super) struct PostRow {
    pub id: Uuid,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub image_path: Option<String>,
    pub author_id: Option<Uuid>,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub group_id: Option<Uuid>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let author = match (row.author_id, row.author_username) {
            (Some(id), Some(username)) => Some(AuthorRef {
                id,
                username,
                display_name: row.author_display_name.unwrap_or_default(),
            }),
            _ => None,
        };

        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupRef { id, title, slug }),
            _ => None,
        };

        PostRecord {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author,
            group,
            image_path: row.image_path,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct CommentRow {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub text: String,
    pub created: OffsetDateTime,
    pub author_id: Option<Uuid>,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        let author = match (row.author_id, row.author_username) {
            (Some(id), Some(username)) => Some(AuthorRef {
                id,
                username,
                display_name: row.author_display_name.unwrap_or_default(),
            }),
            _ => None,
        };

        CommentRecord {
            id: row.id,
            post_id: row.post_id,
            author,
            text: row.text,
            created: row.created,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct FollowRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        FollowRecord {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
        }
    }
}
