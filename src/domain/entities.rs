//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// An account known to the service. Provisioned out of band; piazza only
/// resolves and references users, it never creates them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

/// A named community posts may be filed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Author summary embedded in a post or comment row.
///
/// `None` at the embedding site means the account was deleted; the content
/// is retained, orphaned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

/// Group summary embedded in a post row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub text: String,
    /// Assigned by the server at creation; never updated afterwards.
    pub pub_date: OffsetDateTime,
    pub author: Option<AuthorRef>,
    pub group: Option<GroupRef>,
    /// Stored path of the attached image, relative to the uploads root.
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    /// `None` once the commented post has been deleted.
    pub post_id: Option<Uuid>,
    pub author: Option<AuthorRef>,
    pub text: String,
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowRecord {
    pub id: Uuid,
    /// The follower.
    pub user_id: Uuid,
    /// The followed author.
    pub author_id: Uuid,
}
