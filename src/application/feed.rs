use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{PageNumber, PageWindow, Paginator};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::domain::posts;
use crate::presentation::views::{GroupView, PostCard, ProfileView};

/// Which feed a listing request targets.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFilter {
    Global,
    Group(String),
    Author(String),
    Following(Uuid),
}

/// One resolved page of a feed, ready for the templates.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub cards: Vec<PostCard>,
    pub window: PageWindow,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: usize,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            paginator: Paginator::new(page_size),
        }
    }

    /// Page of the global feed, newest first.
    pub async fn global_page(&self, page: PageNumber) -> Result<FeedPage, FeedError> {
        self.load_page(&PostFilter::All, page).await
    }

    /// Page of a group feed together with the group itself.
    /// An unknown slug is a not-found, never an empty feed.
    pub async fn group_page(
        &self,
        slug: &str,
        page: PageNumber,
    ) -> Result<(GroupView, FeedPage), FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let feed = self.load_page(&PostFilter::Group(group.id), page).await?;
        Ok((group_to_view(&group), feed))
    }

    /// Page of an author feed plus the profile header data. `viewer` drives
    /// the follow button state; anonymous viewers never follow anyone.
    pub async fn author_page(
        &self,
        username: &str,
        page: PageNumber,
        viewer: Option<&UserRecord>,
    ) -> Result<(ProfileView, FeedPage), FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownAuthor)?;

        let feed = self.load_page(&PostFilter::Author(author.id), page).await?;
        let followers = self.follows.count_followers(author.id).await?;
        let following = self.follows.count_following(author.id).await?;

        let (viewer_follows, is_self) = match viewer {
            Some(user) if user.id == author.id => (false, true),
            Some(user) => (self.follows.exists(user.id, author.id).await?, false),
            None => (false, false),
        };

        let profile = ProfileView {
            username: author.username.clone(),
            display_name: author.display_name.clone(),
            post_count: feed.window.total_items,
            follower_count: usize::try_from(followers).unwrap_or(usize::MAX),
            following_count: usize::try_from(following).unwrap_or(usize::MAX),
            viewer_follows,
            is_self,
        };
        Ok((profile, feed))
    }

    /// Page of posts by every author the user follows.
    pub async fn following_page(
        &self,
        user_id: Uuid,
        page: PageNumber,
    ) -> Result<FeedPage, FeedError> {
        self.load_page(&PostFilter::FollowedBy(user_id), page).await
    }

    async fn load_page(
        &self,
        filter: &PostFilter,
        page: PageNumber,
    ) -> Result<FeedPage, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let total_items = usize::try_from(total).unwrap_or(usize::MAX);
        let window = self.paginator.paginate(total_items, page);

        let records = self
            .posts
            .list_page(filter, window.limit as u64, window.offset as u64)
            .await?;

        let cards = records.iter().map(record_to_card).collect();
        Ok(FeedPage { cards, window })
    }
}

pub fn record_to_card(record: &PostRecord) -> PostCard {
    let (author_username, author_name) = match &record.author {
        Some(author) => (author.username.clone(), author.display_name.clone()),
        None => (String::new(), String::new()),
    };

    PostCard {
        id: record.id,
        preview: posts::preview(&record.text).to_string(),
        published: posts::format_human_datetime(record.pub_date),
        author_username,
        author_name,
        group_title: record.group.as_ref().map(|group| group.title.clone()),
        group_slug: record.group.as_ref().map(|group| group.slug.clone()),
        image_url: record.image_path.as_ref().map(|path| media_url(path)),
    }
}

pub fn media_url(path: &str) -> String {
    format!("/media/{path}")
}

fn group_to_view(group: &GroupRecord) -> GroupView {
    GroupView {
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}
