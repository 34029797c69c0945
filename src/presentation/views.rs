//! View structs handed to the askama templates, plus render helpers.
//!
//! Every field is precomputed by the services; templates only branch and
//! print.

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::PageWindow;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: ViewerView) -> Response {
    let mut response =
        render_template_response(NotFoundTemplate { viewer }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Identity of the requester as the layout shows it.
#[derive(Debug, Clone, Default)]
pub struct ViewerView {
    pub is_authenticated: bool,
    pub username: String,
}

/// One post as rendered in feed listings and at the top of the detail page.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub preview: String,
    pub published: String,
    pub author_username: String,
    pub author_name: String,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub image_url: Option<String>,
}

/// Pagination controls with links precomputed against the listing path.
#[derive(Debug, Clone)]
pub struct PaginationView {
    pub number: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_link: String,
    pub next_link: String,
}

impl PaginationView {
    pub fn new(window: &PageWindow, base_path: &str) -> Self {
        Self {
            number: window.number,
            total_pages: window.total_pages,
            has_previous: window.has_previous,
            has_next: window.has_next,
            previous_link: format!("{base_path}?page={}", window.previous_number()),
            next_link: format!("{base_path}?page={}", window.next_number()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub post_count: usize,
    pub follower_count: usize,
    pub following_count: usize,
    pub viewer_follows: bool,
    pub is_self: bool,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub created: String,
}

#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Create/edit form context. `text` carries the submitted value back on a
/// validation failure so nothing the user typed is lost.
#[derive(Debug, Clone)]
pub struct PostFormContext {
    pub is_edit: bool,
    pub post_id: String,
    pub text: String,
    pub group_options: Vec<SelectOption>,
    pub text_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostDetailView {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub published: String,
    pub author_username: String,
    pub author_name: String,
    pub author_post_count: usize,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub image_url: Option<String>,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub viewer: ViewerView,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub viewer: ViewerView,
    pub group: GroupView,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub viewer: ViewerView,
    pub profile: ProfileView,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub viewer: ViewerView,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub viewer: ViewerView,
    pub post: PostDetailView,
    pub comments: Vec<CommentView>,
    /// Carries a rejected comment back into the form so nothing typed is lost.
    pub comment_text: String,
    pub comment_error: Option<String>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub viewer: ViewerView,
    pub form: PostFormContext,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub viewer: ViewerView,
}
