use std::{io::ErrorKind, sync::Arc};

use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bytes::Bytes;
use metrics::counter;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{
        comments::CommentService,
        error::{AppError, ErrorReport, HttpError},
        feed::{FeedError, FeedService},
        follows::FollowService,
        pagination::PageNumber,
        posts::{EditOutcome, PostInput, PostService},
        repos::UsersRepo,
    },
    cache::{CacheState, response_cache_layer},
    domain::{entities::CommentRecord, posts},
    infra::{
        db::PostgresRepositories,
        uploads::{UploadStorage, UploadStorageError},
    },
    presentation::views::{
        CommentView, FollowTemplate, GroupTemplate, IndexTemplate, PaginationView,
        PostDetailTemplate, PostDetailView, PostFormTemplate, ProfileTemplate, ViewerView,
        render_not_found_response, render_template_response,
    },
};

use super::{
    auth::{AuthSession, login_redirect, resolve_session},
    db_health_response,
    forms::{CommentForm, parse_post_form},
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<dyn UsersRepo>,
    pub db: Arc<PostgresRepositories>,
    pub upload_storage: Arc<UploadStorage>,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState, upload_body_limit: usize) -> Router {
    // Only the global feed sits behind the response cache. Every other
    // listing always reflects the latest writes.
    let cached_routes = Router::new().route("/", get(index));

    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let plain_routes = Router::new()
        .route("/group/{slug}/", get(group_index))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", post(follow_author))
        .route("/profile/{username}/unfollow/", post(unfollow_author))
        .route("/follow/", get(follow_index))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(edit_form).post(edit_submit))
        .route("/posts/{id}/comment/", post(add_comment))
        .route("/create/", get(create_form).post(create_submit))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health))
        .route("/_cache/clear", post(clear_cache));

    cached_routes
        .merge(plain_routes)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(state, resolve_session))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

async fn index(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = PageNumber::parse(query.page.as_deref());

    match state.feed.global_page(page).await {
        Ok(feed) => render_template_response(
            IndexTemplate {
                viewer: session.viewer(),
                posts: feed.cards,
                pagination: PaginationView::new(&feed.window, "/"),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, session.viewer()),
    }
}

async fn group_index(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = PageNumber::parse(query.page.as_deref());

    match state.feed.group_page(&slug, page).await {
        Ok((group, feed)) => {
            let base_path = format!("/group/{slug}/");
            render_template_response(
                GroupTemplate {
                    viewer: session.viewer(),
                    group,
                    posts: feed.cards,
                    pagination: PaginationView::new(&feed.window, &base_path),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, session.viewer()),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = PageNumber::parse(query.page.as_deref());

    match state.feed.author_page(&username, page, session.user()).await {
        Ok((profile, feed)) => {
            let base_path = format!("/profile/{username}/");
            render_template_response(
                ProfileTemplate {
                    viewer: session.viewer(),
                    profile,
                    posts: feed.cards,
                    pagination: PaginationView::new(&feed.window, &base_path),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, session.viewer()),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect("/follow/");
    };
    let page = PageNumber::parse(query.page.as_deref());

    match state.feed.following_page(user.id, page).await {
        Ok(feed) => render_template_response(
            FollowTemplate {
                viewer: session.viewer(),
                posts: feed.cards,
                pagination: PaginationView::new(&feed.window, "/follow/"),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, session.viewer()),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(session.viewer());
    };
    render_post_detail(&state, &session, id, StatusCode::OK, String::new(), None).await
}

async fn render_post_detail(
    state: &HttpState,
    session: &AuthSession,
    id: Uuid,
    status: StatusCode,
    comment_text: String,
    comment_error: Option<String>,
) -> Response {
    let detail = match state.posts.detail(id).await {
        Ok(detail) => detail,
        Err(AppError::NotFound) => return render_not_found_response(session.viewer()),
        Err(err) => return err.into_response(),
    };
    let comments = match state.comments.list_for_post(id).await {
        Ok(comments) => comments,
        Err(err) => return err.into_response(),
    };

    let can_edit = session.user().is_some_and(|user| {
        detail
            .post
            .author
            .as_ref()
            .is_some_and(|author| author.id == user.id)
    });

    let card = detail.card;
    let view = PostDetailView {
        id: detail.post.id,
        title: card.preview.clone(),
        text: detail.post.text.clone(),
        published: card.published,
        author_username: card.author_username,
        author_name: card.author_name,
        author_post_count: detail.author_post_count,
        group_title: card.group_title,
        group_slug: card.group_slug,
        image_url: card.image_url,
        can_edit,
    };

    render_template_response(
        PostDetailTemplate {
            viewer: session.viewer(),
            post: view,
            comments: comments.iter().map(comment_to_view).collect(),
            comment_text,
            comment_error,
        },
        status,
    )
}

async fn create_form(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
) -> Response {
    if session.user().is_none() {
        return login_redirect("/create/");
    }

    match state.posts.form_context(None, None, None).await {
        Ok(form) => render_template_response(
            PostFormTemplate {
                viewer: session.viewer(),
                form,
            },
            StatusCode::OK,
        ),
        Err(err) => err.into_response(),
    }
}

async fn create_submit(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    multipart: Multipart,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect("/create/");
    };

    let form = match parse_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let image_path = match store_form_image(&state.upload_storage, form.image).await {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    let input = PostInput {
        text: form.text,
        group_id: form.group_id,
        image_path,
    };

    match state.posts.create(user, input.clone()).await {
        Ok(_) => Redirect::to(&format!("/profile/{}/", user.username)).into_response(),
        Err(err) if err.status_code() == StatusCode::BAD_REQUEST => {
            render_post_form_error(&state, &session, None, input, err).await
        }
        Err(err) => err.into_response(),
    }
}

async fn edit_form(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect(&format!("/posts/{id}/edit/"));
    };
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(session.viewer());
    };

    match state.posts.load_for_edit(user, id).await {
        Ok(Some(existing)) => match state.posts.form_context(Some(&existing), None, None).await {
            Ok(form) => render_template_response(
                PostFormTemplate {
                    viewer: session.viewer(),
                    form,
                },
                StatusCode::OK,
            ),
            Err(err) => err.into_response(),
        },
        // Someone else's post: back to the read-only view.
        Ok(None) => Redirect::to(&format!("/posts/{id}/")).into_response(),
        Err(AppError::NotFound) => render_not_found_response(session.viewer()),
        Err(err) => err.into_response(),
    }
}

async fn edit_submit(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect(&format!("/posts/{id}/edit/"));
    };
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(session.viewer());
    };

    let form = match parse_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let image_path = match store_form_image(&state.upload_storage, form.image).await {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    let input = PostInput {
        text: form.text,
        group_id: form.group_id,
        image_path,
    };

    match state.posts.edit(user, id, input.clone()).await {
        Ok(EditOutcome::Updated(updated)) => {
            Redirect::to(&format!("/posts/{}/", updated.id)).into_response()
        }
        Ok(EditOutcome::NotAuthor) => Redirect::to(&format!("/posts/{id}/")).into_response(),
        Err(AppError::NotFound) => render_not_found_response(session.viewer()),
        Err(err) if err.status_code() == StatusCode::BAD_REQUEST => {
            render_post_form_error(&state, &session, Some(id), input, err).await
        }
        Err(err) => err.into_response(),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    axum::Form(form): axum::Form<CommentForm>,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect(&format!("/posts/{id}/comment/"));
    };
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(session.viewer());
    };

    match state.comments.add_comment(user, id, &form.text).await {
        Ok(_) => Redirect::to(&format!("/posts/{id}/")).into_response(),
        Err(AppError::NotFound) => render_not_found_response(session.viewer()),
        Err(err) if err.status_code() == StatusCode::BAD_REQUEST => {
            let message = err.to_string();
            let mut response = render_post_detail(
                &state,
                &session,
                id,
                StatusCode::BAD_REQUEST,
                form.text,
                Some(message),
            )
            .await;
            ErrorReport::from_error(
                "infra::http::public::add_comment",
                StatusCode::BAD_REQUEST,
                &err,
            )
            .attach(&mut response);
            response
        }
        Err(err) => err.into_response(),
    }
}

async fn follow_author(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(username): Path<String>,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect(&format!("/profile/{username}/follow/"));
    };

    match state.follows.follow(user, &username).await {
        Ok(()) => Redirect::to(&format!("/profile/{username}/")).into_response(),
        Err(AppError::NotFound) => render_not_found_response(session.viewer()),
        Err(err) => err.into_response(),
    }
}

async fn unfollow_author(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(username): Path<String>,
) -> Response {
    let Some(user) = session.user() else {
        return login_redirect(&format!("/profile/{username}/unfollow/"));
    };

    match state.follows.unfollow(user, &username).await {
        Ok(()) => Redirect::to(&format!("/profile/{username}/")).into_response(),
        Err(AppError::NotFound) => render_not_found_response(session.viewer()),
        Err(err) => err.into_response(),
    }
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

/// Manual cache flush. The response cache is never invalidated by writes,
/// so this is the only way to drop stale entries before their TTL runs out.
async fn clear_cache(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
) -> Response {
    if session.user().is_none() {
        return login_redirect("/_cache/clear");
    }
    if let Some(cache) = &state.cache {
        cache.store.clear();
        counter!("piazza_cache_clear_total").increment(1);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn not_found(Extension(session): Extension<AuthSession>) -> Response {
    render_not_found_response(session.viewer())
}

async fn render_post_form_error(
    state: &HttpState,
    session: &AuthSession,
    editing: Option<Uuid>,
    input: PostInput,
    err: AppError,
) -> Response {
    let existing = match editing {
        Some(id) => match state.posts.find_for_form(id).await {
            Ok(existing) => existing,
            Err(load_err) => return load_err.into_response(),
        },
        None => None,
    };

    let context = state
        .posts
        .form_context(existing.as_ref(), Some(&input), Some(err.to_string()))
        .await;
    match context {
        Ok(form) => {
            let mut response = render_template_response(
                PostFormTemplate {
                    viewer: session.viewer(),
                    form,
                },
                StatusCode::BAD_REQUEST,
            );
            ErrorReport::from_error(
                "infra::http::public::render_post_form_error",
                StatusCode::BAD_REQUEST,
                &err,
            )
            .attach(&mut response);
            response
        }
        Err(err) => err.into_response(),
    }
}

fn feed_error_to_response(err: FeedError, viewer: ViewerView) -> Response {
    match err {
        FeedError::UnknownGroup | FeedError::UnknownAuthor => {
            let message = err.to_string();
            let mut response = render_not_found_response(viewer);
            ErrorReport::from_message(
                "infra::http::feed_error_to_response",
                StatusCode::NOT_FOUND,
                message,
            )
            .attach(&mut response);
            response
        }
        err => HttpError::from(err).into_response(),
    }
}

fn parse_post_id(raw: &str) -> Option<Uuid> {
    raw.parse().ok()
}

fn comment_to_view(comment: &CommentRecord) -> CommentView {
    let (author_username, author_name) = match &comment.author {
        Some(author) => (author.username.clone(), author.display_name.clone()),
        None => (String::new(), String::new()),
    };

    CommentView {
        author_username,
        author_name,
        text: comment.text.clone(),
        created: posts::format_human_datetime(comment.created),
    }
}

async fn store_form_image(
    storage: &UploadStorage,
    image: Option<(String, Bytes)>,
) -> Result<Option<String>, HttpError> {
    const SOURCE: &str = "infra::http::public::store_form_image";

    let Some((file_name, data)) = image else {
        return Ok(None);
    };

    match storage.store_image(&file_name, data).await {
        Ok(stored_path) => Ok(Some(stored_path)),
        Err(
            err @ (UploadStorageError::EmptyPayload
            | UploadStorageError::NotAnImage
            | UploadStorageError::InvalidPath),
        ) => Err(HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid image upload",
            err.to_string(),
        )),
        Err(err) => Err(HttpError::new(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store uploaded image",
            err.to_string(),
        )),
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
