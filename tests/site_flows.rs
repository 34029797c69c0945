//! End-to-end flows through the public router backed by in-memory
//! repositories.

mod support;

use axum::http::StatusCode;

use support::{PNG_PIXEL, assert_redirect, body_string, location, test_app};

fn count_cards(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}

/// Collects formatted log output so tests can assert on emitted fields.
#[derive(Clone, Default)]
struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("utf8 logs")
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn response_log_names_the_session_user() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = test_app();
    app.store.add_user("alice");
    let response = app.get_as("alice", "/no/such/page/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let logs = capture.contents();
    assert!(logs.contains("client request error"));
    assert!(logs.contains("alice"));
}

#[tokio::test]
async fn global_feed_splits_thirteen_posts_across_two_pages() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    for n in 1..=13 {
        app.store.add_post(&alice, None, &format!("post number {n}"));
    }

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page_one = body_string(response).await;
    assert_eq!(count_cards(&page_one), 10);
    assert!(page_one.contains("Page 1 of 2"));
    assert!(page_one.contains("Next"));
    assert!(!page_one.contains(">Previous<"));
    // Newest first.
    assert!(page_one.contains("post number 13"));
    assert!(!page_one.contains("post number 3</p>"));

    let page_two = body_string(app.get("/?page=2").await).await;
    assert_eq!(count_cards(&page_two), 3);
    assert!(page_two.contains("Page 2 of 2"));
    assert!(page_two.contains("Previous"));
}

#[tokio::test]
async fn page_parameter_is_forgiving() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    for n in 1..=13 {
        app.store.add_post(&alice, None, &format!("post number {n}"));
    }

    // Garbage falls back to the first page.
    let garbage = body_string(app.get("/?page=banana").await).await;
    assert!(garbage.contains("Page 1 of 2"));

    // Past the end clamps to the last page.
    let clamped = body_string(app.get("/?page=99").await).await;
    assert!(clamped.contains("Page 2 of 2"));
    assert_eq!(count_cards(&clamped), 3);
}

#[tokio::test]
async fn empty_feed_is_a_single_page() {
    let app = test_app();
    let html = body_string(app.get("/").await).await;
    assert!(html.contains("No posts yet."));
    assert!(html.contains("Page 1 of 1"));
}

#[tokio::test]
async fn group_feed_only_lists_that_group() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let cats = app.store.add_group("Cats", "cats");
    let dogs = app.store.add_group("Dogs", "dogs");
    app.store.add_post(&alice, Some(&cats), "a cat post");
    app.store.add_post(&alice, Some(&dogs), "a dog post");
    app.store.add_post(&alice, None, "an ungrouped post");

    let response = app.get("/group/cats/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert_eq!(count_cards(&html), 1);
    assert!(html.contains("a cat post"));
    assert!(!html.contains("a dog post"));
    assert!(!html.contains("an ungrouped post"));
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let app = test_app();
    let response = app.get("/group/nope/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_string(response).await;
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn profile_lists_only_that_author() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let bob = app.store.add_user("bob");
    app.store.add_post(&alice, None, "written by alice");
    app.store.add_post(&bob, None, "written by bob");

    let html = body_string(app.get("/profile/alice/").await).await;
    assert_eq!(count_cards(&html), 1);
    assert!(html.contains("written by alice"));
    assert!(!html.contains("written by bob"));
    assert!(html.contains("1 posts"));
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = test_app();
    let response = app.get("/profile/ghost/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_detail_shows_text_and_author() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let post = app.store.add_post(&alice, None, "a full body much longer than the preview cut");

    let response = app.get(&format!("/posts/{}/", post.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("a full body much longer than the preview cut"));
    assert!(html.contains("alice"));
    assert!(html.contains("No comments yet."));
}

#[tokio::test]
async fn missing_post_detail_is_not_found() {
    let app = test_app();
    let response = app
        .get("/posts/00000000-0000-0000-0000-000000000000/")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/posts/not-a-uuid/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_post_redirects_and_shows_up_in_feeds() {
    let app = test_app();
    app.store.add_user("alice");
    let cats = app.store.add_group("Cats", "cats");

    let response = app
        .post_multipart(
            Some("alice"),
            "/create/",
            "fresh from the form",
            Some(&cats.id.to_string()),
        )
        .await;
    assert_redirect(&response, "/profile/alice/");

    // Read-after-write: every uncached listing reflects it immediately.
    let global = body_string(app.get("/").await).await;
    assert!(global.contains("fresh from the form"));
    let group = body_string(app.get("/group/cats/").await).await;
    assert!(group.contains("fresh from the form"));
    let profile = body_string(app.get("/profile/alice/").await).await;
    assert!(profile.contains("fresh from the form"));
}

#[tokio::test]
async fn anonymous_create_is_sent_to_login() {
    let app = test_app();

    let form = app.get("/create/").await;
    assert_redirect(&form, "/auth/login/?next=/create/");

    let submit = app.post_multipart(None, "/create/", "never stored", None).await;
    assert_redirect(&submit, "/auth/login/?next=/create/");
    assert!(app.store.posts.read().unwrap().is_empty());
}

#[tokio::test]
async fn post_with_image_round_trips() {
    let app = test_app();
    app.store.add_user("alice");
    let group = app.store.add_group("Rustaceans", "rustaceans");

    let response = app
        .post_multipart_with_image(
            Some("alice"),
            "/create/",
            "look at this",
            Some(&group.id.to_string()),
            Some(("pixel.png", PNG_PIXEL)),
        )
        .await;
    assert_redirect(&response, "/profile/alice/");

    let stored = {
        let posts = app.store.posts.read().unwrap();
        posts[0].clone()
    };
    assert_eq!(stored.text, "look at this");
    let image_path = stored.image_path.clone().expect("image stored");

    let detail = body_string(app.get(&format!("/posts/{}/", stored.id)).await).await;
    assert!(detail.contains("look at this"));
    assert!(detail.contains("Rustaceans"));
    assert!(detail.contains(&format!("/media/{image_path}")));

    let media = app.get(&format!("/media/{image_path}")).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(
        media.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = http_body_util::BodyExt::collect(media.into_body())
        .await
        .unwrap()
        .to_bytes();
    assert_eq!(&bytes[..], PNG_PIXEL);
}

#[tokio::test]
async fn blank_post_text_rerenders_the_form() {
    let app = test_app();
    app.store.add_user("alice");

    let response = app.post_multipart(Some("alice"), "/create/", "   ", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await;
    assert!(html.contains("text must not be empty"));
    assert!(app.store.posts.read().unwrap().is_empty());
}

#[tokio::test]
async fn author_edits_in_place() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let post = app.store.add_post(&alice, None, "original text");

    let response = app
        .post_multipart(
            Some("alice"),
            &format!("/posts/{}/edit/", post.id),
            "revised text",
            None,
        )
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    // Updated in place, not duplicated.
    assert_eq!(app.store.posts.read().unwrap().len(), 1);
    let detail = body_string(app.get(&format!("/posts/{}/", post.id)).await).await;
    assert!(detail.contains("revised text"));
    assert!(!detail.contains("original text"));
}

#[tokio::test]
async fn non_author_edit_bounces_to_detail() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    app.store.add_user("bob");
    let post = app.store.add_post(&alice, None, "belongs to alice");

    let form = app.get_as("bob", &format!("/posts/{}/edit/", post.id)).await;
    assert_redirect(&form, &format!("/posts/{}/", post.id));

    let submit = app
        .post_multipart(
            Some("bob"),
            &format!("/posts/{}/edit/", post.id),
            "hijacked",
            None,
        )
        .await;
    assert_redirect(&submit, &format!("/posts/{}/", post.id));

    let detail = body_string(app.get(&format!("/posts/{}/", post.id)).await).await;
    assert!(detail.contains("belongs to alice"));
    assert!(!detail.contains("hijacked"));
}

#[tokio::test]
async fn edit_form_prefills_for_the_author() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let post = app.store.add_post(&alice, None, "prefilled content");

    let response = app.get_as("alice", &format!("/posts/{}/edit/", post.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("prefilled content"));
    assert!(html.contains("Edit post"));
}

#[tokio::test]
async fn comment_appears_after_submission() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    app.store.add_user("bob");
    let post = app.store.add_post(&alice, None, "commentable");

    let response = app
        .post_form(
            Some("bob"),
            &format!("/posts/{}/comment/", post.id),
            "text=nice%20post",
        )
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let detail = body_string(app.get(&format!("/posts/{}/", post.id)).await).await;
    assert!(detail.contains("nice post"));
    assert!(detail.contains("bob"));
}

#[tokio::test]
async fn comments_render_newest_first() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    app.store.add_user("bob");
    let post = app.store.add_post(&alice, None, "commentable");

    for text in ["text=first%20comment", "text=second%20comment"] {
        let response = app
            .post_form(Some("bob"), &format!("/posts/{}/comment/", post.id), text)
            .await;
        assert_redirect(&response, &format!("/posts/{}/", post.id));
    }

    let detail = body_string(app.get(&format!("/posts/{}/", post.id)).await).await;
    let newest = detail.find("second comment").expect("newest comment renders");
    let oldest = detail.find("first comment").expect("oldest comment renders");
    assert!(newest < oldest);
}

#[tokio::test]
async fn blank_comment_redisplays_the_detail_page() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    app.store.add_user("bob");
    let post = app.store.add_post(&alice, None, "commentable");

    let response = app
        .post_form(
            Some("bob"),
            &format!("/posts/{}/comment/", post.id),
            "text=%20%20",
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await;
    assert!(html.contains("commentable"));
    assert!(html.contains("text must not be empty"));
    assert!(app.store.comments.read().unwrap().is_empty());
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = test_app();
    app.store.add_user("bob");

    let response = app
        .post_form(
            Some("bob"),
            "/posts/00000000-0000-0000-0000-000000000000/comment/",
            "text=into%20the%20void",
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.comments.read().unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_comment_is_sent_to_login() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let post = app.store.add_post(&alice, None, "commentable");

    let response = app
        .post_form(None, &format!("/posts/{}/comment/", post.id), "text=hi")
        .await;
    assert_redirect(
        &response,
        &format!("/auth/login/?next=/posts/{}/comment/", post.id),
    );
}

#[tokio::test]
async fn follow_feed_tracks_subscriptions() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    let carol = app.store.add_user("carol");
    app.store.add_user("bob");
    app.store.add_post(&alice, None, "from alice");
    app.store.add_post(&carol, None, "from carol");

    // Nothing followed yet.
    let empty = body_string(app.get_as("bob", "/follow/").await).await;
    assert!(empty.contains("No posts yet."));

    let response = app.post_form(Some("bob"), "/profile/alice/follow/", "").await;
    assert_redirect(&response, "/profile/alice/");

    let feed = body_string(app.get_as("bob", "/follow/").await).await;
    assert!(feed.contains("from alice"));
    assert!(!feed.contains("from carol"));
}

#[tokio::test]
async fn follow_is_idempotent() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    app.store.add_user("bob");

    for _ in 0..3 {
        let response = app.post_form(Some("bob"), "/profile/alice/follow/", "").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    assert_eq!(app.store.follows.read().unwrap().len(), 1);

    let profile = body_string(app.get("/profile/alice/").await).await;
    assert!(profile.contains("1 followers"));
    let _ = alice;
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let app = test_app();
    app.store.add_user("alice");

    let response = app.post_form(Some("alice"), "/profile/alice/follow/", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.follows.read().unwrap().is_empty());
}

#[tokio::test]
async fn unfollow_is_a_noop_without_subscription() {
    let app = test_app();
    app.store.add_user("alice");
    app.store.add_user("bob");

    let response = app.post_form(Some("bob"), "/profile/alice/unfollow/", "").await;
    assert_redirect(&response, "/profile/alice/");
}

#[tokio::test]
async fn unfollow_removes_the_subscription() {
    let app = test_app();
    let alice = app.store.add_user("alice");
    app.store.add_user("bob");
    app.store.add_post(&alice, None, "from alice");

    app.post_form(Some("bob"), "/profile/alice/follow/", "").await;
    app.post_form(Some("bob"), "/profile/alice/unfollow/", "").await;

    assert!(app.store.follows.read().unwrap().is_empty());
    let feed = body_string(app.get_as("bob", "/follow/").await).await;
    assert!(feed.contains("No posts yet."));
}

#[tokio::test]
async fn anonymous_follow_feed_is_sent_to_login() {
    let app = test_app();
    let response = app.get("/follow/").await;
    assert_redirect(&response, "/auth/login/?next=/follow/");
}

#[tokio::test]
async fn unknown_route_renders_not_found_page() {
    let app = test_app();
    let response = app.get("/definitely/not/here/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_string(response).await;
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn unknown_identity_header_is_anonymous() {
    let app = test_app();
    let response = app.get_as("ghost", "/create/").await;
    assert_eq!(location(&response), "/auth/login/?next=/create/");
}
