use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;

use super::public::HttpState;
use crate::domain::entities::UserRecord;
use crate::presentation::views::ViewerView;

/// Header carrying the authenticated username, set by the fronting proxy.
pub const USER_HEADER: &str = "x-piazza-user";

/// Resolved requester identity, attached to every request. `None` means
/// anonymous.
#[derive(Clone, Default)]
pub struct AuthSession(Option<UserRecord>);

impl AuthSession {
    pub fn authenticated(user: UserRecord) -> Self {
        Self(Some(user))
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }

    pub fn viewer(&self) -> ViewerView {
        match &self.0 {
            Some(user) => ViewerView {
                is_authenticated: true,
                username: user.username.clone(),
            },
            None => ViewerView::default(),
        }
    }
}

/// Resolve the trusted username header against the users table. Unknown
/// usernames and lookup failures both fall back to an anonymous session.
pub async fn resolve_session(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let session = match header_value {
        Some(username) if !username.is_empty() => {
            match state.users.find_by_username(&username).await {
                Ok(Some(user)) => AuthSession::authenticated(user),
                Ok(None) => {
                    warn!(
                        target = "piazza::http::auth",
                        username = %username,
                        "identity header named an unknown user"
                    );
                    AuthSession::default()
                }
                Err(err) => {
                    warn!(
                        target = "piazza::http::auth",
                        username = %username,
                        error = %err,
                        "failed to resolve identity header"
                    );
                    AuthSession::default()
                }
            }
        }
        _ => AuthSession::default(),
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Redirect an anonymous requester to the login screen, preserving where
/// they were headed.
pub fn login_redirect(next_path: &str) -> Response {
    Redirect::to(&format!("/auth/login/?next={next_path}")).into_response()
}
