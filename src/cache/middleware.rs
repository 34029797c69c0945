//! Response cache middleware.
//!
//! Caches successful GET responses on the routes it wraps and serves them
//! back until the TTL lapses. Writes elsewhere in the system never touch
//! cached entries; a page can stay stale for the full TTL window, and
//! `POST /_cache/clear` drops everything at once.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument};

use super::{CacheConfig, ResponseStore, keys::ResponseKey, store::CachedResponse};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
}

/// Only GET requests that return 200 OK are cached.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled {
        return next.run(request).await;
    }

    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::from_parts(request.uri().path(), request.uri().query());

    if let Some(cached) = cache.store.get(&key) {
        counter!("piazza_cache_hit_total").increment(1);
        debug!(outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    counter!("piazza_cache_miss_total").increment(1);
    debug!(outcome = "miss", "cache miss, executing handler");

    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|text| (name.to_string(), text.to_string()))
            })
            .collect(),
        body: bytes.clone(),
        stored_at: Instant::now(),
    };

    if cache.store.set(key, cached).is_some() {
        counter!("piazza_cache_evict_total").increment(1);
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    use axum::http::HeaderValue;

    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
