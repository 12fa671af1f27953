//! Page cache middleware.
//!
//! Replays cached `GET` responses and stores fresh `200 OK` renderings.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use metrics::counter;
use tracing::{debug, instrument};

use super::{CachedResponse, PageCacheConfig, PageKey, PageStore};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct PageCacheState {
    pub config: PageCacheConfig,
    pub store: Arc<PageStore>,
    pub session_cookie: Arc<str>,
}

impl PageCacheState {
    pub fn new(config: PageCacheConfig, session_cookie: impl Into<Arc<str>>) -> Self {
        let store = Arc::new(PageStore::new(&config));
        Self {
            config,
            store,
            session_cookie: session_cookie.into(),
        }
    }

    /// Drop every cached page.
    pub fn clear(&self) {
        self.store.clear();
        debug!(cache = "page", "page cache cleared");
    }

    fn key_for(&self, request: &Request<Body>) -> PageKey {
        let jar = CookieJar::from_headers(request.headers());
        let session = jar.get(&self.session_cookie).map(|cookie| cookie.value());
        PageKey::new(request.uri().path(), request.uri().query(), session)
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<PageCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = cache.key_for(&request);

    if let Some(cached) = cache.store.get(&key, Instant::now()) {
        counter!("yatube_page_cache_hit_total").increment(1);
        debug!(cache = "page", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    counter!("yatube_page_cache_miss_total").increment(1);
    debug!(cache = "page", outcome = "miss", "rendering page");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK || response.headers().contains_key(header::SET_COOKIE)
    {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
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
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect(),
        body: bytes.clone(),
    };

    if cache.store.set(key, cached, Instant::now()).is_some() {
        counter!("yatube_page_cache_evict_total").increment(1);
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
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
