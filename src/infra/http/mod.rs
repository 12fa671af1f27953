mod accounts;
mod follows;
mod middleware;
mod posts;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono_tz::Tz;

use crate::{
    application::{
        accounts::AccountService,
        error::{ErrorReport, HttpError},
        feed::{FeedError, FeedService},
        follows::FollowService,
        posts::PostService,
        repos::{HealthRepo, RepoError},
    },
    cache::{PageCacheState, page_cache_layer},
    config::SessionSettings,
    domain::types::{Member, Viewer},
    infra::media::MediaStorage,
    presentation::views::{LayoutChrome, render_not_found_response},
};

pub use middleware::RequestContext;

const LOGIN_PATH: &str = "/auth/login/";
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub media: Arc<MediaStorage>,
    pub page_cache: PageCacheState,
    pub session: SessionSettings,
    pub timezone: Tz,
    pub max_upload_bytes: u64,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the index is cached; every other page reflects writes immediately.
    let cached_routes = Router::new()
        .route("/", get(public::index))
        .layer(from_fn_with_state(
            state.page_cache.clone(),
            page_cache_layer,
        ));

    let body_limit = usize::try_from(state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
        .unwrap_or(usize::MAX);

    let routes = Router::new()
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/posts/{id}/", get(public::post_detail))
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{id}/delete/", post(posts::delete_post))
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/follow/", get(follows::follow_index))
        .route(
            "/profile/{username}/follow/",
            get(follows::profile_follow).post(follows::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follows::profile_unfollow).post(follows::profile_unfollow),
        )
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup_submit),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route(
            "/auth/logout/",
            get(accounts::logout).post(accounts::logout),
        )
        .route("/media/{*path}", get(public::serve_media))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/_health/db", get(public::db_health))
        .fallback(public::not_found);

    cached_routes
        .merge(routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(state.clone(), middleware::resolve_viewer))
        .with_state(state)
        .layer(from_fn(middleware::log_responses))
        .layer(from_fn(middleware::set_request_context))
}

/// The member behind the request, or a redirect to the login page that
/// returns to `uri` afterwards.
fn require_member(viewer: &Viewer, uri: &Uri) -> Result<Member, Response> {
    match viewer.member() {
        Some(member) => Ok(member.clone()),
        None => Err(login_redirect(uri.path())),
    }
}

pub fn login_redirect(next: &str) -> Response {
    let encoded = url::form_urlencoded::byte_serialize(next.as_bytes())
        .collect::<String>()
        .replace("%2F", "/");
    Redirect::to(&format!("{LOGIN_PATH}?next={encoded}")).into_response()
}

/// Ids in paths are parsed by hand so that malformed ones render the 404 page.
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn post_detail_path(id: i64) -> String {
    format!("/posts/{id}/")
}

fn profile_path(username: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{encoded}/")
}

fn not_found(viewer: &Viewer, uri: &Uri) -> Response {
    render_not_found_response(LayoutChrome::new(viewer, uri.path()))
}

fn feed_error_to_response(err: FeedError, viewer: &Viewer, uri: &Uri) -> Response {
    match err {
        FeedError::UnknownGroup | FeedError::UnknownAuthor | FeedError::UnknownPost => {
            let mut response = not_found(viewer, uri);
            ErrorReport::from_error(
                "infra::http::feed_error_to_response",
                StatusCode::NOT_FOUND,
                &err,
            )
            .attach(&mut response);
            response
        }
        err => HttpError::from(err).into_response(),
    }
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
