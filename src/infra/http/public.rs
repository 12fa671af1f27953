use std::io::ErrorKind;

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::{
    application::error::HttpError,
    domain::types::Viewer,
    infra::{assets::build_response, media::MediaStorageError},
    presentation::views::{
        FeedView, GroupTemplate, GroupView, IndexTemplate, LayoutChrome, LayoutContext,
        ListingView, PostDetailTemplate, PostDetailView, ProfileTemplate, ProfileView,
        render_template_response,
    },
};

use super::{HttpState, db_health_response, feed_error_to_response, parse_id};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    pub page: Option<String>,
}

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let content = ListingView {
                feed: FeedView::from_page(page, state.timezone),
            };
            let view = LayoutContext::new(LayoutChrome::new(&viewer, uri.path()), content)
                .with_title("Latest posts");
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group(&slug, query.page.as_deref()).await {
        Ok(group_feed) => {
            let content = GroupView::new(group_feed, state.timezone);
            let title = content.title.clone();
            let view = LayoutContext::new(LayoutChrome::new(&viewer, uri.path()), content)
                .with_title(title);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .feed
        .profile(&username, &viewer, query.page.as_deref())
        .await
    {
        Ok(profile) => {
            let content = ProfileView::new(profile, &viewer, state.timezone);
            let title = format!("Profile of {}", content.username);
            let view = LayoutContext::new(LayoutChrome::new(&viewer, uri.path()), content)
                .with_title(title);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return super::not_found(&viewer, &uri);
    };

    match state.feed.post_detail(id).await {
        Ok(detail) => {
            let content = PostDetailView::new(detail, &viewer, state.timezone);
            let title = format!("Post {}", content.post.preview);
            let view = LayoutContext::new(LayoutChrome::new(&viewer, uri.path()), content)
                .with_title(title);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.media.read(&path).await {
        Ok(bytes) => build_response(bytes, mime_guess::from_path(&path).first_or_octet_stream()),
        Err(MediaStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested media path is not valid",
        )
        .into_response(),
        Err(MediaStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested media file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::internal(SOURCE, &err).into_response()
        }
    }
}

pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

pub(super) async fn not_found(viewer: Viewer, uri: Uri) -> Response {
    super::not_found(&viewer, &uri)
}
