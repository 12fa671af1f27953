use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::{
    application::{error::HttpError, follows::FollowError},
    domain::types::{FollowOutcome, Viewer},
    presentation::views::{
        FeedView, FollowTemplate, LayoutChrome, LayoutContext, ListingView,
        render_template_response,
    },
};

use super::{
    HttpState, feed_error_to_response, not_found, profile_path, public::PageQuery,
    require_member,
};

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };

    match state.feed.follow_feed(&member, query.page.as_deref()).await {
        Ok(page) => {
            let content = ListingView {
                feed: FeedView::from_page(page, state.timezone),
            };
            let view = LayoutContext::new(LayoutChrome::new(&viewer, uri.path()), content)
                .with_title("Following");
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer, &uri),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(username): Path<String>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };

    match state.follows.follow(&member, &username).await {
        Ok(outcome) => {
            if outcome != FollowOutcome::Created {
                debug!(follower = %member.username, author = %username, ?outcome, "follow unchanged");
            }
            Redirect::to(&profile_path(&username)).into_response()
        }
        Err(err) => follow_error_response(err, &viewer, &uri),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(username): Path<String>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };

    match state.follows.unfollow(&member, &username).await {
        Ok(_) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => follow_error_response(err, &viewer, &uri),
    }
}

fn follow_error_response(err: FollowError, viewer: &Viewer, uri: &Uri) -> Response {
    match err {
        FollowError::UnknownAuthor => not_found(viewer, uri),
        err => HttpError::from(err).into_response(),
    }
}
