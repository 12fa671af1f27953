//! Post form, edit, delete and comment handlers.

use axum::{
    Form,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    application::{
        error::HttpError,
        posts::{
            Authorship, ImageChange, ImageUpload, PostDraft, PostError, PostFormErrors,
            PostInput, ValidatedPost,
        },
        repos::PostListRecord,
    },
    domain::types::{Member, Viewer},
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormTemplate, PostFormView, render_template_response,
    },
};

use super::{HttpState, not_found, parse_id, post_detail_path, profile_path, require_member};

const SOURCE: &str = "infra::http::posts";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    pub text: String,
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    if let Err(redirect) = require_member(&viewer, &uri) {
        return redirect;
    }

    match state.posts.groups().await {
        Ok(groups) => render_form(&viewer, &uri, PostFormView::new(None, "", None, groups)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return rejection.into_response(),
    };
    let input = match read_post_form(multipart).await {
        Ok(input) => input,
        Err(err) => return bad_multipart(err),
    };
    let text = input.text.clone();
    let group = input.group.clone();

    let valid = match state.posts.validate(input).await {
        Ok(valid) => valid,
        Err(PostError::Invalid(errors)) => {
            return rerender_form(&state, &viewer, &uri, None, &text, group.as_deref(), None, *errors)
                .await;
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    let (draft, stored) = match store_draft(&state, valid).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    match state.posts.create(&member, draft).await {
        Ok(post) => {
            info!(post_id = post.id, author = %member.username, "post created");
            Redirect::to(&profile_path(&member.username)).into_response()
        }
        Err(err) => {
            discard_stored(&state, stored.as_deref()).await;
            HttpError::from(err).into_response()
        }
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(raw_id): Path<String>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&viewer, &uri);
    };

    let post = match load_editable(&state, &member, id, &viewer, &uri).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    match state.posts.groups().await {
        Ok(groups) => {
            let group = post.group_id.map(|id| id.to_string());
            let form = PostFormView::new(Some(post.id), post.text.clone(), group.as_deref(), groups)
                .with_image(post.image.as_deref());
            render_form(&viewer, &uri, form)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&viewer, &uri);
    };

    let current = match load_editable(&state, &member, id, &viewer, &uri).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return rejection.into_response(),
    };
    let input = match read_post_form(multipart).await {
        Ok(input) => input,
        Err(err) => return bad_multipart(err),
    };
    let text = input.text.clone();
    let group = input.group.clone();

    let valid = match state.posts.validate(input).await {
        Ok(valid) => valid,
        Err(PostError::Invalid(errors)) => {
            return rerender_form(
                &state,
                &viewer,
                &uri,
                Some(&current),
                &text,
                group.as_deref(),
                current.image.as_deref(),
                *errors,
            )
            .await;
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    let (draft, stored) = match store_draft(&state, valid).await {
        Ok(result) => result,
        Err(response) => return response,
    };
    let replaces_image = draft.image != ImageChange::Keep;

    match state.posts.update(&member, &current, draft).await {
        Ok(Authorship::Granted(post)) => {
            if replaces_image && current.image != post.image {
                discard_stored(&state, current.image.as_deref()).await;
            }
            info!(post_id = post.id, author = %member.username, "post updated");
            Redirect::to(&post_detail_path(post.id)).into_response()
        }
        Ok(Authorship::Denied) => {
            discard_stored(&state, stored.as_deref()).await;
            Redirect::to(&post_detail_path(current.id)).into_response()
        }
        Err(err) => {
            discard_stored(&state, stored.as_deref()).await;
            post_error_response(err, &viewer, &uri)
        }
    }
}

pub(super) async fn delete_post(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(raw_id): Path<String>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&viewer, &uri);
    };

    match state.posts.delete(&member, id).await {
        Ok(Authorship::Granted(post)) => {
            discard_stored(&state, post.image.as_deref()).await;
            info!(post_id = post.id, author = %member.username, "post deleted");
            Redirect::to(&profile_path(&member.username)).into_response()
        }
        Ok(Authorship::Denied) => Redirect::to(&post_detail_path(id)).into_response(),
        Err(err) => post_error_response(err, &viewer, &uri),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    Path(raw_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Response {
    let member = match require_member(&viewer, &uri) {
        Ok(member) => member,
        Err(redirect) => return redirect,
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&viewer, &uri);
    };

    match state.posts.add_comment(&member, id, &form.text).await {
        Ok(_) => Redirect::to(&post_detail_path(id)).into_response(),
        Err(err) => post_error_response(err, &viewer, &uri),
    }
}

/// Loads the post or produces the response for a missing post or a non-author.
async fn load_editable(
    state: &HttpState,
    member: &Member,
    id: i64,
    viewer: &Viewer,
    uri: &Uri,
) -> Result<PostListRecord, Response> {
    match state.posts.editable(member, id).await {
        Ok(Authorship::Granted(post)) => Ok(post),
        Ok(Authorship::Denied) => Err(Redirect::to(&post_detail_path(id)).into_response()),
        Err(err) => Err(post_error_response(err, viewer, uri)),
    }
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostInput, MultipartError> {
    let mut input = PostInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => input.text = field.text().await?,
            "group" => input.group = Some(field.text().await?),
            "image-clear" => {
                let value = field.text().await?;
                input.clear_image = !matches!(value.as_str(), "" | "false" | "off");
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    input.image = Some(ImageUpload { filename, bytes });
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

/// Writes a validated image to media storage and turns the form into a draft.
/// Returns the newly stored path so callers can remove it on failure.
async fn store_draft(
    state: &HttpState,
    valid: ValidatedPost,
) -> Result<(PostDraft, Option<String>), Response> {
    let (image, stored) = match valid.image {
        Some(image) => {
            match state
                .media
                .store_post_image(&image.filename, image.format, image.bytes)
                .await
            {
                Ok(path) => (ImageChange::Replace(path.clone()), Some(path)),
                Err(err) => return Err(HttpError::internal(SOURCE, &err).into_response()),
            }
        }
        None if valid.clear_image => (ImageChange::Clear, None),
        None => (ImageChange::Keep, None),
    };

    Ok((
        PostDraft {
            text: valid.text,
            group_id: valid.group_id,
            image,
        },
        stored,
    ))
}

async fn discard_stored(state: &HttpState, stored: Option<&str>) {
    if let Some(path) = stored
        && let Err(err) = state.media.delete(path).await
    {
        warn!(target = SOURCE, path = %path, error = %err, "failed to remove media file");
    }
}

#[allow(clippy::too_many_arguments)]
async fn rerender_form(
    state: &HttpState,
    viewer: &Viewer,
    uri: &Uri,
    current: Option<&PostListRecord>,
    text: &str,
    group: Option<&str>,
    image: Option<&str>,
    errors: PostFormErrors,
) -> Response {
    match state.posts.groups().await {
        Ok(groups) => {
            let form = PostFormView::new(current.map(|post| post.id), text, group, groups)
                .with_image(image)
                .with_errors(errors);
            render_form(viewer, uri, form)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn render_form(viewer: &Viewer, uri: &Uri, form: PostFormView) -> Response {
    let title = if form.is_edit() { "Edit post" } else { "New post" };
    let view = LayoutContext::new(LayoutChrome::new(viewer, uri.path()), form).with_title(title);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn post_error_response(err: PostError, viewer: &Viewer, uri: &Uri) -> Response {
    match err {
        PostError::UnknownPost => not_found(viewer, uri),
        err => HttpError::from(err).into_response(),
    }
}

fn bad_multipart(err: MultipartError) -> Response {
    HttpError::from_error(
        SOURCE,
        StatusCode::BAD_REQUEST,
        "Malformed form submission",
        &err,
    )
    .into_response()
}
