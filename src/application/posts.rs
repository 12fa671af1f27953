//! Write side for posts and comments: form validation, authorship gate, persistence.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostListRecord, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{self, ImageFormat};
use crate::domain::types::{Member, Viewer};
use crate::util::bytes::format_size;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("unknown post")]
    UnknownPost,
    #[error("post form is invalid")]
    Invalid(Box<PostFormErrors>),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw values submitted through the post form.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Per-field messages shown next to the form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<String>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none() && self.image.is_none()
    }

    fn record(&mut self, error: DomainError) {
        let message = error.message().to_string();
        match error.field() {
            Some("group") => self.group = Some(message),
            Some("image") => self.image = Some(message),
            _ => self.text = Some(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidImage {
    pub filename: String,
    pub bytes: Bytes,
    pub format: ImageFormat,
}

#[derive(Debug, Clone)]
pub struct ValidatedPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ValidImage>,
    pub clear_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Replace(String),
    Clear,
}

/// Validated post content with the image already placed in media storage.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: ImageChange,
}

/// Outcome of an operation guarded by the authorship check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorship<T> {
    Granted(T),
    Denied,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writes: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    max_image_bytes: u64,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writes: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        max_image_bytes: u64,
    ) -> Self {
        Self {
            posts,
            writes,
            groups,
            comments,
            max_image_bytes,
        }
    }

    /// Group choices offered by the post form.
    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn validate(&self, input: PostInput) -> Result<ValidatedPost, PostError> {
        let mut errors = PostFormErrors::default();

        let text = match posts::normalize_text("text", &input.text) {
            Ok(text) => Some(text),
            Err(err) => {
                errors.record(err);
                None
            }
        };

        let group_id = match input.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match self.resolve_group(raw).await? {
                Ok(id) => Some(id),
                Err(err) => {
                    errors.record(err);
                    None
                }
            },
        };

        let image = match input.image {
            Some(upload) if !upload.bytes.is_empty() => match self.check_image(&upload) {
                Ok(format) => Some(ValidImage {
                    filename: upload.filename,
                    bytes: upload.bytes,
                    format,
                }),
                Err(err) => {
                    errors.record(err);
                    None
                }
            },
            _ => None,
        };

        match text {
            Some(text) if errors.is_empty() => Ok(ValidatedPost {
                text,
                group_id,
                image,
                clear_image: input.clear_image,
            }),
            _ => Err(PostError::Invalid(Box::new(errors))),
        }
    }

    pub async fn create(&self, author: &Member, draft: PostDraft) -> Result<PostRecord, PostError> {
        let image = match draft.image {
            ImageChange::Replace(path) => Some(path),
            ImageChange::Keep | ImageChange::Clear => None,
        };

        let record = self
            .writes
            .create_post(CreatePostParams {
                author_id: author.id,
                text: draft.text,
                group_id: draft.group_id,
                image,
            })
            .await?;
        Ok(record)
    }

    /// Load a post for editing, checking that the member wrote it.
    pub async fn editable(
        &self,
        member: &Member,
        id: i64,
    ) -> Result<Authorship<PostListRecord>, PostError> {
        let post = self.posts.find_post(id).await?.ok_or(PostError::UnknownPost)?;
        if posts::can_mutate(&post.to_record(), &Viewer::Member(member.clone())) {
            Ok(Authorship::Granted(post))
        } else {
            Ok(Authorship::Denied)
        }
    }

    pub async fn update(
        &self,
        member: &Member,
        current: &PostListRecord,
        draft: PostDraft,
    ) -> Result<Authorship<PostRecord>, PostError> {
        let image = match draft.image {
            ImageChange::Keep => current.image.clone(),
            ImageChange::Replace(path) => Some(path),
            ImageChange::Clear => None,
        };

        let updated = self
            .writes
            .update_post(UpdatePostParams {
                id: current.id,
                author_id: member.id,
                text: draft.text,
                group_id: draft.group_id,
                image,
            })
            .await?;

        Ok(match updated {
            Some(record) => Authorship::Granted(record),
            None => Authorship::Denied,
        })
    }

    pub async fn delete(
        &self,
        member: &Member,
        id: i64,
    ) -> Result<Authorship<PostRecord>, PostError> {
        match self.editable(member, id).await? {
            Authorship::Granted(post) => match self.writes.delete_post(post.id, member.id).await? {
                Some(record) => Ok(Authorship::Granted(record)),
                None => Ok(Authorship::Denied),
            },
            Authorship::Denied => Ok(Authorship::Denied),
        }
    }

    /// Blank text creates nothing and yields `Ok(None)`.
    pub async fn add_comment(
        &self,
        member: &Member,
        post_id: i64,
        text: &str,
    ) -> Result<Option<CommentRecord>, PostError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::UnknownPost)?;

        let Ok(text) = posts::normalize_text("text", text) else {
            return Ok(None);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: member.id,
                text,
            })
            .await?;
        Ok(Some(comment))
    }

    async fn resolve_group(&self, raw: &str) -> Result<Result<i64, DomainError>, PostError> {
        let invalid = || {
            DomainError::validation(
                "group",
                "Select a valid choice. That choice is not one of the available choices.",
            )
        };

        let Ok(id) = raw.parse::<i64>() else {
            return Ok(Err(invalid()));
        };

        Ok(match self.groups.find_group_by_id(id).await? {
            Some(group) => Ok(group.id),
            None => Err(invalid()),
        })
    }

    fn check_image(&self, upload: &ImageUpload) -> Result<ImageFormat, DomainError> {
        if upload.bytes.len() as u64 > self.max_image_bytes {
            return Err(DomainError::validation(
                "image",
                format!(
                    "The file is too large. Images must not exceed {}.",
                    format_size(self.max_image_bytes)
                ),
            ));
        }
        posts::detect_image(&upload.bytes)
    }
}
