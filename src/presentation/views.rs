use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono_tz::Tz;
use thiserror::Error;

use crate::application::accounts::AccountFormErrors;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupFeed, PostDetail, ProfileFeed};
use crate::application::pagination::Page;
use crate::application::posts::PostFormErrors;
use crate::application::repos::{CommentListRecord, PostListRecord};
use crate::domain::entities::GroupRecord;
use crate::domain::posts;
use crate::domain::types::Viewer;
use crate::infra::media::media_url;
use crate::util::timezone::{display_datetime, iso_datetime};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Parts of the page shared by every template: who is looking and where.
#[derive(Clone)]
pub struct LayoutChrome {
    pub username: Option<String>,
    pub current_path: String,
}

impl LayoutChrome {
    pub fn new(viewer: &Viewer, current_path: impl Into<String>) -> Self {
        Self {
            username: viewer.username().map(str::to_string),
            current_path: current_path.into(),
        }
    }

    pub fn is_active(&self, path: &str) -> bool {
        self.current_path == path
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub chrome: LayoutChrome,
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            chrome,
            title: String::new(),
            content,
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub preview: String,
    pub author: String,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub image_url: Option<String>,
    pub published: String,
    pub iso_date: String,
}

impl PostCard {
    pub fn from_record(record: PostListRecord, tz: Tz) -> Self {
        Self {
            id: record.id,
            preview: posts::preview(&record.text),
            published: display_datetime(record.pub_date, tz),
            iso_date: iso_datetime(record.pub_date, tz),
            image_url: record.image.as_deref().map(media_url),
            text: record.text,
            author: record.author_username,
            group_title: record.group_title,
            group_slug: record.group_slug,
        }
    }

    pub fn detail_href(&self) -> String {
        format!("/posts/{}/", self.id)
    }
}

#[derive(Clone)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub first_href: Option<String>,
    pub last_href: Option<String>,
}

impl PaginatorView {
    fn from_page<T>(page: &Page<T>) -> Self {
        let href = |number: u64| format!("?page={number}");
        Self {
            number: page.number,
            num_pages: page.num_pages,
            previous_href: page.previous_number().map(href),
            next_href: page.next_number().map(href),
            first_href: (page.number > 2).then(|| href(1)),
            last_href: (page.number + 1 < page.num_pages).then(|| href(page.num_pages)),
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

/// A page of post cards plus its navigation.
pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl FeedView {
    pub fn from_page(page: Page<PostListRecord>, tz: Tz) -> Self {
        let paginator = PaginatorView::from_page(&page);
        Self {
            posts: page
                .map(|record| PostCard::from_record(record, tz))
                .items,
            paginator,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Index and follow pages: a feed with no extra header.
pub struct ListingView {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<ListingView>,
}

pub struct GroupView {
    pub title: String,
    pub description: String,
    pub feed: FeedView,
}

impl GroupView {
    pub fn new(group_feed: GroupFeed, tz: Tz) -> Self {
        Self {
            title: group_feed.group.title,
            description: group_feed.group.description,
            feed: FeedView::from_page(group_feed.page, tz),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub following: bool,
    pub show_follow: bool,
    pub feed: FeedView,
}

impl ProfileView {
    pub fn new(profile: ProfileFeed, viewer: &Viewer, tz: Tz) -> Self {
        Self {
            show_follow: viewer.is_authenticated() && !profile.is_self,
            username: profile.author.username,
            post_count: profile.post_count,
            following: profile.following,
            feed: FeedView::from_page(profile.page, tz),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct CommentView {
    pub author: String,
    pub text: String,
    pub created: String,
    pub iso_date: String,
}

impl CommentView {
    fn from_record(record: CommentListRecord, tz: Tz) -> Self {
        Self {
            created: display_datetime(record.created, tz),
            iso_date: iso_datetime(record.created, tz),
            author: record.author_username,
            text: record.text,
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

impl PostDetailView {
    pub fn new(detail: PostDetail, viewer: &Viewer, tz: Tz) -> Self {
        Self {
            can_edit: posts::can_mutate(&detail.post.to_record(), viewer),
            can_comment: viewer.is_authenticated(),
            post: PostCard::from_record(detail.post, tz),
            author_post_count: detail.author_post_count,
            comments: detail
                .comments
                .into_iter()
                .map(|comment| CommentView::from_record(comment, tz))
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Create and edit share one form; `post_id` is set when editing.
pub struct PostFormView {
    pub post_id: Option<i64>,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image_url: Option<String>,
    pub errors: PostFormErrors,
}

impl PostFormView {
    pub fn new(
        post_id: Option<i64>,
        text: impl Into<String>,
        selected_group: Option<&str>,
        groups: Vec<GroupRecord>,
    ) -> Self {
        let selected_group = selected_group.map(str::trim);
        Self {
            post_id,
            text: text.into(),
            groups: groups
                .into_iter()
                .map(|group| GroupOption {
                    selected: selected_group == Some(group.id.to_string().as_str()),
                    id: group.id,
                    title: group.title,
                })
                .collect(),
            current_image_url: None,
            errors: PostFormErrors::default(),
        }
    }

    pub fn with_image(self, stored_path: Option<&str>) -> Self {
        Self {
            current_image_url: stored_path.map(media_url),
            ..self
        }
    }

    pub fn with_errors(self, errors: PostFormErrors) -> Self {
        Self { errors, ..self }
    }

    pub fn is_edit(&self) -> bool {
        self.post_id.is_some()
    }

    pub fn action(&self) -> String {
        match self.post_id {
            Some(id) => format!("/posts/{id}/edit/"),
            None => "/create/".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct LoginView {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct SignupView {
    pub username: String,
    pub errors: AccountFormErrors,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<()>,
}
