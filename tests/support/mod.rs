//! In-memory repositories and an application harness for integration tests.
#![allow(dead_code)]

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chrono_tz::Tz;
use tempfile::TempDir;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;
use yatube::{
    application::{
        accounts::AccountService,
        feed::FeedService,
        follows::FollowService,
        pagination::PageWindow,
        posts::PostService,
        repos::{
            CommentListRecord, CommentsRepo, CreateCommentParams, CreateGroupParams,
            CreatePostParams, CreateUserParams, FollowsRepo, GroupsRepo, HealthRepo, PostFilter,
            PostListRecord, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo,
            UpdatePostParams, UsersRepo,
        },
    },
    cache::{PageCacheConfig, PageCacheState},
    config::SessionSettings,
    domain::entities::{
        CommentRecord, FollowRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
    },
    domain::types::Member,
    infra::{
        http::{HttpState, build_router},
        media::MediaStorage,
    },
};

pub const COOKIE_NAME: &str = "yatube_session";
pub const PASSWORD: &str = "correct-horse-battery";

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

#[derive(Default)]
struct State {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn list_record(&self, post: &PostRecord) -> PostListRecord {
        let author = self
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .map(|user| user.username.clone())
            .unwrap_or_default();
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id));

        PostListRecord {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            author_id: post.author_id,
            author_username: author,
            group_id: post.group_id,
            group_title: group.map(|group| group.title.clone()),
            group_slug: group.map(|group| group.slug.clone()),
        }
    }

    fn matches(&self, post: &PostRecord, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(id) => post.group_id == Some(id),
            PostFilter::Author(id) => post.author_id == id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|follow| follow.user_id == user_id && follow.author_id == post.author_id),
        }
    }
}

/// Every repository trait over one shared in-memory state.
#[derive(Default, Clone)]
pub struct InMemoryRepos {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepos {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let user = UserRecord {
            id,
            username: username.to_string(),
            password_hash: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        user
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.create_group(CreateGroupParams {
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        })
        .await
        .expect("group")
    }

    /// Insert a post with an explicit publication time.
    pub async fn post_at(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<&GroupRecord>,
        pub_date: OffsetDateTime,
    ) -> PostRecord {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let post = PostRecord {
            id,
            text: text.to_string(),
            pub_date,
            author_id: author.id,
            group_id: group.map(|group| group.id),
            image: None,
        };
        state.posts.push(post.clone());
        post
    }

    pub async fn post(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<&GroupRecord>,
    ) -> PostRecord {
        self.post_at(author, text, group, OffsetDateTime::now_utc())
            .await
    }

    pub async fn stored_post(&self, id: i64) -> Option<PostRecord> {
        self.state
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub async fn latest_post(&self) -> Option<PostRecord> {
        self.state.lock().await.posts.last().cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }

    pub async fn follow_count(&self) -> usize {
        self.state.lock().await.follows.len()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn delete_post_directly(&self, id: i64) {
        let mut state = self.state.lock().await;
        state.posts.retain(|post| post.id != id);
        state.comments.retain(|comment| comment.post_id != id);
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let id = state.next_id();
        let user = UserRecord {
            id,
            username: params.username,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepos {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(groups)
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let id = state.next_id();
        let group = GroupRecord {
            id,
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| state.matches(post, filter))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        window: PageWindow,
    ) -> Result<Vec<PostListRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| state.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .map(|post| state.list_record(post))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostListRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.list_record(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let post = PostRecord {
            id,
            text: params.text,
            pub_date: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<PostRecord>, RepoError> {
        let mut state = self.state.lock().await;
        let Some(post) = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id && post.author_id == params.author_id)
        else {
            return Ok(None);
        };
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64, author_id: i64) -> Result<Option<PostRecord>, RepoError> {
        let mut state = self.state.lock().await;
        let Some(index) = state
            .posts
            .iter()
            .position(|post| post.id == id && post.author_id == author_id)
        else {
            return Ok(None);
        };
        let removed = state.posts.remove(index);
        state.comments.retain(|comment| comment.post_id != id);
        Ok(Some(removed))
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentListRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut comments: Vec<CommentListRecord> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentListRecord {
                id: comment.id,
                post_id: comment.post_id,
                author_id: comment.author_id,
                author_username: state
                    .users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .map(|user| user.username.clone())
                    .unwrap_or_default(),
                text: comment.text.clone(),
                created: comment.created,
            })
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let comment = CommentRecord {
            id,
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepos {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_not_self".to_string(),
            });
        }
        if state
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|follow| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(state.follows.len() != before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id))
    }
}

#[async_trait]
impl SessionsRepo for InMemoryRepos {
    async fn create_session(&self, session: SessionRecord) -> Result<(), RepoError> {
        self.state.lock().await.sessions.push(session);
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.sessions.iter().find(|session| session.id == id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .sessions
            .retain(|session| session.id != id);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|session| !session.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub fn per_page() -> NonZeroU32 {
    NonZeroU32::new(10).expect("non-zero")
}

pub fn feed_service(repos: &InMemoryRepos) -> FeedService {
    let repos = Arc::new(repos.clone());
    FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos,
        per_page(),
    )
}

pub fn post_service(repos: &InMemoryRepos) -> PostService {
    let repos = Arc::new(repos.clone());
    PostService::new(repos.clone(), repos.clone(), repos.clone(), repos, 5 * 1024 * 1024)
}

pub fn follow_service(repos: &InMemoryRepos) -> FollowService {
    let repos = Arc::new(repos.clone());
    FollowService::new(repos.clone(), repos)
}

pub fn account_service(repos: &InMemoryRepos) -> AccountService {
    let repos = Arc::new(repos.clone());
    AccountService::new(repos.clone(), repos, time::Duration::days(14))
}

pub fn member(user: &UserRecord) -> Member {
    Member {
        id: user.id,
        username: user.username.clone(),
    }
}

/// A router over in-memory repositories with media in a temporary directory.
pub struct TestApp {
    pub repos: InMemoryRepos,
    pub state: HttpState,
    pub router: Router,
    _media_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(PageCacheConfig {
            enabled: true,
            ttl: Duration::from_secs(20),
            capacity: 64,
        })
    }

    pub fn with_cache(cache: PageCacheConfig) -> Self {
        let repos = InMemoryRepos::new();
        let media_dir = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(media_dir.path().to_path_buf()).expect("media storage");

        let state = HttpState {
            feed: Arc::new(feed_service(&repos)),
            posts: Arc::new(post_service(&repos)),
            follows: Arc::new(follow_service(&repos)),
            accounts: Arc::new(account_service(&repos)),
            health: Arc::new(repos.clone()),
            media: Arc::new(media),
            page_cache: PageCacheState::new(cache, COOKIE_NAME),
            session: SessionSettings {
                cookie_name: COOKIE_NAME.to_string(),
                ttl: time::Duration::days(14),
                secure_cookie: false,
            },
            timezone: Tz::UTC,
            max_upload_bytes: 5 * 1024 * 1024,
        };
        let router = build_router(state.clone());

        Self {
            repos,
            state,
            router,
            _media_dir: media_dir,
        }
    }

    /// Create an account and return the cookie header value for its session.
    pub async fn login_as(&self, username: &str) -> (UserRecord, String) {
        let user = self
            .state
            .accounts
            .register(username, PASSWORD)
            .await
            .expect("registered");
        let session = self
            .state
            .accounts
            .start_session(&user)
            .await
            .expect("session");
        (user, format!("{COOKIE_NAME}={}", session.token))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body)).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        form: MultipartBody,
    ) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, form.content_type());
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(form.finish())).expect("request"))
            .await
    }
}

/// Minimal `multipart/form-data` encoder.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("yatube-test-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status, "unexpected status");
}
