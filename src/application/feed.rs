//! Read side: index, group, profile and follow feeds plus the post detail view.

use std::num::NonZeroU32;
use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    CommentListRecord, CommentsRepo, FollowsRepo, GroupsRepo, PostFilter, PostListRecord,
    PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};
use crate::domain::types::{Member, Viewer};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostListRecord>,
}

pub struct ProfileFeed {
    pub author: UserRecord,
    pub post_count: u64,
    /// False for anonymous viewers and for authors viewing their own profile.
    pub following: bool,
    pub is_self: bool,
    pub page: Page<PostListRecord>,
}

pub struct PostDetail {
    pub post: PostListRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentListRecord>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    per_page: NonZeroU32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        per_page: NonZeroU32,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            per_page,
        }
    }

    /// All posts, newest first.
    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostListRecord>, FeedError> {
        self.paginate(PostFilter::All, page).await
    }

    pub async fn group(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let page = self.paginate(PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: &Viewer,
        page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::UnknownAuthor)?;

        let is_self = viewer.user_id() == Some(author.id);
        let following = match viewer.member() {
            Some(member) if !is_self => self.follows.is_following(member.id, author.id).await?,
            _ => false,
        };

        let page = self.paginate(PostFilter::Author(author.id), page).await?;
        Ok(ProfileFeed {
            post_count: page.total,
            author,
            following,
            is_self,
            page,
        })
    }

    /// Posts by authors the member follows; empty when they follow nobody.
    pub async fn follow_feed(
        &self,
        member: &Member,
        page: Option<&str>,
    ) -> Result<Page<PostListRecord>, FeedError> {
        self.paginate(PostFilter::FollowedBy(member.id), page).await
    }

    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(FeedError::UnknownPost)?;
        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author_id))
            .await?;
        let comments = self.comments.list_comments(post.id).await?;

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
        })
    }

    async fn paginate(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<PostListRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let paginator = Paginator::new(total, self.per_page);
        let number = paginator.resolve(page);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts
                .list_posts(filter, paginator.window(number))
                .await?
        };
        Ok(paginator.page(number, items))
    }
}
