use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::types::{FollowOutcome, Member};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Subscribe the member to `username`. Repeats and self-follows change nothing.
    pub async fn follow(
        &self,
        member: &Member,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownAuthor)?;

        if author.id == member.id {
            debug!(user = %member.username, "ignoring self-follow");
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follows.follow(member.id, author.id).await? {
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Returns `true` when an existing subscription was removed.
    pub async fn unfollow(&self, member: &Member, username: &str) -> Result<bool, FollowError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownAuthor)?;

        Ok(self.follows.unfollow(member.id, author.id).await?)
    }
}
