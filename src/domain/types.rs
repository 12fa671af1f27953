//! Shared domain value types.

use serde::Serialize;

/// A logged-in user as seen by request handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
}

/// Identity of whoever issued the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Viewer {
    #[default]
    Anonymous,
    Member(Member),
}

impl Viewer {
    pub fn member(&self) -> Option<&Member> {
        match self {
            Viewer::Member(member) => Some(member),
            Viewer::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.member().map(|member| member.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.member().map(|member| member.username.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Member(_))
    }
}

/// Result of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}
