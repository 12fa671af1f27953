use time::OffsetDateTime;

use crate::application::repos::PostListRecord;
use crate::domain::entities::PostRecord;

#[derive(sqlx::FromRow)]
pub(super) struct PostRow {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author_id: row.author_id,
            group_id: row.group_id,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct PostListRow {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

impl From<PostListRow> for PostListRecord {
    fn from(row: PostListRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            image: row.image,
            author_id: row.author_id,
            author_username: row.author_username,
            group_id: row.group_id,
            group_title: row.group_title,
            group_slug: row.group_slug,
        }
    }
}
