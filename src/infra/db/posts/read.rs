use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::pagination::PageWindow;
use crate::application::repos::{PostFilter, PostListRecord, PostsRepo, RepoError};
use crate::infra::db::map_sqlx_error;
use crate::infra::db::util::convert_count;

use super::POST_LIST_COLUMNS;
use super::PostgresRepositories;
use super::types::PostListRow;

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        window: PageWindow,
    ) -> Result<Vec<PostListRecord>, RepoError> {
        let limit = i64::try_from(window.limit)
            .map_err(|_| RepoError::InvalidInput {
                message: "page size out of range".to_string(),
            })?;
        let offset = i64::try_from(window.offset)
            .map_err(|_| RepoError::InvalidInput {
                message: "page offset out of range".to_string(),
            })?;

        let mut qb = QueryBuilder::new(POST_LIST_COLUMNS);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostListRecord::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LIST_COLUMNS);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostListRecord::from))
    }
}
