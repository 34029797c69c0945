use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostFilter, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::types::PostRow;
use super::util::map_sqlx_error;

const POST_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image_path, \
     u.id AS author_id, u.username AS author_username, u.display_name AS author_display_name, \
     g.id AS group_id, g.title AS group_title, g.slug AS group_slug \
     FROM posts p \
     LEFT JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id \
     WHERE 1=1 ";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_page(
        &self,
        filter: &PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let limit = i64::try_from(limit)
            .map_err(|_| RepoError::from_persistence("page limit exceeds supported range"))?;
        let offset = i64::try_from(offset)
            .map_err(|_| RepoError::from_persistence("page offset exceeds supported range"))?;

        let mut qb = QueryBuilder::new(POST_SELECT);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(POST_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (author_id, text, group_id, image_path) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(params.author_id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_by_id(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        // COALESCE keeps the stored image when the edit form submits none.
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE posts SET text = $2, group_id = $3, \
             image_path = COALESCE($4, image_path) \
             WHERE id = $1 RETURNING id",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image_path)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let id = updated.ok_or(RepoError::NotFound)?;
        self.find_by_id(id).await?.ok_or(RepoError::NotFound)
    }
}
