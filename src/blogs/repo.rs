use axum::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::blogs::repo_types::{Blog, BlogRow, BlogStatus, LikeState};
use crate::error::AppResult;
use crate::listing::{Page, SortBy};

#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn insert(&self, blog: &Blog) -> AppResult<Blog>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Blog>>;
    /// One page of published posts plus their total count.
    async fn list_published(&self, page: Page, sort: SortBy) -> AppResult<(Vec<Blog>, u64)>;
    /// Writes title, content, tags, status and `updated_at`.
    async fn update(&self, blog: &Blog) -> AppResult<Blog>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    /// New view count, `None` for an unknown blog.
    async fn increment_views(&self, id: Uuid) -> AppResult<Option<i64>>;
    /// Adds or removes `user_id` from the likers in one statement.
    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<LikeState>>;
    /// Counts a like without recording who gave it.
    async fn add_anonymous_like(&self, id: Uuid) -> AppResult<Option<i64>>;
}

const BLOG_COLUMNS: &str = "id, author_id, title, content, tags, cover_image, status, \
     views, likes, liked_by, created_at, updated_at";

fn order_clause(sort: SortBy) -> &'static str {
    match sort {
        SortBy::Latest => "created_at DESC, id",
        SortBy::Trending => "views DESC, likes DESC, created_at DESC, id",
    }
}

#[derive(FromRow)]
struct LikeRow {
    likes: i64,
    liked: bool,
}

pub struct PgBlogRepository {
    db: PgPool,
}

impl PgBlogRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlogRepository for PgBlogRepository {
    async fn insert(&self, b: &Blog) -> AppResult<Blog> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            r#"
            INSERT INTO blogs ({BLOG_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(b.id)
        .bind(b.author_id)
        .bind(&b.title)
        .bind(&b.content)
        .bind(&b.tags)
        .bind(&b.cover_image)
        .bind(b.status.as_str())
        .bind(b.views)
        .bind(b.likes)
        .bind(&b.liked_by)
        .bind(b.created_at)
        .bind(b.updated_at)
        .fetch_one(&self.db)
        .await?;
        Ok(Blog::try_from(row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Blog>> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Blog::try_from).transpose()?)
    }

    async fn list_published(&self, page: Page, sort: SortBy) -> AppResult<(Vec<Blog>, u64)> {
        let published = BlogStatus::Published.as_str();
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE status = $1")
            .bind(published)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, BlogRow>(&format!(
            r#"
            SELECT {BLOG_COLUMNS}
            FROM blogs
            WHERE status = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            order_clause(sort)
        ))
        .bind(published)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let blogs = rows
            .into_iter()
            .map(Blog::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((blogs, total.max(0) as u64))
    }

    async fn update(&self, b: &Blog) -> AppResult<Blog> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            r#"
            UPDATE blogs
               SET title = $2, content = $3, tags = $4, status = $5, updated_at = $6
             WHERE id = $1
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(b.id)
        .bind(&b.title)
        .bind(&b.content)
        .bind(&b.tags)
        .bind(b.status.as_str())
        .bind(b.updated_at)
        .fetch_one(&self.db)
        .await?;
        Ok(Blog::try_from(row)?)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn increment_views(&self, id: Uuid) -> AppResult<Option<i64>> {
        let views = sqlx::query_scalar::<_, i64>(
            "UPDATE blogs SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(views)
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<LikeState>> {
        // RETURNING sees the updated row
        let row = sqlx::query_as::<_, LikeRow>(
            r#"
            UPDATE blogs
               SET liked_by = CASE WHEN $2 = ANY(liked_by)
                                   THEN array_remove(liked_by, $2)
                                   ELSE array_append(liked_by, $2) END,
                   likes    = CASE WHEN $2 = ANY(liked_by)
                                   THEN GREATEST(likes - 1, 0)
                                   ELSE likes + 1 END
             WHERE id = $1
            RETURNING likes, ($2 = ANY(liked_by)) AS liked
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|r| LikeState {
            likes: r.likes,
            liked: r.liked,
        }))
    }

    async fn add_anonymous_like(&self, id: Uuid) -> AppResult<Option<i64>> {
        let likes = sqlx::query_scalar::<_, i64>(
            "UPDATE blogs SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(likes)
    }
}
