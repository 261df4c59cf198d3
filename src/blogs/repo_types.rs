use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ownership::Owned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    Draft,
    #[default]
    Published,
}

impl BlogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
        }
    }

    pub fn parse(raw: &str) -> Option<BlogStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(BlogStatus::Draft),
            "published" => Some(BlogStatus::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Blog {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub likes: i64,
    /// Users who liked the post; anonymous likes only bump `likes`.
    pub liked_by: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Blog {
    const KIND: &'static str = "blog";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub likes: i64,
    pub liked: bool,
}

#[derive(Debug, FromRow)]
pub struct BlogRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub status: String,
    pub views: i64,
    pub likes: i64,
    pub liked_by: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<BlogRow> for Blog {
    type Error = anyhow::Error;

    fn try_from(r: BlogRow) -> Result<Self, Self::Error> {
        let status = BlogStatus::parse(&r.status)
            .ok_or_else(|| anyhow::anyhow!("unknown blog status {:?} on blog {}", r.status, r.id))?;
        Ok(Self {
            id: r.id,
            author_id: r.author_id,
            title: r.title,
            content: r.content,
            tags: r.tags,
            cover_image: r.cover_image,
            status,
            views: r.views,
            likes: r.likes,
            liked_by: r.liked_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
