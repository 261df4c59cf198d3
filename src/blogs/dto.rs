use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Blog, BlogStatus};
use crate::{
    auth::repo_types::User,
    error::{ensure_valid, AppResult, FieldError},
    images::MultipartForm,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthorSummary {
    pub fn from_user(user: &User, with_email: bool) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: with_email.then(|| user.email.clone()),
        }
    }
}

/// A post with its author populated. `author` is null once the account is gone.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogResponse {
    pub id: Uuid,
    pub author: Option<AuthorSummary>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub likes: i64,
    pub liked_by: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BlogResponse {
    pub fn new(blog: Blog, author: Option<AuthorSummary>) -> Self {
        Self {
            id: blog.id,
            author,
            title: blog.title,
            content: blog.content,
            tags: blog.tags,
            cover_image: blog.cover_image,
            status: blog.status,
            views: blog.views,
            likes: blog.likes,
            liked_by: blog.liked_by,
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListResponse {
    pub blogs: Vec<BlogResponse>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total_blogs: u64,
}

#[derive(Debug, Serialize)]
pub struct ViewsResponse {
    pub views: i64,
}

fn clean_tags<I: IntoIterator<Item = String>>(tags: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Tags arrive either as a JSON array string or as a comma-separated list.
fn parse_tags(raw: &str) -> Result<Vec<String>, FieldError> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        serde_json::from_str::<Vec<String>>(raw)
            .map(clean_tags)
            .map_err(|_| FieldError::new("tags", "tags must be a JSON array of strings"))
    } else {
        Ok(clean_tags(raw.split(',').map(String::from)))
    }
}

fn parse_status(raw: &str) -> Result<BlogStatus, FieldError> {
    BlogStatus::parse(raw)
        .ok_or_else(|| FieldError::new("status", "status must be draft or published"))
}

/// Fields of a new post, read from its multipart form.
#[derive(Debug)]
pub struct NewBlogInput {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: BlogStatus,
}

impl NewBlogInput {
    pub fn from_form(form: &MultipartForm) -> AppResult<Self> {
        let mut errors = Vec::new();
        let title = form.text("title").unwrap_or_default();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        }
        let content = form.text("content").unwrap_or_default();
        if content.is_empty() {
            errors.push(FieldError::new("content", "Content is required"));
        }

        let mut tags = Vec::new();
        for raw in form.values("tags").unwrap_or_default() {
            match parse_tags(raw) {
                Ok(parsed) => tags.extend(parsed),
                Err(e) => errors.push(e),
            }
        }

        let status = match form.text("status") {
            None => BlogStatus::default(),
            Some(raw) => parse_status(&raw).unwrap_or_else(|e| {
                errors.push(e);
                BlogStatus::default()
            }),
        };

        ensure_valid(errors)?;
        Ok(Self {
            title,
            content,
            tags: clean_tags(tags),
            status,
        })
    }

    pub fn into_blog(self, author_id: Uuid, cover_image: Option<String>, now: OffsetDateTime) -> Blog {
        Blog {
            id: Uuid::new_v4(),
            author_id,
            title: self.title,
            content: self.content,
            tags: self.tags,
            cover_image,
            status: self.status,
            views: 0,
            likes: 0,
            liked_by: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// JSON body of a post update; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

impl BlogChanges {
    /// Validates the whole change set before touching `blog`.
    pub fn apply(self, blog: &mut Blog, now: OffsetDateTime) -> AppResult<()> {
        let mut errors = Vec::new();
        let title = self.title.map(|t| t.trim().to_string());
        if title.as_deref() == Some("") {
            errors.push(FieldError::new("title", "Title cannot be empty"));
        }
        let content = self.content.map(|c| c.trim().to_string());
        if content.as_deref() == Some("") {
            errors.push(FieldError::new("content", "Content cannot be empty"));
        }
        let status = match self.status.as_deref().map(parse_status) {
            None => None,
            Some(Ok(s)) => Some(s),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
        };
        ensure_valid(errors)?;

        if let Some(title) = title {
            blog.title = title;
        }
        if let Some(content) = content {
            blog.content = content;
        }
        if let Some(tags) = self.tags {
            blog.tags = clean_tags(tags);
        }
        if let Some(status) = status {
            blog.status = status;
        }
        blog.updated_at = now;
        Ok(())
    }
}
