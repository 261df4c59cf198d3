use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::claims::Identity,
    blogs::{
        dto::{AuthorSummary, BlogChanges, BlogListResponse, BlogResponse, NewBlogInput},
        repo_types::{Blog, LikeState},
    },
    error::{AppError, AppResult},
    images::{remove_images, store_images, MultipartForm},
    listing::ListQuery,
    ownership::{authorize, not_found, Mutation},
    state::AppState,
};

pub const COVER_FOLDER: &str = "blogs";

async fn author_of(st: &AppState, author_id: Uuid, with_email: bool) -> AppResult<Option<AuthorSummary>> {
    let user = st.users.find_by_id(author_id).await?;
    if user.is_none() {
        warn!(%author_id, "blog author no longer exists");
    }
    Ok(user.map(|u| AuthorSummary::from_user(&u, with_email)))
}

/// Published posts only, authors populated without email.
pub async fn list(st: &AppState, query: &ListQuery) -> AppResult<BlogListResponse> {
    let page = query.page();
    let (blogs, total) = st.blogs.list_published(page, query.sort()).await?;

    let mut authors: HashMap<Uuid, Option<AuthorSummary>> = HashMap::new();
    let mut out = Vec::with_capacity(blogs.len());
    for blog in blogs {
        let author = match authors.get(&blog.author_id) {
            Some(known) => known.clone(),
            None => {
                let found = author_of(st, blog.author_id, false).await?;
                authors.insert(blog.author_id, found.clone());
                found
            }
        };
        out.push(BlogResponse::new(blog, author));
    }

    Ok(BlogListResponse {
        blogs: out,
        current_page: page.number,
        total_pages: page.total_pages(total),
        total_blogs: total,
    })
}

/// Any status; the author carries an email here.
pub async fn get(st: &AppState, id: Uuid) -> AppResult<BlogResponse> {
    let blog = st
        .blogs
        .find_by_id(id)
        .await?
        .ok_or_else(not_found::<Blog>)?;
    let author = author_of(st, blog.author_id, true).await?;
    Ok(BlogResponse::new(blog, author))
}

/// `creator` has already passed the content role check.
pub async fn create(st: &AppState, creator: &Identity, form: MultipartForm) -> AppResult<BlogResponse> {
    let input = NewBlogInput::from_form(&form)?;
    let uploads = &st.config.uploads;
    let cover = store_images(st.storage.as_ref(), uploads, COVER_FOLDER, form.files)
        .await?
        .into_iter()
        .next();

    let blog = input.into_blog(creator.user_id, cover, OffsetDateTime::now_utc());
    let saved = match st.blogs.insert(&blog).await {
        Ok(saved) => saved,
        Err(e) => {
            if let Some(cover) = &blog.cover_image {
                remove_images(st.storage.as_ref(), uploads, std::slice::from_ref(cover)).await;
            }
            return Err(e);
        }
    };
    info!(blog_id = %saved.id, user_id = %creator.user_id, "blog created");

    let author = author_of(st, saved.author_id, false).await?;
    Ok(BlogResponse::new(saved, author))
}

pub async fn update(
    st: &AppState,
    caller: &Identity,
    id: Uuid,
    changes: BlogChanges,
) -> AppResult<BlogResponse> {
    let current = st.blogs.find_by_id(id).await?;
    let mut blog = authorize(current, caller, Mutation::Update)?;
    changes.apply(&mut blog, OffsetDateTime::now_utc())?;

    let saved = st.blogs.update(&blog).await?;
    info!(blog_id = %saved.id, "blog updated");
    let author = author_of(st, saved.author_id, false).await?;
    Ok(BlogResponse::new(saved, author))
}

/// Deletes the post, then its cover image.
pub async fn delete(st: &AppState, caller: &Identity, id: Uuid) -> AppResult<()> {
    let current = st.blogs.find_by_id(id).await?;
    let blog = authorize(current, caller, Mutation::Delete)?;

    if !st.blogs.delete(blog.id).await? {
        return Err(not_found::<Blog>());
    }
    if let Some(cover) = &blog.cover_image {
        remove_images(st.storage.as_ref(), &st.config.uploads, std::slice::from_ref(cover)).await;
    }
    info!(blog_id = %blog.id, user_id = %caller.user_id, "blog deleted");
    Ok(())
}

pub async fn record_view(st: &AppState, id: Uuid) -> AppResult<i64> {
    st.blogs
        .increment_views(id)
        .await?
        .ok_or_else(not_found::<Blog>)
}

/// Signed-in callers toggle their like. Anonymous callers may only add one,
/// and only while anonymous likes are enabled.
pub async fn toggle_like(st: &AppState, caller: Option<&Identity>, id: Uuid) -> AppResult<LikeState> {
    match caller {
        Some(identity) => st
            .blogs
            .toggle_like(id, identity.user_id)
            .await?
            .ok_or_else(not_found::<Blog>),
        None if st.config.allow_anonymous_likes => {
            let likes = st
                .blogs
                .add_anonymous_like(id)
                .await?
                .ok_or_else(not_found::<Blog>)?;
            Ok(LikeState { likes, liked: true })
        }
        None => Err(AppError::Unauthorized(
            "Please log in to like this post".into(),
        )),
    }
}
