use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::claims::Identity,
    error::{AppError, AppResult},
    images::{remove_images, store_images, MultipartForm},
    listing::ListQuery,
    ownership::{authorize, not_found, Mutation},
    properties::{
        dto::{existing_photos, PropertyInput, PropertyListResponse},
        repo_types::Property,
    },
    state::AppState,
};

pub const PHOTO_FOLDER: &str = "properties";

pub async fn list(st: &AppState, query: &ListQuery) -> AppResult<PropertyListResponse> {
    let page = query.page();
    let (properties, total) = st.properties.list(page, query.sort()).await?;
    Ok(PropertyListResponse {
        properties,
        current_page: page.number,
        total_pages: page.total_pages(total),
        total_properties: total,
    })
}

pub async fn list_own(st: &AppState, owner: &Identity) -> AppResult<Vec<Property>> {
    st.properties.list_by_owner(owner.user_id).await
}

/// Detail view; every successful read counts as a view.
pub async fn get(st: &AppState, id: Uuid) -> AppResult<Property> {
    st.properties
        .record_view(id)
        .await?
        .ok_or_else(not_found::<Property>)
}

pub async fn create(st: &AppState, owner: &Identity, form: MultipartForm) -> AppResult<Property> {
    let input = PropertyInput::from_form(&form)?;
    let mut property = input.into_property(owner.user_id, Vec::new(), OffsetDateTime::now_utc())?;

    let uploads = &st.config.uploads;
    property.photos = store_images(st.storage.as_ref(), uploads, PHOTO_FOLDER, form.files).await?;

    match st.properties.insert(&property).await {
        Ok(saved) => {
            info!(property_id = %saved.id, user_id = %owner.user_id, photos = saved.photos.len(), "property created");
            Ok(saved)
        }
        Err(e) => {
            remove_images(st.storage.as_ref(), uploads, &property.photos).await;
            Err(e)
        }
    }
}

/// Photos after an update: the kept subset of `current` followed by `added`.
/// `None` when the request leaves photos alone.
fn merged_photos(current: &[String], keep: Option<Vec<String>>, added: &[String]) -> Option<Vec<String>> {
    if keep.is_none() && added.is_empty() {
        return None;
    }
    let keep = keep.unwrap_or_default();
    let mut photos: Vec<String> = current
        .iter()
        .filter(|p| keep.contains(p))
        .cloned()
        .collect();
    photos.extend(added.iter().cloned());
    Some(photos)
}

pub async fn update(
    st: &AppState,
    caller: &Identity,
    id: Uuid,
    form: MultipartForm,
) -> AppResult<Property> {
    let current = st.properties.find_by_id(id).await?;
    let mut property = authorize(current, caller, Mutation::Update)?;

    let input = PropertyInput::from_form(&form)?;
    let keep = existing_photos(&form);
    let uploads = &st.config.uploads;

    let kept_count = keep
        .as_ref()
        .map(|k| property.photos.iter().filter(|p| k.contains(p)).count())
        .unwrap_or(0);
    if kept_count + form.files.len() > uploads.max_property_photos {
        return Err(AppError::field(
            "photos",
            format!("At most {} photos are allowed", uploads.max_property_photos),
        ));
    }

    let added = store_images(st.storage.as_ref(), uploads, PHOTO_FOLDER, form.files).await?;
    let previous = property.photos.clone();
    input.apply(&mut property);
    if let Some(photos) = merged_photos(&previous, keep, &added) {
        property.photos = photos;
    }

    let saved = match st.properties.update(&property).await {
        Ok(saved) => saved,
        Err(e) => {
            remove_images(st.storage.as_ref(), uploads, &added).await;
            return Err(e);
        }
    };

    let dropped: Vec<String> = previous
        .into_iter()
        .filter(|p| !saved.photos.contains(p))
        .collect();
    remove_images(st.storage.as_ref(), uploads, &dropped).await;

    info!(property_id = %saved.id, dropped = dropped.len(), added = added.len(), "property updated");
    Ok(saved)
}

/// Deletes the record, then its photo files.
pub async fn delete(st: &AppState, caller: &Identity, id: Uuid) -> AppResult<()> {
    let current = st.properties.find_by_id(id).await?;
    let property = authorize(current, caller, Mutation::Delete)?;

    if !st.properties.delete(property.id).await? {
        warn!(property_id = %property.id, "property vanished before delete");
        return Err(not_found::<Property>());
    }
    remove_images(st.storage.as_ref(), &st.config.uploads, &property.photos).await;
    info!(property_id = %property.id, user_id = %caller.user_id, "property deleted");
    Ok(())
}
