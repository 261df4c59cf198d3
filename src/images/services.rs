use anyhow::Context;
use bytes::Bytes;
use rand::Rng;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{
    config::UploadConfig,
    error::{AppError, AppResult},
    storage::StorageClient,
};

/// One uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn ext_from_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == ext)
}

/// Checks size and type; both the filename extension and the MIME type must
/// name an allowed image format. Returns the extension to store under.
pub fn validate_image(item: &UploadItem, max_bytes: usize) -> AppResult<&'static str> {
    if item.body.len() > max_bytes {
        return Err(AppError::PayloadTooLarge { limit: max_bytes });
    }
    match (ext_from_name(&item.file_name), ext_from_mime(&item.content_type)) {
        (Some(ext), Some(_)) => Ok(ext),
        _ => Err(AppError::UnsupportedMediaType(
            "Only image files are allowed".into(),
        )),
    }
}

fn object_key(folder: &str, ext: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}/{}-{}.{}", folder, millis, suffix, ext)
}

pub fn public_path(cfg: &UploadConfig, key: &str) -> String {
    format!("{}/{}", cfg.public_prefix.trim_end_matches('/'), key)
}

/// Inverse of [`public_path`]; `None` for paths outside the upload prefix.
pub fn key_from_public_path<'a>(cfg: &UploadConfig, path: &'a str) -> Option<&'a str> {
    let prefix = cfg.public_prefix.trim_end_matches('/');
    path.strip_prefix(prefix)?
        .strip_prefix('/')
        .filter(|k| !k.is_empty())
}

/// Validates every item, then writes them under `folder`.
/// Returns public paths in upload order.
pub async fn store_images(
    storage: &dyn StorageClient,
    cfg: &UploadConfig,
    folder: &str,
    items: Vec<UploadItem>,
) -> AppResult<Vec<String>> {
    let mut checked = Vec::with_capacity(items.len());
    for item in items {
        let ext = validate_image(&item, cfg.max_file_bytes)?;
        checked.push((item, ext));
    }

    let mut stored: Vec<String> = Vec::with_capacity(checked.len());
    for (item, ext) in checked {
        let key = object_key(folder, ext);
        let put = storage
            .put_object(&key, item.body, &item.content_type)
            .await
            .with_context(|| format!("put_object {}", key));
        if let Err(e) = put {
            remove_images(storage, cfg, &stored).await;
            return Err(e.into());
        }
        debug!(%key, "image stored");
        stored.push(public_path(cfg, &key));
    }
    Ok(stored)
}

/// Best-effort removal; failures are logged and skipped.
pub async fn remove_images(storage: &dyn StorageClient, cfg: &UploadConfig, paths: &[String]) {
    for path in paths {
        let Some(key) = key_from_public_path(cfg, path) else {
            warn!(%path, "not an upload path; skipping delete");
            continue;
        };
        if let Err(e) = storage.delete_object(key).await {
            warn!(error = %e, %path, "failed to delete stored image");
        }
    }
}
