use std::collections::HashMap;

use axum::{extract::Multipart, extract::multipart::MultipartError, http::StatusCode};

use super::services::UploadItem;
use crate::error::{AppError, AppResult};

/// Text fields (possibly repeated) and the files of one file field.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, Vec<String>>,
    pub files: Vec<UploadItem>,
}

impl MultipartForm {
    /// First non-blank value of a text field, trimmed.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(String::from)
    }

    /// All values of a repeated field; `name[]` counts as `name`.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }
}

fn upload_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit: max_bytes }
    } else {
        AppError::field("multipart", format!("File upload error: {}", e.body_text()))
    }
}

/// Buffers a multipart body. Parts named `file_field` (or `file_field[]`)
/// become files; everything else is text. Empty file parts are skipped.
pub async fn read_form(
    mut mp: Multipart,
    file_field: &str,
    max_files: usize,
    max_bytes: usize,
) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| upload_error(e, max_bytes))?
    {
        let name = field
            .name()
            .unwrap_or_default()
            .trim_end_matches("[]")
            .to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field.bytes().await.map_err(|e| upload_error(e, max_bytes))?;
            if file_name.is_empty() && body.is_empty() {
                continue;
            }
            if body.len() > max_bytes {
                return Err(AppError::PayloadTooLarge { limit: max_bytes });
            }
            if form.files.len() == max_files {
                return Err(AppError::field(
                    file_field,
                    format!("At most {max_files} files are allowed"),
                ));
            }
            form.files.push(UploadItem {
                file_name,
                content_type,
                body,
            });
        } else if !name.is_empty() {
            let value = field.text().await.map_err(|e| upload_error(e, max_bytes))?;
            form.fields.entry(name).or_default().push(value);
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_blank_values() {
        let mut form = MultipartForm::default();
        form.fields
            .insert("title".into(), vec!["  ".into(), " Cozy flat ".into()]);
        assert_eq!(form.text("title").as_deref(), Some("Cozy flat"));
        assert_eq!(form.text("missing"), None);
        assert_eq!(form.values("title").map(|v| v.len()), Some(2));
    }
}
