pub mod multipart;
pub mod services;

pub use multipart::{read_form, MultipartForm};
pub use services::{remove_images, store_images};
#[cfg(test)]
pub use services::UploadItem;
