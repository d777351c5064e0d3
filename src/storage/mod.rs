//! Storage for uploaded post images.
//!
//! Files are addressed by the BLAKE3 hash of their content plus the original
//! extension, so uploading the same image twice stores it once.

pub mod local;

use crate::error::AppError;
use async_trait::async_trait;

/// File extensions accepted for images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Content types accepted for images.
pub const IMAGE_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// File not found
    NotFound(String),
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        log::error!("storage error: {}", e);
        AppError::Server("Failed to store file".to_owned())
    }
}

/// Trait for storage backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under its canonical name (hash + extension).
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError>;

    /// Check if a file exists.
    async fn exists(&self, filename: &str) -> Result<bool, StorageError>;

    /// URL a client can fetch the stored file from.
    fn public_url(&self, filename: &str) -> String;
}

/// An image as received from a client, before validation.
pub struct ImageUpload<'a> {
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: Vec<u8>,
}

/// Lower-cased extension of `filename` if it is an accepted image type.
fn image_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Validates type and size, then stores the image. Returns its public URL.
pub async fn store_image(
    backend: &dyn StorageBackend,
    upload: ImageUpload<'_>,
    max_bytes: usize,
) -> Result<String, AppError> {
    let only_images =
        || AppError::Validation("Only image files are allowed (jpg, jpeg, png)".to_owned());

    let ext = upload
        .filename
        .and_then(image_extension)
        .ok_or_else(only_images)?;
    match upload.content_type {
        Some(mime) if IMAGE_MIME_TYPES.contains(&mime) => {}
        _ => return Err(only_images()),
    }
    if upload.data.is_empty() {
        return Err(AppError::Validation("No image file uploaded".to_owned()));
    }
    if upload.data.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "Image exceeds the maximum size of {} bytes",
            max_bytes
        )));
    }

    let filename = format!("{}.{}", blake3::hash(&upload.data).to_hex(), ext);
    if backend.exists(&filename).await? {
        log::debug!("Image {} already stored", filename);
    } else {
        backend.put_object(upload.data, &filename).await?;
    }

    Ok(backend.public_url(&filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("cat.PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("a.b.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("doc.pdf"), None);
        assert_eq!(image_extension("noext"), None);
    }
}
