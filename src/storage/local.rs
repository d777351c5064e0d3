//! Local filesystem storage backend.

use super::{StorageBackend, StorageError};
use actix_web::web;
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

/// Local filesystem storage backend.
pub struct LocalStorage {
    /// Base path for file storage
    base_path: PathBuf,
    /// URL prefix the base path is served under
    public_prefix: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    ///
    /// The `base_path` directory will be created if it doesn't exist.
    pub fn new(base_path: PathBuf, public_prefix: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)?;
        log::info!("LocalStorage initialized at {:?}", base_path);
        Ok(Self {
            base_path,
            public_prefix: public_prefix.trim_end_matches('/').to_owned(),
        })
    }

    /// Path of a file relative to the base, with two levels of prefix
    /// directories: `{filename[0:2]}/{filename[2:4]}/{filename}`.
    fn relative_path(filename: &str) -> String {
        match (filename.get(0..2), filename.get(2..4)) {
            (Some(p1), Some(p2)) if filename.len() > 4 => format!("{}/{}/{}", p1, p2, filename),
            _ => filename.to_owned(),
        }
    }

    fn get_file_path(&self, filename: &str) -> PathBuf {
        self.base_path.join(Self::relative_path(filename))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: put_object: {:?}", path);

        web::block(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, data)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        Ok(())
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        Ok(self.get_file_path(filename).exists())
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, Self::relative_path(filename))
    }
}
