//! Filesystem storage for movie poster images.
//!
//! Each upload is stored as `<uuid><ext>` inside the storage directory; the
//! UUID is the image id handed back to clients.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to store empty file")]
    Empty,

    #[error("image not found with id: {0}")]
    NotFound(String),

    #[error("image storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub id: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Creates the directory if it does not exist.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ImageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(dir = %root.display(), "image storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn upload(&self, original_filename: Option<&str>, bytes: &[u8]) -> Result<String, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let id = Uuid::new_v4().to_string();
        let path = self.root.join(format!("{id}{}", extension_of(original_filename)));
        tokio::fs::write(&path, bytes).await?;

        info!(image_id = %id, path = %path.display(), "uploaded image");
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<StoredImage, ImageError> {
        let path = self
            .find(id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ImageError::NotFound(id.to_string()))?;

        let bytes = tokio::fs::read(&path).await?;
        Ok(StoredImage {
            id: id.to_string(),
            content_type: content_type_for(&path),
            bytes,
        })
    }

    /// Removes every file stored under `id`. `false` when none existed or a
    /// file could not be removed.
    pub async fn delete(&self, id: &str) -> Result<bool, ImageError> {
        let matches = self.find(id).await?;
        if matches.is_empty() {
            return Ok(false);
        }

        let mut all_deleted = true;
        for path in matches {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed to delete image file");
                all_deleted = false;
            }
        }
        Ok(all_deleted)
    }

    /// Files named `<id>.*`. Ids that are not UUIDs never match, which also
    /// keeps path separators out of lookups.
    async fn find(&self, id: &str) -> Result<Vec<PathBuf>, ImageError> {
        if Uuid::parse_str(id).is_err() {
            return Ok(vec![]);
        }

        let prefix = format!("{id}.");
        let mut found = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }
}

/// `.ext` from the client's filename, lowercased; `.jpg` when absent or odd.
fn extension_of(filename: Option<&str>) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("movierent-images-{}", Uuid::now_v7()));
        ImageStore::open(dir).await.unwrap()
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(extension_of(Some("poster.PNG")), ".png");
        assert_eq!(extension_of(Some("poster")), ".jpg");
        assert_eq!(extension_of(None), ".jpg");
        assert_eq!(extension_of(Some("../../etc/passwd.sh/x")), ".jpg");
    }

    #[tokio::test]
    async fn upload_get_delete() {
        let store = temp_store().await;
        let id = store.upload(Some("inception.png"), b"\x89PNG").await.unwrap();

        let image = store.get(&id).await.unwrap();
        assert_eq!(image.bytes, b"\x89PNG");
        assert_eq!(image.content_type, "image/png");

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(matches!(store.get(&id).await, Err(ImageError::NotFound(_))));

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn empty_upload_and_bogus_ids_are_rejected() {
        let store = temp_store().await;
        assert!(matches!(store.upload(Some("a.jpg"), b"").await, Err(ImageError::Empty)));
        assert!(matches!(store.get("../secret").await, Err(ImageError::NotFound(_))));

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }
}
