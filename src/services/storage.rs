//! Image uploads for vendor logos and product pictures.
//!
//! Objects are content addressed: the key is the SHA-256 of the bytes plus an
//! extension derived from the content type, so re-uploading the same file is
//! a no-op.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content type '{0}' is not accepted")]
    UnsupportedContentType(String),

    #[error("upload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("upload is empty")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    VendorLogos,
    ProductImages,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::VendorLogos, Bucket::ProductImages];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::VendorLogos => "vendor-logos",
            Bucket::ProductImages => "product-images",
        }
    }
}

const ACCEPTED_IMAGES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    ACCEPTED_IMAGES
        .iter()
        .find(|(ct, _)| *ct == essence)
        .map(|(_, ext)| *ext)
}

pub fn object_key(bytes: &[u8], extension: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}.{}", hasher.finalize(), extension)
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub key: String,
    pub url: String,
    pub size: usize,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn public_url(&self, bucket: Bucket, key: &str) -> String;
}

/// Buckets are directories under a root; files are served by the HTTP layer.
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config() -> Self {
        let storage = &config::config().storage;
        Self::new(storage.root.clone(), storage.public_base_url.clone())
    }

    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.as_str())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(key);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Object {}/{} already stored", bucket.as_str(), key);
            return Ok(());
        }
        // Write then rename so readers never see a partial file
        let partial = dir.join(format!(".{}.partial", key));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, bucket.as_str(), key)
    }
}

pub struct StorageService {
    backend: Arc<dyn StorageBackend>,
    max_upload_bytes: usize,
}

impl StorageService {
    pub fn new(backend: Arc<dyn StorageBackend>, max_upload_bytes: usize) -> Self {
        Self {
            backend,
            max_upload_bytes,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            Arc::new(LocalStorage::from_config()),
            config::config().storage.max_upload_bytes,
        )
    }

    pub async fn upload_image(
        &self,
        bucket: Bucket,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(StorageError::TooLarge {
                limit: self.max_upload_bytes,
            });
        }
        let extension = extension_for(content_type)
            .ok_or_else(|| StorageError::UnsupportedContentType(content_type.to_string()))?;

        let key = object_key(bytes, extension);
        self.backend.put(bucket, &key, bytes).await?;
        tracing::info!("Stored {} bytes as {}/{}", bytes.len(), bucket.as_str(), key);

        Ok(StoredObject {
            bucket,
            url: self.backend.public_url(bucket, &key),
            key,
            size: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(dir: &tempfile::TempDir, max: usize) -> StorageService {
        StorageService::new(Arc::new(LocalStorage::new(dir.path(), "http://files.test/")), max)
    }

    #[test]
    fn content_types_map_to_extensions() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[test]
    fn keys_are_content_hashes() {
        let key = object_key(b"abc", "png");
        assert_eq!(key, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.png");
    }

    #[tokio::test]
    async fn upload_writes_into_bucket_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stored = service(&dir, 1024)
            .upload_image(Bucket::VendorLogos, "image/png", b"\x89PNG fake")
            .await
            .unwrap();

        assert_eq!(stored.size, 9);
        assert_eq!(stored.url, format!("http://files.test/storage/vendor-logos/{}", stored.key));
        let on_disk = std::fs::read(dir.path().join("vendor-logos").join(&stored.key)).unwrap();
        assert_eq!(on_disk, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn same_bytes_give_same_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir, 1024);
        let a = storage.upload_image(Bucket::ProductImages, "image/gif", b"GIF89a").await.unwrap();
        let b = storage.upload_image(Bucket::ProductImages, "image/gif", b"GIF89a").await.unwrap();
        assert_eq!(a.key, b.key);
    }

    #[tokio::test]
    async fn rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir, 4);
        assert!(matches!(
            storage.upload_image(Bucket::VendorLogos, "image/png", b"").await,
            Err(StorageError::Empty)
        ));
        assert!(matches!(
            storage.upload_image(Bucket::VendorLogos, "image/png", b"too large").await,
            Err(StorageError::TooLarge { limit: 4 })
        ));
        assert!(matches!(
            storage.upload_image(Bucket::VendorLogos, "text/plain", b"hi").await,
            Err(StorageError::UnsupportedContentType(_))
        ));
    }
}
