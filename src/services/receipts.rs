use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Allowed upload types, with the magic bytes they must carry and the file
/// extension they are stored under.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Blob store for receipt images. Payments keep the returned path as a weak
/// reference; the store never deletes on their behalf.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Validates and persists an image, returning its path reference.
    async fn store(&self, bytes: &[u8], content_type: &str) -> Result<String, ServiceError>;

    /// Reads a previously stored image back by its path reference.
    async fn load(&self, path: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Filesystem-backed receipt store.
pub struct FsReceiptStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FsReceiptStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    fn extension_for(content_type: &str) -> Result<&'static str, ServiceError> {
        ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| content_type.eq_ignore_ascii_case(mime))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| ServiceError::UnsupportedMedia(content_type.to_string()))
    }

    /// The declared content type must match the file's magic bytes; a PDF
    /// renamed to .png is rejected here.
    fn sniff_matches(content_type: &str, bytes: &[u8]) -> bool {
        match content_type.to_ascii_lowercase().as_str() {
            "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            "image/png" => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
            "image/gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
            "image/webp" => {
                bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP"
            }
            _ => false,
        }
    }

    /// Path references are single relative file names; anything that walks
    /// out of the root is refused.
    fn resolve(&self, reference: &str) -> Result<PathBuf, ServiceError> {
        let candidate = Path::new(reference);
        let safe = candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || candidate.components().count() != 1 {
            return Err(ServiceError::UnsupportedMedia(format!(
                "invalid receipt reference: {reference}"
            )));
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl ReceiptStore for FsReceiptStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len(), content_type = %content_type))]
    async fn store(&self, bytes: &[u8], content_type: &str) -> Result<String, ServiceError> {
        let extension = Self::extension_for(content_type)?;
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::UnsupportedMedia(format!(
                "receipt exceeds {} byte limit",
                self.max_bytes
            )));
        }
        if !Self::sniff_matches(content_type, bytes) {
            return Err(ServiceError::UnsupportedMedia(format!(
                "content does not match declared type {content_type}"
            )));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let file_name = format!("{}.{extension}", Uuid::new_v4().simple());
        let target = self.root.join(&file_name);
        tokio::fs::write(&target, bytes).await?;

        debug!(path = %target.display(), "receipt stored");
        Ok(file_name)
    }

    async fn load(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(
                ServiceError::UnsupportedMedia(format!("no receipt at {path}")),
            ),
            Err(err) => Err(err.into()),
        }
    }
}
