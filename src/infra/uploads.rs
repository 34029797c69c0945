//! Media storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file is not a recognised image")]
    NotAnImage,
}

/// Filesystem-backed media storage rooted at the configured media directory.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store an image payload under a date-partitioned, digest-named path
    /// and return that path. Re-storing identical content under the same
    /// name on the same day lands on the same path.
    ///
    /// The payload must decode as an image; arbitrary files are rejected
    /// before anything touches the disk.
    pub async fn store_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }
        if imagesize::blob_size(&data).is_err() {
            return Err(UploadStorageError::NotAnImage);
        }

        let digest = Sha256::digest(&data);
        let stored_path = self.build_stored_path(original_name, &digest);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(stored_path)
    }

    /// Read a stored payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Resolve the absolute filesystem path for a stored upload.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }

    fn build_stored_path(&self, original_name: &str, digest: &[u8]) -> String {
        let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
        let directory = format!("posts/{year}/{:02}/{:02}", month as u8, day);
        let identifier = hex::encode(&digest[..8]);
        let filename = sanitize_filename(original_name);
        format!("{directory}/{identifier}-{filename}")
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid 1x1 PNG.
    const PNG_PIXEL: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x62, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    #[tokio::test]
    async fn stores_and_reads_back_an_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored_path = storage
            .store_image("small.png", Bytes::from_static(PNG_PIXEL))
            .await
            .expect("stored");

        assert!(stored_path.ends_with("-small.png"));

        let read_back = storage.read(&stored_path).await.expect("read");
        assert_eq!(read_back, Bytes::from_static(PNG_PIXEL));
    }

    #[tokio::test]
    async fn identical_content_is_stored_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let first = storage
            .store_image("small.png", Bytes::from_static(PNG_PIXEL))
            .await
            .expect("stored");
        let second = storage
            .store_image("small.png", Bytes::from_static(PNG_PIXEL))
            .await
            .expect("stored again");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rejects_non_image_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let result = storage
            .store_image("notes.txt", Bytes::from_static(b"plain text"))
            .await;
        assert!(matches!(result, Err(UploadStorageError::NotAnImage)));
    }

    #[tokio::test]
    async fn rejects_empty_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let result = storage.store_image("empty.png", Bytes::new()).await;
        assert!(matches!(result, Err(UploadStorageError::EmptyPayload)));
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        assert!(matches!(
            storage.resolve("../outside.png"),
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.resolve("/etc/passwd"),
            Err(UploadStorageError::InvalidPath)
        ));
    }

    #[test]
    fn filenames_are_slugified() {
        assert_eq!(sanitize_filename("My Photo.PNG"), "my-photo.png");
        assert_eq!(sanitize_filename("???"), "image");
    }
}
