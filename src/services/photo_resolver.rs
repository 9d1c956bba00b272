//! src/services/photo_resolver.rs
//!
//! Turns uploaded images into opaque `PhotoRef`s and reclaims them. The file
//! backed resolver shards payloads beneath `base_path/{shard}/{shard}/{ref}`.

use crate::{
    models::item::{PhotoRef, PhotoUpload},
    services::record_store::{StorageError, StorageResult},
};
use std::{
    future::Future,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_PHOTO_REF_LEN: usize = 128;

/// Acquire/release contract for photo resources.
///
/// `release` must tolerate refs that are unknown or already released.
pub trait PhotoResolver: Send + Sync + 'static {
    fn acquire(&self, upload: PhotoUpload) -> impl Future<Output = StorageResult<PhotoRef>> + Send;

    fn release(&self, photo: &PhotoRef) -> impl Future<Output = StorageResult<()>> + Send;
}

/// An opened photo ready for streaming.
#[derive(Debug)]
pub struct PhotoFile {
    pub file: File,
    pub size_bytes: u64,
    pub content_type: &'static str,
}

/// Stores photo payloads as files on local disk.
#[derive(Clone, Debug)]
pub struct FilePhotoResolver {
    /// Root directory for photo payloads.
    pub base_path: PathBuf,
}

impl FilePhotoResolver {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Refs are plain file names we minted ourselves. Anything else is
    /// rejected before it gets near the filesystem.
    fn is_ref_safe(photo: &PhotoRef) -> bool {
        let key = photo.as_str();
        !key.is_empty()
            && key.len() <= MAX_PHOTO_REF_LEN
            && !key.starts_with('.')
            && !key.contains("..")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    }

    /// Two-level shard directories from MD5(ref), as lowercase hex.
    fn photo_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn photo_path(&self, photo: &PhotoRef) -> PathBuf {
        let (shard_a, shard_b) = Self::photo_shards(photo.as_str());
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(photo.as_str());
        path
    }

    /// Open a stored photo for reading.
    pub async fn open(&self, photo: &PhotoRef) -> StorageResult<PhotoFile> {
        if !Self::is_ref_safe(photo) {
            return Err(StorageError::PhotoNotFound(photo.to_string()));
        }

        let path = self.photo_path(photo);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::PhotoNotFound(photo.to_string())
            } else {
                StorageError::Io(err)
            }
        })?;
        let size_bytes = file.metadata().await?.len();

        Ok(PhotoFile {
            file,
            size_bytes,
            content_type: content_type_for(photo.as_str()),
        })
    }

    /// Remove empty shard directories up to, not including, `base_path`.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

impl PhotoResolver for FilePhotoResolver {
    /// Write the payload to a temp file, fsync, then rename into place.
    async fn acquire(&self, upload: PhotoUpload) -> StorageResult<PhotoRef> {
        let photo = PhotoRef::new(format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            extension_for(upload.content_type.as_deref())
        ));

        let file_path = self.photo_path(&photo);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "photo path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(&upload.bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &file_path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        debug!(
            "stored photo {} ({} bytes) at {}",
            photo,
            upload.bytes.len(),
            file_path.display()
        );
        Ok(photo)
    }

    async fn release(&self, photo: &PhotoRef) -> StorageResult<()> {
        if !Self::is_ref_safe(photo) {
            debug!("ignoring release of foreign photo ref {}", photo);
            return Ok(());
        }

        let file_path = self.photo_path(photo);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed photo file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("photo file {} already missing", file_path.display());
                return Ok(());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.map(|ct| ct.trim().to_ascii_lowercase()).as_deref() {
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        Some("image/heic") => "heic",
        Some("image/bmp") => "bmp",
        Some("image/svg+xml") => "svg",
        _ => "bin",
    }
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn png(bytes: &'static [u8]) -> PhotoUpload {
        PhotoUpload::new(Some("image/png".into()), bytes)
    }

    #[tokio::test]
    async fn acquire_then_open_returns_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FilePhotoResolver::new(dir.path());

        let photo = resolver.acquire(png(b"\x89PNG fake")).await.unwrap();
        assert!(photo.as_str().ends_with(".png"));

        let mut opened = resolver.open(&photo).await.unwrap();
        assert_eq!(opened.content_type, "image/png");
        assert_eq!(opened.size_bytes, 9);

        let mut buf = Vec::new();
        opened.file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn release_removes_file_and_prunes_shards() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FilePhotoResolver::new(dir.path());

        let photo = resolver.acquire(png(b"data")).await.unwrap();
        resolver.release(&photo).await.unwrap();

        assert!(matches!(
            resolver.open(&photo).await,
            Err(StorageError::PhotoNotFound(_))
        ));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn release_is_a_no_op_when_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FilePhotoResolver::new(dir.path());

        let photo = resolver.acquire(png(b"data")).await.unwrap();
        resolver.release(&photo).await.unwrap();
        resolver.release(&photo).await.unwrap();
        resolver.release(&PhotoRef::new("never-existed.png")).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_refs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FilePhotoResolver::new(dir.path());

        for bad in ["../secret", "a/b.png", ".hidden", ""] {
            let photo = PhotoRef::new(bad);
            assert!(matches!(
                resolver.open(&photo).await,
                Err(StorageError::PhotoNotFound(_))
            ));
            resolver.release(&photo).await.unwrap();
        }
    }

    #[test]
    fn unknown_content_types_fall_back_to_binary() {
        assert_eq!(extension_for(Some("image/JPEG")), "jpg");
        assert_eq!(extension_for(None), "bin");
        assert_eq!(content_type_for("abc.bin"), "application/octet-stream");
    }
}
