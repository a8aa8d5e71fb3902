use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    payload::UploadedImage,
};

/// Public URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

// 1. StorageService Contract
/// StorageService
///
/// The file sink for uploaded entity images. Handlers only ever see the relative public
/// URL that comes back; where the bytes live is the implementation's business.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the upload root if needed. Called once at startup.
    async fn ensure_root_exists(&self) -> AppResult<()>;

    /// Persists `image` under `folder` and returns its public URL,
    /// e.g. `/uploads/hospitals/3f2a...png`.
    ///
    /// Rejects non-image payloads and files over the size limit with `Validation`.
    async fn store_image(&self, folder: &str, image: &UploadedImage) -> AppResult<String>;
}

/// sanitize_key
///
/// Prevents path traversal by removing directory navigation components (`..`, `.`) and
/// empty segments from a caller-provided folder.
pub fn sanitize_key(key: &str) -> String {
    key.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// check_image
///
/// Accepts only the allowed image MIME types within `max_size` bytes and returns the
/// file extension to store the image under.
pub fn check_image(image: &UploadedImage, max_size: usize) -> AppResult<&'static str> {
    let extension = ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| image.content_type.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
        .ok_or_else(|| AppError::validation("Only image files are allowed"))?;

    if image.bytes.len() > max_size {
        return Err(AppError::validation(format!(
            "File too large. Maximum size is {} bytes",
            max_size
        )));
    }

    Ok(extension)
}

fn object_name(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}

// 2. The Real Implementation (local disk)
/// LocalDiskStorage
///
/// Writes uploads beneath the configured `UPLOAD_PATH`; the router serves that directory
/// at `/uploads`.
#[derive(Clone, Debug)]
pub struct LocalDiskStorage {
    root: PathBuf,
    max_file_size: usize,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_root_exists(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::unexpected(format!("cannot create upload root: {}", e)))
    }

    async fn store_image(&self, folder: &str, image: &UploadedImage) -> AppResult<String> {
        let extension = check_image(image, self.max_file_size)?;
        let folder = sanitize_key(folder);
        let file_name = object_name(extension);

        let directory = self.root.join(&folder);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| AppError::unexpected(format!("cannot create upload folder: {}", e)))?;
        tokio::fs::write(directory.join(&file_name), &image.bytes)
            .await
            .map_err(|e| AppError::unexpected(format!("cannot write upload: {}", e)))?;

        tracing::info!(folder = %folder, file = %file_name, size = image.bytes.len(), "stored upload");

        Ok(if folder.is_empty() {
            format!("{}/{}", PUBLIC_PREFIX, file_name)
        } else {
            format!("{}/{}/{}", PUBLIC_PREFIX, folder, file_name)
        })
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Applies the same checks as `LocalDiskStorage` but never touches the filesystem.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, every store attempt fails as an infrastructure error.
    pub should_fail: bool,
    pub max_file_size: usize,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            max_file_size: 5 * 1024 * 1024,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_root_exists(&self) -> AppResult<()> {
        Ok(())
    }

    async fn store_image(&self, folder: &str, image: &UploadedImage) -> AppResult<String> {
        let extension = check_image(image, self.max_file_size)?;
        if self.should_fail {
            return Err(AppError::unexpected("Mock Storage Error: Simulation requested"));
        }

        Ok(format!(
            "{}/{}/{}",
            PUBLIC_PREFIX,
            sanitize_key(folder),
            object_name(extension)
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
