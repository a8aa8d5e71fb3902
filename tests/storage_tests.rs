use axum::body::Bytes;
use medcast_directory::{
    AppError, LocalDiskStorage, MockStorageService,
    payload::UploadedImage,
    storage::{StorageService, sanitize_key},
};

fn image(content_type: &str, bytes: &'static [u8]) -> UploadedImage {
    UploadedImage {
        file_name: "photo".to_string(),
        content_type: content_type.to_string(),
        bytes: Bytes::from_static(bytes),
    }
}

#[test]
fn sanitize_key_strips_traversal() {
    assert_eq!(sanitize_key("../../etc"), "etc");
    assert_eq!(sanitize_key("hospitals/./logos//"), "hospitals/logos");
    assert_eq!(sanitize_key("..\\windows"), "windows");
    assert_eq!(sanitize_key(".."), "");
}

#[tokio::test]
async fn local_disk_writes_under_the_folder_and_returns_its_url() {
    let root = tempfile::tempdir().unwrap();
    let storage = LocalDiskStorage::new(root.path(), 1024);
    storage.ensure_root_exists().await.unwrap();

    let url = storage
        .store_image("doctors", &image("image/png", b"png-bytes"))
        .await
        .unwrap();

    assert!(url.starts_with("/uploads/doctors/"), "got {}", url);
    assert!(url.ends_with(".png"));
    let file_name = url.rsplit('/').next().unwrap();
    let written = std::fs::read(root.path().join("doctors").join(file_name)).unwrap();
    assert_eq!(written, b"png-bytes");
}

#[tokio::test]
async fn local_disk_keeps_uploads_inside_the_root() {
    let root = tempfile::tempdir().unwrap();
    let storage = LocalDiskStorage::new(root.path(), 1024);

    let url = storage
        .store_image("../escape", &image("image/jpeg", b"jpeg"))
        .await
        .unwrap();

    assert!(url.starts_with("/uploads/escape/"), "got {}", url);
    assert!(root.path().join("escape").is_dir());
}

#[tokio::test]
async fn non_images_are_rejected_before_anything_is_written() {
    let root = tempfile::tempdir().unwrap();
    let storage = LocalDiskStorage::new(root.path(), 1024);

    let err = storage
        .store_image("general", &image("application/pdf", b"%PDF"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(ref m) if m == "Only image files are allowed"));
    assert!(!root.path().join("general").exists());
}

#[tokio::test]
async fn oversized_images_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    let storage = LocalDiskStorage::new(root.path(), 4);

    let err = storage
        .store_image("general", &image("image/gif", b"GIF89a"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("File too large")));
}

#[tokio::test]
async fn mock_storage_returns_a_url_without_touching_disk() {
    let url = MockStorageService::new()
        .store_image("testimonials", &image("image/webp", b"webp"))
        .await
        .unwrap();

    assert!(url.starts_with("/uploads/testimonials/"));
    assert!(url.ends_with(".webp"));
}

#[tokio::test]
async fn failing_mock_reports_an_unexpected_error() {
    let err = MockStorageService::new_failing()
        .store_image("general", &image("image/png", b"png"))
        .await
        .unwrap_err();

    assert!(!err.is_operational());
}
