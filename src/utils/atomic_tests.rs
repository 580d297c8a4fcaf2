use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_atomic_write_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("export.tf.json");

    atomic_write(&file_path, "{}\n").await.unwrap();

    assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "{}\n");
}

#[tokio::test]
async fn test_atomic_write_overwrites_existing() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("export.tf.json");
    std::fs::write(&file_path, "stale").unwrap();

    atomic_write(&file_path, "fresh").await.unwrap();

    assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "fresh");
}

#[tokio::test]
async fn test_write_all_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let files = vec![
        (temp_dir.path().join("a.tf.json"), "a".to_string()),
        (temp_dir.path().join("b.tf.json"), "b".to_string()),
    ];

    atomic_write_all(files).await.unwrap();

    let count = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(count, 2, "Should only have the target files, no temp files");
}

#[tokio::test]
async fn test_staging_failure_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let good = temp_dir.path().join("good.tf.json");
    let files = vec![
        (good.clone(), "content".to_string()),
        (temp_dir.path().join("missing/bad.tf.json"), "content".to_string()),
    ];

    assert!(atomic_write_all(files).await.is_err());
    assert!(!good.exists());
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_atomic_write_fails_with_invalid_parent() {
    let result = atomic_write(Path::new("/nonexistent/deeply/nested/file.json"), "content").await;
    assert!(result.is_err());
}
