//! Common test utilities

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tf_exporter::config::ExportConfig;
use tf_exporter::registry::SnapshotRegistry;
use tokio::sync::watch;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Snapshot checked in under `tests/fixtures/snapshot`
pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("snapshot")
}

pub async fn open_fixture() -> SnapshotRegistry {
    SnapshotRegistry::open(&fixture_dir())
        .await
        .expect("Failed to open fixture snapshot")
}

/// Config writing into `<temp>/out`, tolerating the fixture's unreadable type
pub fn export_config(temp: &TempDir) -> ExportConfig {
    ExportConfig {
        directory: temp.path().join("out"),
        log_permission_errors: true,
        ..ExportConfig::default()
    }
}

/// A cancel flag nobody flips
#[allow(dead_code)] // Not every test binary cancels
pub fn never_cancelled() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);
    rx
}

#[allow(dead_code)] // Test utility for integration tests
pub fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    serde_json::from_str(&content).expect("Output should be valid JSON")
}
