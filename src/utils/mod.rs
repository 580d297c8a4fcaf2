mod atomic;
mod hash;

pub use atomic::{atomic_write, atomic_write_all};
pub use hash::{compute_hash, short_hash, SHORT_HASH_LEN};

/// Get current timestamp in ISO 8601 format
#[must_use]
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Format a path for display, replacing home directory with ~/
#[must_use]
pub fn format_display_path(path: &str) -> String {
    replace_homedir::replace_homedir(path, "~")
}
