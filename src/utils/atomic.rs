//! Write-then-rename file output.
//!
//! Temp files live next to their targets so the final rename stays on one
//! filesystem. A temp file that is never persisted is removed on drop.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn parent_of(path: &Path) -> io::Result<&Path> {
    path.parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory"))
}

fn stage(path: &Path, content: &str) -> io::Result<NamedTempFile> {
    let mut temp_file = NamedTempFile::new_in(parent_of(path)?)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    Ok(temp_file)
}

/// Write a single file atomically: the target is either fully replaced or
/// left untouched.
pub async fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    atomic_write_all(vec![(path.to_path_buf(), content.to_string())]).await
}

/// Write a set of files, staging every one of them before the first rename.
///
/// A failure while staging leaves all targets untouched. Renames happen in
/// the given order once everything is on disk.
pub async fn atomic_write_all(files: Vec<(PathBuf, String)>) -> io::Result<()> {
    tokio::task::spawn_blocking(move || -> io::Result<()> {
        let staged = files
            .iter()
            .map(|(path, content)| stage(path, content).map(|temp| (temp, path)))
            .collect::<io::Result<Vec<_>>>()?;

        for (temp_file, target) in staged {
            temp_file.persist(target)?;
        }
        Ok(())
    })
    .await
    .map_err(io::Error::other)?
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
