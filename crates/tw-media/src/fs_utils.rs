//! Working-directory management.
//!
//! Each job gets its own directory under the work root. Creation and removal
//! go straight through the filesystem API so failures carry the real error.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Create `root/name` and return its path.
///
/// Fails if the directory already exists: a working directory belongs to
/// exactly one job.
pub async fn create_work_dir(root: impl AsRef<Path>, name: &str) -> MediaResult<PathBuf> {
    let root = root.as_ref();
    fs::create_dir_all(root)
        .await
        .map_err(|e| MediaError::work_dir(root, e))?;

    let dir = root.join(name);
    fs::create_dir(&dir)
        .await
        .map_err(|e| MediaError::work_dir(&dir, e))?;

    tracing::debug!("Created working directory {}", dir.display());
    Ok(dir)
}

/// Recursively remove a working directory.
///
/// A directory that is already gone counts as removed.
pub async fn remove_work_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    let dir = dir.as_ref();
    match fs::remove_dir_all(dir).await {
        Ok(()) => {
            tracing::debug!("Removed working directory {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::work_dir(dir, e)),
    }
}
