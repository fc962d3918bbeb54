//! ## Path Safety
//!
//! `assert_safe_path` guards against syncing a disallowed system directory
//! or a path that doesn't resolve to a real folder. Grounded on the donor
//! workspace's `SyncPath::validate` newtype-at-
//! construction pattern, generalized to an async check since the directory
//! check requires a stat call through the local filesystem port.

use std::path::{Path, PathBuf};

use vaultsync_core::config::DisallowedPaths;
use vaultsync_core::domain::errors::SyncError;
use vaultsync_core::ports::local_fs::LocalFilesystemPort;

/// Rejects `path` if it is in the disallowed set, doesn't exist, or isn't a
/// directory. Used before a path is accepted as a local sync root.
pub async fn assert_safe_path(
    fs: &dyn LocalFilesystemPort,
    disallowed: &DisallowedPaths,
    path: &Path,
) -> Result<(), SyncError> {
    let normalized = normalize(path);

    if disallowed.contains(&normalized) {
        return Err(SyncError::ProtectedFileNotWritable {
            path: normalized.display().to_string(),
        });
    }

    match fs.stat(&normalized).await.map_err(SyncError::adapter)? {
        None => Err(SyncError::NotFound {
            path: normalized.display().to_string(),
        }),
        Some(stat) if !stat.is_dir() => Err(SyncError::NotAFolder {
            path: normalized.display().to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn normalize(path: &Path) -> PathBuf {
    // `Path::components` already collapses repeated separators and `.`
    // segments; a disallowed-path comparison only needs to be consistent,
    // not canonical (canonicalizing would require the path to exist, which
    // would turn a "missing path" case into an I/O error before we get a
    // chance to report `NotFound`).
    path.components().collect()
}
