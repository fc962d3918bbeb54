//! ## Initial Merge
//!
//! Runs once when attaching a writable archive to a folder in
//! auto-publish mode. Grounded on the donor workspace's
//! `lnxdrive-sync::engine`'s one-shot "first sync" path, generalized from a
//! remote-delta bootstrap to a manifest-merge-then-add-only-then-full-
//! promote sequence.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use vaultsync_core::domain::errors::SyncError;
use vaultsync_core::ports::archive::ArchivePort;
use vaultsync_core::ports::local_fs::LocalFilesystemPort;

use crate::coordinator::SyncCoordinator;
use crate::events::{EventBus, SyncEvent};
use crate::runtime::SyncOpts;

/// Merges two JSON manifests with folder fields winning on key conflict,
/// e.g. `{title:"F"}` + `{title:"A", description:"D"}` ->
/// `{title:"F", description:"D"}`.
fn merge_manifests(folder: &Value, archive: &Value) -> Value {
    let mut merged = archive.as_object().cloned().unwrap_or_default();
    if let Some(folder_fields) = folder.as_object() {
        for (key, value) in folder_fields {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Reconciles manifests, then runs an add-only archive-to-folder pass
/// followed by a full folder-to-archive pass against `path` (the resolved
/// local root), and emits `merge:<keyHex>` on success.
pub async fn initial_merge(
    coordinator: &SyncCoordinator,
    archive: &Arc<dyn ArchivePort>,
    local_fs: &Arc<dyn LocalFilesystemPort>,
    events: &EventBus,
    path: &Path,
) -> Result<(), SyncError> {
    let folder_manifest = local_fs.read_manifest(path).await.map_err(SyncError::adapter)?;
    let archive_manifest = archive.read_manifest().await.map_err(SyncError::adapter)?;

    let merged = merge_manifests(&folder_manifest, &archive_manifest);
    local_fs.write_manifest(path, &merged).await.map_err(SyncError::adapter)?;

    // Fills in files the folder lacks, without overwriting what's already there.
    coordinator
        .sync_archive_to_folder(SyncOpts {
            path: Some(path.to_path_buf()),
            add_only: true,
            ..Default::default()
        })
        .await?;

    // Promotes everything the folder now has, including its pre-merge content.
    coordinator
        .sync_folder_to_archive(SyncOpts {
            path: Some(path.to_path_buf()),
            ..Default::default()
        })
        .await?;

    info!(archive = %archive.key(), "initial merge complete");
    events.emit(SyncEvent::Merge { archive: archive.key() });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folder_fields_win_on_key_conflict() {
        let folder = json!({"title": "F"});
        let archive = json!({"title": "A", "description": "D"});
        let merged = merge_manifests(&folder, &archive);
        assert_eq!(merged, json!({"title": "F", "description": "D"}));
    }

    #[test]
    fn empty_folder_manifest_keeps_archive_fields() {
        let folder = json!({});
        let archive = json!({"title": "A"});
        assert_eq!(merge_manifests(&folder, &archive), json!({"title": "A"}));
    }
}
