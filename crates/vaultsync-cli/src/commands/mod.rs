pub mod config;
pub mod completions;
pub mod diff_file;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use vaultsync_core::config::SyncTuning;
use vaultsync_core::domain::settings::SyncSettings;
use vaultsync_sync::coordinator::SyncCoordinator;
use vaultsync_sync::events::EventBus;
use vaultsync_sync::local_archive::LocalDirectoryArchive;
use vaultsync_sync::local_fs::LocalFilesystemAdapter;
use vaultsync_sync::lock::LockRegistry;
use vaultsync_sync::runtime::ArchiveRuntime;

/// Shared archive/folder selection flags for every one-shot command (sync,
/// status, diff-file). A `vaultsync-cli` invocation always names exactly
/// one archive-folder pair; there is no persistent archive registry since
/// the CLI runs a fresh `SyncCoordinator` per invocation rather than
/// sharing a long-lived `SyncEngine` with a daemon.
#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Local folder to sync.
    #[arg(long)]
    pub folder: PathBuf,

    /// Directory backing the archive (see `vaultsync_sync::local_archive`).
    #[arg(long)]
    pub archive_dir: PathBuf,

    /// Whether this process may write to the archive.
    #[arg(long)]
    pub writable: bool,
}

impl ArchiveArgs {
    /// Builds a one-shot `SyncCoordinator` for this pair, with settings
    /// already populated so `SyncOpts::default()` resolves the folder path.
    pub async fn coordinator(&self) -> SyncCoordinator {
        let archive = Arc::new(LocalDirectoryArchive::new(self.archive_dir.clone(), self.writable));
        let local_fs = Arc::new(LocalFilesystemAdapter::new());
        let runtime = Arc::new(ArchiveRuntime::new(archive, local_fs));
        *runtime.settings.write().await = Some(SyncSettings::user_chosen(self.folder.clone(), true));
        SyncCoordinator::new(runtime, LockRegistry::new(), EventBus::new(), SyncTuning::default())
    }
}
