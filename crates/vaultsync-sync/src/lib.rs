//! The sync coordinator, debouncer, watcher lifecycle, initial merge, and
//! path safety checks that sit on top of `vaultsync-diff`'s tree-diff
//! algorithm. `SyncEngine` is the crate's single entry point: one instance
//! per process, holding one `ArchiveRuntime`/`WatcherSupervisor` pair per
//! attached archive.

pub mod coordinator;
pub mod events;
pub mod lock;
pub mod local_archive;
pub mod local_fs;
pub mod merge;
pub mod pathsafety;
pub mod queue;
pub mod runtime;
pub mod watcher;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use vaultsync_core::config::SyncTuning;
use vaultsync_core::domain::archive_key::ArchiveKey;
use vaultsync_core::domain::errors::SyncError;
use vaultsync_core::domain::settings::SyncSettings;
use vaultsync_core::ports::archive::{ArchiveChangeEvent, ArchivePort};
use vaultsync_core::ports::local_fs::LocalFilesystemPort;

pub use coordinator::SyncCoordinator;
pub use events::{EventBus, SyncDirection, SyncEvent};
pub use lock::LockRegistry;
pub use queue::QueueDirection;
pub use runtime::{ArchiveRuntime, SyncOpts, WatchHandles};
pub use watcher::WatcherSupervisor;

struct Attached {
    runtime: Arc<ArchiveRuntime>,
    coordinator: Arc<SyncCoordinator>,
    watcher: Arc<WatcherSupervisor>,
}

/// Process-wide registry of attached archives: a sync settings record and
/// its queue/cache/watcher handles are owned by the archive handle it
/// annotates, destroyed together with it or on reconfiguration. Holds the
/// process-global lock registry and event bus
/// that every attached archive shares.
pub struct SyncEngine {
    locks: LockRegistry,
    events: EventBus,
    tuning: SyncTuning,
    archives: RwLock<HashMap<ArchiveKey, Attached>>,
}

impl SyncEngine {
    pub fn new(tuning: SyncTuning) -> Self {
        Self {
            locks: LockRegistry::new(),
            events: EventBus::new(),
            tuning,
            archives: RwLock::new(HashMap::new()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Attaches an archive with the given local-sync settings (or no local
    /// mirror, if `settings` is `None`) and runs the watcher configuration.
    /// Also subscribes to the archive's own change-notification stream and
    /// forwards it into the watcher's archive-side path.
    pub async fn attach(
        &self,
        archive: Arc<dyn ArchivePort>,
        local_fs: Arc<dyn LocalFilesystemPort>,
        settings: Option<SyncSettings>,
    ) -> Result<(), SyncError> {
        let key = archive.key();
        let runtime = Arc::new(ArchiveRuntime::new(archive.clone(), local_fs));
        *runtime.settings.write().await = settings;

        let coordinator = Arc::new(SyncCoordinator::new(
            runtime.clone(),
            self.locks.clone(),
            self.events.clone(),
            self.tuning.clone(),
        ));
        let watcher = Arc::new(WatcherSupervisor::new(
            runtime.clone(),
            coordinator.clone(),
            self.events.clone(),
            self.tuning.debounce(),
        ));

        self.forward_archive_events(archive, watcher.clone()).await;

        watcher.configure_watcher().await;

        self.archives.write().await.insert(
            key,
            Attached {
                runtime,
                coordinator,
                watcher,
            },
        );
        info!(archive = %key, "archive attached");
        Ok(())
    }

    /// Re-runs the watcher configuration for an already-attached archive,
    /// e.g. after its settings changed. The generation-counter guard makes
    /// this safe to call rapidly and repeatedly.
    pub async fn reconfigure(&self, key: ArchiveKey, settings: Option<SyncSettings>) -> Result<(), SyncError> {
        let archives = self.archives.read().await;
        let Some(attached) = archives.get(&key) else {
            return Err(SyncError::NotFound { path: key.to_hex() });
        };
        *attached.runtime.settings.write().await = settings;
        attached.watcher.configure_watcher().await;
        Ok(())
    }

    pub async fn detach(&self, key: ArchiveKey) {
        if let Some(attached) = self.archives.write().await.remove(&key) {
            // Clear settings first so `configure_watcher` reads `None` and
            // performs a pure teardown instead of re-running setup.
            *attached.runtime.settings.write().await = None;
            attached.watcher.configure_watcher().await;
            drop(attached);
        }
    }

    pub async fn coordinator(&self, key: ArchiveKey) -> Option<Arc<SyncCoordinator>> {
        self.archives.read().await.get(&key).map(|a| a.coordinator.clone())
    }

    pub async fn ensure_sync_finished(&self, key: ArchiveKey) {
        self.locks.ensure_sync_finished(&key).await;
    }

    async fn forward_archive_events(&self, archive: Arc<dyn ArchivePort>, watcher: Arc<WatcherSupervisor>) {
        let Ok(mut rx) = archive.watch().await else {
            return;
        };
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let ArchiveChangeEvent { path, kind } = event;
                watcher.on_archive_change(kind, path).await;
            }
        });
    }
}
