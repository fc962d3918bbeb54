//! ## Per-Archive Serialization
//!
//! A named mutex keyed by `"sync:<hex>"` plus the active-sync counter it
//! guards. Grounded on the `dashmap`-backed per-key table already used for
//! the content-compare cache (`vaultsync_diff::cache::ContentCompareCache`);
//! here the map holds one `tokio::sync::Mutex<()>` per archive instead of
//! fingerprints, since the lock must be held across suspension points
//! rather than released and reacquired like a `std::sync::Mutex`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, Duration};
use vaultsync_core::domain::archive_key::ArchiveKey;

struct ArchiveLockState {
    mutex: Arc<Mutex<()>>,
    active_syncs: AtomicU32,
}

/// Process-wide registry of per-archive locks: the mutex is global across
/// the process, not scoped to a single caller. One entry is created lazily
/// on first use and lives for the process lifetime, mirroring the scoped
/// filesystem view registry's intern-by-key shape.
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<DashMap<ArchiveKey, Arc<ArchiveLockState>>>,
}

/// RAII guard returned by [`LockRegistry::acquire`]. Holding this guard is
/// the only way to mutate the archive's tree or its companion folder;
/// dropping it releases the lock on every exit path, including a panic
/// unwound across an `.await`. Owns the mutex `Arc` itself (via
/// `lock_owned`) rather than borrowing it, so the guard has no lifetime
/// tied to the registry and can be held across further `.await` points
/// without pinning a borrow.
pub struct ArchiveLockGuard {
    _guard: OwnedMutexGuard<()>,
    state: Arc<ArchiveLockState>,
}

impl ArchiveLockGuard {
    /// Increments the active-sync count; call once on entry to a sync,
    /// under the lock.
    pub fn enter_sync(&self) {
        self.state.active_syncs.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements `activeSyncs`; call once on exit from a sync, still under
    /// the lock, regardless of whether the sync succeeded.
    pub fn exit_sync(&self) {
        self.state.active_syncs.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_for(&self, archive: &ArchiveKey) -> Arc<ArchiveLockState> {
        self.locks
            .entry(*archive)
            .or_insert_with(|| {
                Arc::new(ArchiveLockState {
                    mutex: Arc::new(Mutex::new(())),
                    active_syncs: AtomicU32::new(0),
                })
            })
            .clone()
    }

    /// Acquires the named lock `"sync:<hex>"` for `archive`.
    pub async fn acquire(&self, archive: &ArchiveKey) -> ArchiveLockGuard {
        let state = self.state_for(archive);
        let guard = state.mutex.clone().lock_owned().await;
        ArchiveLockGuard {
            _guard: guard,
            state,
        }
    }

    pub fn active_syncs(&self, archive: &ArchiveKey) -> u32 {
        match self.locks.get(archive) {
            Some(state) => state.active_syncs.load(Ordering::SeqCst),
            None => 0,
        }
    }

    /// Waits for any in-flight sync on `archive` to finish: polls for a
    /// zero active-sync count while holding then releasing the lock,
    /// retrying until the count is zero. A quiesce barrier with no
    /// signalling primitive, by design.
    pub async fn ensure_sync_finished(&self, archive: &ArchiveKey) {
        loop {
            {
                let guard = self.acquire(archive).await;
                if guard.state.active_syncs.load(Ordering::SeqCst) == 0 {
                    return;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    }
}
