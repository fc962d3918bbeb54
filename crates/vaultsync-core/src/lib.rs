//! Domain types, ports, and configuration shared by the vaultsync sync engine.
//!
//! `domain` holds data that has meaning independent of any adapter (archive
//! keys, changes, errors, settings). `ports` declares the traits adapters
//! must implement to plug a real archive or local filesystem into the
//! engine in `vaultsync-sync`.

pub mod config;
pub mod domain;
pub mod ports;

pub use domain::archive_key::ArchiveKey;
pub use domain::diff::{Change, ChangeKind, EntryKind, EntryStat, Side};
pub use domain::errors::SyncError;
pub use domain::ignore::{IgnoreRuleset, PathFilter};
pub use domain::settings::SyncSettings;
