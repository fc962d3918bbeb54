//! Driven ports the sync engine depends on. Mirrors the donor workspace's
//! `lnxdrive-core::ports` split between `ICloudProvider` and
//! `ILocalFileSystem`: `anyhow::Result` at the boundary, concrete
//! adapters live in the `vaultsync-sync` crate (or a caller's own crate),
//! not here.

pub mod archive;
pub mod local_fs;
