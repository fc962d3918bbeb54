//! vaultsync daemon - runs the watcher lifecycle continuously for every
//! archive named in the archive registry, until interrupted.
//!
//! Unlike the donor workspace's daemon (a D-Bus/FUSE-backed background
//! service, never implemented there beyond a stub), this one has no
//! desktop-integration surface to provide: attaching an archive already
//! starts its recursive watcher and debounce loop inside `SyncEngine`, so
//! the daemon's whole job is to load the registry, attach everything in
//! it, log what the engine reports, and detach cleanly on shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vaultsync_core::config::Config;
use vaultsync_core::domain::settings::SyncSettings;
use vaultsync_sync::events::SyncEvent;
use vaultsync_sync::local_archive::LocalDirectoryArchive;
use vaultsync_sync::local_fs::LocalFilesystemAdapter;
use vaultsync_sync::SyncEngine;

mod registry;

use registry::Registry;

#[derive(Debug, Parser)]
#[command(name = "vaultsyncd", version, about = "vaultsync background synchronization daemon")]
struct Args {
    /// Path to the archive registry YAML (defaults under the user config dir).
    #[arg(long)]
    archives: Option<std::path::PathBuf>,

    /// Verbose output (can be repeated: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);
    info!(config_path = %config_path.display(), "loaded configuration");

    let registry_path = args.archives.unwrap_or_else(Registry::default_path);
    let registry = Registry::load(&registry_path)
        .with_context(|| format!("failed to load archive registry at {}", registry_path.display()))?;

    if registry.archives.is_empty() {
        warn!(path = %registry_path.display(), "archive registry is empty; nothing to attach");
    }

    let engine = Arc::new(SyncEngine::new(config.sync.clone()));

    for pair in &registry.archives {
        let archive = Arc::new(LocalDirectoryArchive::new(pair.archive_dir.clone(), pair.writable));
        let local_fs = Arc::new(LocalFilesystemAdapter::new());
        let settings = SyncSettings::user_chosen(pair.folder.clone(), pair.auto_publish);

        info!(
            folder = %pair.folder.display(),
            archive_dir = %pair.archive_dir.display(),
            writable = pair.writable,
            "attaching archive"
        );
        if let Err(err) = engine.attach(archive, local_fs, Some(settings)).await {
            error!(folder = %pair.folder.display(), error = %err, "failed to attach archive");
        }
    }

    spawn_event_logger(engine.clone());

    info!("vaultsyncd running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown requested");

    Ok(())
}

/// Subscribes to the shared event bus and logs every sync/merge/error
/// event, so an operator tailing the daemon's log sees exactly what
/// `SyncEngine` decided without polling anything.
fn spawn_event_logger(engine: Arc<SyncEngine>) {
    let mut events = engine.events().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Sync { archive, direction }) => {
                    info!(archive = %archive, direction = direction.as_str(), "sync completed");
                }
                Ok(SyncEvent::Merge { archive }) => {
                    info!(archive = %archive, "initial merge completed");
                }
                Ok(SyncEvent::Error { archive, message }) => {
                    error!(archive = %archive, error = %message, "sync error");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged behind the event bus");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    });
}
