//! Sync command - run a one-shot folder-to-archive or archive-to-folder
//! sync. Grounded on the donor workspace's
//! `lnxdrive-cli::commands::sync`: same load-config/build-adapters/run/
//! report-results shape, adapted from the donor's single implicit
//! direction (always toward the local cache) to this engine's two
//! explicit directions.

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::commands::ArchiveArgs;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Push local changes to the archive instead of pulling archive
    /// changes into the folder.
    #[arg(long)]
    pub to_archive: bool,

    /// Only add files that are missing on the destination; never
    /// overwrite or delete.
    #[arg(long)]
    pub add_only: bool,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let coordinator = self.archive.coordinator().await;

        let opts = vaultsync_sync::runtime::SyncOpts {
            add_only: self.add_only,
            ..Default::default()
        };

        info!(
            folder = %self.archive.folder.display(),
            archive_dir = %self.archive.archive_dir.display(),
            to_archive = self.to_archive,
            "starting sync"
        );

        let result = if self.to_archive {
            coordinator.sync_folder_to_archive(opts).await
        } else {
            coordinator.sync_archive_to_folder(opts).await
        };

        match result {
            Ok(()) => {
                let direction = if self.to_archive { "folder -> archive" } else { "archive -> folder" };
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "direction": direction,
                    }));
                } else {
                    formatter.success(&format!("Sync complete ({direction})"));
                }
                Ok(())
            }
            Err(err) => {
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "success": false,
                        "error": err.to_string(),
                    }));
                } else {
                    formatter.error(&err.to_string());
                }
                Ok(())
            }
        }
    }
}
