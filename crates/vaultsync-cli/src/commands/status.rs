//! Status command - lists pending changes between a folder and an archive
//! without applying them. Grounded on the donor
//! workspace's `lnxdrive-cli::commands::status`, trimmed to this engine's
//! much smaller state model (a change list, not a per-item state machine
//! backed by a database).

use anyhow::Result;
use clap::Args;
use vaultsync_core::domain::diff::ChangeKind;

use crate::commands::ArchiveArgs;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// List what would change on the archive instead of the folder.
    #[arg(long)]
    pub to_archive: bool,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let coordinator = self.archive.coordinator().await;

        let changes = coordinator
            .diff_listing(self.to_archive, Default::default())
            .await?;

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!({
                "direction": if self.to_archive { "folder -> archive" } else { "archive -> folder" },
                "changes": changes.iter().map(change_to_json).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        if changes.is_empty() {
            formatter.success("Already up to date");
            return Ok(());
        }

        formatter.info(&format!("{} pending change(s):", changes.len()));
        for change in &changes {
            let label = match change.kind {
                ChangeKind::Add => "add",
                ChangeKind::Modify => "modify",
                ChangeKind::Remove => "remove",
            };
            formatter.info(&format!("  [{label}] {}", change.path));
        }
        Ok(())
    }
}

fn change_to_json(change: &vaultsync_core::domain::diff::Change) -> serde_json::Value {
    let kind = match change.kind {
        ChangeKind::Add => "add",
        ChangeKind::Modify => "modify",
        ChangeKind::Remove => "remove",
    };
    serde_json::json!({"path": change.path, "kind": kind})
}
