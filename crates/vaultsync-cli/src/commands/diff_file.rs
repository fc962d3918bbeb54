//! Diff-file command - a line-level preview of one file's pending
//! changes, rendered the way `git diff` or a code-review tool would,
//! without applying anything.

use anyhow::Result;
use clap::Args;
use vaultsync_diff::textdiff::LineTag;

use crate::commands::ArchiveArgs;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DiffFileCommand {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Path (relative to the folder/archive root) to diff.
    pub path: String,
}

impl DiffFileCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let coordinator = self.archive.coordinator().await;

        let diff = coordinator.diff_file(&self.path, Default::default()).await?;

        if matches!(format, OutputFormat::Json) {
            let hunks: Vec<_> = diff
                .hunks
                .iter()
                .map(|hunk| {
                    let tag = match hunk.tag {
                        LineTag::Delete => "delete",
                        LineTag::Insert => "insert",
                        LineTag::Equal => "equal",
                    };
                    serde_json::json!({
                        "tag": tag,
                        "old_line": hunk.old_line,
                        "new_line": hunk.new_line,
                        "content": hunk.content,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({"path": self.path, "hunks": hunks}));
            return Ok(());
        }

        if !diff.has_changes() {
            formatter.success(&format!("{} is unchanged", self.path));
            return Ok(());
        }

        for hunk in &diff.hunks {
            let prefix = match hunk.tag {
                LineTag::Delete => "-",
                LineTag::Insert => "+",
                LineTag::Equal => " ",
            };
            formatter.info(&format!("{prefix} {}", hunk.content.trim_end_matches('\n')));
        }
        Ok(())
    }
}
