//! Shell completions generation.
//! `vaultsync completions bash > ~/.local/share/bash-completion/completions/vaultsync`

use std::io;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::output::OutputFormat;

#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub async fn execute(&self, _format: OutputFormat) -> Result<()> {
        let mut cmd = crate::Cli::command();
        clap_complete::generate(self.shell, &mut cmd, "vaultsync", &mut io::stdout());
        Ok(())
    }
}
