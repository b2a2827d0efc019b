//! Top-level arguments and process setup.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::{execute, Command};

#[derive(Debug, Parser)]
#[command(name = "segstore", version, about = "sharded media segment store")]
pub struct CliConfig {
    /// log filter used when RUST_LOG is unset (e.g. "info", "cluster=debug")
    #[arg(long, env = "SEGSTORE_LOG", default_value = "info", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Installs logging, starts the runtime, and runs the command to
    /// completion.
    pub fn run(self) -> anyhow::Result<()> {
        init_tracing(&self.log);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let result = runtime.block_on(execute(self.command))?;
        result.print()
    }
}

fn init_tracing(fallback: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}
