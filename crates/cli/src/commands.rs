//! Subcommands.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use clap::{Args, Subcommand};
use cluster::{ClusterConfig, GatewayService, MembershipController, TcpConnector};
use corelib::{HashRing, MemberInfo};
use store::FsStore;
use tokio::net::TcpListener;
use tracing::{info, warn};
use transport::{serve, GatewayClient, MigrationSummary, StoreService, Timeouts};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve a storage node from a local directory
    Storage(StorageArgs),
    /// Serve a gateway: routed reads/writes and membership administration
    Gateway(GatewayArgs),
    /// List ring members in token order
    Nodes(ClientArgs),
    /// Show each member's token and share of the ring
    Ring(ClientArgs),
    /// Join a storage node, moving the segments it will own
    AddNode {
        address: String,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Remove a storage node, handing its segments to its successor
    RemoveNode {
        address: String,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Read a segment through the gateway
    Get {
        group_id: String,
        segment_name: String,
        /// write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Write a segment through the gateway
    Put {
        group_id: String,
        segment_name: String,
        /// file holding the segment bytes
        file: PathBuf,
        #[command(flatten)]
        client: ClientArgs,
    },
}

#[derive(Debug, Args)]
pub struct StorageArgs {
    /// host address to listen on
    #[arg(long, env = "SEGSTORE_HOST", default_value = "localhost")]
    pub host: String,

    /// port to listen on
    #[arg(long, env = "SEGSTORE_PORT", default_value_t = 8090)]
    pub port: u16,

    /// directory holding one subdirectory per group
    pub base_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct GatewayArgs {
    /// path to JSON configuration file
    #[arg(short = 'c', long, env = "SEGSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// address to serve on
    #[arg(long, env = "SEGSTORE_LISTEN")]
    pub listen: Option<String>,

    /// storage nodes joined at startup, comma separated
    #[arg(long, env = "SEGSTORE_NODES", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// deadline for every call to a storage node
    #[arg(long, env = "SEGSTORE_RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,

    /// deadline for connecting to a storage node
    #[arg(long, env = "SEGSTORE_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: Option<u64>,
}

impl GatewayArgs {
    /// File values (or defaults) with flags applied on top.
    pub fn resolve(&self) -> anyhow::Result<ClusterConfig> {
        let mut config = match &self.config {
            Some(path) => ClusterConfig::from_file(path)?,
            None => ClusterConfig::default(),
        };
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if !self.nodes.is_empty() {
            config.nodes = self.nodes.clone();
        }
        if let Some(ms) = self.rpc_timeout_ms {
            config.rpc_timeout_ms = ms;
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout_ms = ms;
        }
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct ClientArgs {
    /// gateway to talk to
    #[arg(long, env = "SEGSTORE_GATEWAY", default_value = "localhost:8080")]
    pub gateway: String,

    /// request deadline; membership changes can take a while
    #[arg(long, env = "SEGSTORE_TIMEOUT_MS", default_value_t = 600_000)]
    pub timeout_ms: u64,
}

impl ClientArgs {
    async fn connect(&self) -> anyhow::Result<GatewayClient> {
        let timeouts = Timeouts {
            request: Duration::from_millis(self.timeout_ms),
            ..Timeouts::default()
        };
        GatewayClient::connect(&self.gateway, timeouts)
            .await
            .with_context(|| format!("cannot reach gateway {}", self.gateway))
    }
}

/// What a command produced, for printing.
#[derive(Debug)]
pub enum CommandResult {
    /// A server ran until shutdown.
    Stopped,
    Nodes(Vec<String>),
    Ring(Vec<MemberInfo>),
    Migrated(MigrationSummary),
    Data { bytes: Bytes, output: Option<PathBuf> },
    Written { bytes: usize },
}

impl CommandResult {
    pub fn print(&self) -> anyhow::Result<()> {
        match self {
            CommandResult::Stopped => {}
            CommandResult::Nodes(nodes) => {
                for node in nodes {
                    println!("{node}");
                }
            }
            CommandResult::Ring(members) => {
                for member in members {
                    println!(
                        "{:<24} {} {:>7.3}%  {}",
                        member.address,
                        member.token,
                        member.share * 100.0,
                        member.range
                    );
                }
            }
            CommandResult::Migrated(summary) => {
                println!("migrated {} skipped {}", summary.migrated, summary.skipped);
                if let Some(reason) = &summary.enumeration_failure {
                    println!("departing node could not be listed: {reason}");
                }
            }
            CommandResult::Data { bytes, output } => match output {
                Some(path) => std::fs::write(path, bytes)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => std::io::stdout().lock().write_all(bytes)?,
            },
            CommandResult::Written { bytes } => println!("wrote {bytes} bytes"),
        }
        Ok(())
    }
}

pub async fn execute(command: Command) -> anyhow::Result<CommandResult> {
    match command {
        Command::Storage(args) => run_storage(args).await,
        Command::Gateway(args) => run_gateway(args).await,
        Command::Nodes(client) => Ok(CommandResult::Nodes(client.connect().await?.list_nodes().await?)),
        Command::Ring(client) => Ok(CommandResult::Ring(client.connect().await?.describe_ring().await?)),
        Command::AddNode { address, client } => {
            let summary = client.connect().await?.add_node(&address).await?;
            Ok(CommandResult::Migrated(summary))
        }
        Command::RemoveNode { address, client } => {
            let summary = client.connect().await?.remove_node(&address).await?;
            Ok(CommandResult::Migrated(summary))
        }
        Command::Get {
            group_id,
            segment_name,
            output,
            client,
        } => {
            let bytes = client.connect().await?.read(&group_id, &segment_name).await?;
            Ok(CommandResult::Data { bytes, output })
        }
        Command::Put {
            group_id,
            segment_name,
            file,
            client,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let bytes = data.len();
            client
                .connect()
                .await?
                .write(&group_id, &segment_name, Bytes::from(data))
                .await?;
            Ok(CommandResult::Written { bytes })
        }
    }
}

async fn run_storage(args: StorageArgs) -> anyhow::Result<CommandResult> {
    let store = FsStore::open(&args.base_dir)
        .await
        .with_context(|| format!("cannot open {}", args.base_dir.display()))?;
    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("cannot listen on {address}"))?;
    info!(%address, base_dir = %args.base_dir.display(), "storage node started");

    serve(listener, Arc::new(StoreService::new(Arc::new(store))), shutdown_signal()).await?;
    Ok(CommandResult::Stopped)
}

async fn run_gateway(args: GatewayArgs) -> anyhow::Result<CommandResult> {
    let config = args.resolve()?;
    let controller = Arc::new(MembershipController::new(
        Arc::new(HashRing::new()),
        Arc::new(TcpConnector::new(config.timeouts())),
        config.rpc_timeout(),
    ));
    controller
        .bootstrap(&config.nodes)
        .await
        .context("bootstrap failed")?;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("cannot listen on {}", config.listen_addr))?;
    info!(address = %config.listen_addr, nodes = config.nodes.len(), "gateway started");

    let service = Arc::new(GatewayService::new(Arc::clone(&controller)));
    serve(listener, service, shutdown_signal()).await?;

    for node in controller.ring().nodes() {
        node.handle.close().await;
    }
    Ok(CommandResult::Stopped)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
