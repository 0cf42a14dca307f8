//! fk-node — the fkcoord write-path binary.
//!
//! Startup sequence:
//!   1. Open (or initialize) the sled-backed state store
//!   2. Start the in-process distributor queue
//!   3. Start the JSON-RPC 2.0 server exposing `fk_submitEvent`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use fk_distributor::ChannelDistributorQueue;
use fk_executor::{ExecutorConfig, TimingStatistics};
use fk_rpc::{RpcServer, RpcServerState};
use fk_storage::SledSystemStorage;

#[derive(Parser, Debug)]
#[command(
    name = "fk-node",
    version,
    about = "fkcoord write-path node — a lease-serialized, ZooKeeper-compatible tree coordinator"
)]
struct Args {
    /// Directory for the persistent sled state store.
    #[arg(long, default_value = "~/.fkcoord/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Lease lifetime in seconds, after which a held lock becomes stealable.
    #[arg(long, default_value_t = fk_core::constants::LOCK_LIFETIME)]
    lock_lifetime: i64,

    /// Maximum lock-acquisition attempts before an executor reports
    /// `retry_exhausted`.
    #[arg(long, default_value_t = 3)]
    max_lock_attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fk=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("fkcoord node starting");

    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let storage = Arc::new(
        SledSystemStorage::open(&data_dir, args.lock_lifetime).context("opening state store")?,
    );

    let (queue, _distributor_handle) = ChannelDistributorQueue::new();

    let rpc_state = Arc::new(RpcServerState {
        storage,
        queue: Arc::new(queue),
        stats: Arc::new(TimingStatistics::new()),
        executor_config: ExecutorConfig {
            max_lock_attempts: args.max_lock_attempts,
        },
    });

    let rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    info!("node ready");
    rpc_handle.stopped().await;
    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
