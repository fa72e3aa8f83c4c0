//! respkv - an in-memory RESP key/value server
//!
//! Serves a small command set over the RESP wire protocol, seeds its key
//! space from an on-disk binary snapshot, and can start as either a primary
//! or a replica of another server.

mod core;
mod protocol;
mod replication;
mod server;
mod snapshot;
mod storage;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use crate::core::config::{DEFAULT_PORT, ServerConfig};
use crate::core::errors::ServerResult;
use crate::replication::state::ReplicationState;
use crate::server::KvServer;
use crate::storage::keyspace::KeySpace;

#[derive(Parser, Debug)]
#[command(
    name = "respkv",
    about = "In-memory RESP key/value server",
    version = "0.1.0"
)]
struct Args {
    /// Directory containing the snapshot file
    #[arg(long)]
    dir: Option<String>,

    /// Snapshot file name within the directory
    #[arg(long)]
    dbfilename: Option<String>,

    /// TCP listen port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Run as a replica of the given primary, as "<host> <port>"
    #[arg(long)]
    replicaof: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = ServerConfig::new(args.dir, args.dbfilename, args.port, args.replicaof)?;

    match serve(config).await {
        Ok(()) => {
            info!("server shut down cleanly");
            Ok(())
        }
        Err(e) => {
            error!("server failed: {}", e);
            Err(e.into())
        }
    }
}

/// Bootstrap and serve: snapshot load, replica handshake, listener
async fn serve(config: ServerConfig) -> ServerResult<()> {
    let keyspace = KeySpace::new();
    if let Some(path) = config.snapshot_path() {
        let records = snapshot::load(&path)?;
        info!(
            entries = records.len(),
            path = %path.display(),
            "key space seeded from snapshot"
        );
        for record in records {
            keyspace.set(record.key, record.value, record.expires_at);
        }
    }

    let replication = match config.replicaof.clone() {
        Some((host, port)) => {
            replication::handshake::announce_to_primary(&host, port).await?;
            ReplicationState::replica(host, port)
        }
        None => ReplicationState::primary(),
    };

    let server = KvServer::bind(config, keyspace, replication).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
