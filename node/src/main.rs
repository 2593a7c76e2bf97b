// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Herald Publisher Node
//!
//! Entry point for the `herald-node` binary. Parses CLI arguments,
//! initializes logging, loads (or generates) the provider identity, opens
//! the sled datastore, and runs the publisher until interrupted.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the publisher node
//! - `version` — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use herald::{Herald, ProviderIdentity, SledDatastore};

use cli::{Commands, HeraldNodeCli};

/// File inside the data directory holding the hex-encoded Ed25519 seed.
const IDENTITY_FILE: &str = "identity.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = HeraldNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            println!("herald-node {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Starts the publisher node and blocks until SIGINT.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "herald_node=info,herald=info,tower_http=debug",
        &args.log_format,
    );

    tracing::info!(
        listen_addr = %args.listen_addr,
        topic = %args.topic,
        data_dir = %args.data_dir.display(),
        chunk_size = args.ad_entries_chunk_size,
        "starting herald-node"
    );

    let metadata = hex::decode(args.metadata.trim())
        .context("metadata must be a hex-encoded byte string")?;

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;

    // --- Identity ---
    let identity = load_or_generate_identity(&args.data_dir)?;
    tracing::info!(peer_id = %identity.peer_id(), "provider identity loaded");

    // --- Datastore ---
    let db_path = args.data_dir.join("db");
    let datastore = SledDatastore::open(&db_path)
        .with_context(|| format!("failed to open datastore at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "datastore opened");

    // --- Publisher ---
    let mut builder = Herald::builder()
        .listen_addr(args.listen_addr)
        .topic(args.topic)
        .identity(identity)
        .ad_entries_chunk_size(args.ad_entries_chunk_size)
        .datastore(Arc::new(datastore))
        .metadata(metadata);
    for addr in args.provider_addrs {
        builder = builder.provider_address(addr);
    }
    let mut herald = builder.build().context("invalid publisher configuration")?;

    herald.start().await.context("failed to start HTTP publisher")?;
    if let Some(addr) = herald.http_addr() {
        tracing::info!(address = %addr, "herald-node is serving");
    }

    signal::ctrl_c().await.context("failed to listen for SIGINT")?;
    tracing::info!("interrupt received, shutting down");

    herald.shutdown().await.context("graceful shutdown failed")?;
    tracing::info!("herald-node stopped");
    Ok(())
}

/// Load the provider identity from the data directory, generating and
/// persisting a fresh one on first run so the peer id is stable across
/// restarts.
fn load_or_generate_identity(data_dir: &Path) -> Result<ProviderIdentity> {
    let key_path = data_dir.join(IDENTITY_FILE);

    if key_path.exists() {
        let hex_seed = std::fs::read_to_string(&key_path)
            .with_context(|| format!("failed to read {}", key_path.display()))?;
        let identity = ProviderIdentity::from_hex(&hex_seed)
            .with_context(|| format!("invalid identity key in {}", key_path.display()))?;
        tracing::info!(path = %key_path.display(), "loaded existing identity");
        Ok(identity)
    } else {
        let identity = ProviderIdentity::generate();
        std::fs::write(&key_path, hex::encode(identity.to_seed()))
            .with_context(|| format!("failed to write {}", key_path.display()))?;
        tracing::info!(path = %key_path.display(), "generated new identity");
        Ok(identity)
    }
}
