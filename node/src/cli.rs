//! # CLI Interface
//!
//! Command-line argument structure for `herald-node` using clap derive.
//! Every configurable value has a corresponding environment variable for
//! container-friendly deployment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Herald publisher node.
///
/// Publishes signed advertisement chains of content multihashes and serves
/// them to downstream indexers over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "herald-node",
    about = "Herald advertisement chain publisher",
    version,
    propagate_version = true
)]
pub struct HeraldNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the publisher node.
    Run(RunArgs),
    /// Print build version information.
    Version,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Address the HTTP publisher listens on.
    #[arg(long, env = "HERALD_LISTEN_ADDR", default_value = herald::DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    /// Topic embedded in signed head messages.
    #[arg(long, env = "HERALD_TOPIC", default_value = herald::DEFAULT_TOPIC)]
    pub topic: String,

    /// Data directory: holds the identity key file and the datastore.
    #[arg(long, env = "HERALD_DATA_DIR", default_value = "./herald-data")]
    pub data_dir: PathBuf,

    /// Maximum multihashes per advertisement entry chunk.
    #[arg(
        long,
        env = "HERALD_CHUNK_SIZE",
        default_value_t = herald::DEFAULT_AD_ENTRIES_CHUNK_SIZE
    )]
    pub ad_entries_chunk_size: usize,

    /// Network address the provider serves content from. Repeatable;
    /// at least one is required.
    #[arg(
        long = "provider-addr",
        env = "HERALD_PROVIDER_ADDRS",
        value_delimiter = ',',
        required = true
    )]
    pub provider_addrs: Vec<String>,

    /// Hex-encoded metadata bytes embedded in every advertisement.
    #[arg(long, env = "HERALD_METADATA")]
    pub metadata: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "HERALD_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
