//! # Error Types
//!
//! Every failure the publisher can report, in one place. The core never
//! recovers from any of these; it reports them and leaves the chain exactly
//! where it was. In particular the head pointer is never advanced on an
//! error path, so a failed publish is invisible to consumers.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or serving the chain.
#[derive(Debug, Error)]
pub enum Error {
    /// Construction-time rejection: missing metadata, missing provider
    /// addresses, zero chunk size. The system never starts half-configured.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The requested CID has no block in the store. Maps to HTTP 404.
    #[error("content not found")]
    ContentNotFound,

    /// The catalog iterator reported an error mid-publish. The publish is
    /// aborted and the caller's error is preserved as the source.
    #[error("catalog iterator failed: {0}")]
    Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Advertisement or signed-head signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The underlying datastore failed for a reason other than not-found.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IPLD serialization or decoding failed. Treated like a storage
    /// failure at the API surface (HTTP 500).
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Listener or other I/O failure outside the datastore.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an embedder's iterator error without losing its type.
    pub fn catalog(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Catalog(err.into())
    }
}

/// Errors surfaced by [`Datastore`](crate::datastore::Datastore)
/// implementations. Not-found is NOT an error at this layer; `get` returns
/// `Ok(None)` so that callers decide whether absence is exceptional.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
}
