// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Herald — Advertisement Chain Publisher
//!
//! Herald announces content-addressed data to network indexers. Each
//! [`publish`](Publisher::publish) call turns a catalog of multihashes into
//! a linked list of entry chunks plus one signed advertisement, appended to
//! an ever-growing chain whose head is served over HTTP for indexers to
//! pull and verify.
//!
//! ## Architecture
//!
//! The crate is split along the data path:
//!
//! - **datastore** — the opaque key-value collaborator everything persists
//!   into (in-memory or sled).
//! - **store** — content-addressed block reads/writes over the datastore.
//! - **schema** — the IPLD data model: entry chunks, advertisements, the
//!   signed head message, and the link prototype.
//! - **catalog** — the embedder-supplied source of multihashes.
//! - **chain** — chunk generation, advertisement signing, and the head
//!   pointer discipline.
//! - **http** — the axum surface serving `/head` and `/{cid}`.
//! - **identity** — the provider's Ed25519 keypair.
//! - **herald** — the facade tying it all together.
//!
//! ## Quick start
//!
//! ```no_run
//! use herald::{Herald, Publisher, VecCatalog};
//!
//! # #[tokio::main]
//! # async fn main() -> herald::Result<()> {
//! let mut herald = Herald::builder()
//!     .metadata(vec![0x01])
//!     .provider_address("/ip4/192.0.2.1/tcp/9000")
//!     .build()?;
//! herald.start().await?;
//!
//! let mut catalog = VecCatalog::new(b"my-catalog".to_vec(), vec![]);
//! let head = herald.publish(&mut catalog)?;
//! println!("published advertisement {head}");
//!
//! herald.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod chain;
pub mod datastore;
pub mod error;
pub mod herald;
pub mod http;
pub mod identity;
pub mod schema;
pub mod store;

pub use catalog::{Catalog, CatalogId, VecCatalog};
pub use chain::{AdChain, Publisher};
pub use datastore::{Datastore, MemoryDatastore, SledDatastore};
pub use error::{Error, Result, StoreError};
pub use herald::{
    Herald, HeraldBuilder, DEFAULT_AD_ENTRIES_CHUNK_SIZE, DEFAULT_LISTEN_ADDR, DEFAULT_TOPIC,
};
pub use http::HttpPublisher;
pub use identity::ProviderIdentity;
pub use schema::{Advertisement, EntryChunk, Multihash, SignedHead};

pub use cid::Cid;
