//! # Herald Facade
//!
//! Wires the datastore, chain, and HTTP publisher together behind one
//! handle. Embedders configure through [`HeraldBuilder`], publish and
//! retract through the [`Publisher`] methods, and drive the HTTP lifecycle
//! with [`start`](Herald::start) / [`shutdown`](Herald::shutdown).

use cid::Cid;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use crate::catalog::Catalog;
use crate::chain::{AdChain, Publisher};
use crate::datastore::{Datastore, MemoryDatastore};
use crate::error::{Error, Result};
use crate::http::HttpPublisher;
use crate::identity::ProviderIdentity;
use crate::store::BlockStore;

/// Default HTTP listen address for the publisher.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:40080";

/// Default topic embedded in signed head messages. Downstream indexers
/// subscribe by topic, so publishing under the wrong one means nobody
/// ever pulls the chain.
pub const DEFAULT_TOPIC: &str = "/indexer/ingest/mainnet";

/// Default maximum number of multihashes per entry chunk.
pub const DEFAULT_AD_ENTRIES_CHUNK_SIZE: usize = 16 << 10;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and constructs a [`Herald`].
///
/// Two options have no default and must be supplied: `metadata` and at
/// least one `provider_address`. Everything else falls back to a default,
/// loudly where the default is unfit for production (ephemeral identity,
/// in-memory datastore).
pub struct HeraldBuilder {
    listen_addr: String,
    topic: String,
    identity: Option<ProviderIdentity>,
    provider_addrs: Vec<String>,
    chunk_size: usize,
    datastore: Option<Arc<dyn Datastore>>,
    metadata: Option<Vec<u8>>,
}

impl Default for HeraldBuilder {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            topic: DEFAULT_TOPIC.to_owned(),
            identity: None,
            provider_addrs: Vec::new(),
            chunk_size: DEFAULT_AD_ENTRIES_CHUNK_SIZE,
            datastore: None,
            metadata: None,
        }
    }
}

impl HeraldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the HTTP publisher binds. Use port 0 to let the OS pick,
    /// then read [`Herald::http_addr`] after start.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Topic string embedded in signed head messages.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// The signing identity. Without one, `build` generates an ephemeral
    /// keypair and warns: chains signed by a throwaway key are orphaned on
    /// restart.
    pub fn identity(mut self, identity: ProviderIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Add one network address the provider serves content from.
    /// Required at least once.
    pub fn provider_address(mut self, addr: impl Into<String>) -> Self {
        self.provider_addrs.push(addr.into());
        self
    }

    /// Maximum multihashes per entry chunk. Must be at least 1.
    pub fn ad_entries_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// The backing datastore. Defaults to in-memory, with a warning.
    pub fn datastore(mut self, ds: Arc<dyn Datastore>) -> Self {
        self.datastore = Some(ds);
        self
    }

    /// Opaque metadata embedded in every advertisement. Required.
    pub fn metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Validate the configuration and assemble the facade.
    pub fn build(self) -> Result<Herald> {
        let metadata = self
            .metadata
            .ok_or_else(|| Error::Config("metadata must be set".into()))?;
        if self.provider_addrs.is_empty() {
            return Err(Error::Config(
                "at least one provider address must be set".into(),
            ));
        }

        let identity = self.identity.unwrap_or_else(|| {
            let identity = ProviderIdentity::generate();
            warn!(
                peer_id = %identity.peer_id(),
                "no identity specified; generated an ephemeral one"
            );
            identity
        });

        let datastore = self.datastore.unwrap_or_else(|| {
            warn!("using in-memory datastore; the chain will not survive a restart");
            Arc::new(MemoryDatastore::new())
        });

        let chain = Arc::new(AdChain::new(
            BlockStore::new(datastore),
            identity.clone(),
            self.provider_addrs,
            metadata,
            self.chunk_size,
        )?);
        let http = HttpPublisher::new(
            Arc::clone(&chain),
            identity,
            self.topic,
            self.listen_addr,
        );

        Ok(Herald { chain, http })
    }
}

// ---------------------------------------------------------------------------
// Herald
// ---------------------------------------------------------------------------

/// The assembled publisher: advertisement chain plus HTTP surface.
pub struct Herald {
    chain: Arc<AdChain>,
    http: HttpPublisher,
}

impl Herald {
    pub fn builder() -> HeraldBuilder {
        HeraldBuilder::new()
    }

    /// Start serving the chain over HTTP.
    pub async fn start(&mut self) -> Result<()> {
        self.http.start().await
    }

    /// Gracefully stop the HTTP publisher. The chain itself needs no
    /// shutdown; pending state is only ever one atomic put.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.http.shutdown().await
    }

    /// The HTTP listener's bound address, once started.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.local_addr()
    }
}

impl Publisher for Herald {
    fn publish(&self, catalog: &mut dyn Catalog) -> Result<Cid> {
        self.chain.publish(catalog)
    }

    fn retract(&self, context_id: &[u8]) -> Result<Cid> {
        self.chain.retract(context_id)
    }

    fn get_content(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.chain.get_content(cid)
    }

    fn get_head(&self) -> Result<Option<Cid>> {
        self.chain.get_head()
    }
}
