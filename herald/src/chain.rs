//! # Advertisement Chain
//!
//! The write side of the publisher: turns catalogs into linked entry
//! chunks, wraps them in signed advertisements, and advances the head
//! pointer. One [`AdChain`] owns the whole chain of a single provider.
//!
//! ## Chain discipline
//!
//! Publish and retract share one sequence: take the writer lock, read the
//! current head, build and sign the new advertisement against it, store the
//! advertisement block, then overwrite the head key. The head put is the
//! linearization point; everything before it is invisible to readers, so a
//! failure anywhere in the sequence leaves at worst an unreferenced block
//! and never a broken chain.
//!
//! Readers (`get_head`, `get_content`) take no lock. The head value is a
//! single atomic datastore put, so a reader observes either the old head or
//! the new one, never a torn value.

use cid::Cid;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::identity::ProviderIdentity;
use crate::schema::{self, Advertisement, EntryChunk, Multihash};
use crate::store::BlockStore;

/// Datastore key holding the current head advertisement's CID bytes.
/// Created on first publish, overwritten on every publish/retract after
/// that, never deleted.
const HEAD_KEY: &str = "head";

/// The read/write contract a publisher exposes to embedders.
pub trait Publisher: Send + Sync {
    /// Announce a catalog: build its entry chunks, extend the chain with a
    /// signed advertisement, and return the new head CID.
    fn publish(&self, catalog: &mut dyn Catalog) -> Result<Cid>;

    /// Retract a previously announced catalog id. Returns the new head CID.
    fn retract(&self, context_id: &[u8]) -> Result<Cid>;

    /// Fetch the raw bytes of a stored block.
    fn get_content(&self, cid: &Cid) -> Result<Vec<u8>>;

    /// The current chain head, or `None` if nothing was ever published.
    fn get_head(&self) -> Result<Option<Cid>>;
}

/// Builds, signs, and persists the advertisement chain.
pub struct AdChain {
    store: BlockStore,
    identity: ProviderIdentity,
    provider_addrs: Vec<String>,
    metadata: Vec<u8>,
    chunk_size: usize,
    /// Serializes publish/retract. Readers never take this.
    writer: Mutex<()>,
}

impl AdChain {
    /// Assemble a chain writer.
    ///
    /// `chunk_size` is the maximum number of multihashes per entry chunk
    /// and must be at least 1.
    pub fn new(
        store: BlockStore,
        identity: ProviderIdentity,
        provider_addrs: Vec<String>,
        metadata: Vec<u8>,
        chunk_size: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config(
                "ad entries chunk size must be at least 1".into(),
            ));
        }
        Ok(Self {
            store,
            identity,
            provider_addrs,
            metadata,
            chunk_size,
            writer: Mutex::new(()),
        })
    }

    /// Shared handle to the underlying block store.
    pub fn block_store(&self) -> &BlockStore {
        &self.store
    }

    // -- Entry chunks -------------------------------------------------------

    fn store_chunk(&self, entries: Vec<Multihash>, next: Option<Cid>) -> Result<Cid> {
        self.store.put_node(&EntryChunk::new(entries, next))
    }

    /// Drain a catalog into a linked list of entry chunks.
    ///
    /// Chunks are emitted as the buffer fills, each linking to the one
    /// before it, so walking from the returned link visits the most
    /// recently pulled multihashes first. An empty catalog produces no
    /// chunks and returns the no-entries sentinel.
    ///
    /// An iterator error aborts the build mid-flight. Chunks already
    /// written stay in the store as garbage; nothing references them, so
    /// the chain is unaffected.
    fn generate_entries(&self, catalog: &mut dyn Catalog) -> Result<Cid> {
        let mut buffer: Vec<Multihash> = Vec::with_capacity(self.chunk_size);
        let mut next: Option<Cid> = None;
        let mut total = 0usize;
        let mut chunks = 0usize;

        while let Some(mh) = catalog.next_entry()? {
            buffer.push(mh);
            total += 1;
            if buffer.len() >= self.chunk_size {
                next = Some(self.store_chunk(std::mem::take(&mut buffer), next)?);
                chunks += 1;
            }
        }
        if !buffer.is_empty() {
            next = Some(self.store_chunk(buffer, next)?);
            chunks += 1;
        }

        info!(
            total_multihashes = total,
            chunk_count = chunks,
            "generated linked entry chunks"
        );
        Ok(next.unwrap_or_else(schema::no_entries))
    }

    // -- Advertisements -----------------------------------------------------

    /// Extend the chain with one signed advertisement and advance the head.
    fn generate_advertisement(
        &self,
        context_id: &[u8],
        entries: Cid,
        is_rm: bool,
    ) -> Result<Cid> {
        let _guard = self.writer.lock();

        let previous_id = self.get_head()?;

        let mut ad = Advertisement {
            previous_id,
            provider: self.identity.peer_id(),
            addresses: self.provider_addrs.clone(),
            entries,
            context_id: context_id.to_vec(),
            metadata: self.metadata.clone(),
            is_rm,
            signature: Vec::new(),
        };
        ad.sign(&self.identity);

        let new_head = self.store.put_node(&ad).map_err(|e| {
            error!(err = %e, "failed to store advertisement");
            e
        })?;

        // Linearization point: the advertisement joins the chain only once
        // this put succeeds.
        if let Err(e) = self.store.write_key(HEAD_KEY, &new_head.to_bytes()) {
            error!(new_head = %new_head, err = %e, "failed to set new head");
            return Err(e);
        }

        debug!(head = %new_head, is_rm, "advertisement chain advanced");
        Ok(new_head)
    }
}

impl Publisher for AdChain {
    fn publish(&self, catalog: &mut dyn Catalog) -> Result<Cid> {
        let entries = self.generate_entries(catalog)?;
        let context_id = catalog.id().to_vec();
        self.generate_advertisement(&context_id, entries, false)
    }

    fn retract(&self, context_id: &[u8]) -> Result<Cid> {
        self.generate_advertisement(context_id, schema::no_entries(), true)
    }

    fn get_content(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.store.read_block(cid)
    }

    fn get_head(&self) -> Result<Option<Cid>> {
        match self.store.read_key(HEAD_KEY)? {
            None => Ok(None),
            Some(bytes) => {
                let head = Cid::try_from(bytes.as_slice()).map_err(|e| {
                    error!(err = %e, "failed to decode stored head as CID");
                    Error::Encoding(format!("stored head is not a valid CID: {e}"))
                })?;
                Ok(Some(head))
            }
        }
    }
}
