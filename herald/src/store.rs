//! # Block Store
//!
//! Content-addressed reads and writes over the [`Datastore`] abstraction.
//! Keys are the canonical string form of each block's CID, computed under
//! the chain's link prototype (see [`crate::schema::link_cid`]); values are
//! the block bytes exactly as serialized.
//!
//! The invariant the rest of the crate leans on: for any block written,
//! reading by its CID returns byte-identical content. Writes are idempotent
//! because the key is a function of the value.

use cid::Cid;
use serde::Serialize;
use std::sync::Arc;

use crate::datastore::Datastore;
use crate::error::{Error, Result};
use crate::schema;

/// Content-addressed view of a datastore.
///
/// Cheap to clone; the datastore handle is shared.
#[derive(Clone)]
pub struct BlockStore {
    ds: Arc<dyn Datastore>,
}

impl BlockStore {
    pub fn new(ds: Arc<dyn Datastore>) -> Self {
        Self { ds }
    }

    /// Store raw block bytes; returns the CID they are now addressable by.
    ///
    /// Writing the same bytes twice yields the same CID and leaves the
    /// store content unchanged.
    pub fn write_block(&self, bytes: &[u8]) -> Result<Cid> {
        let cid = schema::link_cid(bytes);
        self.ds.put(&cid.to_string(), bytes)?;
        Ok(cid)
    }

    /// Serialize a schema value to dag-json and store it as a block.
    pub fn put_node<T: Serialize>(&self, value: &T) -> Result<Cid> {
        let bytes = schema::encode(value)?;
        self.write_block(&bytes)
    }

    /// Fetch the bytes of the block addressed by `cid`.
    ///
    /// Returns [`Error::ContentNotFound`] when no such block exists; any
    /// other datastore failure is surfaced unchanged.
    pub fn read_block(&self, cid: &Cid) -> Result<Vec<u8>> {
        match self.ds.get(&cid.to_string())? {
            Some(bytes) => Ok(bytes),
            None => Err(Error::ContentNotFound),
        }
    }

    /// Fetch a raw value stored under an arbitrary datastore key.
    ///
    /// Only the chain's head pointer lives outside the CID keyspace; this
    /// is its accessor.
    pub fn read_key(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.ds.get(key)?)
    }

    /// Store a raw value under an arbitrary datastore key.
    pub fn write_key(&self, key: &str, value: &[u8]) -> Result<()> {
        self.ds.put(key, value)?;
        Ok(())
    }
}
