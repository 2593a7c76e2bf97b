//! # Datastore Abstraction
//!
//! The opaque ordered key-value store that everything persists into: string
//! keys, byte-array values, atomic single-key put/get. The publisher never
//! uses multi-key transactions, so any backend that can do an atomic single
//! put qualifies.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryDatastore`] — a mutex-wrapped `BTreeMap`. The default when an
//!   embedder supplies nothing, with a warning, because nothing survives a
//!   restart.
//! - [`SledDatastore`] — persistent, backed by sled's embedded key-value
//!   store. What the node binary runs on.
//!
//! The keyspace is flat and owned exclusively by this crate: the key
//! `"head"` holds the current head CID's bytes, and every other key is the
//! canonical string form of a block CID mapping to that block's bytes.
//! Treat the store as opaque from the outside; there is no migration story.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StoreError;

/// An ordered key-value store with atomic single-key operations.
///
/// Absence is not an error: `get` returns `Ok(None)` for a missing key and
/// callers decide whether that is exceptional. Implementations must be safe
/// to share across threads; the publisher reads concurrently with writes.
pub trait Datastore: Send + Sync + 'static {
    /// Atomically store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Fetch the value stored under `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryDatastore
// ---------------------------------------------------------------------------

/// In-memory datastore over a `BTreeMap`.
///
/// Every operation clones the value in or out, which keeps the lock hold
/// time to a minimum and the semantics identical to a real backend: callers
/// always own what they read.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored. Test and debugging aid.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// True until the first put. Companion to [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Datastore for MemoryDatastore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.map.write().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.map.read().get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// SledDatastore
// ---------------------------------------------------------------------------

/// Persistent datastore backed by sled.
///
/// sled is inherently thread-safe: lock-free concurrent reads, serialized
/// writes, and single-key operations are atomic, which is exactly the
/// contract [`Datastore`] asks for. A `SledDatastore` can be shared across
/// threads via `Arc` without external synchronization.
#[derive(Debug, Clone)]
pub struct SledDatastore {
    db: sled::Db,
}

impl SledDatastore {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Create a temporary database that lives in memory and is cleaned up
    /// when dropped. Ideal for tests: no filesystem side effects.
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Block until all pending writes are durable on disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl Datastore for SledDatastore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.as_bytes())?.map(|v| v.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn exercise(store: &dyn Datastore) {
        // Missing key is None, not an error.
        assert!(store.get("absent").unwrap().is_none());

        store.put("k1", b"v1").unwrap();
        assert_eq!(store.get("k1").unwrap().unwrap(), b"v1");

        // Put replaces.
        store.put("k1", b"v2").unwrap();
        assert_eq!(store.get("k1").unwrap().unwrap(), b"v2");

        // Empty values are values.
        store.put("k2", b"").unwrap();
        assert_eq!(store.get("k2").unwrap().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn memory_contract() {
        exercise(&MemoryDatastore::new());
    }

    #[test]
    fn sled_contract() {
        exercise(&SledDatastore::open_temporary().unwrap());
    }

    #[test]
    fn memory_len_tracks_inserts() {
        let store = MemoryDatastore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);

        store.put("k1", b"v1").unwrap();
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);

        // Overwrites do not grow the keyspace.
        store.put("k1", b"v2").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sled_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = SledDatastore::open(dir.path()).unwrap();
            store.put("head", b"\x01\x02\x03").unwrap();
            store.flush().unwrap();
        }
        let store = SledDatastore::open(dir.path()).unwrap();
        assert_eq!(store.get("head").unwrap().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn memory_concurrent_readers_and_writer() {
        let store = Arc::new(MemoryDatastore::new());
        for i in 0..10u8 {
            store.put(&format!("key_{i}"), &[i]).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10u8 {
                        let val = store.get(&format!("key_{i}")).unwrap().unwrap();
                        assert_eq!(val, vec![i]);
                    }
                })
            })
            .collect();

        store.put("key_extra", b"late write").unwrap();

        for handle in handles {
            handle.join().expect("reader thread should not panic");
        }
        assert_eq!(store.len(), 11);
    }
}
