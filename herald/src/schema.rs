//! # Chain Schema
//!
//! The IPLD data model of the advertisement chain: entry chunks,
//! advertisements, the signed head message, and the link prototype that
//! turns block bytes into CIDs.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Advertisement (dag-json)                    │
//! │  ├── PreviousID: Link?    (chain linkage)    │
//! │  ├── Provider: String     (peer id, base58)  │
//! │  ├── Addresses: [String]                     │
//! │  ├── Entries: Link        (head entry chunk) │
//! │  ├── ContextID: Bytes     (catalog id)       │
//! │  ├── Metadata: Bytes                         │
//! │  ├── IsRm: Bool                              │
//! │  └── Signature: Bytes     (Ed25519)          │
//! ├──────────────────────────────────────────────┤
//! │  EntryChunk (dag-json)                       │
//! │  ├── Entries: [Bytes]     (multihashes)      │
//! │  └── Next: Link?          (older chunk)      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Link Prototype
//!
//! Every block is addressed by a CIDv1 with the dag-json codec and a
//! SHA2-256 multihash. Downstream indexers resolve links under this exact
//! prototype; changing it orphans every chain ever published, so don't.
//!
//! ## Signing
//!
//! The advertisement signature covers the SHA-256 of the canonical
//! concatenation of all fields preceding it, in schema order. The
//! `Provider` field carries the base58 public key, so verification needs
//! nothing beyond the advertisement itself.

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::identity::{verify_signature, ProviderIdentity};

/// A self-describing content hash, as produced by catalogs.
pub type Multihash = multihash::Multihash<64>;

/// Multicodec tag for dag-json, the codec of every block this crate writes.
pub const DAG_JSON: u64 = 0x0129;

/// Multicodec tag for dag-cbor. Never written by this crate, but consumers
/// may ask for foreign blocks and the HTTP layer maps the content type.
pub const DAG_CBOR: u64 = 0x71;

/// Multicodec tag for raw bytes. Used by the no-entries sentinel.
pub const RAW: u64 = 0x55;

/// Compute the CID of a block's bytes under the chain's link prototype.
pub fn link_cid(bytes: &[u8]) -> Cid {
    Cid::new_v1(DAG_JSON, Code::Sha2_256.digest(bytes))
}

/// The distinguished empty-entries link used by retractions (and by
/// publishes of an empty catalog).
///
/// This is a schema-level sentinel, not the CID of a zero-length chunk: it
/// uses the raw codec over a fixed preimage, so it can never collide with
/// a dag-json block and consumers can compare against it by equality. No
/// block is ever stored under it.
pub fn no_entries() -> Cid {
    static NO_ENTRIES: OnceLock<Cid> = OnceLock::new();
    *NO_ENTRIES.get_or_init(|| Cid::new_v1(RAW, Code::Sha2_256.digest(b"herald/no-entries")))
}

/// Encode a schema value to dag-json block bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_ipld_dagjson::to_vec(value).map_err(|e| Error::Encoding(e.to_string()))
}

/// Decode dag-json block bytes into a schema value.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagjson::from_slice(bytes).map_err(|e| Error::Encoding(e.to_string()))
}

// ---------------------------------------------------------------------------
// EntryChunk
// ---------------------------------------------------------------------------

/// One bounded slice of a catalog's multihashes.
///
/// Chunks form a singly-linked list from the most recently emitted chunk
/// back to the first: `Next` points at the *older* chunk, and the
/// advertisement's `Entries` link points at the newest. Within a chunk the
/// multihash order is the catalog's iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryChunk {
    #[serde(rename = "Entries")]
    pub entries: Vec<Multihash>,

    #[serde(rename = "Next", default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Cid>,
}

impl EntryChunk {
    pub fn new(entries: Vec<Multihash>, next: Option<Cid>) -> Self {
        Self { entries, next }
    }
}

// ---------------------------------------------------------------------------
// Advertisement
// ---------------------------------------------------------------------------

/// A signed entry in the advertisement chain.
///
/// Announces (or, with `is_rm`, retracts) the binding between a context id
/// and this provider. `previous_id` links to the advertisement that was
/// head when this one was built; the first advertisement of a chain has
/// none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    #[serde(rename = "PreviousID", default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<Cid>,

    /// Peer id of the publisher: base58 of its Ed25519 public key.
    #[serde(rename = "Provider")]
    pub provider: String,

    /// Network addresses the provider serves the announced content from.
    #[serde(rename = "Addresses")]
    pub addresses: Vec<String>,

    /// Link to the head entry chunk, or the [`no_entries`] sentinel.
    #[serde(rename = "Entries")]
    pub entries: Cid,

    /// Opaque catalog id chosen by the embedder.
    #[serde(rename = "ContextID", with = "serde_bytes")]
    pub context_id: Vec<u8>,

    /// Opaque transport/protocol description, passed through verbatim.
    #[serde(rename = "Metadata", with = "serde_bytes")]
    pub metadata: Vec<u8>,

    /// True if this advertisement retracts the (context id, provider) pair.
    #[serde(rename = "IsRm")]
    pub is_rm: bool,

    /// Ed25519 signature over [`Advertisement::signing_digest`].
    #[serde(rename = "Signature", with = "serde_bytes")]
    pub signature: Vec<u8>,
}

impl Advertisement {
    /// The digest the signature covers: SHA-256 over every field that
    /// precedes the signature, in schema order. Length markers are not
    /// needed because the field set is fixed and verification recomputes
    /// from the same decoded fields.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        if let Some(prev) = &self.previous_id {
            hasher.update(prev.to_bytes());
        }
        hasher.update(self.provider.as_bytes());
        for addr in &self.addresses {
            hasher.update(addr.as_bytes());
        }
        hasher.update(self.entries.to_bytes());
        hasher.update(&self.context_id);
        hasher.update(&self.metadata);
        hasher.update([u8::from(self.is_rm)]);
        hasher.finalize().into()
    }

    /// Sign in place under the provider identity.
    ///
    /// The identity must be the one whose peer id is in `provider`,
    /// otherwise the advertisement will never verify.
    pub fn sign(&mut self, identity: &ProviderIdentity) {
        self.signature = identity.sign(&self.signing_digest());
    }

    /// Verify the signature against the public key carried in `provider`.
    pub fn verify(&self) -> bool {
        verify_signature(&self.provider, &self.signing_digest(), &self.signature)
    }
}

// ---------------------------------------------------------------------------
// SignedHead
// ---------------------------------------------------------------------------

/// The message served at `GET /head`: the chain head plus a signature
/// binding it to this publisher and topic.
///
/// Plain JSON rather than dag-json; this is the one message consumers read
/// before they can resolve any links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedHead {
    /// String form of the head advertisement's CID.
    pub head: String,
    /// The logical channel this chain belongs to.
    pub topic: String,
    /// Hex-encoded Ed25519 public key of the publisher.
    pub pubkey: String,
    /// Hex-encoded signature over SHA-256(head CID bytes || topic bytes).
    pub sig: String,
}

impl SignedHead {
    fn digest(head: &Cid, topic: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(head.to_bytes());
        hasher.update(topic.as_bytes());
        hasher.finalize().into()
    }

    /// Build and sign a head message for the current chain head.
    pub fn new(head: &Cid, topic: &str, identity: &ProviderIdentity) -> Self {
        let sig = identity.sign(&Self::digest(head, topic));
        Self {
            head: head.to_string(),
            topic: topic.to_owned(),
            pubkey: hex::encode(identity.public_key_bytes()),
            sig: hex::encode(sig),
        }
    }

    /// Verify the signature and return the head CID it covers.
    pub fn verify(&self) -> Result<Cid> {
        let head = Cid::try_from(self.head.as_str())
            .map_err(|e| Error::Encoding(format!("invalid head CID: {e}")))?;
        let key_bytes =
            hex::decode(&self.pubkey).map_err(|e| Error::Encoding(format!("invalid pubkey: {e}")))?;
        let sig =
            hex::decode(&self.sig).map_err(|e| Error::Encoding(format!("invalid signature: {e}")))?;
        let peer_id = bs58::encode(&key_bytes).into_string();
        if !verify_signature(&peer_id, &Self::digest(&head, &self.topic), &sig) {
            return Err(Error::Signing("signed head verification failed".into()));
        }
        Ok(head)
    }
}
