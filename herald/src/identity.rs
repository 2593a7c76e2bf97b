//! # Provider Identity
//!
//! The Ed25519 keypair that a publisher signs with. Every advertisement in
//! the chain and every signed-head message is authenticated by this key, and
//! the base58 form of the public key doubles as the provider's peer id
//! string inside advertisements.
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures (no k-value footguns like ECDSA).
//! - 128-bit security level in 32+32 bytes. Compact and sufficient.
//! - Downstream indexers already speak it.
//!
//! Private key material is never logged and never appears in `Debug` output.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors during identity operations.
///
/// Intentionally vague about *why* something failed. Leaking details about
/// key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// A publisher identity wrapping an Ed25519 signing key.
///
/// `ProviderIdentity` intentionally does NOT implement `Serialize` or
/// `Deserialize`. Exporting a private key should be a deliberate act, not
/// something that happens because a struct ended up in a JSON response.
/// Use [`to_seed`](Self::to_seed) / [`from_seed`](Self::from_seed)
/// explicitly.
pub struct ProviderIdentity {
    signing_key: SigningKey,
}

impl ProviderIdentity {
    /// Generate a fresh identity using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Construct an identity deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed, so this round-trips
    /// with [`to_seed`](Self::to_seed). A weak seed gives a weak key; feed
    /// it CSPRNG output or KDF output, nothing else.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte seed, e.g. from a key file.
    pub fn from_hex(hex_str: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| IdentityError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Export the raw 32-byte seed. Handle with care; this is the whole
    /// secret.
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The raw public key bytes (32 bytes). Safe to share.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The provider's peer id string: base58 of the public key.
    ///
    /// This exact string is embedded in every advertisement as `Provider`,
    /// and [`verify_signature`] re-derives the verifying key from it, so
    /// the chain is self-contained: no out-of-band key distribution needed
    /// to check signatures.
    pub fn peer_id(&self) -> String {
        bs58::encode(self.public_key_bytes()).into_string()
    }

    /// Sign a message; returns the 64-byte Ed25519 signature.
    ///
    /// Deterministic: the same (key, message) pair always produces the same
    /// signature (RFC 8032). Verification goes through [`verify_signature`]
    /// with the peer id, the same way consumers of the chain do it.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl Clone for ProviderIdentity {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "ProviderIdentity(peer_id={})", self.peer_id())
    }
}

/// Verify a signature under a peer id string (base58 public key).
///
/// Returns `false` for malformed peer ids, malformed signatures, and
/// genuine verification failures alike. Callers only ever want a yes/no
/// answer here, and a detailed error oracle helps nobody but attackers.
pub fn verify_signature(peer_id: &str, message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = bs58::decode(peer_id).into_vec() else {
        return false;
    };
    let Ok(key_arr) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_arr) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let sig = DalekSignature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &sig).is_ok()
}
