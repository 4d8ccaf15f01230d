//! # Secure Secret Type
//!
//! Wrapper for the swap preimage that zeroizes memory on drop.
//!
//! The secret is the only thing standing between the counterparty and the
//! locked funds until the initiator claims. It has no `Serialize` impl and a
//! redacted `Debug`, so it cannot leak through history records or logs.

use sha3::{Digest, Keccak256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::{Hash, Secret};

/// A swap secret that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureSecret {
    inner: Secret,
}

impl SecureSecret {
    /// Create a new secure secret from bytes.
    pub fn new(bytes: Secret) -> Self {
        Self { inner: bytes }
    }

    /// Create from a slice. Returns `None` unless exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut inner = [0u8; 32];
        inner.copy_from_slice(slice);
        Some(Self { inner })
    }

    /// Get the secret bytes.
    ///
    /// Only chain adapters should call this, when building a claim.
    pub fn as_bytes(&self) -> &Secret {
        &self.inner
    }

    /// Keccak-256 of the raw secret bytes.
    pub fn hashlock(&self) -> Hash {
        Keccak256::digest(self.inner).into()
    }

    /// Check the secret against a hashlock.
    pub fn matches(&self, hashlock: &Hash) -> bool {
        self.hashlock() == *hashlock
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureSecret(***)")
    }
}
