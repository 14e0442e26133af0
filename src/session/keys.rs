//! Session key material and rotation state
//!
//! Keys are derived once from a secret and the shared salt, then held in a
//! [`KeyRing`]: an immutable, ordered list of key generations, newest first.
//! The [`KeyStore`] owns the active ring behind a lock and replaces it whole
//! on rotation, so a reader always sees either the pre- or post-rotation pair.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::session::errors::SessionError;
use crate::utils::crypto::{derive_key_material, ENCRYPTION_KEY_SIZE};

/// Number of key generations kept: the active key plus one fallback
pub const RETAINED_GENERATIONS: usize = 2;

/// A 256-bit symmetric key used for both AES-GCM and HMAC-SHA512
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; ENCRYPTION_KEY_SIZE]);

impl DerivedKey {
    /// Derive a key from `secret` and `salt` with PBKDF2-HMAC-SHA512
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` if either input is empty, or
    /// `SessionError::Encryption` if derivation itself fails.
    pub fn derive(secret: &str, salt: &str) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::InvalidInput("secret must not be empty".into()));
        }
        if salt.is_empty() {
            return Err(SessionError::InvalidInput("salt must not be empty".into()));
        }

        derive_key_material(secret.as_bytes(), salt.as_bytes())
            .map(Self)
            .map_err(|e| {
                log::error!("Session key derivation failed: {e}");
                SessionError::Encryption
            })
    }

    /// Wrap raw key bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; ENCRYPTION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Ordered key generations, newest first
///
/// The first key signs and encrypts; every key is a verification candidate.
#[derive(Debug, Clone)]
pub struct KeyRing {
    generations: Vec<Arc<DerivedKey>>,
}

impl KeyRing {
    #[must_use]
    pub fn new(current: DerivedKey, previous: Option<DerivedKey>) -> Self {
        let mut generations = Vec::with_capacity(RETAINED_GENERATIONS);
        generations.push(Arc::new(current));
        generations.extend(previous.map(Arc::new));
        Self { generations }
    }

    /// The active key used for issuing tokens
    #[must_use]
    pub fn current(&self) -> &DerivedKey {
        &self.generations[0]
    }

    /// The fallback key retained from the last rotation, if any
    #[must_use]
    pub fn previous(&self) -> Option<&DerivedKey> {
        self.generations.get(1).map(AsRef::as_ref)
    }

    /// Verification candidates in trial order
    pub fn candidates(&self) -> impl Iterator<Item = &DerivedKey> {
        self.generations.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Build the ring that results from making `key` the active generation
    ///
    /// Generations beyond [`RETAINED_GENERATIONS`] are dropped.
    #[must_use]
    pub fn rotated(&self, key: DerivedKey) -> Self {
        let generations = std::iter::once(Arc::new(key))
            .chain(self.generations.iter().cloned())
            .take(RETAINED_GENERATIONS)
            .collect();
        Self { generations }
    }
}

/// Process-wide holder of the active [`KeyRing`]
#[derive(Debug)]
pub struct KeyStore {
    ring: RwLock<Arc<KeyRing>>,
}

impl KeyStore {
    #[must_use]
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring: RwLock::new(Arc::new(ring)),
        }
    }

    /// A consistent view of the keys, unaffected by later rotations
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeyRing> {
        Arc::clone(&*self.ring.read())
    }

    /// Make `key` the active key, demoting the current one to fallback
    pub fn rotate(&self, key: DerivedKey) {
        let mut ring = self.ring.write();
        let next = ring.rotated(key);
        *ring = Arc::new(next);
    }
}
