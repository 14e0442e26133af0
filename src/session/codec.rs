//! Session codec: encrypt-then-MAC session tokens with key rotation
//!
//! A token is produced by serializing the payload to JSON, encrypting it with
//! AES-256-GCM under the active key and a fresh 16-byte IV, and signing the
//! hex-encoded `iv:tag:ciphertext` block with HMAC-SHA512 under the same key.
//!
//! Verification tries each retained key generation in order. A key only
//! yields a payload when both its HMAC and its GCM tag check out, so parts
//! produced under different keys never combine into a valid token.

use serde::{de::DeserializeOwned, Serialize};

use crate::session::errors::SessionError;
use crate::session::keys::{DerivedKey, KeyRing, KeyStore};
use crate::session::token::{format_sealed, format_token, SealedBlock, SealedParts, SignedToken};
use crate::utils::crypto::{generate_iv, hmac_sha512_hex, open, seal, verify_hmac_sha512};

/// Outcome of checking a token against a single key
enum KeyAttempt<T> {
    /// Signature and ciphertext both verified
    Verified(T),
    /// This key did not produce a payload; try the next one
    Mismatch,
    /// The signature matched but the block is structurally broken
    Malformed,
}

/// Signs and verifies session tokens
#[derive(Debug)]
pub struct SessionCodec {
    keys: KeyStore,
    salt: String,
}

impl SessionCodec {
    /// Derive the key pair from configured secrets
    ///
    /// An empty `previous_secret` means no rotation has happened yet.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if `current_secret` or `salt` is
    /// empty or key derivation fails.
    pub fn from_secrets(
        current_secret: &str,
        previous_secret: Option<&str>,
        salt: &str,
    ) -> Result<Self, SessionError> {
        if current_secret.is_empty() || salt.is_empty() {
            return Err(SessionError::Configuration(
                "Missing required cookie encryption secret or salt".into(),
            ));
        }

        let current = DerivedKey::derive(current_secret, salt)
            .map_err(|e| SessionError::Configuration(format!("Key derivation failed: {e}")))?;
        let previous = match previous_secret.filter(|s| !s.is_empty()) {
            Some(secret) => Some(DerivedKey::derive(secret, salt).map_err(|e| {
                SessionError::Configuration(format!("Key derivation failed: {e}"))
            })?),
            None => None,
        };

        log::info!(
            "Session keys derived (fallback key {})",
            if previous.is_some() { "present" } else { "absent" }
        );

        Ok(Self::with_keys(current, previous, salt))
    }

    /// Build a codec from already-derived keys
    #[must_use]
    pub fn with_keys(current: DerivedKey, previous: Option<DerivedKey>, salt: &str) -> Self {
        Self {
            keys: KeyStore::new(KeyRing::new(current, previous)),
            salt: salt.to_string(),
        }
    }

    /// Encrypt and sign a payload into a cookie-safe token
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `SessionError::InvalidInput` if the payload serializes to null, an
    ///   empty object or an empty string
    /// - `SessionError::Encryption` if serialization, the cipher or the MAC fails
    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, SessionError> {
        let value = serde_json::to_value(payload).map_err(|e| {
            log::error!("Failed to serialize session payload: {e}");
            SessionError::Encryption
        })?;
        if is_empty_payload(&value) {
            return Err(SessionError::InvalidInput(
                "No data provided for cookie signing".into(),
            ));
        }
        let json = serde_json::to_string(&value).map_err(|e| {
            log::error!("Failed to serialize session payload: {e}");
            SessionError::Encryption
        })?;

        let ring = self.keys.snapshot();
        let key = ring.current().as_bytes();

        let iv = generate_iv();
        let (ciphertext, auth_tag) = seal(json.as_bytes(), key, &iv).map_err(|e| {
            log::error!("Session encryption failed: {e}");
            SessionError::Encryption
        })?;

        let sealed = format_sealed(&iv, &auth_tag, &ciphertext);
        let signature = hmac_sha512_hex(key, sealed.as_bytes()).map_err(|e| {
            log::error!("Session signing failed: {e}");
            SessionError::Encryption
        })?;

        Ok(format_token(&sealed, &signature))
    }

    /// Verify and decrypt a token
    ///
    /// Returns `None` for any malformed, tampered, foreign-key or corrupted
    /// token; never panics on untrusted input.
    #[must_use]
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let signed = SignedToken::parse(token).filter(SignedToken::has_canonical_signature)?;
        let ring = self.keys.snapshot();

        for key in ring.candidates() {
            match Self::try_key(&signed, key) {
                KeyAttempt::Verified(payload) => return Some(payload),
                KeyAttempt::Mismatch => {}
                KeyAttempt::Malformed => return None,
            }
        }

        log::debug!("Session token did not verify under any retained key");
        None
    }

    /// Derive a key from `new_secret` and make it the active key
    ///
    /// The current key is kept as the only fallback; anything older is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` if `new_secret` is empty, or
    /// `SessionError::Encryption` if derivation fails.
    pub fn rotate_keys(&self, new_secret: &str) -> Result<(), SessionError> {
        if new_secret.is_empty() {
            return Err(SessionError::InvalidInput("No new secret provided".into()));
        }
        let key = DerivedKey::derive(new_secret, &self.salt)?;
        self.rotate_to(key);
        Ok(())
    }

    /// Install an already-derived key as the active key
    pub fn rotate_to(&self, key: DerivedKey) {
        self.keys.rotate(key);
        log::info!("Session keys rotated; previous key retained as fallback");
    }

    /// Number of key generations currently accepted by [`Self::verify`]
    #[must_use]
    pub fn key_generations(&self) -> usize {
        self.keys.snapshot().len()
    }

    fn try_key<T: DeserializeOwned>(signed: &SignedToken<'_>, key: &DerivedKey) -> KeyAttempt<T> {
        let Ok(signature) = hex::decode(signed.signature) else {
            return KeyAttempt::Mismatch;
        };
        if !verify_hmac_sha512(key.as_bytes(), signed.sealed.as_bytes(), &signature) {
            return KeyAttempt::Mismatch;
        }

        let Some(parts) = SealedParts::parse(signed.sealed) else {
            return KeyAttempt::Malformed;
        };
        let block = match SealedBlock::decode(parts) {
            Ok(block) => block,
            Err(reason) => {
                log::debug!("Signed session block rejected: {reason}");
                return KeyAttempt::Mismatch;
            }
        };

        let plaintext = match open(&block.ciphertext, key.as_bytes(), &block.iv, &block.auth_tag) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                log::warn!("Session signature matched but decryption failed: {e}");
                return KeyAttempt::Mismatch;
            }
        };

        match serde_json::from_slice(&plaintext) {
            Ok(payload) => KeyAttempt::Verified(payload),
            Err(e) => {
                log::debug!("Decrypted session payload did not parse: {e}");
                KeyAttempt::Mismatch
            }
        }
    }
}

fn is_empty_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}
