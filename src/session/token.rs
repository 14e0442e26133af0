//! Session token wire format
//!
//! ```text
//! <iv-hex>:<authTag-hex>:<ciphertext-hex>.<signature-hex>
//! ```
//!
//! The signature is an HMAC-SHA512 over the literal sealed block (everything
//! before the dot), so it is checked before the block is decoded.

use crate::utils::crypto::{AUTH_TAG_SIZE, IV_SIZE};

const SIGNATURE_SEPARATOR: char = '.';
const BLOCK_SEPARATOR: char = ':';

/// Hex length of an HMAC-SHA512 signature
pub const SIGNATURE_HEX_LEN: usize = 128;

/// A token split into its signed block and signature, both still hex text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedToken<'a> {
    pub sealed: &'a str,
    pub signature: &'a str,
}

impl<'a> SignedToken<'a> {
    /// Split a raw token on its single dot; any other shape yields `None`
    #[must_use]
    pub fn parse(token: &'a str) -> Option<Self> {
        let mut parts = token.split(SIGNATURE_SEPARATOR);
        let sealed = parts.next()?;
        let signature = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { sealed, signature })
    }

    /// Whether the signature is exactly the lowercase hex the signer emits
    ///
    /// Hex decoding is case-insensitive, so any other spelling of the same
    /// bytes must be refused before decoding.
    #[must_use]
    pub fn has_canonical_signature(&self) -> bool {
        self.signature.len() == SIGNATURE_HEX_LEN
            && self
                .signature
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

/// The three hex fields of a sealed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealedParts<'a> {
    pub iv: &'a str,
    pub auth_tag: &'a str,
    pub ciphertext: &'a str,
}

impl<'a> SealedParts<'a> {
    /// Split a sealed block into IV, tag and ciphertext
    ///
    /// Returns `None` unless there are exactly three non-empty fields.
    #[must_use]
    pub fn parse(sealed: &'a str) -> Option<Self> {
        let mut parts = sealed.split(BLOCK_SEPARATOR);
        let iv = parts.next().filter(|p| !p.is_empty())?;
        let auth_tag = parts.next().filter(|p| !p.is_empty())?;
        let ciphertext = parts.next().filter(|p| !p.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            iv,
            auth_tag,
            ciphertext,
        })
    }
}

/// Decoded binary fields of a sealed block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlock {
    pub iv: Vec<u8>,
    pub auth_tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl SealedBlock {
    /// Hex-decode the fields, checking IV and tag sizes
    ///
    /// # Errors
    ///
    /// Returns a description of the first field that is not valid hex or has
    /// the wrong length.
    pub fn decode(parts: SealedParts<'_>) -> Result<Self, &'static str> {
        let iv = hex::decode(parts.iv).map_err(|_| "IV is not valid hex")?;
        if iv.len() != IV_SIZE {
            return Err("IV has the wrong length");
        }
        let auth_tag = hex::decode(parts.auth_tag).map_err(|_| "auth tag is not valid hex")?;
        if auth_tag.len() != AUTH_TAG_SIZE {
            return Err("auth tag has the wrong length");
        }
        let ciphertext = hex::decode(parts.ciphertext).map_err(|_| "ciphertext is not valid hex")?;
        Ok(Self {
            iv,
            auth_tag,
            ciphertext,
        })
    }
}

/// Hex-join IV, tag and ciphertext into the block that gets signed
#[must_use]
pub fn format_sealed(iv: &[u8], auth_tag: &[u8], ciphertext: &[u8]) -> String {
    format!(
        "{}{BLOCK_SEPARATOR}{}{BLOCK_SEPARATOR}{}",
        hex::encode(iv),
        hex::encode(auth_tag),
        hex::encode(ciphertext)
    )
}

/// Attach a hex signature to a sealed block
#[must_use]
pub fn format_token(sealed: &str, signature: &str) -> String {
    format!("{sealed}{SIGNATURE_SEPARATOR}{signature}")
}
