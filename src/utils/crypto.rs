// Cryptographic primitives backing the session token format

use aes_gcm::{
    aead::{consts::U16, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm, Nonce, Tag,
};
use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha512;
use std::num::NonZeroU32;

/// IV size for the session cipher (128 bits, one AES block)
pub const IV_SIZE: usize = 16;

/// Authentication tag size produced by the session cipher (128 bits)
pub const AUTH_TAG_SIZE: usize = 16;

/// Encryption key size for AES-256 (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// PBKDF2 iteration count (OWASP minimum for PBKDF2-HMAC-SHA512)
pub const PBKDF2_ITERATIONS: u32 = 210_000;

/// AES-256-GCM keyed with a 16-byte IV instead of the usual 12
type SessionCipher = AesGcm<Aes256, U16>;

type HmacSha512 = Hmac<Sha512>;

/// Derive a 256-bit key from a secret and salt with PBKDF2-HMAC-SHA512
///
/// This is intentionally slow and must only run at startup or during key rotation.
///
/// # Errors
///
/// Returns an error if the iteration count is zero (never the case with the
/// built-in constant).
pub fn derive_key_material(secret: &[u8], salt: &[u8]) -> Result<[u8; ENCRYPTION_KEY_SIZE]> {
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or_else(|| anyhow!("PBKDF2 iteration count must be non-zero"))?;

    let mut key = [0u8; ENCRYPTION_KEY_SIZE];
    ring::pbkdf2::derive(
        ring::pbkdf2::PBKDF2_HMAC_SHA512,
        iterations,
        salt,
        secret,
        &mut key,
    );
    Ok(key)
}

/// Generate a fresh random IV for a single encryption
#[must_use]
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::rng().fill_bytes(&mut iv);
    iv
}

/// Generate `length` random bytes and return them hex-encoded
///
/// Used to mint cookie secrets and salts for a fresh environment file.
#[must_use]
pub fn generate_secret_hex(length: usize) -> String {
    let mut secret = vec![0u8; length];
    rand::rng().fill_bytes(&mut secret);
    hex::encode(secret)
}

/// Encrypt `plaintext` with AES-256-GCM, returning the ciphertext and its detached tag
///
/// # Errors
///
/// Returns an error if:
/// - Key or IV length is invalid
/// - AES encryption fails
pub fn seal(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<(Vec<u8>, [u8; AUTH_TAG_SIZE])> {
    if iv.len() != IV_SIZE {
        return Err(anyhow!("Invalid IV length: expected {IV_SIZE} bytes, got {}", iv.len()));
    }

    let cipher = session_cipher(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(iv), b"", &mut buffer)
        .map_err(|e| anyhow!("AES encryption failed: {e}"))?;

    let mut tag_bytes = [0u8; AUTH_TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok((buffer, tag_bytes))
}

/// Decrypt a ciphertext produced by [`seal`], checking its detached tag
///
/// # Errors
///
/// Returns an error if:
/// - Key, IV or tag length is invalid
/// - The tag does not authenticate the ciphertext under this key
pub fn open(ciphertext: &[u8], key: &[u8], iv: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
    if iv.len() != IV_SIZE {
        return Err(anyhow!("Invalid IV length: expected {IV_SIZE} bytes, got {}", iv.len()));
    }
    if tag.len() != AUTH_TAG_SIZE {
        return Err(anyhow!(
            "Invalid auth tag length: expected {AUTH_TAG_SIZE} bytes, got {}",
            tag.len()
        ));
    }

    let cipher = session_cipher(key)?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(iv),
            b"",
            &mut buffer,
            Tag::<U16>::from_slice(tag),
        )
        .map_err(|e| anyhow!("AES decryption failed: {e}"))?;

    Ok(buffer)
}

/// Compute a hex-encoded HMAC-SHA512 of `message`
///
/// # Errors
///
/// Returns an error if HMAC initialisation fails
pub fn hmac_sha512_hex(key: &[u8], message: &[u8]) -> Result<String> {
    let mut mac =
        <HmacSha512 as Mac>::new_from_slice(key).map_err(|e| anyhow!("Invalid HMAC key: {e}"))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check an HMAC-SHA512 `signature` over `message` in constant time
///
/// A signature of the wrong length never matches.
#[must_use]
pub fn verify_hmac_sha512(key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(mut mac) = <HmacSha512 as Mac>::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(signature).is_ok()
}

fn session_cipher(key: &[u8]) -> Result<SessionCipher> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(anyhow!(
            "Invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {}",
            key.len()
        ));
    }
    SessionCipher::new_from_slice(key).map_err(|e| anyhow!("Invalid AES key: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: [u8; ENCRYPTION_KEY_SIZE] = [7u8; ENCRYPTION_KEY_SIZE];

    #[test]
    fn test_seal_open_recovers_plaintext() {
        let iv = generate_iv();
        let (ciphertext, tag) = seal(b"{\"userId\":\"u1\"}", &TEST_KEY, &iv).unwrap();

        assert_eq!(ciphertext.len(), 15, "GCM ciphertext has the plaintext length");
        let plaintext = open(&ciphertext, &TEST_KEY, &iv, &tag).unwrap();
        assert_eq!(plaintext, b"{\"userId\":\"u1\"}");
    }

    #[test]
    fn test_open_rejects_modified_tag() {
        let iv = generate_iv();
        let (ciphertext, mut tag) = seal(b"payload", &TEST_KEY, &iv).unwrap();
        tag[0] ^= 0x01;

        let result = open(&ciphertext, &TEST_KEY, &iv, &tag);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("AES decryption failed"));
    }

    #[test]
    fn test_open_rejects_wrong_key() {
        let iv = generate_iv();
        let (ciphertext, tag) = seal(b"payload", &TEST_KEY, &iv).unwrap();

        assert!(open(&ciphertext, &[8u8; ENCRYPTION_KEY_SIZE], &iv, &tag).is_err());
    }

    #[test]
    fn test_seal_rejects_bad_lengths() {
        assert!(seal(b"payload", &TEST_KEY, &[0u8; 12]).is_err());
        assert!(seal(b"payload", &[0u8; 16], &generate_iv()).is_err());

        let iv = generate_iv();
        let (ciphertext, _) = seal(b"payload", &TEST_KEY, &iv).unwrap();
        assert!(open(&ciphertext, &TEST_KEY, &iv, &[0u8; 8]).is_err());
    }

    #[test]
    fn test_iv_is_fresh_per_call() {
        assert_ne!(generate_iv(), generate_iv());
    }

    #[test]
    fn test_hmac_sha512_hex_shape() {
        let signature = hmac_sha512_hex(&TEST_KEY, b"a:b:c").unwrap();

        // SHA-512 produces 64 bytes, 128 hex characters
        assert_eq!(signature.len(), 128);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, hmac_sha512_hex(&TEST_KEY, b"a:b:c").unwrap());
    }

    #[test]
    fn test_verify_hmac_sha512() {
        let signature = hex::decode(hmac_sha512_hex(&TEST_KEY, b"a:b:c").unwrap()).unwrap();

        assert!(verify_hmac_sha512(&TEST_KEY, b"a:b:c", &signature));
        assert!(!verify_hmac_sha512(&TEST_KEY, b"a:b:d", &signature));
        assert!(!verify_hmac_sha512(&[1u8; 32], b"a:b:c", &signature));
        assert!(!verify_hmac_sha512(&TEST_KEY, b"a:b:c", &signature[..63]));
    }

    #[test]
    fn test_generate_secret_hex() {
        let secret = generate_secret_hex(32);
        assert_eq!(secret.len(), 64);
        assert_ne!(secret, generate_secret_hex(32));
    }

    #[test]
    fn test_derive_key_material_is_deterministic() {
        let first = derive_key_material(b"secret", b"salt").unwrap();
        let second = derive_key_material(b"secret", b"salt").unwrap();
        let other_salt = derive_key_material(b"secret", b"pepper").unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other_salt);
    }
}
