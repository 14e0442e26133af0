//! Session Management Module
//!
//! Stateless sessions carried in an encrypted, signed `session` cookie.
//!
//! # Modules
//!
//! - [`keys`] - Derived key material and the rotating key ring
//! - [`token`] - Token wire format `<iv>:<tag>:<ciphertext>.<signature>`
//! - [`codec`] - Sign, verify and key rotation
//! - [`validation`] - IP, device and age checks on decoded sessions
//! - [`cookie`] - Cookie construction and extraction
//! - [`manager`] - Issuing and authenticating sessions for requests
//! - [`errors`] - Session error taxonomy

pub mod codec;
pub mod cookie;
pub mod errors;
pub mod keys;
pub mod manager;
pub mod token;
pub mod validation;

// Re-export commonly used items for convenience
pub use codec::SessionCodec;
pub use cookie::{CookieFactory, CookieOptions, COOKIE_NAME};
pub use errors::SessionError;
pub use keys::{DerivedKey, KeyRing, KeyStore};
pub use manager::{AuthFailure, AuthRejection, AuthenticatedSession, SessionManager};
pub use validation::{RequestContext, SessionRejection, SessionValidator, DEFAULT_MAX_AGE_MS};
