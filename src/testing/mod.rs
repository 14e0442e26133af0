//! Unified testing utilities for the portal session crate
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built test data (keys, sessions, accounts, settings)
//! - [`requests`] - HTTP request builders for testing handlers
//! - [`assertions`] - Custom assertion helpers for common patterns
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portal_session::testing::{fixtures::TestFixtures, RequestBuilder};
//!
//! let manager = TestFixtures::session_manager();
//! let (_, cookie) = manager
//!     .issue_session(&TestFixtures::student_account(), &TestFixtures::request_context())
//!     .unwrap();
//! let req = RequestBuilder::new().session_cookie(cookie.value()).build();
//! ```

pub mod assertions;
pub mod fixtures;
pub mod requests;

// Re-export commonly used items for convenience
pub use assertions::*;
pub use fixtures::TestFixtures;
pub use requests::RequestBuilder;

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "student@example.edu";

    /// Default test user name
    pub const TEST_USER_NAME: &str = "Test Student";

    /// Default test user identifier
    pub const TEST_USER_ID: &str = "65f1c0ffee0000000000abcd";

    /// Default test institute ID
    pub const TEST_INSTITUTE_ID: u64 = 20_240_001;

    /// Default test client IP
    pub const TEST_CLIENT_IP: &str = "192.168.1.1";

    /// Default test user agent string
    pub const TEST_USER_AGENT: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

    /// Test cookie secrets, one per key generation
    pub const TEST_SECRET_A: &str = "test-cookie-secret-generation-a";
    pub const TEST_SECRET_B: &str = "test-cookie-secret-generation-b";
    pub const TEST_SECRET_C: &str = "test-cookie-secret-generation-c";

    /// Test salt shared by all generations
    pub const TEST_SALT: &str = "test-cookie-salt";

    /// Staff account configured in test settings
    pub const TEST_STAFF_EMAIL: &str = "registrar@example.edu";
    pub const TEST_STAFF_PASSWORD: &str = "correct horse battery staple";
    pub const TEST_STAFF_NAME: &str = "Registrar";

    /// Bearer token for the key rotation endpoint in test settings
    pub const TEST_ROTATION_TOKEN: &str = "test-rotation-token";
}
