#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the portal session service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod accounts;
pub mod handlers;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

// Test utilities for unit tests and, with the `testing` feature, integration tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::{configure_services, AppState};
pub use models::{CurrentUser, PortalSession};
pub use session::{SessionCodec, SessionError, SessionManager};
pub use settings::PortalSettings;
