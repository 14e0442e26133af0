//! Session error types
//!
//! Verification failures are not errors: a token that does not verify is an
//! expected outcome and surfaces as `None` from [`SessionCodec::verify`].
//!
//! [`SessionCodec::verify`]: crate::session::SessionCodec::verify

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::utils::responses::ResponseBuilder;

/// Errors raised by the session codec and its configuration
#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing or unusable secret material at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller passed an empty payload or an empty rotation secret
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The cipher or MAC failed while issuing a token
    #[error("Cookie encryption failed")]
    Encryption,
}

impl ResponseError for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Encryption => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::InvalidInput(_) => ResponseBuilder::bad_request("Invalid request").build(),
            Self::Configuration(_) | Self::Encryption => ResponseBuilder::server_error().build(),
        }
    }
}
