//! Session validation
//!
//! Runs after a token has verified. Checks, in order, stopping at the first
//! failure:
//! 1. the request IP matches the IP the session was issued to
//! 2. the request `User-Agent` matches the issuing user agent
//! 3. the session is no older than the maximum age (24 hours by default)
//!
//! The window is fixed from issuance; validating a session never extends it.

use actix_web::{http::header, HttpRequest};
use chrono::Utc;
use std::fmt;
use std::net::SocketAddr;

use crate::models::PortalSession;

/// Default maximum session age: 24 hours in milliseconds
pub const DEFAULT_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Client context of the request being authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: String,
    pub user_agent: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(ip: impl Into<String>, user_agent: Option<&str>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.map(ToString::to_string),
        }
    }

    /// Extract the client IP and `User-Agent` from a request
    ///
    /// With `trust_forwarded_headers` the IP comes from `Forwarded` /
    /// `X-Forwarded-For` when present; otherwise it is the socket peer address.
    /// Ports are stripped so reconnects from the same host keep the same IP.
    #[must_use]
    pub fn from_request(req: &HttpRequest, trust_forwarded_headers: bool) -> Self {
        let forwarded = if trust_forwarded_headers {
            req.connection_info()
                .realip_remote_addr()
                .map(strip_port)
        } else {
            None
        };
        let ip = forwarded
            .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
            .unwrap_or_default();

        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok());

        Self::new(ip, user_agent)
    }
}

/// Why a verified session was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    IpMismatch,
    DeviceMismatch,
    Expired,
}

impl SessionRejection {
    /// Stable reason code for logs
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::IpMismatch => "ip-mismatch",
            Self::DeviceMismatch => "device-mismatch",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Stateless validator for decoded sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionValidator {
    max_age_ms: i64,
}

impl Default for SessionValidator {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }
}

impl SessionValidator {
    #[must_use]
    pub fn new(max_age_ms: i64) -> Self {
        Self { max_age_ms }
    }

    /// Build a validator from a maximum age in hours
    #[must_use]
    pub fn from_hours(max_age_hours: u64) -> Self {
        let hours = i64::try_from(max_age_hours).unwrap_or(i64::MAX);
        Self::new(hours.saturating_mul(60 * 60 * 1000))
    }

    #[must_use]
    pub fn max_age_ms(&self) -> i64 {
        self.max_age_ms
    }

    /// Validate against the current wall clock
    ///
    /// # Errors
    ///
    /// Returns the first [`SessionRejection`] that applies.
    pub fn validate(
        &self,
        session: &PortalSession,
        context: &RequestContext,
    ) -> Result<(), SessionRejection> {
        self.validate_at(session, context, Utc::now().timestamp_millis())
    }

    /// Validate with an explicit `now` in epoch milliseconds
    ///
    /// # Errors
    ///
    /// Returns the first [`SessionRejection`] that applies.
    pub fn validate_at(
        &self,
        session: &PortalSession,
        context: &RequestContext,
        now_ms: i64,
    ) -> Result<(), SessionRejection> {
        if session.ip != context.ip {
            return Err(SessionRejection::IpMismatch);
        }

        if session.user_agent != context.user_agent {
            return Err(SessionRejection::DeviceMismatch);
        }

        if now_ms.saturating_sub(session.timestamp) > self.max_age_ms {
            return Err(SessionRejection::Expired);
        }

        Ok(())
    }
}

fn strip_port(addr: &str) -> String {
    addr.parse::<SocketAddr>()
        .map_or_else(|_| addr.trim_matches(['[', ']']).to_string(), |sa| sa.ip().to_string())
}
