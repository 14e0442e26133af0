//! Session Manager - issuing and authenticating portal sessions
//!
//! The `SessionManager` ties the pieces together:
//! - **Codec**: encrypts/signs payloads and verifies tokens (`codec` module)
//! - **Validation**: IP, device and age checks (`validation` module)
//! - **Cookies**: building and clearing the session cookie (`CookieFactory`)
//!
//! Request flow: extract the raw `session` cookie, verify it, validate the
//! payload against the request context. Any failure yields an
//! [`AuthRejection`], whose HTTP response clears the cookie and returns 401.

use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::{
    cookie::Cookie, dev::Payload, error::ErrorInternalServerError, web, FromRequest, HttpRequest,
    HttpResponse, ResponseError,
};
use chrono::Utc;

use crate::models::auth::Account;
use crate::models::PortalSession;
use crate::session::codec::SessionCodec;
use crate::session::cookie::{extract_session_token, CookieFactory};
use crate::session::errors::SessionError;
use crate::session::validation::{RequestContext, SessionRejection, SessionValidator};
use crate::settings::PortalSettings;
use crate::utils::responses::ResponseBuilder;

// =============================================================================
// Types and Error Handling
// =============================================================================

/// Why a request could not be authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No session cookie on the request
    MissingSession,
    /// The token did not verify under any retained key
    InvalidToken,
    /// The token verified but the session was refused
    Rejected(SessionRejection),
}

impl AuthFailure {
    /// Reason code for server-side logs
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::MissingSession => "missing-session",
            Self::InvalidToken => "invalid-token",
            Self::Rejected(rejection) => rejection.reason(),
        }
    }
}

/// A failed authentication, rendered as 401 with the session cookie cleared
///
/// The response body never reveals which check failed.
#[derive(Debug)]
pub struct AuthRejection {
    failure: AuthFailure,
    clear_cookie: Cookie<'static>,
}

impl AuthRejection {
    #[must_use]
    pub fn failure(&self) -> AuthFailure {
        self.failure
    }
}

impl std::fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session rejected: {}", self.failure.reason())
    }
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.failure {
            AuthFailure::MissingSession => "Not logged in",
            AuthFailure::InvalidToken | AuthFailure::Rejected(_) => "Please sign in again",
        };
        ResponseBuilder::unauthorized(message)
            .with_cookie(self.clear_cookie.clone())
            .build()
    }
}

// =============================================================================
// Session Manager Structure
// =============================================================================

/// Session manager shared by all workers
#[derive(Clone, Debug)]
pub struct SessionManager {
    codec: Arc<SessionCodec>,
    validator: SessionValidator,
    cookie_factory: CookieFactory,
    trust_forwarded_headers: bool,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        codec: Arc<SessionCodec>,
        validator: SessionValidator,
        cookie_factory: CookieFactory,
        trust_forwarded_headers: bool,
    ) -> Self {
        Self {
            codec,
            validator,
            cookie_factory,
            trust_forwarded_headers,
        }
    }

    /// Derive keys from the configured secrets and build the manager
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the settings fail validation
    /// or key derivation fails.
    pub fn from_settings(settings: &PortalSettings) -> Result<Self, SessionError> {
        settings.validate()?;

        let session = &settings.session;
        let codec = SessionCodec::from_secrets(
            &session.cookie_secret,
            Some(session.previous_cookie_secret.as_str()),
            &session.cookie_salt,
        )?;

        Ok(Self::new(
            Arc::new(codec),
            SessionValidator::from_hours(session.max_age_hours),
            CookieFactory::new(settings.cookie_secure(), session.max_age_hours),
            settings.application.trust_forwarded_headers,
        ))
    }
}

// =============================================================================
// Session Creation
// =============================================================================

impl SessionManager {
    /// Issue a session for an authenticated account
    ///
    /// Returns the payload and the `session` cookie carrying its token.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Encryption` if the token cannot be produced; no
    /// cookie is issued in that case.
    pub fn issue_session(
        &self,
        account: &Account,
        context: &RequestContext,
    ) -> Result<(PortalSession, Cookie<'static>), SessionError> {
        let session = PortalSession::issue(account, context, Utc::now().timestamp_millis());
        let token = self.codec.sign(&session)?;

        log::info!(
            "Issued session for user {} (role: {})",
            session.user_id,
            session.role
        );

        Ok((session, self.cookie_factory.create_session_cookie(token)))
    }

    /// Sign an arbitrary payload with the session keys
    ///
    /// # Errors
    ///
    /// See [`SessionCodec::sign`].
    pub fn sign_value<T: serde::Serialize>(&self, payload: &T) -> Result<String, SessionError> {
        self.codec.sign(payload)
    }
}

// =============================================================================
// Session Extraction & Validation
// =============================================================================

impl SessionManager {
    /// Authenticate a request from its `session` cookie
    ///
    /// # Errors
    ///
    /// Returns an [`AuthRejection`] if the cookie is missing, does not verify,
    /// or fails IP, device or age validation.
    pub fn authenticate(&self, req: &HttpRequest) -> Result<PortalSession, AuthRejection> {
        let token = extract_session_token(req);
        let context = RequestContext::from_request(req, self.trust_forwarded_headers);

        self.authenticate_token(token.as_deref(), &context, Utc::now().timestamp_millis())
            .map_err(|failure| {
                match failure {
                    AuthFailure::MissingSession => log::debug!("No session cookie on request"),
                    AuthFailure::InvalidToken => {
                        log::warn!("Invalid session token from {}", context.ip);
                    }
                    AuthFailure::Rejected(rejection) => {
                        log::warn!("Session rejected ({rejection}) for client {}", context.ip);
                    }
                }
                AuthRejection {
                    failure,
                    clear_cookie: self.cookie_factory.create_expired_cookie(),
                }
            })
    }

    /// Verify and validate a raw token against a request context
    ///
    /// # Errors
    ///
    /// Returns the [`AuthFailure`] describing the first failed step.
    pub fn authenticate_token(
        &self,
        token: Option<&str>,
        context: &RequestContext,
        now_ms: i64,
    ) -> Result<PortalSession, AuthFailure> {
        let token = token.ok_or(AuthFailure::MissingSession)?;
        let session: PortalSession = self
            .codec
            .verify(token)
            .ok_or(AuthFailure::InvalidToken)?;

        self.validator
            .validate_at(&session, context, now_ms)
            .map_err(AuthFailure::Rejected)?;

        Ok(session)
    }
}

// =============================================================================
// Utilities
// =============================================================================

impl SessionManager {
    #[must_use]
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub fn cookie_factory(&self) -> &CookieFactory {
        &self.cookie_factory
    }

    #[must_use]
    pub fn request_context(&self, req: &HttpRequest) -> RequestContext {
        RequestContext::from_request(req, self.trust_forwarded_headers)
    }

    /// Rotate to a key derived from `new_secret`
    ///
    /// Key derivation is slow; call from a blocking context.
    ///
    /// # Errors
    ///
    /// See [`SessionCodec::rotate_keys`].
    pub fn rotate_keys(&self, new_secret: &str) -> Result<(), SessionError> {
        self.codec.rotate_keys(new_secret)
    }
}

/// Extractor for handlers that require a valid session
///
/// Rejects with [`AuthRejection`] (401 + cleared cookie) when the request is
/// not authenticated.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub PortalSession);

impl FromRequest for AuthenticatedSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(manager) = req.app_data::<web::Data<SessionManager>>() else {
            log::error!("SessionManager missing from application data");
            return ready(Err(ErrorInternalServerError("Session manager unavailable")));
        };

        ready(
            manager
                .authenticate(req)
                .map(AuthenticatedSession)
                .map_err(actix_web::Error::from),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::constants::{TEST_CLIENT_IP, TEST_USER_AGENT};
    use crate::testing::fixtures::key_b;
    use crate::testing::{assert_same_session, TestFixtures};
    use actix_web::{body::to_bytes, test};

    fn context() -> RequestContext {
        RequestContext::new(TEST_CLIENT_IP, Some(TEST_USER_AGENT))
    }

    #[::core::prelude::v1::test]
    fn test_issue_then_authenticate_token() {
        let manager = TestFixtures::session_manager();
        let (session, cookie) = manager
            .issue_session(&TestFixtures::student_account(), &context())
            .unwrap();

        assert_eq!(cookie.name(), "session");
        let authenticated = manager
            .authenticate_token(Some(cookie.value()), &context(), session.timestamp + 1_000)
            .unwrap();
        assert_eq!(authenticated, session);
    }

    #[::core::prelude::v1::test]
    fn test_authenticate_token_failures() {
        let manager = TestFixtures::session_manager();
        let (session, cookie) = manager
            .issue_session(&TestFixtures::student_account(), &context())
            .unwrap();
        let now = session.timestamp + 1_000;

        assert_eq!(
            manager.authenticate_token(None, &context(), now),
            Err(AuthFailure::MissingSession)
        );
        assert_eq!(
            manager.authenticate_token(Some("not-a-valid-token"), &context(), now),
            Err(AuthFailure::InvalidToken)
        );

        let elsewhere = RequestContext::new("198.51.100.7", Some(TEST_USER_AGENT));
        assert_eq!(
            manager.authenticate_token(Some(cookie.value()), &elsewhere, now),
            Err(AuthFailure::Rejected(SessionRejection::IpMismatch))
        );

        let other_device = RequestContext::new(TEST_CLIENT_IP, Some("curl/8.0"));
        assert_eq!(
            manager.authenticate_token(Some(cookie.value()), &other_device, now),
            Err(AuthFailure::Rejected(SessionRejection::DeviceMismatch))
        );

        let next_day = session.timestamp + 24 * 60 * 60 * 1000 + 1;
        assert_eq!(
            manager.authenticate_token(Some(cookie.value()), &context(), next_day),
            Err(AuthFailure::Rejected(SessionRejection::Expired))
        );
    }

    #[::core::prelude::v1::test]
    fn test_from_settings_rejects_unbounded_lifetime() {
        let mut settings = TestFixtures::settings();
        settings.session.max_age_hours = u64::MAX / 2;

        assert!(matches!(
            SessionManager::from_settings(&settings),
            Err(SessionError::Configuration(_))
        ));
    }

    #[::core::prelude::v1::test]
    fn test_sessions_survive_rotation() {
        let manager = TestFixtures::session_manager();
        let (session, cookie) = manager
            .issue_session(&TestFixtures::student_account(), &context())
            .unwrap();

        manager.codec().rotate_to(key_b());
        let authenticated = manager
            .authenticate_token(Some(cookie.value()), &context(), session.timestamp)
            .unwrap();
        assert_same_session(&authenticated, &session);
    }

    #[actix_web::test]
    async fn test_rejection_response_clears_cookie() {
        let manager = TestFixtures::session_manager();
        let req = test::TestRequest::default()
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .cookie(Cookie::new("session", "tampered.token"))
            .to_http_request();

        let rejection = manager.authenticate(&req).unwrap_err();
        assert_eq!(rejection.failure(), AuthFailure::InvalidToken);

        let response = rejection.error_response();
        assert_eq!(response.status(), 401);

        let set_cookie = response
            .headers()
            .get(actix_web::http::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("session=;"));
        assert!(set_cookie.contains("Max-Age=-1"));

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Please sign in again");
    }

    #[::core::prelude::v1::test]
    fn test_failure_reason_codes() {
        assert_eq!(AuthFailure::MissingSession.reason(), "missing-session");
        assert_eq!(AuthFailure::InvalidToken.reason(), "invalid-token");
        assert_eq!(
            AuthFailure::Rejected(SessionRejection::Expired).reason(),
            "expired"
        );
    }
}
