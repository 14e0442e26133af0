// Administrative handlers: session key rotation
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::session::{SessionError, SessionManager};
use crate::settings::PortalSettings;
use crate::utils::responses::ResponseBuilder;

/// Bearer token guarding the rotation endpoint
///
/// With no token configured the endpoint does not exist.
#[derive(Clone, Default)]
pub struct RotationGuard {
    token: Option<String>,
}

impl RotationGuard {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &PortalSettings) -> Self {
        Self::new(Some(settings.session.rotation_token.clone()))
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Constant-time check of an `Authorization` header value
    #[must_use]
    pub fn authorize(&self, authorization: Option<&str>) -> bool {
        let (Some(expected), Some(presented)) = (
            self.token.as_deref(),
            authorization.and_then(|value| value.strip_prefix("Bearer ")),
        ) else {
            return false;
        };
        presented.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

#[derive(Deserialize)]
pub struct RotateKeysRequest {
    pub secret: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RotateKeysResponse {
    message: &'static str,
    key_generations: usize,
}

/// Rotate the session keys to a new secret
///
/// The previous key keeps verifying existing sessions; older keys are dropped.
///
/// # Errors
///
/// Returns `SessionError::InvalidInput` (400) for an empty secret and
/// `SessionError::Encryption` (500) if derivation fails.
pub async fn rotate_keys(
    req: HttpRequest,
    body: Option<web::Json<RotateKeysRequest>>,
    guard: web::Data<RotationGuard>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, SessionError> {
    if !guard.is_enabled() {
        return Ok(ResponseBuilder::not_found().build());
    }

    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    if !guard.authorize(authorization) {
        warn!("Rejected key rotation request from {:?}", req.peer_addr());
        return Ok(ResponseBuilder::unauthorized("Unauthorized").build());
    }

    let Some(body) = body else {
        return Err(SessionError::InvalidInput("missing secret".to_string()));
    };
    let secret = body.into_inner().secret;

    // PBKDF2 is deliberately slow; keep it off the worker threads
    let manager = session_manager.into_inner();
    let rotation_manager = manager.clone();
    let outcome = tokio::task::spawn_blocking(move || rotation_manager.rotate_keys(&secret))
        .await
        .map_err(|e| {
            error!("Key rotation task failed: {e}");
            SessionError::Encryption
        })?;
    outcome?;

    let key_generations = manager.codec().key_generations();
    info!("Session keys rotated ({key_generations} generations retained)");

    Ok(ResponseBuilder::ok().json(&RotateKeysResponse {
        message: "Session keys rotated",
        key_generations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::constants::TEST_ROTATION_TOKEN;
    use crate::testing::{RequestBuilder, TestFixtures};
    use actix_web::http::Method;
    use actix_web::{test, App};
    use serde_json::json;

    fn rotate_request(token: Option<&str>, body: serde_json::Value) -> test::TestRequest {
        let builder = RequestBuilder::new()
            .method(Method::POST)
            .uri("/api/admin/rotate-keys")
            .json_body(body);
        match token {
            Some(token) => builder.bearer(token),
            None => builder,
        }
        .to_test_request()
    }

    #[::core::prelude::v1::test]
    fn test_guard_authorize() {
        let guard = RotationGuard::new(Some("abc".to_string()));
        assert!(guard.authorize(Some("Bearer abc")));
        assert!(!guard.authorize(Some("Bearer abcd")));
        assert!(!guard.authorize(Some("abc")));
        assert!(!guard.authorize(None));

        let disabled = RotationGuard::new(Some(String::new()));
        assert!(!disabled.is_enabled());
        assert!(!disabled.authorize(Some("Bearer ")));
    }

    #[actix_web::test]
    async fn test_rotation_requires_bearer_token() {
        let state = TestFixtures::app_state();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(
            &app,
            rotate_request(None, json!({"secret": "next"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 401);

        let resp = test::call_service(
            &app,
            rotate_request(Some("wrong"), json!({"secret": "next"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 401);
        assert_eq!(state.session_manager.codec().key_generations(), 1);
    }

    #[actix_web::test]
    async fn test_rotation_disabled_without_token() {
        let mut state = TestFixtures::app_state();
        state.rotation = web::Data::new(RotationGuard::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(
            &app,
            rotate_request(Some(TEST_ROTATION_TOKEN), json!({"secret": "next"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_rotation_rejects_empty_secret() {
        let state = TestFixtures::app_state();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(
            &app,
            rotate_request(Some(TEST_ROTATION_TOKEN), json!({"secret": ""})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 400);
        assert_eq!(state.session_manager.codec().key_generations(), 1);
    }

    #[actix_web::test]
    async fn test_rotation_keeps_existing_sessions_valid() {
        let state = TestFixtures::app_state();
        let manager = state.session_manager.clone();
        let (session, cookie) = manager
            .issue_session(&TestFixtures::student_account(), &TestFixtures::request_context())
            .unwrap();

        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        let resp = test::call_service(
            &app,
            rotate_request(Some(TEST_ROTATION_TOKEN), json!({"secret": "rotated-secret"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["keyGenerations"], 2);

        assert!(manager
            .authenticate_token(
                Some(cookie.value()),
                &TestFixtures::request_context(),
                session.timestamp
            )
            .is_ok());
    }
}
