use actix_web::HttpResponse;
use chrono::Utc;
use serde::Serialize;

use crate::session::AuthenticatedSession;
use crate::utils::responses::ResponseBuilder;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedUser<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    institute_id: Option<u64>,
    role: &'a str,
}

#[derive(Serialize)]
struct ProtectedResponse<'a> {
    data: &'static str,
    user: ProtectedUser<'a>,
    timestamp: String,
}

/// Example session-protected endpoint
///
/// Exposes only the institute ID and role; session binding data stays server side.
pub async fn protected(session: AuthenticatedSession) -> HttpResponse {
    let session = session.0;
    ResponseBuilder::ok().json(&ProtectedResponse {
        data: "Protected content",
        user: ProtectedUser {
            institute_id: session.institute_id,
            role: &session.role,
        },
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use crate::testing::{assert_cookie_cleared, assert_no_binding_data, RequestBuilder, TestFixtures};
    use crate::session::COOKIE_NAME;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_protected_with_valid_session() {
        let state = TestFixtures::app_state();
        let (_, cookie) = state
            .session_manager
            .issue_session(&TestFixtures::student_account(), &TestFixtures::request_context())
            .unwrap();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(
            &app,
            RequestBuilder::authenticated_get("/api/protected", cookie.value())
                .to_test_request()
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"], "Protected content");
        assert_eq!(body["user"]["role"], "student");
        assert_eq!(body["user"]["instituteId"], 20_240_001);
        assert!(body["user"].get("email").is_none());
        assert_no_binding_data(&body["user"]);
    }

    #[actix_web::test]
    async fn test_protected_rejects_session_from_other_ip() {
        let state = TestFixtures::app_state();
        let (_, cookie) = state
            .session_manager
            .issue_session(&TestFixtures::student_account(), &TestFixtures::request_context())
            .unwrap();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(
            &app,
            RequestBuilder::authenticated_get("/api/protected", cookie.value())
                .peer_ip("198.51.100.23")
                .to_test_request()
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), 401);
        assert_cookie_cleared(resp.response(), COOKIE_NAME);
    }

    #[actix_web::test]
    async fn test_protected_rejects_tampered_token() {
        let state = TestFixtures::app_state();
        let (_, cookie) = state
            .session_manager
            .issue_session(&TestFixtures::student_account(), &TestFixtures::request_context())
            .unwrap();
        let mut tampered = cookie.value().to_string();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        let resp = test::call_service(
            &app,
            RequestBuilder::authenticated_get("/api/protected", &tampered)
                .to_test_request()
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), 401);
    }
}
