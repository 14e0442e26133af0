//! Custom assertion helpers for testing

use actix_web::cookie::Cookie;
use actix_web::HttpResponse;
use serde_json::Value;

use crate::models::PortalSession;
use crate::session::cookie::COOKIE_NAME;

/// Assert that an HTTP response has the expected status code
///
/// # Panics
///
/// Panics if the response status does not match the expected status code.
pub fn assert_status(response: &HttpResponse, expected_status: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected_status,
        "Expected status {expected_status}, got {}",
        response.status()
    );
}

/// Find a cookie set by the response
#[must_use]
pub fn response_cookie(response: &HttpResponse, name: &str) -> Option<Cookie<'static>> {
    response
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(Cookie::into_owned)
}

/// Assert that the response sets a non-empty `session` cookie and return its token
///
/// # Panics
///
/// Panics if the cookie is missing, empty, or not `HttpOnly`.
#[must_use]
pub fn assert_session_cookie_set(response: &HttpResponse) -> String {
    let cookie = response_cookie(response, COOKIE_NAME)
        .unwrap_or_else(|| panic!("Expected '{COOKIE_NAME}' cookie to be set"));
    assert!(!cookie.value().is_empty(), "Session cookie should not be empty");
    assert_eq!(cookie.http_only(), Some(true), "Session cookie must be HttpOnly");
    cookie.value().to_string()
}

/// Assert that the response clears the named cookie
///
/// # Panics
///
/// Panics if the cookie is not set, or set with a value or a positive max age.
pub fn assert_cookie_cleared(response: &HttpResponse, name: &str) {
    let cookie = response_cookie(response, name)
        .unwrap_or_else(|| panic!("Expected '{name}' cookie to be cleared"));
    assert_eq!(cookie.value(), "", "Cleared cookie '{name}' should be empty");
    let max_age = cookie
        .max_age()
        .unwrap_or_else(|| panic!("Cleared cookie '{name}' should carry Max-Age"));
    assert!(
        max_age.is_negative() || max_age.is_zero(),
        "Cleared cookie '{name}' should already be expired"
    );
}

/// Assert that a user JSON object exposes no session binding data
///
/// # Panics
///
/// Panics if the object carries `ip`, `userAgent` or `timestamp`.
pub fn assert_no_binding_data(user: &Value) {
    for field in ["ip", "userAgent", "timestamp"] {
        assert!(
            user.get(field).is_none(),
            "User data must not expose '{field}': {user}"
        );
    }
}

/// Assert that two sessions describe the same user and binding
///
/// # Panics
///
/// Panics if any identifying or binding field differs.
pub fn assert_same_session(actual: &PortalSession, expected: &PortalSession) {
    assert_eq!(actual.user_id, expected.user_id, "user id differs");
    assert_eq!(actual.role, expected.role, "role differs");
    assert_eq!(actual.ip, expected.ip, "bound IP differs");
    assert_eq!(actual.user_agent, expected.user_agent, "bound user agent differs");
    assert_eq!(actual.timestamp, expected.timestamp, "issue time differs");
}
