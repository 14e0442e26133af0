//! HTTP response handling
//!
//! Every JSON response carries a `success` flag. Failures add a `message`
//! that never reveals which internal check failed.

use actix_web::{cookie::Cookie, http::StatusCode, HttpResponse};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};

// ===============================
// CACHED RESPONSES
// ===============================

/// Pre-serialized failure bodies for messages that never change
static CACHED_BODIES: Lazy<CachedBodies> = Lazy::new(CachedBodies::new);

struct CachedBodies {
    server_error: String,
    not_found: String,
}

impl CachedBodies {
    fn new() -> Self {
        Self {
            server_error: failure_body("Internal server error"),
            not_found: failure_body("Not found"),
        }
    }
}

fn failure_body(message: &str) -> String {
    json!({ "success": false, "message": message }).to_string()
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// `400 Bad Request` with a client-facing message
    #[must_use]
    pub fn bad_request(message: &str) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::BAD_REQUEST, failure_body(message))
    }

    /// `401 Unauthorized` with a client-facing message
    #[must_use]
    pub fn unauthorized(message: &str) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::UNAUTHORIZED, failure_body(message))
    }

    /// `403 Forbidden` with a client-facing message
    #[must_use]
    pub fn forbidden(message: &str) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::FORBIDDEN, failure_body(message))
    }

    /// `503 Service Unavailable` with a client-facing message
    #[must_use]
    pub fn service_unavailable(message: &str) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::SERVICE_UNAVAILABLE, failure_body(message))
    }

    /// `404 Not Found`
    #[must_use]
    pub fn not_found() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::NOT_FOUND, CACHED_BODIES.not_found.clone())
    }

    /// `500 Internal Server Error` with a generic message
    #[must_use]
    pub fn server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            CACHED_BODIES.server_error.clone(),
        )
    }

    /// `200 OK` with `success: true` merged into the JSON body
    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::new(StatusCode::OK)
    }
}

// ===============================
// BUILDER TYPES
// ===============================

/// Builder for failure responses
pub struct ErrorResponseBuilder {
    status: StatusCode,
    body: String,
    cookies: Vec<Cookie<'static>>,
}

impl ErrorResponseBuilder {
    fn new(status: StatusCode, body: String) -> Self {
        Self {
            status,
            body,
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.content_type("application/json").body(self.body)
    }
}

/// Builder for successful JSON responses
pub struct JsonResponseBuilder {
    status: StatusCode,
    cookies: Vec<Cookie<'static>>,
}

impl JsonResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: impl IntoIterator<Item = Cookie<'static>>) -> Self {
        self.cookies.extend(cookies);
        self
    }

    /// Finish with `data`'s fields alongside `success: true`
    ///
    /// `data` should serialize to a JSON object; any other value is placed
    /// under `data`.
    #[must_use]
    pub fn json<T: Serialize>(self, data: &T) -> HttpResponse {
        let body = match serde_json::to_value(data) {
            Ok(Value::Object(mut fields)) => {
                fields.insert("success".to_string(), Value::Bool(true));
                Value::Object(fields)
            }
            Ok(Value::Null) => json!({ "success": true }),
            Ok(other) => json!({ "success": true, "data": other }),
            Err(e) => {
                log::error!("Failed to serialize response body: {e}");
                return ResponseBuilder::server_error().build();
            }
        };

        let mut builder = HttpResponse::build(self.status);
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::header;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_failure_bodies() {
        let response = ResponseBuilder::bad_request("Missing credentials").build();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "message": "Missing credentials"})
        );

        let response = ResponseBuilder::server_error().build();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "Internal server error");

        assert_eq!(ResponseBuilder::not_found().build().status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_ok_merges_success_flag_and_sets_cookies() {
        let response = ResponseBuilder::ok()
            .with_cookie(Cookie::new("a", "1"))
            .with_cookies(vec![Cookie::new("b", "2")])
            .json(&json!({"user": {"id": "u1"}}));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.cookies().count(), 2);
        assert_eq!(
            body_json(response).await,
            json!({"success": true, "user": {"id": "u1"}})
        );
    }

    #[actix_web::test]
    async fn test_unauthorized_carries_cookie() {
        let response = ResponseBuilder::unauthorized("Not logged in")
            .with_cookie(Cookie::new("session", ""))
            .build();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }
}
