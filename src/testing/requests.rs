//! HTTP request builders for testing handlers

use std::net::SocketAddr;

use actix_web::cookie::Cookie;
use actix_web::http::{header, Method};
use actix_web::{test, HttpRequest};
use serde_json::Value;

use super::constants::{TEST_CLIENT_IP, TEST_USER_AGENT};
use crate::session::cookie::COOKIE_NAME;

/// Builder for creating HTTP requests for testing
pub struct RequestBuilder {
    method: Method,
    uri: String,
    peer_addr: Option<SocketAddr>,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie<'static>>,
    body: Option<Value>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Create a new request builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: "/".to_string(),
            peer_addr: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the request URI
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(self, user_agent: &str) -> Self {
        self.header(header::USER_AGENT.as_str(), user_agent)
    }

    /// Set the socket peer IP (an ephemeral port is added)
    ///
    /// # Panics
    ///
    /// Panics if `ip` is not a valid IP address.
    #[must_use]
    pub fn peer_ip(mut self, ip: &str) -> Self {
        let ip = ip.parse().expect("valid test IP address");
        self.peer_addr = Some(SocketAddr::new(ip, 54_321));
        self
    }

    /// Peer IP and User-Agent of the default test client
    #[must_use]
    pub fn test_client(self) -> Self {
        self.peer_ip(TEST_CLIENT_IP).user_agent(TEST_USER_AGENT)
    }

    /// Add a cookie to the request
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Add the `session` cookie
    #[must_use]
    pub fn session_cookie(self, token: &str) -> Self {
        self.with_cookie(Cookie::new(COOKIE_NAME, token.to_string()))
    }

    /// Set `Authorization: Bearer <token>`
    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.header(header::AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// Set JSON body
    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Build a `TestRequest` for `test::call_service`
    #[must_use]
    pub fn to_test_request(self) -> test::TestRequest {
        let mut req = test::TestRequest::default()
            .method(self.method)
            .uri(&self.uri);

        if let Some(addr) = self.peer_addr {
            req = req.peer_addr(addr);
        }

        for (name, value) in self.headers {
            req = req.insert_header((name, value));
        }

        for cookie in self.cookies {
            req = req.cookie(cookie);
        }

        if let Some(body) = self.body {
            req = req.set_json(body);
        }

        req
    }

    /// Build the final `HttpRequest`
    #[must_use]
    pub fn build(self) -> HttpRequest {
        self.to_test_request().to_http_request()
    }
}

/// Quick builder functions for common request types
impl RequestBuilder {
    /// POST with a JSON body from the test client
    #[must_use]
    pub fn api_post(uri: &str, body: Value) -> Self {
        Self::new()
            .method(Method::POST)
            .uri(uri)
            .test_client()
            .json_body(body)
    }

    /// GET from the test client carrying a session token
    #[must_use]
    pub fn authenticated_get(uri: &str, token: &str) -> Self {
        Self::new().uri(uri).test_client().session_cookie(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RequestContext;
    use crate::testing::TestFixtures;

    #[::core::prelude::v1::test]
    fn test_test_client_matches_fixture_context() {
        let req = RequestBuilder::new().test_client().build();
        assert_eq!(
            RequestContext::from_request(&req, false),
            TestFixtures::request_context()
        );
    }

    #[::core::prelude::v1::test]
    fn test_session_cookie_and_bearer() {
        let req = RequestBuilder::new()
            .session_cookie("aa:bb:cc.dd")
            .bearer("xyz")
            .build();

        assert_eq!(req.cookie(COOKIE_NAME).unwrap().value(), "aa:bb:cc.dd");
        assert_eq!(
            req.headers().get(header::AUTHORIZATION).unwrap(),
            "Bearer xyz"
        );
    }
}
