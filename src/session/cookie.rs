use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    HttpRequest,
};
use serde::Serialize;

/// Common cookie names used across the portal
pub const COOKIE_NAME: &str = "session";
pub const INSTITUTE_ID_COOKIE: &str = "instituteId";
pub const CURRENT_USER_COOKIE: &str = "currentUser";
pub const STAFF_EMAIL_COOKIE: &str = "staff_email";
pub const STAFF_NAME_COOKIE: &str = "staff_name";
pub const STAFF_ROLE_COOKIE: &str = "staff_role";

/// Every cookie the portal may set for a logged-in user
pub const PORTAL_COOKIES: &[&str] = &[
    COOKIE_NAME,
    INSTITUTE_ID_COOKIE,
    CURRENT_USER_COOKIE,
    STAFF_EMAIL_COOKIE,
    STAFF_NAME_COOKIE,
    STAFF_ROLE_COOKIE,
];

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: SameSite::Strict,
            path: "/".to_string(),
            max_age: Duration::hours(24),
        }
    }
}

/// Cookie factory for the session cookie and its companions
///
/// Holds no key material: values are produced by the session codec and
/// handed in already encoded.
#[derive(Clone, Debug)]
pub struct CookieFactory {
    cookie_secure: bool,
    session_duration_hours: u64,
}

impl CookieFactory {
    #[must_use]
    pub fn new(cookie_secure: bool, session_duration_hours: u64) -> Self {
        Self {
            cookie_secure,
            session_duration_hours,
        }
    }

    /// Generic method to create a cookie with a pre-encoded value
    #[must_use]
    pub fn create_cookie(&self, name: &str, value: String, options: CookieOptions) -> Cookie<'static> {
        Cookie::build(name.to_owned(), value)
            .http_only(options.http_only)
            .secure(self.cookie_secure && options.secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age)
            .finish()
    }

    /// Create the `session` cookie carrying a signed token
    ///
    /// `HttpOnly; Path=/; Max-Age=<session duration>; SameSite=Strict`, plus
    /// `Secure` when enabled.
    #[must_use]
    pub fn create_session_cookie(&self, token: String) -> Cookie<'static> {
        self.create_cookie(COOKIE_NAME, token, self.session_options())
    }

    /// Create a companion cookie carrying an already signed token
    #[must_use]
    pub fn create_signed_cookie(&self, name: &str, token: String) -> Cookie<'static> {
        self.create_cookie(name, token, self.session_options())
    }

    /// Create an `HttpOnly` cookie holding URL-encoded JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn create_json_cookie<T: Serialize>(
        &self,
        name: &str,
        data: &T,
    ) -> serde_json::Result<Cookie<'static>> {
        let json = serde_json::to_string(data)?;
        Ok(self.create_cookie(
            name,
            urlencoding::encode(&json).into_owned(),
            self.session_options(),
        ))
    }

    /// Create an `HttpOnly` cookie holding a URL-encoded plain value
    #[must_use]
    pub fn create_plain_cookie(&self, name: &str, value: &str) -> Cookie<'static> {
        self.create_cookie(
            name,
            urlencoding::encode(value).into_owned(),
            self.session_options(),
        )
    }

    /// Create an expired cookie to clear the session
    #[must_use]
    pub fn create_expired_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(COOKIE_NAME, self.cookie_secure)
    }

    /// Expired versions of every portal cookie, for logout
    #[must_use]
    pub fn create_logout_cookies(&self) -> Vec<Cookie<'static>> {
        PORTAL_COOKIES
            .iter()
            .map(|name| create_expired_cookie(name, self.cookie_secure))
            .collect()
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    fn session_options(&self) -> CookieOptions {
        CookieOptions {
            max_age: Duration::seconds(
                i64::try_from(self.session_duration_hours)
                    .unwrap_or(i64::MAX)
                    .saturating_mul(60 * 60),
            ),
            ..Default::default()
        }
    }
}

/// Raw session token from the request's cookie jar, exactly as sent
#[must_use]
pub fn extract_session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(-1))
        .finish()
}
