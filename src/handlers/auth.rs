// Authentication handlers: login, logout and current user
use actix_web::{cookie::Cookie, http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::accounts::AccountDirectory;
use crate::models::auth::{AuthenticationError, LoginRequest, STAFF_ROLE};
use crate::models::{CurrentUser, PortalSession};
use crate::session::cookie::{
    CURRENT_USER_COOKIE, INSTITUTE_ID_COOKIE, STAFF_EMAIL_COOKIE, STAFF_NAME_COOKIE,
    STAFF_ROLE_COOKIE,
};
use crate::session::{AuthenticatedSession, SessionError, SessionManager};
use crate::utils::responses::ResponseBuilder;

#[derive(Serialize)]
struct UserResponse {
    user: CurrentUser,
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountInactive => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::InvalidRequest(msg) => ResponseBuilder::bad_request(msg).build(),
            Self::InvalidCredentials => ResponseBuilder::unauthorized("Invalid credentials").build(),
            Self::AccountInactive => ResponseBuilder::forbidden("Account is inactive").build(),
            Self::ServiceUnavailable(_) => {
                ResponseBuilder::service_unavailable("Login is currently unavailable").build()
            }
        }
    }
}

/// Login handler
///
/// Resolves the account, then issues a session bound to the caller's IP and
/// `User-Agent`. No cookie is set unless the session token was produced.
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    directory: web::Data<dyn AccountDirectory>,
    session_manager: web::Data<SessionManager>,
) -> HttpResponse {
    let request = body.into_inner();
    debug!(
        "Login attempt for role {}",
        request.role.as_deref().unwrap_or("student")
    );

    let credentials = match request.credentials() {
        Ok(credentials) => credentials,
        Err(e) => return e.error_response(),
    };

    let account = match directory.authenticate(&credentials).await {
        Ok(account) => account,
        Err(e) => {
            warn!("Login failed via {} directory: {e}", directory.directory_name());
            return e.error_response();
        }
    };
    if !account.is_active {
        return AuthenticationError::AccountInactive.error_response();
    }

    let context = session_manager.request_context(&req);
    let (session, session_cookie) = match session_manager.issue_session(&account, &context) {
        Ok(issued) => issued,
        Err(e) => {
            error!("Failed to issue session: {e}");
            return e.error_response();
        }
    };

    let user = CurrentUser::from(&session);
    let companions = match companion_cookies(&session_manager, &session, &user) {
        Ok(cookies) => cookies,
        Err(e) => {
            error!("Failed to build session cookies: {e}");
            return e.error_response();
        }
    };

    info!("User {} logged in", session.user_id);
    ResponseBuilder::ok()
        .with_cookie(session_cookie)
        .with_cookies(companions)
        .json(&UserResponse { user })
}

/// Cookies the portal front end reads alongside the session
fn companion_cookies(
    manager: &SessionManager,
    session: &PortalSession,
    user: &CurrentUser,
) -> Result<Vec<Cookie<'static>>, SessionError> {
    let factory = manager.cookie_factory();
    let mut cookies = vec![factory
        .create_json_cookie(CURRENT_USER_COOKIE, user)
        .map_err(|_| SessionError::Encryption)?];

    if session.role == STAFF_ROLE {
        if let Some(email) = &session.email {
            cookies.push(factory.create_plain_cookie(STAFF_EMAIL_COOKIE, email));
        }
        if let Some(name) = &session.name {
            cookies.push(factory.create_plain_cookie(STAFF_NAME_COOKIE, name));
        }
        cookies.push(factory.create_plain_cookie(STAFF_ROLE_COOKIE, &session.role));
    } else if let Some(institute_id) = session.institute_id {
        let signed = manager.sign_value(&json!({ "id": institute_id }))?;
        cookies.push(factory.create_signed_cookie(INSTITUTE_ID_COOKIE, signed));
    }

    Ok(cookies)
}

/// Logout handler: expires every portal cookie
pub async fn logout(session_manager: web::Data<SessionManager>) -> HttpResponse {
    ResponseBuilder::ok()
        .with_cookies(session_manager.cookie_factory().create_logout_cookies())
        .json(&json!({ "message": "Logged out successfully" }))
}

/// Current user handler
///
/// Returns only the public view of the session.
pub async fn current_user(session: AuthenticatedSession) -> HttpResponse {
    ResponseBuilder::ok().json(&UserResponse {
        user: CurrentUser::from(&session.0),
    })
}
