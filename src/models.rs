use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod auth;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Session payload carried inside the encrypted `session` cookie
///
/// Field names are camelCase on the wire. Anything beyond the known fields is
/// kept in `extra` so a token round-trips without losing context.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortalSession {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institute_id: Option<u64>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Client IP address the session is bound to
    pub ip: String,
    /// `User-Agent` header the session is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Issue time in epoch milliseconds
    pub timestamp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PortalSession {
    /// Build a session for an authenticated account, bound to the request context
    #[must_use]
    pub fn issue(
        account: &auth::Account,
        context: &crate::session::RequestContext,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id: account.user_id.clone(),
            institute_id: account.institute_id,
            role: account.role.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            ip: context.ip.clone(),
            user_agent: context.user_agent.clone(),
            timestamp,
            extra: Map::new(),
        }
    }
}

/// Public view of a session, safe to return to the browser
///
/// Binding data (IP, user agent, issue time) is never exposed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institute_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
}

impl From<&PortalSession> for CurrentUser {
    fn from(session: &PortalSession) -> Self {
        Self {
            id: session.user_id.clone(),
            institute_id: session.institute_id,
            email: session.email.clone(),
            name: session.name.clone(),
            role: session.role.clone(),
        }
    }
}
