//! Login request and account types
//!
//! Credential storage lives outside this crate; these types are what the
//! login handler exchanges with an [`AccountDirectory`].
//!
//! [`AccountDirectory`]: crate::accounts::AccountDirectory

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Role value used for staff accounts
pub const STAFF_ROLE: &str = "staff";

/// Role value used for student accounts
pub const STUDENT_ROLE: &str = "student";

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Accepts either a JSON number or a numeric string
    #[serde(default)]
    pub institute_id: Option<Value>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Whether this is a staff login (email based) rather than a student one
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role.as_deref() == Some(STAFF_ROLE)
    }

    /// The password, if present and non-empty
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// The email, lowercased, if present and non-empty
    #[must_use]
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }

    /// Parse the institute ID
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError::InvalidRequest` if the value is present but
    /// is not a non-negative integer.
    pub fn institute_id(&self) -> Result<Option<u64>, AuthenticationError> {
        match &self.institute_id {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(Self::invalid_institute_id),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Self::invalid_institute_id()),
            Some(_) => Err(Self::invalid_institute_id()),
        }
    }

    fn invalid_institute_id() -> AuthenticationError {
        AuthenticationError::InvalidRequest("Institute ID must be a number".to_string())
    }

    /// Check required fields for the requested role
    ///
    /// Staff sign in with email and password; everyone else with institute ID
    /// and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError::InvalidRequest` naming the missing fields.
    pub fn credentials(&self) -> Result<Credentials, AuthenticationError> {
        if self.is_staff() {
            match (self.normalized_email(), self.password()) {
                (Some(email), Some(password)) => Ok(Credentials::Staff {
                    email,
                    password: password.to_string(),
                }),
                _ => Err(AuthenticationError::InvalidRequest(
                    "Email and password are required".to_string(),
                )),
            }
        } else {
            let institute_id = self.institute_id()?;
            match (institute_id, self.password()) {
                (Some(institute_id), Some(password)) => Ok(Credentials::Student {
                    institute_id,
                    password: password.to_string(),
                }),
                _ => Err(AuthenticationError::InvalidRequest(
                    "Institute ID and password are required".to_string(),
                )),
            }
        }
    }
}

/// Validated login credentials
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Staff { email: String, password: String },
    Student { institute_id: u64, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Staff { email, .. } => f
                .debug_struct("Staff")
                .field("email", email)
                .finish_non_exhaustive(),
            Credentials::Student { institute_id, .. } => f
                .debug_struct("Student")
                .field("institute_id", institute_id)
                .finish_non_exhaustive(),
        }
    }
}

/// An authenticated account as resolved by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: String,
    pub institute_id: Option<u64>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: String,
    pub is_active: bool,
}

/// Login failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Required fields missing or malformed
    InvalidRequest(String),
    /// Unknown account or wrong password
    InvalidCredentials,
    /// Account exists but is disabled
    AccountInactive,
    /// Login kind not supported by the configured directory
    ServiceUnavailable(String),
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthenticationError::InvalidRequest(msg) => write!(f, "Invalid request: {msg}"),
            AuthenticationError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthenticationError::AccountInactive => write!(f, "Account is inactive"),
            AuthenticationError::ServiceUnavailable(msg) => {
                write!(f, "Service unavailable: {msg}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}
