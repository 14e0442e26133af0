//! Account resolution for login
//!
//! Credential storage is owned by other services. The login handler only
//! needs something that turns [`Credentials`] into an [`Account`], which is
//! what [`AccountDirectory`] abstracts.

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use crate::models::auth::{Account, AuthenticationError, Credentials};
use crate::settings::StaffSettings;

/// User ID assigned to the configured staff account
pub const STAFF_USER_ID: &str = "env-staff";

/// Resolves login credentials to an account
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Authenticate credentials and return the matching account
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The credentials do not match an account
    /// - The account is inactive
    /// - This directory cannot handle the login kind
    async fn authenticate(&self, credentials: &Credentials) -> Result<Account, AuthenticationError>;

    /// Directory name for logging
    fn directory_name(&self) -> &'static str;
}

/// Directory holding the single development staff account from settings
///
/// Student logins are answered with `ServiceUnavailable`; student records
/// live in the records service.
pub struct StaffDirectory {
    staff: StaffSettings,
}

impl StaffDirectory {
    #[must_use]
    pub fn new(staff: StaffSettings) -> Self {
        Self { staff }
    }

    /// Whether a staff account is configured at all
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.staff.email.is_empty() && !self.staff.password.is_empty()
    }

    fn staff_account(&self) -> Account {
        Account {
            user_id: STAFF_USER_ID.to_string(),
            institute_id: None,
            email: Some(self.staff.email.to_lowercase()),
            name: Some(self.staff.name.clone()).filter(|n| !n.is_empty()),
            role: self.staff.role.clone(),
            is_active: true,
        }
    }

    fn matches(&self, email: &str, password: &str) -> bool {
        if !self.is_configured() {
            return false;
        }
        let email_ok = email
            .as_bytes()
            .ct_eq(self.staff.email.to_lowercase().as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.staff.password.as_bytes());
        (email_ok & password_ok).into()
    }
}

#[async_trait]
impl AccountDirectory for StaffDirectory {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Account, AuthenticationError> {
        match credentials {
            Credentials::Staff { email, password } => {
                if self.matches(email, password) {
                    Ok(self.staff_account())
                } else {
                    Err(AuthenticationError::InvalidCredentials)
                }
            }
            Credentials::Student { .. } => Err(AuthenticationError::ServiceUnavailable(
                "Student login is handled by the records service".to_string(),
            )),
        }
    }

    fn directory_name(&self) -> &'static str {
        "staff"
    }
}
