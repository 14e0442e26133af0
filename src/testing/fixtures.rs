//! Test fixtures providing pre-built test objects
//!
//! Key derivation runs PBKDF2 with a production iteration count, so the test
//! keys are derived once per process and cloned from there.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Map;

use crate::accounts::StaffDirectory;
use crate::handlers::{AppState, RotationGuard};
use crate::models::auth::{Account, STAFF_ROLE, STUDENT_ROLE};
use crate::models::PortalSession;
use crate::session::cookie::CookieFactory;
use crate::session::keys::DerivedKey;
use crate::session::validation::{RequestContext, SessionValidator};
use crate::session::{SessionCodec, SessionManager};
use crate::settings::PortalSettings;

use super::constants::{
    TEST_CLIENT_IP, TEST_EMAIL, TEST_INSTITUTE_ID, TEST_ROTATION_TOKEN, TEST_SALT, TEST_SECRET_A,
    TEST_SECRET_B, TEST_SECRET_C, TEST_STAFF_EMAIL, TEST_STAFF_NAME, TEST_STAFF_PASSWORD,
    TEST_USER_AGENT, TEST_USER_ID, TEST_USER_NAME,
};

static KEY_A: Lazy<DerivedKey> = Lazy::new(|| derive(TEST_SECRET_A));
static KEY_B: Lazy<DerivedKey> = Lazy::new(|| derive(TEST_SECRET_B));
static KEY_C: Lazy<DerivedKey> = Lazy::new(|| derive(TEST_SECRET_C));

fn derive(secret: &str) -> DerivedKey {
    DerivedKey::derive(secret, TEST_SALT).expect("test key derivation")
}

/// Key derived from [`TEST_SECRET_A`]
#[must_use]
pub fn key_a() -> DerivedKey {
    KEY_A.clone()
}

/// Key derived from [`TEST_SECRET_B`]
#[must_use]
pub fn key_b() -> DerivedKey {
    KEY_B.clone()
}

/// Key derived from [`TEST_SECRET_C`]
#[must_use]
pub fn key_c() -> DerivedKey {
    KEY_C.clone()
}

/// Codec over pre-derived keys
#[must_use]
pub fn codec_with(current: DerivedKey, previous: Option<DerivedKey>) -> SessionCodec {
    SessionCodec::with_keys(current, previous, TEST_SALT)
}

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Request context matching [`TestFixtures::student_session`]
    #[must_use]
    pub fn request_context() -> RequestContext {
        RequestContext::new(TEST_CLIENT_IP, Some(TEST_USER_AGENT))
    }

    /// Active student account
    #[must_use]
    pub fn student_account() -> Account {
        Account {
            user_id: TEST_USER_ID.to_string(),
            institute_id: Some(TEST_INSTITUTE_ID),
            email: Some(TEST_EMAIL.to_string()),
            name: Some(TEST_USER_NAME.to_string()),
            role: STUDENT_ROLE.to_string(),
            is_active: true,
        }
    }

    /// Staff account matching [`TestFixtures::settings`]
    #[must_use]
    pub fn staff_account() -> Account {
        Account {
            user_id: crate::accounts::STAFF_USER_ID.to_string(),
            institute_id: None,
            email: Some(TEST_STAFF_EMAIL.to_string()),
            name: Some(TEST_STAFF_NAME.to_string()),
            role: STAFF_ROLE.to_string(),
            is_active: true,
        }
    }

    /// Student session issued just now from the test client
    #[must_use]
    pub fn student_session() -> PortalSession {
        PortalSession {
            user_id: TEST_USER_ID.to_string(),
            institute_id: Some(TEST_INSTITUTE_ID),
            role: STUDENT_ROLE.to_string(),
            email: Some(TEST_EMAIL.to_string()),
            name: Some(TEST_USER_NAME.to_string()),
            ip: TEST_CLIENT_IP.to_string(),
            user_agent: Some(TEST_USER_AGENT.to_string()),
            timestamp: chrono::Utc::now().timestamp_millis(),
            extra: Map::new(),
        }
    }

    /// Session manager over key A, 24 hour sessions, insecure cookies
    #[must_use]
    pub fn session_manager() -> SessionManager {
        SessionManager::new(
            Arc::new(codec_with(key_a(), None)),
            SessionValidator::default(),
            CookieFactory::new(false, 24),
            false,
        )
    }

    /// Settings with test secrets, a staff account and rotation enabled
    #[must_use]
    pub fn settings() -> PortalSettings {
        let mut settings = PortalSettings::default();
        settings.session.cookie_secret = TEST_SECRET_A.to_string();
        settings.session.cookie_salt = TEST_SALT.to_string();
        settings.session.rotation_token = TEST_ROTATION_TOKEN.to_string();
        settings.staff.email = TEST_STAFF_EMAIL.to_string();
        settings.staff.password = TEST_STAFF_PASSWORD.to_string();
        settings.staff.name = TEST_STAFF_NAME.to_string();
        settings
    }

    /// Application state over [`TestFixtures::session_manager`], the test
    /// staff account and the test rotation token
    #[must_use]
    pub fn app_state() -> AppState {
        AppState::new(
            Self::session_manager(),
            Arc::new(StaffDirectory::new(Self::settings().staff)),
            RotationGuard::new(Some(TEST_ROTATION_TOKEN.to_string())),
        )
    }
}
