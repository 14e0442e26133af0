// HTTP request handlers for the portal session service
pub mod admin;
pub mod auth;
pub mod health;
pub mod protected;

use std::sync::Arc;

use actix_web::{error::InternalError, web};

use crate::accounts::{AccountDirectory, StaffDirectory};
use crate::session::{SessionError, SessionManager};
use crate::settings::PortalSettings;
use crate::utils::responses::ResponseBuilder;

// Re-export the main handler functions
pub use admin::{rotate_keys, RotationGuard};
pub use auth::{current_user, login, logout};
pub use health::health;
pub use protected::protected;

/// Shared application data, cloned into every worker
#[derive(Clone)]
pub struct AppState {
    pub session_manager: web::Data<SessionManager>,
    pub directory: web::Data<dyn AccountDirectory>,
    pub rotation: web::Data<RotationGuard>,
}

impl AppState {
    #[must_use]
    pub fn new(
        session_manager: SessionManager,
        directory: Arc<dyn AccountDirectory>,
        rotation: RotationGuard,
    ) -> Self {
        Self {
            session_manager: web::Data::new(session_manager),
            directory: web::Data::from(directory),
            rotation: web::Data::new(rotation),
        }
    }

    /// Build state from loaded settings
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the session secrets are
    /// missing or key derivation fails.
    pub fn from_settings(settings: &PortalSettings) -> Result<Self, SessionError> {
        let session_manager = SessionManager::from_settings(settings)?;
        let directory = StaffDirectory::new(settings.staff.clone());
        if !directory.is_configured() {
            log::warn!("No staff account configured; staff login is disabled");
        }

        Ok(Self::new(
            session_manager,
            Arc::new(directory),
            RotationGuard::from_settings(settings),
        ))
    }

    /// Register the application data and all routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.session_manager.clone())
            .app_data(self.directory.clone())
            .app_data(self.rotation.clone());
        configure_services(cfg);
    }
}

/// Register every route and the JSON body error handler
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejected request body: {err}");
        InternalError::from_response(err, ResponseBuilder::bad_request("Invalid request body").build())
            .into()
    });

    cfg.app_data(json_config)
        // Authentication endpoints
        .route("/api/auth/login", web::post().to(login))
        .route("/api/auth/logout", web::post().to(logout))
        .route("/api/auth/current-user", web::get().to(current_user))
        // Session-protected endpoints
        .route("/api/protected", web::get().to(protected))
        // Administration
        .route("/api/admin/rotate-keys", web::post().to(rotate_keys))
        // Health endpoint
        .route("/ping", web::get().to(health));
}
