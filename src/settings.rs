use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::session::errors::SessionError;
use crate::utils::crypto::generate_secret_hex;

/// Environment name that disables the `Secure` cookie attribute by default
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_AGE_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PortalSettings {
    pub application: ApplicationSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
    pub staff: StaffSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
    /// `development` or `production`; controls the default cookie `Secure` flag
    pub environment: String,
    /// Take the client IP from `Forwarded` / `X-Forwarded-For` (only behind a trusted proxy)
    pub trust_forwarded_headers: bool,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Source of the active signing/encryption key
    pub cookie_secret: String,
    /// Source of the fallback key; empty when no rotation has happened
    pub previous_cookie_secret: String,
    /// Salt shared by both key derivations
    pub cookie_salt: String,
    /// Absolute session lifetime, also used as the cookie `Max-Age`
    pub max_age_hours: u64,
    /// Bearer token for the key rotation endpoint; empty disables it
    pub rotation_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CookieSettings {
    /// Explicit `Secure` flag; when unset it follows the environment
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

/// Development staff account (the only account source this service owns)
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffSettings {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            cors_origins: "http://localhost:3000".to_string(),
            environment: DEVELOPMENT_ENVIRONMENT.to_string(),
            trust_forwarded_headers: false,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_secret: String::new(),
            previous_cookie_secret: String::new(),
            cookie_salt: String::new(),
            max_age_hours: 24,
            rotation_token: String::new(),
        }
    }
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("cookie_secret", &redacted(&self.cookie_secret))
            .field("previous_cookie_secret", &redacted(&self.previous_cookie_secret))
            .field("cookie_salt", &redacted(&self.cookie_salt))
            .field("max_age_hours", &self.max_age_hours)
            .field("rotation_token", &redacted(&self.rotation_token))
            .finish()
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for StaffSettings {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            name: String::new(),
            role: crate::models::auth::STAFF_ROLE.to_string(),
        }
    }
}

impl fmt::Debug for StaffSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaffSettings")
            .field("email", &self.email)
            .field("password", &redacted(&self.password))
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl PortalSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    /// - Logger initialization fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file(Path::new(".env"));

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Self::initialize_logging(&settings.logging)?;
        Ok(settings)
    }

    /// Check that the settings can start the service
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the cookie secret or salt is
    /// missing, or the session lifetime is zero or longer than
    /// [`MAX_SESSION_AGE_HOURS`].
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.session.cookie_secret.is_empty() {
            return Err(SessionError::Configuration(
                "COOKIE_SECRET is required".to_string(),
            ));
        }
        if self.session.cookie_salt.is_empty() {
            return Err(SessionError::Configuration(
                "COOKIE_SALT is required".to_string(),
            ));
        }
        if self.session.max_age_hours == 0 {
            return Err(SessionError::Configuration(
                "max_age_hours must be greater than zero".to_string(),
            ));
        }
        if self.session.max_age_hours > MAX_SESSION_AGE_HOURS {
            return Err(SessionError::Configuration(format!(
                "max_age_hours must not exceed {MAX_SESSION_AGE_HOURS}"
            )));
        }
        Ok(())
    }

    /// Initialize the global logger from the configured level
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    fn initialize_logging(logging: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::Builder::new()
            .parse_filters(&logging.level)
            .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PORTAL_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("PORTAL_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ PORTAL_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
        Self::apply_staff_env_overrides(&mut settings.staff);
    }

    /// Apply environment overrides for application settings
    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        Self::apply_string_env_override("HOST", &mut app_settings.host);
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        Self::apply_string_env_override("CORS_ORIGINS", &mut app_settings.cors_origins);
        Self::apply_string_env_override("APP_ENV", &mut app_settings.environment);
        if let Ok(value) = std::env::var("TRUST_FORWARDED_HEADERS") {
            if let Ok(trust) = value.parse::<bool>() {
                app_settings.trust_forwarded_headers = trust;
            }
        }
    }

    /// Apply environment overrides for session settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_string_env_override("COOKIE_SECRET", &mut session_settings.cookie_secret);
        Self::apply_string_env_override("COOKIE_SALT", &mut session_settings.cookie_salt);
        Self::apply_string_env_override("KEY_ROTATION_TOKEN", &mut session_settings.rotation_token);

        // An empty PREV_COOKIE_SECRET is meaningful: it clears the fallback key
        if let Ok(previous) = std::env::var("PREV_COOKIE_SECRET") {
            session_settings.previous_cookie_secret = previous;
        }

        if let Ok(value_str) = std::env::var("SESSION_MAX_AGE_HOURS") {
            if let Ok(value) = value_str.parse::<u64>() {
                session_settings.max_age_hours = value;
            }
        }
    }

    /// Apply environment overrides for cookie settings
    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = Some(cookie_secure);
            }
        }
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        Self::apply_string_env_override("RUST_LOG", &mut logging_settings.level);
    }

    /// Apply environment overrides for the development staff account
    fn apply_staff_env_overrides(staff_settings: &mut StaffSettings) {
        Self::apply_string_env_override("DEV_STAFF_EMAIL", &mut staff_settings.email);
        Self::apply_string_env_override("DEV_STAFF_PASSWORD", &mut staff_settings.password);
        Self::apply_string_env_override("DEV_STAFF_NAME", &mut staff_settings.name);
        Self::apply_string_env_override("DEV_STAFF_ROLE", &mut staff_settings.role);
    }

    /// Helper function to apply non-empty string environment variable overrides
    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                *target = value;
            }
        }
    }

    /// Load environment variables from a dotenv-style file
    ///
    /// Variables already present in the process environment win.
    pub fn load_env_file(path: &Path) {
        if let Ok(contents) = fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    if std::env::var_os(key).is_none() {
                        std::env::set_var(key, value.trim());
                    }
                }
            }
        }
    }

    /// Render a fresh environment file with newly generated secrets
    #[must_use]
    pub fn generate_env_contents() -> String {
        [
            format!("COOKIE_SECRET={}", generate_secret_hex(32)),
            format!("COOKIE_SALT={}", generate_secret_hex(16)),
            "PREV_COOKIE_SECRET=".to_string(),
            format!("APP_ENV={DEVELOPMENT_ENVIRONMENT}"),
            "PORT=4000".to_string(),
            "CORS_ORIGINS=http://localhost:3000".to_string(),
        ]
        .join("\n")
            + "\n"
    }

    /// Write a fresh environment file, refusing to replace an existing one
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or cannot be written
    pub fn write_env_file(path: &Path) -> std::io::Result<()> {
        use std::io::Write;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(Self::generate_env_contents().as_bytes())
    }

    /// Whether session cookies carry the `Secure` attribute
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookies
            .secure
            .unwrap_or(self.application.environment != DEVELOPMENT_ENVIRONMENT)
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether the key rotation endpoint is enabled
    #[must_use]
    pub fn rotation_enabled(&self) -> bool {
        !self.session.rotation_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Helper function to clean all relevant environment variables for tests
    fn clean_env_vars() {
        for var in [
            "COOKIE_SECRET",
            "PREV_COOKIE_SECRET",
            "COOKIE_SALT",
            "SESSION_MAX_AGE_HOURS",
            "KEY_ROTATION_TOKEN",
            "COOKIE_SECURE",
            "APP_ENV",
            "PORTAL_SECRETS_DIR",
            "PORTAL_TEST_DOTENV_KEY",
        ] {
            std::env::remove_var(var);
        }
    }

    fn configured() -> PortalSettings {
        let mut settings = PortalSettings::default();
        settings.session.cookie_secret = "secret".to_string();
        settings.session.cookie_salt = "salt".to_string();
        settings
    }

    #[test]
    fn test_defaults() {
        let settings = PortalSettings::default();
        assert_eq!(settings.session.max_age_hours, 24);
        assert_eq!(settings.session.cookie_secret, "");
        assert_eq!(settings.application.environment, "development");
        assert!(!settings.rotation_enabled());
    }

    #[test]
    fn test_validate_requires_secret_and_salt() {
        assert!(configured().validate().is_ok());

        let mut missing_secret = configured();
        missing_secret.session.cookie_secret.clear();
        assert!(matches!(
            missing_secret.validate(),
            Err(SessionError::Configuration(msg)) if msg.contains("COOKIE_SECRET")
        ));

        let mut missing_salt = configured();
        missing_salt.session.cookie_salt.clear();
        assert!(matches!(
            missing_salt.validate(),
            Err(SessionError::Configuration(msg)) if msg.contains("COOKIE_SALT")
        ));

        let mut zero_age = configured();
        zero_age.session.max_age_hours = 0;
        assert!(zero_age.validate().is_err());
    }

    #[test]
    fn test_validate_caps_session_lifetime() {
        let mut at_cap = configured();
        at_cap.session.max_age_hours = MAX_SESSION_AGE_HOURS;
        assert!(at_cap.validate().is_ok());

        let mut over_cap = configured();
        over_cap.session.max_age_hours = MAX_SESSION_AGE_HOURS + 1;
        assert!(matches!(
            over_cap.validate(),
            Err(SessionError::Configuration(msg)) if msg.contains("max_age_hours")
        ));

        let mut huge = configured();
        huge.session.max_age_hours = u64::MAX / 2;
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_cookie_secure_follows_environment() {
        let mut settings = configured();
        assert!(!settings.cookie_secure());

        settings.application.environment = "production".to_string();
        assert!(settings.cookie_secure());

        settings.cookies.secure = Some(false);
        assert!(!settings.cookie_secure());
    }

    #[test]
    #[serial]
    fn test_session_env_overrides() {
        clean_env_vars();

        let mut session_settings = SessionSettings {
            cookie_secret: "file-secret".to_string(),
            previous_cookie_secret: "file-previous".to_string(),
            ..SessionSettings::default()
        };

        std::env::set_var("COOKIE_SECRET", "env-secret");
        std::env::set_var("COOKIE_SALT", "env-salt");
        std::env::set_var("PREV_COOKIE_SECRET", "");
        std::env::set_var("SESSION_MAX_AGE_HOURS", "12");

        PortalSettings::apply_session_env_overrides(&mut session_settings);

        assert_eq!(session_settings.cookie_secret, "env-secret");
        assert_eq!(session_settings.cookie_salt, "env-salt");
        assert_eq!(session_settings.previous_cookie_secret, "");
        assert_eq!(session_settings.max_age_hours, 12);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_cookie_secure_env_override() {
        clean_env_vars();

        let mut settings = configured();
        std::env::set_var("COOKIE_SECURE", "true");
        PortalSettings::apply_env_overrides(&mut settings);
        assert!(settings.cookie_secure());

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_settings_file_then_env_precedence() {
        clean_env_vars();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Settings.toml");
        fs::write(
            &path,
            r#"
[application]
port = 9000
environment = "production"

[session]
cookie_secret = "toml-secret"
cookie_salt = "toml-salt"
max_age_hours = 8
"#,
        )
        .unwrap();

        let mut settings = PortalSettings::from_file(&path).unwrap();
        assert_eq!(settings.application.port, 9000);
        assert_eq!(settings.application.host, "0.0.0.0");
        assert_eq!(settings.session.cookie_secret, "toml-secret");
        assert_eq!(settings.session.max_age_hours, 8);
        assert!(settings.cookie_secure());

        std::env::set_var("COOKIE_SECRET", "env-secret");
        PortalSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings.session.cookie_secret, "env-secret");
        assert_eq!(settings.session.cookie_salt, "toml-salt");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_load_env_file_does_not_override_process_env() {
        clean_env_vars();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# comment\nPORTAL_TEST_DOTENV_KEY=from-file\nCOOKIE_SALT=file-salt\n")
            .unwrap();
        std::env::set_var("COOKIE_SALT", "process-salt");

        PortalSettings::load_env_file(&path);

        assert_eq!(std::env::var("PORTAL_TEST_DOTENV_KEY").unwrap(), "from-file");
        assert_eq!(std::env::var("COOKIE_SALT").unwrap(), "process-salt");

        clean_env_vars();
    }

    #[test]
    fn test_generate_env_contents() {
        let contents = PortalSettings::generate_env_contents();
        let secret_line = contents
            .lines()
            .find(|l| l.starts_with("COOKIE_SECRET="))
            .unwrap();
        let salt_line = contents
            .lines()
            .find(|l| l.starts_with("COOKIE_SALT="))
            .unwrap();

        assert_eq!(secret_line.len(), "COOKIE_SECRET=".len() + 64);
        assert_eq!(salt_line.len(), "COOKIE_SALT=".len() + 32);
        assert!(contents.contains("PREV_COOKIE_SECRET=\n"));
        assert_ne!(contents, PortalSettings::generate_env_contents());
    }

    #[test]
    fn test_write_env_file_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        PortalSettings::write_env_file(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let err = PortalSettings::write_env_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut settings = configured();
        settings.staff.password = "hunter2".to_string();

        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret\""));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_cors_origins_split() {
        let mut settings = PortalSettings::default();
        settings.application.cors_origins = "http://a.example, http://b.example,".to_string();
        assert_eq!(
            settings.get_cors_origins(),
            vec!["http://a.example", "http://b.example"]
        );
    }
}
