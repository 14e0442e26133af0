#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::Path;

use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use portal_session::{handlers::AppState, settings::PortalSettings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        return match command.as_str() {
            "generate-env" => generate_env(&args.next().unwrap_or_else(|| ".env".to_string())),
            other => Err(std::io::Error::other(format!(
                "Unknown command '{other}'. Usage: portal-session [generate-env [path]]"
            ))),
        };
    }

    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = PortalSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    // Key derivation happens here; missing secrets abort before binding
    let state = AppState::from_settings(&settings).map_err(|e| {
        log::error!("Refusing to start: {e}");
        std::io::Error::other(format!("Failed to initialize sessions: {e}"))
    })?;

    start_server(state, settings).await
}

/// Write a fresh `.env` with newly generated secrets
fn generate_env(path: &str) -> std::io::Result<()> {
    let path = Path::new(path);
    PortalSettings::write_env_file(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Could not write {}: {e}", path.display()),
        )
    })?;
    println!("✓ Wrote new secrets to {}", path.display());
    println!("  Keep this file out of version control.");
    Ok(())
}

/// Start the server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(state: AppState, settings: PortalSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    // Configure CORS for the portal front end
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        let state = state.clone();
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &PortalSettings) {
    println!("Starting portal session service on http://{bind_address}");
    println!("Environment: {}", settings.application.environment);
    println!(
        "Session lifetime: {}h, Secure cookies: {}",
        settings.session.max_age_hours,
        settings.cookie_secure()
    );
    println!(
        "Previous key: {}",
        if settings.session.previous_cookie_secret.is_empty() {
            "none"
        } else {
            "loaded"
        }
    );
    println!();
    println!("Authentication endpoints:");
    println!("  POST /api/auth/login         - Sign in and receive a session cookie");
    println!("  POST /api/auth/logout        - Clear session cookies");
    println!("  GET  /api/auth/current-user  - Current user (requires session)");
    println!("  GET  /api/protected          - Protected example (requires session)");
    println!();
    if settings.rotation_enabled() {
        println!("Administration:");
        println!("  POST /api/admin/rotate-keys  - Rotate session keys (bearer token)");
        println!();
    }
    println!("System endpoints:");
    println!("  GET  /ping                   - Health check");
}
