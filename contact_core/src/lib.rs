//! Core library for the contact-form submission server.

pub mod config;
pub mod contact;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;

pub use config::AppConfig;
pub use contact::{ContactForm, SubmissionGate, SubmissionPayload};
pub use error::{ContactError, Result};
pub use handlers::routes::create_routes;
pub use mail::{EnvMailSettings, MailSettings, MailSettingsSource, Mailer, OutgoingMail, SmtpMailer};
pub use middleware::client_identity::{client_identity, ClientIdentity};
pub use middleware::cors::cors_layer_from_config;
pub use middleware::rate_limit::{RateLimitStatus, RateLimiter};

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub rate_limiter: RateLimiter,
    pub gate: SubmissionGate,
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            app_name: "Contact Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            rate_limiter: RateLimiter::new(&config.rate_limit),
            gate: SubmissionGate::from_config(&config.mail),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_gate(mut self, gate: SubmissionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.gate = self.gate.with_mailer(mailer);
        self
    }

    pub fn with_mail_settings(mut self, settings: Arc<dyn MailSettingsSource>) -> Self {
        self.gate = self.gate.with_settings(settings);
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    create_app_with_config(state, &AppConfig::default())
}

pub fn create_app_with_config(state: AppState, config: &AppConfig) -> Router {
    let mut router = create_routes(&state);

    router = router.layer(cors_layer_from_config(&config.cors));

    if config.logging.enable_request_logging {
        router = router.layer(middleware::logging::logging_layer());
    }

    router.with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
