//! Application configuration

pub mod settings;

pub use settings::{AppConfig, CorsConfig, LoggingConfig, MailConfig, RateLimitConfig, ServerConfig};
