use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Window length override carried over from the original deployment's environment.
pub const RATE_LIMIT_WINDOW_ENV: &str = "CONTACT_RATE_LIMIT_WINDOW_MS";
/// Per-window request cap override.
pub const RATE_LIMIT_MAX_ENV: &str = "CONTACT_RATE_LIMIT_MAX";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub mail: MailConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
    /// Seconds between sweeps of expired records; 0 disables the sweeper.
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub dispatch_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty means any origin may submit.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 5,
            sweep_interval_seconds: 300,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_seconds: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_request_logging: true,
        }
    }
}

impl AppConfig {
    /// Layers defaults, an optional `config.toml`, `APP_*` variables
    /// (`APP_RATE_LIMIT__MAX_REQUESTS`), then the `CONTACT_RATE_LIMIT_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("rate_limit.window_ms", std::env::var(RATE_LIMIT_WINDOW_ENV).ok())?
            .set_override_option("rate_limit.max_requests", std::env::var(RATE_LIMIT_MAX_ENV).ok())?;

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::Message(
                "Rate limit window must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Message(
                "Rate limit max requests must be greater than 0".to_string(),
            ));
        }

        if self.mail.dispatch_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Mail dispatch timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
