//! Application configuration management.
//!
//! Sources, later ones overriding earlier ones:
//! `config/default.toml`, `config/{RUN_MODE}.toml`, then `COREBANK__SECTION__KEY`
//! environment variables.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Background job configuration.
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origin. `None` allows any origin.
    #[serde(default)]
    pub cors_origin: Option<String>,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: None,
            log_json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiration in seconds.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> u64 {
    604_800 // 7 days
}

/// Background job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Whether the monthly EMI deduction job runs inside the server process.
    #[serde(default = "default_emi_enabled")]
    pub emi_deduction_enabled: bool,
    /// UTC hour (0-23) on the 1st of the month at which the EMI job runs.
    #[serde(default)]
    pub emi_run_hour: u32,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            emi_deduction_enabled: default_emi_enabled(),
            emi_run_hour: 0,
        }
    }
}

fn default_emi_enabled() -> bool {
    true
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COREBANK").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Returns the socket address string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("COREBANK__DATABASE__URL", Some("postgres://localhost/corebank_test")),
                ("COREBANK__JWT__SECRET", Some("test-secret")),
                ("COREBANK__SERVER__PORT", Some("7070")),
                ("COREBANK__JOBS__EMI_DEDUCTION_ENABLED", Some("false")),
                ("RUN_MODE", Some("nonexistent-mode")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/corebank_test");
                assert_eq!(config.jwt.secret, "test-secret");
                assert_eq!(config.server.port, 7070);
                assert_eq!(config.server.host, "0.0.0.0");
                assert!(!config.jobs.emi_deduction_enabled);
                assert_eq!(config.jwt.access_token_expiry_secs, 900);
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.bind_address(), "0.0.0.0:7070");
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("COREBANK__DATABASE__URL", None::<&str>),
                ("COREBANK__JWT__SECRET", Some("test-secret")),
                ("RUN_MODE", Some("nonexistent-mode")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
