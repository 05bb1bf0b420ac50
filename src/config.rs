//! Environment-driven configuration
//!
//! Every tunable reads from the process environment with a sane default.
//! Only DATABASE_URL and MIDTRANS_SERVER_KEY are required.

use bigdecimal::BigDecimal;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub rewards: RewardsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Midtrans gateway credentials and endpoints
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub server_key: String,
    pub client_key: Option<String>,
    pub snap_base_url: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Reward and fee parameters
#[derive(Debug, Clone)]
pub struct RewardsConfig {
    /// Per-kilogram service fee charged when a dropoff uses PICKUP
    pub pickup_fee_per_kg: BigDecimal,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVariable(name.to_string()))
}

fn env_parse<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env_or(name, default)
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            rewards: RewardsConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.gateway.validate()?;
        self.rewards.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env_or("SERVER_HOST", "127.0.0.1"),
            port: env_parse("SERVER_PORT", "8000")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT must be nonzero".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", "20")?,
            min_connections: env_parse("DB_MIN_CONNECTIONS", "5")?,
            connection_timeout: env_parse("DB_CONNECTION_TIMEOUT", "30")?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS exceeds DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env_or("LOG_LEVEL", "INFO"),
            format: match env_or("LOG_FORMAT", "plain").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !LEVELS.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            server_key: env_required("MIDTRANS_SERVER_KEY")?,
            client_key: env::var("MIDTRANS_CLIENT_KEY").ok(),
            snap_base_url: env_or(
                "MIDTRANS_SNAP_BASE_URL",
                "https://app.sandbox.midtrans.com/snap/v1",
            ),
            api_base_url: env_or(
                "MIDTRANS_API_BASE_URL",
                "https://api.sandbox.midtrans.com/v2",
            ),
            timeout_secs: env_parse("MIDTRANS_TIMEOUT_SECS", "30")?,
            max_retries: env_parse("MIDTRANS_MAX_RETRIES", "3")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_key.is_empty() {
            return Err(ConfigError::InvalidValue("MIDTRANS_SERVER_KEY".to_string()));
        }

        for (name, url) in [
            ("MIDTRANS_SNAP_BASE_URL", &self.snap_base_url),
            ("MIDTRANS_API_BASE_URL", &self.api_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be a valid URL",
                    name
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "MIDTRANS_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(())
    }
}

impl RewardsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(RewardsConfig {
            pickup_fee_per_kg: env_parse("PICKUP_SERVICE_FEE_PER_KG", "10000")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pickup_fee_per_kg < BigDecimal::from(0) {
            return Err(ConfigError::InvalidValue(
                "PICKUP_SERVICE_FEE_PER_KG cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_server_config_passes() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = ServerConfig {
            host: "".to_string(),
            port: 8000,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_connection_bounds_are_rejected() {
        let config = DatabaseConfig {
            url: "postgres://localhost/trashvalue".to_string(),
            max_connections: 5,
            min_connections: 10,
            connection_timeout: 30,
            idle_timeout: None,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_server_key_is_rejected() {
        let config = GatewayConfig {
            server_key: "".to_string(),
            client_key: None,
            snap_base_url: "https://app.sandbox.midtrans.com/snap/v1".to_string(),
            api_base_url: "https://api.sandbox.midtrans.com/v2".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_gateway_url_is_rejected() {
        let config = GatewayConfig {
            server_key: "SB-Mid-server-test".to_string(),
            client_key: None,
            snap_base_url: "ftp://app.sandbox.midtrans.com".to_string(),
            api_base_url: "https://api.sandbox.midtrans.com/v2".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_pickup_fee_is_rejected() {
        let config = RewardsConfig {
            pickup_fee_per_kg: BigDecimal::from(-1),
        };

        assert!(config.validate().is_err());
    }
}
