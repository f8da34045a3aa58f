use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub db_max_connections: u32,
    pub db_connect_retries: u32,
    pub db_retry_interval_secs: u64,
    pub auto_migrate: bool,
    /// 0 disables expiry.
    pub cache_ttl_secs: u64,
    pub cache_cleanup_interval_secs: u64,
    pub cache_invalidate_on_write: bool,
    pub request_timeout_secs: u64,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAppConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    db_max_connections: Option<u32>,
    db_connect_retries: Option<u32>,
    db_retry_interval_secs: Option<u64>,
    auto_migrate: Option<bool>,
    cache_ttl_secs: Option<u64>,
    cache_cleanup_interval_secs: Option<u64>,
    cache_invalidate_on_write: Option<bool>,
    request_timeout_secs: Option<u64>,
    log_dir: Option<String>,
}

impl PartialAppConfig {
    fn from_file(path_str: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path_str);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path_str.to_string(),
            source,
        })?;
        Self::from_toml(path_str, &contents)
    }

    fn from_toml(origin: &str, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }
}

impl AppConfig {
    /// Loads the configuration: file first, environment overrides, then defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialAppConfig::from_file(path)?,
            None => PartialAppConfig::default(),
        };
        let env_config = envy::from_env::<PartialAppConfig>()?;

        Self::merge(env_config, file_config)
    }

    fn merge(env: PartialAppConfig, file: PartialAppConfig) -> Result<Self, ConfigError> {
        let config = AppConfig {
            listen_addr: env
                .listen_addr
                .or(file.listen_addr)
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: env
                .jwt_secret
                .or(file.jwt_secret)
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            db_max_connections: env
                .db_max_connections
                .or(file.db_max_connections)
                .unwrap_or(10),
            db_connect_retries: env
                .db_connect_retries
                .or(file.db_connect_retries)
                .unwrap_or(5),
            db_retry_interval_secs: env
                .db_retry_interval_secs
                .or(file.db_retry_interval_secs)
                .unwrap_or(2),
            auto_migrate: env.auto_migrate.or(file.auto_migrate).unwrap_or(true),
            cache_ttl_secs: env.cache_ttl_secs.or(file.cache_ttl_secs).unwrap_or(300),
            cache_cleanup_interval_secs: env
                .cache_cleanup_interval_secs
                .or(file.cache_cleanup_interval_secs)
                .unwrap_or(600),
            cache_invalidate_on_write: env
                .cache_invalidate_on_write
                .or(file.cache_invalidate_on_write)
                .unwrap_or(false),
            request_timeout_secs: env
                .request_timeout_secs
                .or(file.request_timeout_secs)
                .unwrap_or(30),
            log_dir: env
                .log_dir
                .or(file.log_dir)
                .unwrap_or_else(|| "logs".to_string()),
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.db_connect_retries == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_CONNECT_RETRIES",
                reason: "at least one connection attempt is needed".to_string(),
            });
        }
        if self.cache_cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "CACHE_CLEANUP_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval_secs)
    }

    pub fn db_retry_interval(&self) -> Duration {
        Duration::from_secs(self.db_retry_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
