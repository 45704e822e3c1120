use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct RecordConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Present whenever `backend` is `mongodb`.
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub url: Secret<String>,
    pub database: String,
    pub collection: String,
    pub server_selection_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl MongoConfig {
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

impl RecordConfig {
    /// Read configuration once at process start.
    ///
    /// `MONGODB_URL` is the single store connection string. With
    /// `ENVIRONMENT=prod` every variable must be set explicitly.
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("mongodb"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongodb = match backend {
            StoreBackend::Mongodb => Some(MongoConfig {
                url: Secret::new(get_env("MONGODB_URL", None, is_prod)?),
                database: get_env("MONGODB_DATABASE", Some("record_db"), is_prod)?,
                collection: get_env("MONGODB_COLLECTION", Some("records"), is_prod)?,
                server_selection_timeout_ms: get_env_millis(
                    "MONGODB_SERVER_SELECTION_TIMEOUT_MS",
                    is_prod,
                )?,
                connect_timeout_ms: get_env_millis("MONGODB_CONNECT_TIMEOUT_MS", is_prod)?,
            }),
            StoreBackend::Memory => None,
        };

        Ok(RecordConfig {
            common: common_config,
            store: StoreConfig { backend, mongodb },
        })
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::Mongodb),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_env_millis(key: &str, is_prod: bool) -> Result<u64, AppError> {
    get_env(key, Some("5000"), is_prod)?
        .parse::<u64>()
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "{} must be a number of milliseconds: {}",
                key,
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backends() {
        assert_eq!("mongodb".parse::<StoreBackend>(), Ok(StoreBackend::Mongodb));
        assert_eq!("Mongo".parse::<StoreBackend>(), Ok(StoreBackend::Mongodb));
        assert_eq!("MEMORY".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn get_env_prefers_set_value_then_default() {
        env::set_var("RECORD_CONFIG_TEST_SET", "from-env");
        assert_eq!(
            get_env("RECORD_CONFIG_TEST_SET", Some("default"), false).unwrap(),
            "from-env"
        );
        assert_eq!(
            get_env("RECORD_CONFIG_TEST_UNSET", Some("default"), false).unwrap(),
            "default"
        );
    }

    #[test]
    fn missing_required_values_are_config_errors() {
        assert!(matches!(
            get_env("RECORD_CONFIG_TEST_REQUIRED", None, false),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            get_env("RECORD_CONFIG_TEST_PROD", Some("default"), true),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn timeouts_must_be_numeric() {
        env::set_var("RECORD_CONFIG_TEST_TIMEOUT", "soon");
        assert!(get_env_millis("RECORD_CONFIG_TEST_TIMEOUT", false).is_err());

        env::set_var("RECORD_CONFIG_TEST_TIMEOUT_OK", "250");
        assert_eq!(
            get_env_millis("RECORD_CONFIG_TEST_TIMEOUT_OK", false).unwrap(),
            250
        );
    }
}
