//! Configuration Loader
//!
//! 0. Loads a `.env` file if present (via dotenvy)
//! 1. Reads one TOML file (explicit path, `CACHEFLOW_CONFIG_PATH`, or `config/cacheflow.toml`)
//! 2. Substitutes `${VAR}` and `${VAR:-default}` references
//! 3. Deserializes into [`RelayConfig`]
//! 4. Applies the explicit environment overrides
//!
//! Validation is left to the caller because the gateway and the relay need
//! different subsets (see [`RelayConfig::validate_for_relay`]).

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::RelayConfig;

pub const CONFIG_PATH_ENV: &str = "CACHEFLOW_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/cacheflow.toml";

const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Zero-state utility for loading [`RelayConfig`]
#[derive(Debug)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a process.
    ///
    /// An explicit or `CACHEFLOW_CONFIG_PATH` path must exist. When neither is
    /// given and the default path is absent, defaults plus environment
    /// overrides are used (container deployments configure purely via env).
    pub fn load(explicit_path: Option<&Path>) -> ConfigResult<RelayConfig> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }

        let requested = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match requested {
            Some(path) => Self::load_file(&path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::load_file(&default_path)?
                } else {
                    info!("No configuration file found, using defaults and environment overrides");
                    RelayConfig::default()
                }
            }
        };

        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read, substitute and parse a single TOML file
    pub fn load_file(path: &Path) -> ConfigResult<RelayConfig> {
        let contents = Self::read_config_file(path)?;
        let config = Self::load_from_str(&contents, &path.display().to_string(), |name| {
            std::env::var(name).ok()
        })?;
        info!(path = %path.display(), "Configuration file loaded");
        Ok(config)
    }

    /// Parse TOML text after `${VAR}` substitution through `lookup`
    pub fn load_from_str<F>(contents: &str, source: &str, lookup: F) -> ConfigResult<RelayConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = substitute_env_vars(contents, lookup)?;
        toml::from_str(&expanded).map_err(|e| ConfigurationError::invalid_toml(source, e))
    }

    /// Apply the fixed set of `CACHEFLOW_*` overrides through `lookup`
    pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CACHEFLOW_KAFKA_BROKERS") {
            config.broker.bootstrap_servers = value;
        }
        if let Some(value) = lookup("CACHEFLOW_DATABASE_URL") {
            config.storage.database_url = value;
        }
        if let Some(value) = lookup("CACHEFLOW_REDIS_URL") {
            config.registry.redis_url = value;
        }
        if let Some(value) = lookup("CACHEFLOW_BIND_ADDRESS") {
            config.web.bind_address = value;
        }
        if let Some(value) = lookup("CACHEFLOW_WORKER_COUNT") {
            config.pipeline.worker_count = parse_override("CACHEFLOW_WORKER_COUNT", &value)?;
        }
        if let Some(value) = lookup("CACHEFLOW_QUEUE_CAPACITY") {
            config.pipeline.queue_capacity = parse_override("CACHEFLOW_QUEUE_CAPACITY", &value)?;
        }
        Ok(())
    }

    fn read_config_file(path: &Path) -> ConfigResult<String> {
        let metadata = std::fs::metadata(path).map_err(|_| {
            ConfigurationError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        })?;

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "config_path",
                path.display().to_string(),
                "configuration path must point to a regular file",
            ));
        }
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                "configuration file larger than 1MB",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigurationError::invalid_value(name, value, "expected a non-negative integer")
    })
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("static regex is valid")
    })
}

/// Replace `${VAR}` / `${VAR:-default}`; unset variables without a default are errors
fn substitute_env_vars<F>(contents: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = env_var_pattern();
    let mut result = String::with_capacity(contents.len());
    let mut last = 0;

    for caps in pattern.captures_iter(contents) {
        let whole = caps.get(0).expect("capture group 0 always present");
        let name = &caps[1];
        let value = match (lookup(name), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                return Err(ConfigurationError::EnvironmentVariableError {
                    variable: name.to_string(),
                    context: "variable is not set and has no default".to_string(),
                })
            }
        };
        result.push_str(&contents[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&contents[last..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_substitution_with_and_without_defaults() {
        let text = r#"url = "${DB_URL}" and "${MISSING:-fallback}""#;
        let out = substitute_env_vars(text, lookup_from(&[("DB_URL", "postgresql://db")])).unwrap();
        assert_eq!(out, r#"url = "postgresql://db" and "fallback""#);
    }

    #[test]
    fn test_substitution_missing_variable_fails() {
        let err = substitute_env_vars("${NOPE}", lookup_from(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::EnvironmentVariableError { ref variable, .. } if variable == "NOPE"
        ));
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let toml = r#"
            [broker]
            bootstrap_servers = "kafka:9092"

            [storage]
            database_url = "${DATABASE_URL}"

            [pipeline]
            worker_count = 8
        "#;
        let config = ConfigLoader::load_from_str(
            toml,
            "inline",
            lookup_from(&[("DATABASE_URL", "postgresql://u:p@db/cache")]),
        )
        .unwrap();

        assert_eq!(config.broker.bootstrap_servers, "kafka:9092");
        assert_eq!(config.broker.topic, "cache_access_logs");
        assert_eq!(config.storage.database_url, "postgresql://u:p@db/cache");
        assert_eq!(config.pipeline.worker_count, 8);
        assert_eq!(config.pipeline.queue_capacity, 100);
        assert!(config.validate_for_relay().is_ok());
    }

    #[test]
    fn test_invalid_toml_reports_source() {
        let err = ConfigLoader::load_from_str("[broker", "broken.toml", lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RelayConfig::default();
        ConfigLoader::apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("CACHEFLOW_KAFKA_BROKERS", "k1:9092,k2:9092"),
                ("CACHEFLOW_WORKER_COUNT", "12"),
                ("CACHEFLOW_QUEUE_CAPACITY", "500"),
            ]),
        )
        .unwrap();
        assert_eq!(config.broker.bootstrap_servers, "k1:9092,k2:9092");
        assert_eq!(config.pipeline.worker_count, 12);
        assert_eq!(config.pipeline.queue_capacity, 500);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = RelayConfig::default();
        let err = ConfigLoader::apply_env_overrides(
            &mut config,
            lookup_from(&[("CACHEFLOW_WORKER_COUNT", "many")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("CACHEFLOW_WORKER_COUNT"));
    }

    #[test]
    fn test_load_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[dead_letter]\nenabled = false\n\n[web]\nbind_address = \"127.0.0.1:9090\""
        )
        .unwrap();

        let config = ConfigLoader::load_file(file.path()).unwrap();
        assert!(!config.dead_letter.enabled);
        assert_eq!(config.web.bind_address, "127.0.0.1:9090");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::load_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = ConfigLoader::load_from_str(
            include_str!("../../config/cacheflow.toml"),
            "config/cacheflow.toml",
            lookup_from(&[]),
        )
        .unwrap();
        assert!(config.validate_for_relay().is_ok());
        assert!(config.validate_for_gateway().is_ok());
        assert_eq!(config.broker.group_id, "db-updater-group");
    }
}
