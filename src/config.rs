//! Layered configuration: defaults, optional TOML file, `RIGWATCH_*` env vars.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Environment variable prefix. Nested keys use `__`, e.g. `RIGWATCH_LOG__LEVEL`.
pub const ENV_PREFIX: &str = "RIGWATCH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP API binds to.
    pub listen: String,
    /// JSON file holding the server registry.
    pub registry_path: PathBuf,
    /// Opaque token forwarded to every endpoint. Empty sends none.
    pub credential: String,
    pub fetch_timeout_ms: u64,
    pub list_period_ms: u64,
    pub detail_period_ms: u64,
    pub countdown_tick_ms: u64,
    /// Keep a list-mode subscription alive for the whole process.
    pub background_polling: bool,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            registry_path: PathBuf::from("servers.json"),
            credential: String::new(),
            fetch_timeout_ms: 2000,
            list_period_ms: 2000,
            detail_period_ms: 5000,
            countdown_tick_ms: 1000,
            background_polling: false,
            log: LogSettings::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from the process environment and an optional file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("fetch_timeout_ms", self.fetch_timeout_ms),
            ("list_period_ms", self.list_period_ms),
            ("detail_period_ms", self.detail_period_ms),
            ("countdown_tick_ms", self.countdown_tick_ms),
        ];
        for (key, value) in periods {
            if value == 0 {
                return Err(ConfigError::Message(format!("{key} must be greater than zero")));
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn list_period(&self) -> Duration {
        Duration::from_millis(self.list_period_ms)
    }

    pub fn detail_period(&self) -> Duration {
        Duration::from_millis(self.detail_period_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn defaults_without_file() {
        let settings = Settings::load_with_env(None, no_env()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(2));
        assert_eq!(settings.detail_period(), Duration::from_secs(5));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
listen = "127.0.0.1:9000"
list_period_ms = 3000
background_polling = true

[log]
level = "debug"
"#
        )
        .unwrap();

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.listen, "127.0.0.1:9000");
        assert_eq!(settings.list_period_ms, 3000);
        assert!(settings.background_polling);
        assert_eq!(settings.log.level, "debug");
        assert!(!settings.log.json);
        assert_eq!(settings.detail_period_ms, 5000);
    }

    #[test]
    fn env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "fetch_timeout_ms = 1500").unwrap();

        let env = HashMap::from([
            ("RIGWATCH_FETCH_TIMEOUT_MS".to_string(), "750".to_string()),
            ("RIGWATCH_CREDENTIAL".to_string(), "tok".to_string()),
            ("RIGWATCH_LOG__JSON".to_string(), "true".to_string()),
        ]);

        let settings = Settings::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(settings.fetch_timeout_ms, 750);
        assert_eq!(settings.credential, "tok");
        assert!(settings.log.json);
    }

    #[test]
    fn zero_period_is_rejected() {
        let env = HashMap::from([("RIGWATCH_LIST_PERIOD_MS".to_string(), "0".to_string())]);
        let err = Settings::load_with_env(None, Some(env)).unwrap_err();
        assert!(err.to_string().contains("list_period_ms"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/definitely/not/here/rigwatch.toml");
        assert!(Settings::load_with_env(Some(path), no_env()).is_err());
    }
}
