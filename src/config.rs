use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub broker: BrokerConfig,
    pub source: SourceConfig,
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    pub topic: String,
    #[serde(default = "default_interval")]
    pub interval_secs: f64,
    #[serde(default)]
    pub continuous: bool,
}

/// Values taken from the command line that take precedence over the config
/// file and the `MQTT_REPLAY_*` environment layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub broker_host: Option<String>,
    pub broker_port: Option<u16>,
    pub topic: Option<String>,
    pub source_path: Option<PathBuf>,
    pub interval_secs: Option<f64>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub continuous: bool,
}

impl Config {
    /// Assembles the configuration from an optional TOML file, the
    /// environment, and command-line overrides, in increasing precedence.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MQTT_REPLAY")
                .prefix_separator("_")
                .separator("__"),
        );

        if let Some(host) = overrides.broker_host {
            builder = builder.set_override("broker.host", host)?;
        }
        if let Some(port) = overrides.broker_port {
            builder = builder.set_override("broker.port", port as i64)?;
        }
        if let Some(username) = overrides.username {
            builder = builder.set_override("broker.username", username)?;
        }
        if let Some(password) = overrides.password {
            builder = builder.set_override("broker.password", password)?;
        }
        if let Some(topic) = overrides.topic {
            builder = builder.set_override("replay.topic", topic)?;
        }
        if let Some(interval) = overrides.interval_secs {
            builder = builder.set_override("replay.interval_secs", interval)?;
        }
        if overrides.continuous {
            builder = builder.set_override("replay.continuous", true)?;
        }
        if let Some(path) = overrides.source_path {
            builder = builder.set_override("source.path", path.to_string_lossy().to_string())?;
        }

        let config: Config = builder.build()?.try_deserialize().map_err(Error::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.broker.host.is_empty() {
            return Err(Error::Config("broker host must not be empty".to_string()));
        }
        if self.replay.topic.is_empty() {
            return Err(Error::Config("topic must not be empty".to_string()));
        }
        if self.replay.interval_secs < 0.0 || !self.replay.interval_secs.is_finite() {
            return Err(Error::Config(format!(
                "interval must be a non-negative number of seconds, got {}",
                self.replay.interval_secs
            )));
        }
        // rumqttc rejects keep-alives under 5 seconds
        if self.broker.keep_alive_secs < 5 {
            return Err(Error::Config(format!(
                "keep-alive must be at least 5 seconds, got {}",
                self.broker.keep_alive_secs
            )));
        }
        match (&self.broker.username, &self.broker.password) {
            (Some(_), None) | (None, Some(_)) => Err(Error::Config(
                "username and password must be provided together".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.broker.host, self.broker.port)
    }
}

impl BrokerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl ReplayConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_client_id_prefix() -> String {
    "mqtt-replay".to_string()
}

fn default_interval() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_overrides() -> Overrides {
        Overrides {
            broker_host: Some("localhost".to_string()),
            topic: Some("robot/data".to_string()),
            source_path: Some(PathBuf::from("data/sampledata.csv")),
            ..Overrides::default()
        }
    }

    #[test]
    fn test_defaults_from_overrides_only() {
        let config = Config::load(None, minimal_overrides()).unwrap();
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.keep_alive_secs, 60);
        assert_eq!(config.broker.connect_timeout_secs, 30);
        assert_eq!(config.replay.topic, "robot/data");
        assert_eq!(config.replay.interval_secs, 1.0);
        assert!(!config.replay.continuous);
        assert!(config.broker.username.is_none());
        assert_eq!(config.broker_addr(), "localhost:1883");
    }

    #[test]
    fn test_missing_required_fields_is_config_error() {
        let err = Config::load(None, Overrides::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut overrides = minimal_overrides();
        overrides.broker_port = Some(8883);
        overrides.interval_secs = Some(0.5);
        overrides.continuous = true;
        let config = Config::load(None, overrides).unwrap();
        assert_eq!(config.broker.port, 8883);
        assert_eq!(config.replay.interval_secs, 0.5);
        assert!(config.replay.continuous);
    }

    #[test]
    fn test_credentials_must_be_paired() {
        let mut overrides = minimal_overrides();
        overrides.username = Some("myuser".to_string());
        let err = Config::load(None, overrides).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("together"));

        let mut overrides = minimal_overrides();
        overrides.username = Some("myuser".to_string());
        overrides.password = Some("mypass".to_string());
        let config = Config::load(None, overrides).unwrap();
        assert_eq!(config.broker.username.as_deref(), Some("myuser"));
    }

    #[test]
    fn test_negative_interval_rejected() {
        let mut overrides = minimal_overrides();
        overrides.interval_secs = Some(-1.0);
        let err = Config::load(None, overrides).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_file_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.toml");
        std::fs::write(
            &path,
            r#"
[broker]
host = "mqtt.example.com"
port = 8883

[source]
path = "data/sampledata.csv"

[replay]
topic = "sensors/robot1"
interval_secs = 0.25
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!(config.broker.host, "mqtt.example.com");
        assert_eq!(config.replay.interval_secs, 0.25);

        // CLI still wins over the file
        let mut overrides = Overrides::default();
        overrides.broker_host = Some("other.example.com".to_string());
        let config = Config::load(Some(&path), overrides).unwrap();
        assert_eq!(config.broker.host, "other.example.com");
        assert_eq!(config.broker.port, 8883);
    }
}
