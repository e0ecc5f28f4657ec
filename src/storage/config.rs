use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub base_url: String,
    pub xsrf_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub storage_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    pub date_format: String,
    pub time_format: String,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plan-share")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8080".to_string(),
                xsrf_token: "csrf".to_string(),
            },
            session: SessionConfig {
                storage_path: Self::config_dir().join("session.json"),
            },
            ui: UiConfig {
                date_format: "%Y-%m-%d".to_string(),
                time_format: "%H:%M".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_server() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8080");
    }

    #[test]
    fn default_config_uses_static_xsrf_token() {
        let config = Config::default();
        assert_eq!(config.server.xsrf_token, "csrf");
    }

    #[test]
    fn default_session_file_lives_next_to_config() {
        let config = Config::default();
        assert_eq!(config.session.storage_path, Config::config_dir().join("session.json"));
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r#"
            [server]
            base_url = "https://calendar.example.com/api"
            xsrf_token = "token"

            [session]
            storage_path = "/tmp/session.json"

            [ui]
            date_format = "%d/%m/%Y"
            time_format = "%I:%M %p"
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.server.base_url, "https://calendar.example.com/api");
        assert_eq!(config.server.xsrf_token, "token");
        assert_eq!(config.session.storage_path, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.ui.date_format, "%d/%m/%Y");
    }

    #[test]
    fn default_config_survives_toml_round_trip() {
        let config = Config::default();
        let content = toml::to_string_pretty(&config).unwrap();

        assert_eq!(Config::from_toml(&content).unwrap(), config);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let invalid_toml = "this is not valid toml";
        let result = Config::from_toml(invalid_toml);
        assert!(result.is_err());
    }
}
