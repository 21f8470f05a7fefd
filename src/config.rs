//! Configuration management for Devassist
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::api::Category;
use crate::error::{DevassistError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Devassist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Chat front-end behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address of the assistant backend; `/api/...` paths are
    /// appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_user_agent() -> String {
    format!("devassist/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Chat front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Category used for new conversations and messages
    #[serde(default)]
    pub default_category: Category,

    /// How long a transient error notice stays on screen
    #[serde(default = "default_notice_seconds")]
    pub notice_seconds: u64,

    /// Title given to conversations created without one
    #[serde(default = "default_title")]
    pub default_title: String,
}

fn default_notice_seconds() -> u64 {
    5
}

fn default_title() -> String {
    "New Conversation".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_category: Category::default(),
            notice_seconds: default_notice_seconds(),
            default_title: default_title(),
        }
    }
}

impl ChatConfig {
    /// Notice lifetime as a [`Duration`]
    pub fn notice_duration(&self) -> Duration {
        Duration::from_secs(self.notice_seconds)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(DevassistError::from)?;
        let config = serde_yaml::from_str(&contents).map_err(DevassistError::from)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("DEVASSIST_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(category) = std::env::var("DEVASSIST_DEFAULT_CATEGORY") {
            match category.parse() {
                Ok(value) => self.chat.default_category = value,
                Err(e) => tracing::warn!("Invalid DEVASSIST_DEFAULT_CATEGORY: {}", e),
            }
        }

        if let Ok(seconds) = std::env::var("DEVASSIST_NOTICE_SECONDS") {
            if let Ok(value) = seconds.parse() {
                self.chat.notice_seconds = value;
            } else {
                tracing::warn!("Invalid DEVASSIST_NOTICE_SECONDS: {}", seconds);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            tracing::debug!("Using base URL override from CLI: {}", base_url);
            self.api.base_url = base_url.clone();
        }
    }

    /// Parsed backend base address
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an absolute http(s) URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            DevassistError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(DevassistError::Config(format!(
                "api.base_url must be an http or https URL, got {}",
                self.api.base_url
            ))
            .into());
        }

        Ok(url)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.chat.notice_seconds == 0 {
            return Err(DevassistError::Config(
                "chat.notice_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.default_title.trim().is_empty() {
            return Err(
                DevassistError::Config("chat.default_title cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}
