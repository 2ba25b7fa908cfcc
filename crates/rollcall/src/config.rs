//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "rollcall";

/// Origin used during local development.
const DEFAULT_DEVELOPMENT_ORIGIN: &str = "http://localhost:8080";

/// Path of the push channel on the API origin.
const DEFAULT_CHANNEL_PATH: &str = "/ws/records";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, `__` between levels)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger API configuration.
    pub api: ApiConfig,
    /// Push channel configuration.
    pub channel: ChannelConfig,
}

/// Which API origin to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Local development server.
    #[default]
    Development,
    /// Deployed server.
    Production,
}

/// Ledger API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Selects between the development and production origins.
    pub profile: Profile,
    /// Origin used with the development profile.
    pub development_origin: String,
    /// Origin used with the production profile. Required for that profile.
    pub production_origin: Option<String>,
    /// Timeout for a single REST request, in seconds.
    pub request_timeout_secs: u64,
}

/// Push channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Path of the push channel on the API origin.
    pub path: String,
    /// Fixed delay before reconnecting after a drop, in seconds.
    pub reconnect_delay_secs: u64,
    /// Re-fetch the ledger whenever the channel comes back after a drop.
    pub resync_on_reconnect: bool,
    /// Capacity of the queue between the channel task and the session.
    pub event_buffer: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Development,
            development_origin: DEFAULT_DEVELOPMENT_ORIGIN.to_string(),
            production_origin: None,
            request_timeout_secs: 10,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_CHANNEL_PATH.to_string(),
            reconnect_delay_secs: 5,
            resync_on_reconnect: true,
            event_buffer: 64,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLCALL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.api.request_timeout_secs == 0 {
            return Err(Error::config_validation(
                "request_timeout_secs must be greater than 0",
            ));
        }

        if self.channel.reconnect_delay_secs == 0 {
            return Err(Error::config_validation(
                "reconnect_delay_secs must be greater than 0",
            ));
        }

        if self.channel.event_buffer == 0 {
            return Err(Error::config_validation(
                "event_buffer must be greater than 0",
            ));
        }

        if !self.channel.path.starts_with('/') {
            return Err(Error::config_validation(format!(
                "channel path must start with '/': {}",
                self.channel.path
            )));
        }

        check_origin(&self.api.development_origin)?;
        if let Some(origin) = &self.api.production_origin {
            check_origin(origin)?;
        }
        self.origin()?;

        Ok(())
    }

    /// Get the API origin selected by the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the production profile is selected without a
    /// production origin.
    pub fn origin(&self) -> Result<&str> {
        match self.api.profile {
            Profile::Development => Ok(&self.api.development_origin),
            Profile::Production => self.api.production_origin.as_deref().ok_or_else(|| {
                Error::config_validation("production profile requires production_origin")
            }),
        }
    }

    /// Resolve a REST path against the API origin.
    ///
    /// # Errors
    ///
    /// Returns an error if no origin is configured for the profile.
    pub fn api_url(&self, path: &str) -> Result<String> {
        Ok(join_url(self.origin()?, path))
    }

    /// Get the push channel URL. An `https` origin gets a `wss` channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin can't be turned into a channel URL.
    pub fn push_url(&self) -> Result<String> {
        let origin = self.origin()?;
        let mut url = Url::parse(origin)
            .map_err(|e| Error::config_validation(format!("invalid origin {origin}: {e}")))?;

        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| {
            Error::config_validation(format!("cannot derive a {scheme} URL from {origin}"))
        })?;
        url.set_path(&self.channel.path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(url.to_string())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Get the reconnect delay as a Duration.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.channel.reconnect_delay_secs)
    }
}

fn check_origin(origin: &str) -> Result<()> {
    let url = Url::parse(origin)
        .map_err(|e| Error::config_validation(format!("invalid origin {origin}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::config_validation(format!(
            "origin must be http or https, got {other}: {origin}"
        ))),
    }
}

/// Join an origin and a path with exactly one slash between them.
fn join_url(origin: &str, path: &str) -> String {
    let base = origin.strip_suffix('/').unwrap_or(origin);
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
