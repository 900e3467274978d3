//! Configuration for the legacy SOAP client.
//!
//! Loaded once, from the environment or a YAML file, and treated as immutable
//! afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the WSDL URL.
pub const ENV_WSDL_URL: &str = "SOAP_WSDL_URL";
/// Environment variable holding the Basic auth username.
pub const ENV_USERNAME: &str = "SOAP_USERNAME";
/// Environment variable holding the Basic auth password.
pub const ENV_PASSWORD: &str = "SOAP_PASSWORD";
/// Environment variable holding the per-call timeout in seconds.
pub const ENV_TIMEOUT_SECONDS: &str = "SOAP_TIMEOUT_SECONDS";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the legacy service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyClientConfig {
    /// WSDL location (http(s) URL or local file path). May be empty, in
    /// which case client construction fails.
    pub endpoint_url: String,

    /// Basic auth username
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// Transport timeout applied to every request
    pub timeout_secs: u64,
}

impl Default for LegacyClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for LegacyClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyClientConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LegacyClientConfig {
    /// Create a config for the given WSDL location with default settings.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Default::default()
        }
    }

    /// Set Basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the transport timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Load from `SOAP_WSDL_URL`, `SOAP_USERNAME`, `SOAP_PASSWORD` and
    /// `SOAP_TIMEOUT_SECONDS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup(ENV_TIMEOUT_SECONDS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_SECONDS.to_string(),
                message: e.to_string(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            endpoint_url: lookup(ENV_WSDL_URL).unwrap_or_default(),
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
            timeout_secs,
        })
    }

    /// Load from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check the values that are only validated on first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Credentials to use for Basic auth.
    ///
    /// Returns `None` unless both username and password are non-empty.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
