//! Configuration for the try-on client.
//!
//! Configuration lives in `tryon.json` in the working directory. Every key is
//! optional; missing keys fall back to defaults and unknown keys are ignored.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TryOnError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "tryon.json";

/// Path of the try-on endpoint under the service base URL.
pub const TRY_ON_PATH: &str = "/api/try-on";

/// Default base URL of the synthesis service.
fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

/// Default total request timeout in seconds.
const fn default_request_timeout() -> u64 {
    120
}

/// Default connect timeout in seconds.
const fn default_connect_timeout() -> u64 {
    10
}

/// Default output directory for downloaded results.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Main configuration for the try-on client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the synthesis service; the endpoint path is appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on a whole request, from connect to last body byte.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on establishing the connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Directory relative download destinations are placed in.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `tryon.json` in the current directory. If not found,
    /// returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TryOnError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `tryon.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TryOnError::ConfigParseError` if the file exists but contains
    /// invalid JSON.
    ///
    /// Returns `TryOnError::ConfigValidationError` if the configuration values
    /// are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TryOnError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TryOnError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// - `baseUrl` must be an absolute `http` or `https` URL
    /// - `requestTimeoutSecs` must be greater than 0
    /// - `connectTimeoutSecs` must be greater than 0 and not exceed `requestTimeoutSecs`
    /// - `outputDir` must not be empty
    ///
    /// # Errors
    ///
    /// Returns `TryOnError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;

        if self.request_timeout_secs == 0 {
            return Err(TryOnError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your tryon.json",
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(TryOnError::config_validation(
                "connectTimeoutSecs must be greater than 0",
                "Set connectTimeoutSecs to at least 1 second in your tryon.json",
            ));
        }

        if self.connect_timeout_secs > self.request_timeout_secs {
            return Err(TryOnError::config_validation(
                format!(
                    "connectTimeoutSecs ({}) exceeds requestTimeoutSecs ({})",
                    self.connect_timeout_secs, self.request_timeout_secs
                ),
                "Lower connectTimeoutSecs or raise requestTimeoutSecs in your tryon.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(TryOnError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your tryon.json (use '.' for current directory)",
            ));
        }

        Ok(())
    }

    /// Parses `base_url`, rejecting anything that is not absolute `http`/`https`.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            TryOnError::config_validation(
                format!("baseUrl '{}' is not a valid URL: {e}", self.base_url),
                "Set baseUrl to something like \"http://127.0.0.1:8000\" in your tryon.json",
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TryOnError::config_validation(
                format!("baseUrl scheme '{}' is not supported", url.scheme()),
                "Use an http:// or https:// baseUrl in your tryon.json",
            ));
        }

        Ok(url)
    }

    /// Returns the full URL of the try-on endpoint.
    ///
    /// Any path on the base URL is kept as a prefix, so a service mounted at
    /// `https://host/studio` is reached at `https://host/studio/api/try-on`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tryon_client::Config;
    ///
    /// let config = Config {
    ///     base_url: "https://tryon.example.com/studio/".to_string(),
    ///     ..Config::default()
    /// };
    /// assert_eq!(
    ///     config.endpoint_url().unwrap().as_str(),
    ///     "https://tryon.example.com/studio/api/try-on"
    /// );
    /// ```
    pub fn endpoint_url(&self) -> Result<Url> {
        let mut url = self.parsed_base_url()?;
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{TRY_ON_PATH}"));
        Ok(url)
    }

    /// Resolves a result reference against the base URL.
    ///
    /// Absolute references are returned unchanged; relative ones such as
    /// `/results/abc.jpg` are joined onto the base URL.
    pub fn resolve_reference(&self, reference: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(reference) {
            return Ok(url);
        }
        let base = self.parsed_base_url()?;
        base.join(reference).map_err(|e| {
            TryOnError::config_validation(
                format!("cannot resolve result reference '{reference}' against '{base}': {e}"),
                "Check that baseUrl points at the synthesis service",
            )
        })
    }

    /// Total request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
