//! Verifier configuration.
//!
//! Values come from command-line flags or their environment variables (an
//! optional `.env` file is loaded first by the binary). The parsed `Cli` is
//! turned into a `VerifierConfig`, which is what the verifier receives.
//!
//! | flag | env | default |
//! |---|---|---|
//! | `--base-url` | `BOOKS_API_URL` | `http://localhost:8001/api/v1` |
//! | `--api-key` | `BOOKS_API_KEY` | required |
//! | `--username` | `BOOKS_USERNAME` | `testuser` |
//! | `--password` | `BOOKS_PASSWORD` | `securepassword` |
//! | `--timeout-secs` | `BOOKS_TIMEOUT_SECS` | `10` |
//! | `--log-format` | `LOG_FORMAT` | `text` |

use std::fmt;
use std::time::Duration;

use books_core::{BooksClient, Credentials};
use clap::{Parser, ValueEnum};
use thiserror::Error;
use url::Url;

use crate::scenario::Scenario;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Verify that a books API honours its HTTP contract.
#[derive(Debug, Parser)]
#[command(name = "books-verify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the API, including the version prefix
    #[arg(long, env = "BOOKS_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Static key sent in the X-API-Key header
    #[arg(long, env = "BOOKS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Account registered and logged in for the run
    #[arg(long, env = "BOOKS_USERNAME", default_value = "testuser")]
    pub username: String,

    #[arg(long, env = "BOOKS_PASSWORD", default_value = "securepassword", hide_env_values = true)]
    pub password: String,

    /// Per-call timeout in seconds
    #[arg(long, env = "BOOKS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Scenario to run; repeat to run several (default: all)
    #[arg(long = "scenario", value_enum)]
    pub scenarios: Vec<Scenario>,

    /// Call the health endpoint before authenticating
    #[arg(long)]
    pub preflight: bool,
}

impl Cli {
    pub fn config(&self) -> VerifierConfig {
        VerifierConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            credentials: Credentials::new(&self.username, &self.password),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Selected scenarios in declaration order, or all of them.
    pub fn selected_scenarios(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            return Scenario::ALL.to_vec();
        }
        Scenario::ALL
            .into_iter()
            .filter(|s| self.scenarios.contains(s))
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base URL `{url}` is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("base URL must use http or https, got `{0}`")]
    UnsupportedScheme(String),

    #[error("API key must not be empty")]
    MissingApiKey,

    #[error("username and password must not be empty")]
    MissingCredentials,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Everything the verifier needs to talk to one API instance.
#[derive(Clone)]
pub struct VerifierConfig {
    pub base_url: String,
    pub api_key: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl VerifierConfig {
    pub fn new(base_url: &str, api_key: &str, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Returns the first problem found: an unparsable or non-http(s) base
    /// URL, an empty API key, empty credentials, or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.credentials.username.trim().is_empty() || self.credentials.password.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn client(&self) -> BooksClient {
        BooksClient::new(&self.base_url, &self.api_key)
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish()
    }
}
