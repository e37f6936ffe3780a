//! Parses the action inputs into a [`Configuration`].

use std::{fmt::Debug, time::Duration};

use reqwest::Url;
use thiserror::Error;

use crate::env::Env;

/// The exclusive upper bound of the request timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// The path of the optimizer API, relative to the configured endpoint.
pub const OPTIMIZER_PATH: &str = "api/v1/ci/optimizer";

/// The input holding the bearer token.
pub const TOKEN_INPUT: &str = "token";
/// The input holding the base URL of the optimizer service.
pub const ENDPOINT_INPUT: &str = "endpoint";
/// The input holding the request timeout in seconds.
pub const TIMEOUT_INPUT: &str = "timeout";

/// An invalid or missing action input.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input is unset or blank.
    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    /// The endpoint is not an absolute URL.
    #[error("Endpoint `{value}` is not a valid URL: {reason}")]
    InvalidEndpoint {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The timeout is not a whole number of seconds in range.
    #[error("Timeout must be a positive integer less than {MAX_TIMEOUT_SECS} seconds, got `{0}`")]
    InvalidTimeout(String),
}

/// The validated inputs of one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    /// The opaque bearer token sent in the request body.
    pub token: String,
    /// The base URL of the optimizer service.
    pub endpoint: Url,
    /// How long to wait for the optimizer before running the workflow anyway.
    pub timeout: Duration,
}

impl Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Configuration {
    /// Reads and validates the `token`, `endpoint` and `timeout` inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first input that is missing or invalid.
    pub fn from_env<E>(env: &E) -> Result<Self, ConfigError>
    where
        E: Env,
    {
        let token = env
            .input(TOKEN_INPUT)
            .ok_or(ConfigError::MissingInput(TOKEN_INPUT))?;
        let endpoint = env
            .input(ENDPOINT_INPUT)
            .ok_or(ConfigError::MissingInput(ENDPOINT_INPUT))?;
        let timeout = env
            .input(TIMEOUT_INPUT)
            .ok_or(ConfigError::MissingInput(TIMEOUT_INPUT))?;

        Ok(Self {
            token,
            endpoint: parse_endpoint(&endpoint)?,
            timeout: parse_timeout(&timeout)?,
        })
    }

    /// The full URL of the optimizer API.
    pub fn optimizer_url(&self) -> String {
        format!(
            "{}/{OPTIMIZER_PATH}",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }
}

fn parse_endpoint(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        value: value.to_owned(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(invalid(format!("unsupported scheme `{scheme}`"))),
    }
}

/// Parses a timeout in whole seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTimeout`] unless `value` is an integer in `1..300`.
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| u64::try_from(secs).ok())
        .filter(|secs| (1..MAX_TIMEOUT_SECS).contains(secs))
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidTimeout(value.to_owned()))
}
