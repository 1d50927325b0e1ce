//! Pipeline configuration
//!
//! Connection targets and retry/concurrency knobs, supplied by the
//! environment with the defaults from the connector's backend classes. An
//! unparsable numeric value is a configuration error, never a silent
//! fallback to the default.

use std::time::Duration;

use super::connect::{BackendClass, RetryPolicy};

const ENV_PREFIX: &str = "SOCIALSTREAM_";

/// External configuration for the write and query paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Storage backend connection target.
    pub storage_url: String,
    /// Query backend connection target.
    pub query_url: String,
    pub storage_retry: RetryPolicy,
    pub query_retry: RetryPolicy,
    /// Concurrent partition writes per `write` call; 1 = sequential.
    pub write_concurrency: usize,
    /// Base path for partitioned output inside the store.
    pub base_path: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_url: "file:///data/socialstream".to_string(),
            query_url: "mem://".to_string(),
            storage_retry: BackendClass::Storage.default_policy(),
            query_retry: BackendClass::Query.default_policy(),
            write_concurrency: 1,
            base_path: "/data/social_media".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Read configuration from process environment variables
    /// (`SOCIALSTREAM_STORAGE_URL`, `SOCIALSTREAM_QUERY_URL`,
    /// `SOCIALSTREAM_STORAGE_RETRIES`, `SOCIALSTREAM_STORAGE_RETRY_DELAY_MS`,
    /// `SOCIALSTREAM_QUERY_RETRIES`, `SOCIALSTREAM_QUERY_RETRY_DELAY_MS`,
    /// `SOCIALSTREAM_WRITE_CONCURRENCY`, `SOCIALSTREAM_BASE_PATH`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; tests pass a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let mut config = PipelineConfig::default();

        if let Some(url) = lookup("STORAGE_URL") {
            config.storage_url = url;
        }
        if let Some(url) = lookup("QUERY_URL") {
            config.query_url = url;
        }
        if let Some(path) = lookup("BASE_PATH") {
            config.base_path = path;
        }

        if let Some(value) = lookup("STORAGE_RETRIES") {
            config.storage_retry =
                RetryPolicy::new(parse_number("STORAGE_RETRIES", &value)?, config.storage_retry.delay);
        }
        if let Some(value) = lookup("STORAGE_RETRY_DELAY_MS") {
            config.storage_retry = RetryPolicy::new(
                config.storage_retry.max_attempts,
                Duration::from_millis(parse_number("STORAGE_RETRY_DELAY_MS", &value)?),
            );
        }
        if let Some(value) = lookup("QUERY_RETRIES") {
            config.query_retry =
                RetryPolicy::new(parse_number("QUERY_RETRIES", &value)?, config.query_retry.delay);
        }
        if let Some(value) = lookup("QUERY_RETRY_DELAY_MS") {
            config.query_retry = RetryPolicy::new(
                config.query_retry.max_attempts,
                Duration::from_millis(parse_number("QUERY_RETRY_DELAY_MS", &value)?),
            );
        }
        if let Some(value) = lookup("WRITE_CONCURRENCY") {
            let parsed: u64 = parse_number("WRITE_CONCURRENCY", &value)?;
            config.write_concurrency = (parsed.max(1)) as usize;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: format!("{}{}", ENV_PREFIX, key),
        value: value.to_string(),
    })
}

/// Rejected configuration input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_backend_classes() {
        let config = PipelineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.storage_retry.max_attempts, 5);
        assert_eq!(config.storage_retry.delay, Duration::from_secs(3));
        assert_eq!(config.query_retry.max_attempts, 3);
        assert_eq!(config.query_retry.delay, Duration::from_secs(1));
        assert_eq!(config.write_concurrency, 1);
    }

    #[test]
    fn test_overrides_apply() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("SOCIALSTREAM_STORAGE_URL", "file:///tmp/store"),
            ("SOCIALSTREAM_STORAGE_RETRIES", "7"),
            ("SOCIALSTREAM_STORAGE_RETRY_DELAY_MS", "250"),
            ("SOCIALSTREAM_WRITE_CONCURRENCY", "4"),
        ]))
        .unwrap();
        assert_eq!(config.storage_url, "file:///tmp/store");
        assert_eq!(config.storage_retry.max_attempts, 7);
        assert_eq!(config.storage_retry.delay, Duration::from_millis(250));
        assert_eq!(config.write_concurrency, 4);
    }

    #[test]
    fn test_invalid_numeric_is_an_error() {
        let result =
            PipelineConfig::from_lookup(lookup_from(&[("SOCIALSTREAM_QUERY_RETRIES", "many")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                key: "SOCIALSTREAM_QUERY_RETRIES".to_string(),
                value: "many".to_string(),
            })
        );
    }
}
