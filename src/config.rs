//! Configuration management for docgate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{DocgateError, Result};
use crate::ratelimit::TimeWindow;

/// Prefix for environment overrides, e.g. `DOCGATE__CLIENT__ENDPOINT`.
const ENV_PREFIX: &str = "DOCGATE";

/// Main configuration for the document client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocgateConfig {
    /// HTTP client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Document creation endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Treat non-2xx responses as errors instead of returning the body
    #[serde(default)]
    pub reject_error_status: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            reject_error_status: false,
        }
    }
}

fn default_endpoint() -> String {
    "https://ismp.crpt.ru/api/v3/1k/documents/create".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Window over which `request_limit` applies
    #[serde(default)]
    pub time_unit: TimeWindow,

    /// Maximum requests per window
    #[serde(default = "default_request_limit")]
    pub request_limit: u32,

    /// Explicit window length in milliseconds, overrides `time_unit`
    #[serde(default)]
    pub period_ms: Option<u64>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            time_unit: TimeWindow::default(),
            request_limit: default_request_limit(),
            period_ms: None,
        }
    }
}

fn default_request_limit() -> u32 {
    10
}

impl RateLimitingConfig {
    /// Effective window length.
    pub fn period(&self) -> Duration {
        match self.period_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.time_unit.duration(),
        }
    }
}

impl ClientConfig {
    /// Per-request HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DocgateConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `DOCGATE__SECTION__KEY` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Like [`DocgateConfig::load`], reading overrides from `env` instead of
    /// the process environment when given.
    fn load_from(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration");
            builder =
                builder.add_source(config::File::from(path).format(config::FileFormat::Yaml));
        }

        let config: DocgateConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DocgateError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: DocgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| DocgateError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.client.endpoint.trim().is_empty() {
            return Err(DocgateError::Config("endpoint must not be empty".to_string()));
        }
        if self.client.timeout_secs == 0 {
            return Err(DocgateError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.rate_limiting.request_limit == 0 {
            return Err(DocgateError::InvalidCapacity);
        }
        if self.rate_limiting.period_ms == Some(0) {
            return Err(DocgateError::Config(
                "period_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocgateConfig::default();
        assert_eq!(
            config.client.endpoint,
            "https://ismp.crpt.ru/api/v3/1k/documents/create"
        );
        assert_eq!(config.client.timeout(), Duration::from_secs(30));
        assert!(!config.client.reject_error_status);
        assert_eq!(config.rate_limiting.request_limit, 10);
        assert_eq!(config.rate_limiting.period(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
client:
  endpoint: http://localhost:8080/documents
  reject_error_status: true
rate_limiting:
  time_unit: second
  request_limit: 5
"#;
        let config = DocgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.client.endpoint, "http://localhost:8080/documents");
        assert_eq!(config.client.timeout_secs, 30);
        assert!(config.client.reject_error_status);
        assert_eq!(config.rate_limiting.time_unit, TimeWindow::Second);
        assert_eq!(config.rate_limiting.request_limit, 5);
        assert_eq!(config.rate_limiting.period(), Duration::from_secs(1));
    }

    #[test]
    fn test_period_override() {
        let yaml = r#"
rate_limiting:
  time_unit: hour
  period_ms: 250
"#;
        let config = DocgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rate_limiting.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_request_limit_rejected() {
        let yaml = "rate_limiting:\n  request_limit: 0\n";
        let err = DocgateConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, DocgateError::InvalidCapacity));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DocgateConfig::from_yaml("client:\n  endpoint: ''\n").is_err());
        assert!(DocgateConfig::from_yaml("client:\n  timeout_secs: 0\n").is_err());
        assert!(DocgateConfig::from_yaml("rate_limiting:\n  period_ms: 0\n").is_err());
        assert!(DocgateConfig::from_yaml("rate_limiting:\n  time_unit: fortnight\n").is_err());
    }

    fn write_temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let file_name = format!("docgate-{}-{}.yaml", name, std::process::id());
        let path = std::env::temp_dir().join(file_name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_load_from_file() {
        let path = write_temp_config(
            "file",
            "rate_limiting:\n  time_unit: minute\n  request_limit: 3\n",
        );

        let config = DocgateConfig::load_from(Some(&path), env(&[])).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.rate_limiting.request_limit, 3);
        assert_eq!(config.rate_limiting.time_unit, TimeWindow::Minute);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let overrides = env(&[
            ("DOCGATE__RATE_LIMITING__REQUEST_LIMIT", "7"),
            ("DOCGATE__RATE_LIMITING__TIME_UNIT", "hour"),
            ("DOCGATE__CLIENT__REJECT_ERROR_STATUS", "true"),
            ("UNRELATED__REQUEST_LIMIT", "99"),
        ]);

        let config = DocgateConfig::load_from(None, overrides).unwrap();

        assert_eq!(config.rate_limiting.request_limit, 7);
        assert_eq!(config.rate_limiting.time_unit, TimeWindow::Hour);
        assert!(config.client.reject_error_status);
        assert_eq!(config.client.timeout_secs, 30);
    }

    #[test]
    fn test_env_takes_precedence_over_file() {
        let path = write_temp_config(
            "precedence",
            "rate_limiting:\n  time_unit: second\n  request_limit: 3\n",
        );
        let overrides = env(&[("DOCGATE__RATE_LIMITING__REQUEST_LIMIT", "12")]);

        let config = DocgateConfig::load_from(Some(&path), overrides).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.rate_limiting.request_limit, 12);
        assert_eq!(config.rate_limiting.time_unit, TimeWindow::Second);
    }

    #[test]
    fn test_invalid_env_override_rejected() {
        let overrides = env(&[("DOCGATE__RATE_LIMITING__REQUEST_LIMIT", "0")]);
        let err = DocgateConfig::load_from(None, overrides).unwrap_err();
        assert!(matches!(err, DocgateError::InvalidCapacity));
    }

    #[test]
    fn test_load_reads_process_environment() {
        // No other test reads this key through the process environment
        std::env::set_var("DOCGATE__CLIENT__TIMEOUT_SECS", "45");
        let config = DocgateConfig::load(None);
        std::env::remove_var("DOCGATE__CLIENT__TIMEOUT_SECS");

        assert_eq!(config.unwrap().client.timeout_secs, 45);
    }
}
