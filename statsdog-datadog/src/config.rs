use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The name under which the Datadog backend is registered.
pub const BACKEND_NAME: &str = "datadog";

/// The default series ingestion endpoint.
pub const DEFAULT_API_URL: &str = "https://app.datadoghq.com/api/v1/series";

/// Sample configuration of the Datadog backend, shown to operators.
pub const SAMPLE_CONFIG: &str = r#"datadog:
  # API key used to authenticate with the ingestion endpoint. Required.
  api_key: "0123456789abcdef0123456789abcdef"
  # Series ingestion endpoint.
  api_endpoint: "https://app.datadoghq.com/api/v1/series"
  # Timeout of a single request in seconds. Keep this shorter than the retry budget.
  timeout: 5
  # Total time in seconds spent retrying a failed delivery.
  max_retry_elapsed: 10
  # Host reported for metrics without a statsd_source_id tag. Defaults to the system hostname.
  # hostname: "web-1"
"#;

/// Configuration of the Datadog backend.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatadogConfig {
    /// The API key sent with every request. The client cannot be created without it.
    pub api_key: Option<String>,
    /// The series ingestion endpoint.
    pub api_endpoint: String,
    /// Timeout of a single request in seconds.
    pub timeout: u64,
    /// Total time budget in seconds for all attempts of one delivery.
    pub max_retry_elapsed: u64,
    /// The default host of all data points.
    ///
    /// When absent, the system hostname is used.
    pub hostname: Option<String>,
}

impl DatadogConfig {
    /// Returns the timeout of a single request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the total time budget of one delivery.
    pub fn max_retry_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_retry_elapsed)
    }
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: DEFAULT_API_URL.to_owned(),
            timeout: 5,
            max_retry_elapsed: 10,
            hostname: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        datadog: DatadogConfig,
    }

    #[test]
    fn test_sample_config_parses() {
        let sample: Sample = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        let config = sample.datadog;

        assert!(config.api_key.is_some());
        assert_eq!(config.api_endpoint, DEFAULT_API_URL);
        assert_eq!(config.hostname, None);
        assert!(config.timeout() < config.max_retry_elapsed());
    }

    #[test]
    fn test_defaults() {
        let config: DatadogConfig = serde_yaml::from_str("api_key: secret").unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.max_retry_elapsed(), Duration::from_secs(10));
        assert_eq!(config, DatadogConfig {
            api_key: Some("secret".to_owned()),
            ..Default::default()
        });
    }
}
