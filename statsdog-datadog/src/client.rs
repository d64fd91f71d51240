use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use statsdog_common::{RetryError, RetryPolicy, UnixTimestamp, retry};
use statsdog_log::LogError;
use statsdog_metrics::{BackendRegistry, MetricMap, MetricSender, SendMetricsError};
use url::Url;

use crate::{BACKEND_NAME, DatadogConfig, SAMPLE_CONFIG, TimeSeries};

/// Version of the dogstatsd protocol announced to the ingestion endpoint.
pub const DOGSTATSD_VERSION: &str = "5.6.3";

/// User agent announced to the ingestion endpoint.
pub const DOGSTATSD_USER_AGENT: &str = "python-requests/2.6.0 CPython/2.7.10";

/// Header carrying [`DOGSTATSD_VERSION`].
const DOGSTATSD_VERSION_HEADER: &str = "DD-Dogstatsd-Version";

/// Replacement for the API key in error messages.
pub const REDACTED: &str = "*****";

/// An error creating a [`DatadogClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configuration does not contain an API key.
    #[error("datadog api key is not configured")]
    MissingApiKey,
    /// The ingestion endpoint is not a valid URL.
    #[error("invalid datadog api endpoint")]
    InvalidEndpoint(#[source] url::ParseError),
    /// No default host is known.
    #[error("could not determine the hostname")]
    MissingHostname,
    /// The HTTP client could not be initialized.
    #[error("failed to create http client")]
    HttpClient(#[source] reqwest::Error),
}

/// An error delivering a [`TimeSeries`].
///
/// None of the messages contain the API key.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The series could not be serialized. Not retried.
    #[error("failed to serialize series")]
    Serialize(#[source] serde_json::Error),
    /// The request could not be built. Not retried.
    #[error("failed to build request: {0}")]
    BuildRequest(String),
    /// The request did not complete, for instance due to a connection error or a timeout.
    #[error("failed to send request: {0}")]
    Transport(String),
    /// The endpoint responded with a status outside of `200..=209`.
    #[error("unexpected response status {0}")]
    BadStatus(u16),
}

impl SendError {
    /// Returns `true` if a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::BadStatus(_))
    }
}

/// Returns `true` if the ingestion endpoint accepted the payload.
fn is_accepted(status: StatusCode) -> bool {
    (200..=209).contains(&status.as_u16())
}

/// Delivers series to the Datadog ingestion endpoint.
///
/// Configuration is fixed at construction. Every call to [`send`](Self::send) starts with a fresh
/// backoff state, so one client can be reused across flush cycles.
pub struct DatadogClient {
    /// The endpoint including the `api_key` query parameter.
    url: Url,
    /// The API key and its URL-encoded form, both removed from error messages.
    secrets: [String; 2],
    hostname: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl DatadogClient {
    /// Creates a client from its configuration.
    ///
    /// `hostname` is the host of all points that do not carry a host override. The caller resolves
    /// it from [`DatadogConfig::hostname`] or the system hostname.
    pub fn new(config: &DatadogConfig, hostname: impl Into<String>) -> Result<Self, ClientError> {
        let api_key = match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ClientError::MissingApiKey),
        };

        let hostname = hostname.into();
        if hostname.is_empty() {
            return Err(ClientError::MissingHostname);
        }

        let url = Url::parse_with_params(&config.api_endpoint, [("api_key", api_key)])
            .map_err(ClientError::InvalidEndpoint)?;

        let timeout = config.timeout();
        let max_elapsed = config.max_retry_elapsed();
        if timeout >= max_elapsed {
            statsdog_log::warn!(
                "datadog request timeout of {timeout:?} is not shorter than the retry budget of {max_elapsed:?}"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::HttpClient)?;

        let encoded_key = url::form_urlencoded::byte_serialize(api_key.as_bytes()).collect();

        Ok(Self {
            url,
            secrets: [api_key.to_owned(), encoded_key],
            hostname,
            client,
            policy: RetryPolicy::default().with_max_elapsed_time(max_elapsed),
        })
    }

    /// Replaces the retry policy of this client.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the default host of all series built by this client.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the retry policy used for every delivery.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Builds a series from a snapshot and delivers it.
    ///
    /// The capture time is taken once, so all points share the same timestamp. A snapshot without
    /// stats is not sent.
    pub async fn send_snapshot(&self, metrics: &MetricMap) -> Result<(), SendError> {
        match TimeSeries::build(metrics, UnixTimestamp::now(), &self.hostname) {
            Some(series) => self.send(&series).await,
            None => Ok(()),
        }
    }

    /// Delivers a series.
    ///
    /// An empty series succeeds without a request. Otherwise, the series is posted until the
    /// endpoint accepts it or the retry budget is spent, in which case the last error is returned.
    pub async fn send(&self, series: &TimeSeries) -> Result<(), SendError> {
        if series.is_empty() {
            return Ok(());
        }

        let payload = serde_json::to_vec(series).map_err(SendError::Serialize)?;
        statsdog_log::debug!(
            "sending {} data points to datadog: {}",
            series.len(),
            String::from_utf8_lossy(&payload)
        );

        let request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(DOGSTATSD_VERSION_HEADER, DOGSTATSD_VERSION)
            .header(USER_AGENT, DOGSTATSD_USER_AGENT)
            .body(payload)
            .build()
            .map_err(|error| SendError::BuildRequest(self.redact(&error)))?;

        retry(&self.policy, || self.attempt(&request)).await
    }

    async fn attempt(&self, request: &reqwest::Request) -> Result<(), RetryError<SendError>> {
        let request = request.try_clone().ok_or_else(|| {
            RetryError::permanent(SendError::BuildRequest("request is not reusable".to_owned()))
        })?;

        let mut response = self
            .client
            .execute(request)
            .await
            .map_err(|error| RetryError::transient(SendError::Transport(self.redact(&error))))?;

        let status = response.status();

        // Drain the body so the connection can be reused for the next attempt.
        while let Ok(Some(_)) = response.chunk().await {}

        if !is_accepted(status) {
            return Err(RetryError::transient(SendError::BadStatus(status.as_u16())));
        }

        Ok(())
    }

    /// Formats an error with its causes and removes the API key.
    fn redact(&self, error: &dyn Error) -> String {
        let mut message = LogError(error).to_string();
        for secret in &self.secrets {
            message = message.replace(secret.as_str(), REDACTED);
        }
        message
    }
}

impl fmt::Debug for DatadogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut endpoint = self.url.clone();
        endpoint.set_query(None);

        f.debug_struct("DatadogClient")
            .field("endpoint", &endpoint.as_str())
            .field("hostname", &self.hostname)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetricSender for DatadogClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn send_metrics(&self, metrics: &MetricMap) -> Result<(), SendMetricsError> {
        self.send_snapshot(metrics)
            .await
            .map_err(|error| SendMetricsError::new(BACKEND_NAME, error))
    }
}

/// Registers the Datadog backend with a registry.
///
/// `config` extracts the backend configuration and the default host from the registry's
/// configuration type.
pub fn register<C, F>(registry: &mut BackendRegistry<C>, config: F)
where
    C: 'static,
    F: Fn(&C) -> (&DatadogConfig, &str) + Send + Sync + 'static,
{
    registry.register(BACKEND_NAME, SAMPLE_CONFIG, move |outer: &C| {
        let (config, hostname) = config(outer);
        let client = DatadogClient::new(config, hostname)?;
        Ok(Box::new(client) as Box<dyn MetricSender>)
    });
}
