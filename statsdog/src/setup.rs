use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use statsdog_config::Config;
use statsdog_metrics::{BackendRegistry, MetricMap};

/// Everything a backend needs to be created.
pub struct BackendContext {
    /// The loaded configuration.
    pub config: Config,
    /// The default host of exported metrics.
    pub hostname: String,
}

impl BackendContext {
    /// Creates the context, resolving the system hostname unless one is configured.
    pub fn new(config: Config) -> Result<Self> {
        let hostname = match config.datadog().hostname.clone() {
            Some(hostname) => hostname,
            None => system_hostname()?,
        };

        Ok(Self { config, hostname })
    }
}

fn system_hostname() -> Result<String> {
    hostname::get()
        .context("could not determine the hostname")?
        .into_string()
        .map_err(|_| anyhow::anyhow!("the hostname is not valid unicode"))
}

/// Returns a registry with all available backends.
pub fn backend_registry() -> BackendRegistry<BackendContext> {
    let mut registry = BackendRegistry::new();
    statsdog_datadog::register(&mut registry, |context: &BackendContext| {
        (context.config.datadog(), context.hostname.as_str())
    });
    registry
}

/// Loads a JSON snapshot from a file, or from stdin if the path is `-`.
pub fn read_snapshot(path: &Path) -> Result<MetricMap> {
    let json = if path.as_os_str() == "-" {
        let mut json = String::new();
        io::stdin()
            .read_to_string(&mut json)
            .context("could not read snapshot from stdin")?;
        json
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("could not read snapshot from {}", path.display()))?
    };

    serde_json::from_str(&json).context("could not parse snapshot")
}

/// Print spawn infos to the log.
pub fn dump_spawn_infos(context: &BackendContext, backend: &str) {
    let config = &context.config;
    if config.path().as_os_str().is_empty() {
        statsdog_log::info!("launching statsdog without config folder");
    } else {
        statsdog_log::info!(
            "launching statsdog from config folder {}",
            config.path().display()
        );
    }

    statsdog_log::info!("  backend: {backend}");
    statsdog_log::info!("  endpoint: {}", config.datadog().api_endpoint);
    statsdog_log::info!("  hostname: {}", context.hostname);
    statsdog_log::info!("  log level: {}", config.logging().level);
}

/// Logs a summary of the snapshot that is about to be sent.
pub fn dump_snapshot_infos(metrics: &MetricMap) {
    statsdog_log::info!(
        "sending snapshot with {} stats ({} counters, {} timers, {} gauges, {} sets)",
        metrics.num_stats,
        metrics.counters().count(),
        metrics.timers().count(),
        metrics.gauges().count(),
        metrics.sets().count(),
    );
}

#[cfg(test)]
mod tests {
    use statsdog_datadog::{BACKEND_NAME, SAMPLE_CONFIG};

    use super::*;

    #[test]
    fn test_registry_contains_datadog() {
        let registry = backend_registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), [BACKEND_NAME]);
        assert_eq!(registry.sample_config(BACKEND_NAME), Some(SAMPLE_CONFIG));
    }

    #[test]
    fn test_configured_hostname_wins() {
        let config = Config::from_yaml_str("datadog: {hostname: web-7}").unwrap();
        let context = BackendContext::new(config).unwrap();
        assert_eq!(context.hostname, "web-7");
    }

    #[test]
    fn test_create_requires_api_key() {
        let config = Config::from_yaml_str("datadog: {hostname: web-7}").unwrap();
        let context = BackendContext::new(config).unwrap();

        let error = backend_registry()
            .create(BACKEND_NAME, &context)
            .err()
            .unwrap();
        assert_eq!(error.to_string(), "failed to create datadog backend");
    }

    #[test]
    fn test_create_datadog() {
        let config =
            Config::from_yaml_str("datadog: {api_key: abc, hostname: web-7}").unwrap();
        let context = BackendContext::new(config).unwrap();

        let sender = backend_registry().create(BACKEND_NAME, &context).unwrap();
        assert_eq!(sender.name(), BACKEND_NAME);
    }

    #[test]
    fn test_read_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, r#"{"num_stats": 2, "gauges": {"g": {"": {"value": 1.5}}}}"#).unwrap();

        let metrics = read_snapshot(&path).unwrap();

        assert_eq!(metrics.num_stats, 2);
        assert_eq!(metrics.gauges().count(), 1);
    }

    #[test]
    fn test_read_invalid_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "not json").unwrap();

        let error = read_snapshot(&path).unwrap_err();
        assert_eq!(error.to_string(), "could not parse snapshot");
    }
}
