use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use async_trait::async_trait;

use crate::MetricMap;

/// A boxed error as returned by backends and their factories.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A backend failed to export a snapshot.
#[derive(Debug, thiserror::Error)]
#[error("{backend} backend failed to send metrics")]
pub struct SendMetricsError {
    backend: &'static str,
    #[source]
    source: BoxError,
}

impl SendMetricsError {
    /// Wraps an error raised by the named backend.
    pub fn new(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            backend,
            source: source.into(),
        }
    }

    /// Returns the name of the backend that failed.
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Exports aggregated metrics to an external system.
///
/// A sender is invoked once per flush cycle with the cycle's snapshot. Callers must not run
/// overlapping sends on the same instance.
#[async_trait]
pub trait MetricSender: Send + Sync {
    /// Returns the name this backend is registered under.
    fn name(&self) -> &'static str;

    /// Exports one snapshot.
    ///
    /// An empty snapshot is not an error. Backends return `Ok` without doing any work.
    async fn send_metrics(&self, metrics: &MetricMap) -> Result<(), SendMetricsError>;
}

/// Creates a backend from configuration of type `C`.
pub type BackendFactory<C> =
    Box<dyn Fn(&C) -> Result<Box<dyn MetricSender>, BoxError> + Send + Sync>;

/// Errors returned by [`BackendRegistry::create`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No backend is registered under the requested name.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),
    /// The factory rejected the configuration.
    #[error("failed to create {backend} backend")]
    Init {
        /// Name of the backend.
        backend: &'static str,
        /// The error raised by the factory.
        #[source]
        source: BoxError,
    },
}

struct Registration<C> {
    sample_config: &'static str,
    factory: BackendFactory<C>,
}

/// Named backend factories.
///
/// Backends are registered explicitly by the application. The registry never creates a backend
/// until [`create`](Self::create) is called, so registering a backend with incomplete
/// configuration is harmless.
pub struct BackendRegistry<C> {
    backends: BTreeMap<&'static str, Registration<C>>,
}

impl<C> BackendRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// Registers a backend factory and its sample configuration.
    ///
    /// Registering a name twice replaces the earlier registration.
    pub fn register<F>(&mut self, name: &'static str, sample_config: &'static str, factory: F)
    where
        F: Fn(&C) -> Result<Box<dyn MetricSender>, BoxError> + Send + Sync + 'static,
    {
        let registration = Registration {
            sample_config,
            factory: Box::new(factory),
        };

        self.backends.insert(name, registration);
    }

    /// Creates the backend registered under `name`.
    pub fn create(&self, name: &str, config: &C) -> Result<Box<dyn MetricSender>, RegistryError> {
        let (&backend, registration) = self
            .backends
            .get_key_value(name)
            .ok_or_else(|| RegistryError::UnknownBackend(name.to_owned()))?;

        (registration.factory)(config).map_err(|source| RegistryError::Init { backend, source })
    }

    /// Returns the sample configuration of a registered backend.
    pub fn sample_config(&self, name: &str) -> Option<&'static str> {
        self.backends.get(name).map(|r| r.sample_config)
    }

    /// Returns the names of all registered backends in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.keys().copied()
    }
}

impl<C> Default for BackendRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for BackendRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.backends.keys()).finish()
    }
}
