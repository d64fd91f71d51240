use std::error::Error;
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

use serde::{Deserialize, Serialize};
use statsdog_datadog::{DatadogConfig, REDACTED};
use statsdog_log::{LogConfig, LogLevel};
use url::Url;

/// The name of the configuration file within the configuration folder.
const CONFIG_FILE_NAME: &str = "config.yml";

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Where a config error originates from.
#[derive(Debug)]
enum ConfigErrorSource {
    /// An error occurring independently.
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (an env var, or a CLI parameter).
    FieldOverride(&'static str),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    origin: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<BoxError>,
}

impl ConfigError {
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            origin: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            cause: Some(cause.into()),
            ..Self::new(kind)
        }
    }

    fn for_field<E>(cause: E, field: &'static str) -> Self
    where
        E: Into<BoxError>,
    {
        Self::wrap(cause, ConfigErrorKind::InvalidValue).field(field)
    }

    fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.origin = ConfigErrorSource::File(path.as_ref().to_path_buf());
        self
    }

    fn field(mut self, name: &'static str) -> Self {
        self.origin = ConfigErrorSource::FieldOverride(name);
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            ConfigErrorSource::None => write!(f, "{}", self.kind),
            ConfigErrorSource::File(path) => write!(f, "{} (file {})", self.kind, path.display()),
            ConfigErrorSource::FieldOverride(name) => write!(f, "{} (field {name})", self.kind),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
}

/// Configuration values overridden by command line arguments or environment variables.
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The Datadog API key.
    pub api_key: Option<String>,
    /// The Datadog series endpoint.
    pub api_endpoint: Option<String>,
    /// The default host of all data points.
    pub hostname: Option<String>,
    /// The log level.
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct ConfigValues {
    logging: LogConfig,
    datadog: DatadogConfig,
}

impl ConfigValues {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => {
                return Err(ConfigError::wrap(error, ConfigErrorKind::CouldNotOpenFile).file(path));
            }
        };

        match serde_yaml::from_reader::<_, Option<Self>>(io::BufReader::new(file)) {
            Ok(values) => Ok(values.unwrap_or_default()),
            Err(error) => Err(ConfigError::wrap(error, ConfigErrorKind::BadYaml).file(path)),
        }
    }
}

/// The complete statsdog configuration.
#[derive(Clone)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut datadog = self.values.datadog.clone();
        if datadog.api_key.is_some() {
            datadog.api_key = Some(REDACTED.to_owned());
        }

        f.debug_struct("Config")
            .field("path", &self.path)
            .field("logging", &self.values.logging)
            .field("datadog", &datadog)
            .finish()
    }
}

impl Config {
    /// Loads a config from a given config folder.
    ///
    /// A missing `config.yml` is not an error. In that case, all values are defaults and can be
    /// provided through [`apply_override`](Self::apply_override).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let values = ConfigValues::load(&path.join(CONFIG_FILE_NAME))?;
        Ok(Config { values, path })
    }

    /// Creates a config from a YAML document.
    ///
    /// This is mostly useful for tests.
    pub fn from_yaml_str(yaml: &str) -> Result<Config, ConfigError> {
        let values = serde_yaml::from_str::<Option<ConfigValues>>(yaml)
            .map_err(|error| ConfigError::wrap(error, ConfigErrorKind::BadYaml))?;

        Ok(Config {
            values: values.unwrap_or_default(),
            path: PathBuf::new(),
        })
    }

    /// Override configuration with values coming from other sources (e.g. env variables or
    /// command line parameters).
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let datadog = &mut self.values.datadog;

        if let Some(api_key) = overrides.api_key {
            if api_key.is_empty() {
                return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("api_key"));
            }
            datadog.api_key = Some(api_key);
        }

        if let Some(endpoint) = overrides.api_endpoint {
            Url::parse(&endpoint).map_err(|error| ConfigError::for_field(error, "api_endpoint"))?;
            datadog.api_endpoint = endpoint;
        }

        if let Some(hostname) = overrides.hostname {
            if hostname.is_empty() {
                return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("hostname"));
            }
            datadog.hostname = Some(hostname);
        }

        if let Some(level) = overrides.log_level {
            self.values.logging.level = level
                .parse::<LogLevel>()
                .map_err(|error| ConfigError::for_field(error, "log_level"))?;
        }

        Ok(self)
    }

    /// Returns the folder this config was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }

    /// Returns the configuration of the Datadog backend.
    pub fn datadog(&self) -> &DatadogConfig {
        &self.values.datadog
    }
}
