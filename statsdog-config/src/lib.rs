//! Configuration for statsdog.
//!
//! The configuration is read from `config.yml` in a configuration folder and can be overridden
//! with command line arguments or environment variables through [`OverridableConfig`].
//!
//! ```yaml
//! logging:
//!   level: debug
//! datadog:
//!   api_key: "0123456789abcdef0123456789abcdef"
//!   timeout: 5
//! ```
#![warn(missing_docs)]

mod config;

pub use crate::config::*;
