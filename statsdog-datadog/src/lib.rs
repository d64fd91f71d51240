//! Export of aggregated metrics to the Datadog series API.
//!
//! Exporting a flush cycle happens in two steps:
//!
//!  1. [`TimeSeries::build`] expands a [`MetricMap`](statsdog_metrics::MetricMap) into data
//!     points. Every aggregated metric fans out into one or more points, all stamped with the
//!     same capture time.
//!  2. [`DatadogClient::send`] posts the series to the ingestion endpoint and retries transient
//!     failures with exponential backoff until the configured time budget is spent.
//!
//! [`DatadogClient`] also implements [`MetricSender`](statsdog_metrics::MetricSender), so it can
//! be registered with a [`BackendRegistry`](statsdog_metrics::BackendRegistry) via [`register`].
#![warn(missing_docs)]

mod client;
mod config;
mod series;

pub use self::client::*;
pub use self::config::*;
pub use self::series::*;
