//! Aggregated metrics as produced by one flush cycle, and the interface of backends that export
//! them.
//!
//! A [`MetricMap`] is the read-only snapshot of a flush cycle. It holds four kinds of aggregated
//! metrics, each keyed by metric name and [tags key](crate::tags):
//!
//!  - [`Counter`]: A raw count and its per-second rate.
//!  - [`Timer`]: Statistics over timing samples, including configured percentiles.
//!  - [`Gauge`]: The current value of a quantity.
//!  - [`Set`]: The unique values observed, exported as their cardinality.
//!
//! Backends implement [`MetricSender`] and are made available by name through a
//! [`BackendRegistry`].
#![warn(missing_docs)]

mod backend;
mod snapshot;
pub mod tags;

pub use self::backend::*;
pub use self::snapshot::*;
pub use self::tags::{Tags, extract_source_from_tags};
