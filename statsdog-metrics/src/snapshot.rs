use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statsdog_common::serde::duration_millis;

/// Metrics of one kind, keyed by metric name and then by tags key.
pub type MetricGroup<T> = BTreeMap<String, BTreeMap<String, T>>;

/// An aggregated counter.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Counter {
    /// The raw count accumulated during the flush interval.
    pub value: i64,
    /// The count normalized to one second.
    pub per_second: f64,
    /// The flush interval this counter was aggregated over.
    #[serde(with = "duration_millis", default)]
    pub flush: Duration,
}

/// A named percentile of a [`Timer`], such as `p90` or `upper_99`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Percentile {
    /// The label under which the percentile is exported.
    pub name: String,
    /// The value at this percentile.
    pub value: f64,
}

/// Aggregated statistics over timing samples.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Timer {
    /// The smallest sample.
    pub min: f64,
    /// The largest sample.
    pub max: f64,
    /// The number of samples.
    pub count: u64,
    /// The number of samples normalized to one second.
    pub per_second: f64,
    /// The arithmetic mean of all samples.
    pub mean: f64,
    /// The median sample.
    pub median: f64,
    /// The standard deviation of all samples.
    pub std_dev: f64,
    /// The sum of all samples.
    pub sum: f64,
    /// The sum of all squared samples.
    pub sum_squares: f64,
    /// Configured percentiles, in the order they are exported.
    #[serde(default)]
    pub percentiles: Vec<Percentile>,
    /// The flush interval this timer was aggregated over.
    #[serde(with = "duration_millis", default)]
    pub flush: Duration,
}

/// The current value of a quantity.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Gauge {
    /// The last reported value.
    pub value: f64,
    /// The flush interval this gauge was aggregated over.
    #[serde(with = "duration_millis", default)]
    pub flush: Duration,
}

/// The unique values reported for a metric.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Set {
    /// The distinct values.
    pub values: BTreeSet<String>,
    /// The flush interval this set was aggregated over.
    #[serde(with = "duration_millis", default)]
    pub flush: Duration,
}

impl Set {
    /// Returns the number of distinct values in this set.
    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

/// The aggregated state of one flush cycle.
///
/// All groups are [`BTreeMap`]s, so every iteration visits metrics ordered by name and then by
/// tags key.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricMap {
    /// The total number of stats received during the flush interval.
    pub num_stats: u64,
    /// Time spent aggregating this snapshot.
    #[serde(with = "duration_millis")]
    pub processing_time: Duration,
    /// The flush interval of the aggregator.
    #[serde(with = "duration_millis")]
    pub flush_interval: Duration,
    /// All counters.
    pub counters: MetricGroup<Counter>,
    /// All timers.
    pub timers: MetricGroup<Timer>,
    /// All gauges.
    pub gauges: MetricGroup<Gauge>,
    /// All sets.
    pub sets: MetricGroup<Set>,
}

impl MetricMap {
    /// Returns `true` if no stats were received during this flush cycle.
    pub fn is_empty(&self) -> bool {
        self.num_stats == 0
    }

    /// Iterates `(name, tags_key, counter)` triples.
    pub fn counters(&self) -> impl Iterator<Item = (&str, &str, &Counter)> {
        iter_group(&self.counters)
    }

    /// Iterates `(name, tags_key, timer)` triples.
    pub fn timers(&self) -> impl Iterator<Item = (&str, &str, &Timer)> {
        iter_group(&self.timers)
    }

    /// Iterates `(name, tags_key, gauge)` triples.
    pub fn gauges(&self) -> impl Iterator<Item = (&str, &str, &Gauge)> {
        iter_group(&self.gauges)
    }

    /// Iterates `(name, tags_key, set)` triples.
    pub fn sets(&self) -> impl Iterator<Item = (&str, &str, &Set)> {
        iter_group(&self.sets)
    }
}

fn iter_group<T>(group: &MetricGroup<T>) -> impl Iterator<Item = (&str, &str, &T)> {
    group.iter().flat_map(|(name, by_tags)| {
        by_tags
            .iter()
            .map(move |(tags_key, value)| (name.as_str(), tags_key.as_str(), value))
    })
}
