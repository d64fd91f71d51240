use std::time::Duration;

use serde::Serialize;
use statsdog_common::UnixTimestamp;
use statsdog_metrics::{MetricMap, Tags, extract_source_from_tags};

/// Name of the health point carrying the number of stats in a flush cycle.
pub const NUM_STATS_METRIC: &str = "statsd.numStats";

/// Name of the health point carrying the aggregation time of a flush cycle in milliseconds.
pub const PROCESSING_TIME_METRIC: &str = "statsd.processingTime";

/// The type of a data point as understood by the ingestion API.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// An instantaneous value.
    Gauge,
    /// A value normalized to one second.
    Rate,
}

/// A single `(timestamp, value)` pair.
pub type Point = (UnixTimestamp, f64);

/// A single sample of a metric.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataPoint {
    /// The full metric name, including the suffix of its fan-out.
    pub metric: String,
    /// The value at the capture time of the series.
    pub points: [Point; 1],
    /// The host reporting this metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// The flush interval in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    /// Normalized tags.
    #[serde(skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    /// The type of this point.
    #[serde(rename = "type")]
    pub ty: MetricType,
}

impl DataPoint {
    /// Returns the timestamp of this point.
    pub fn timestamp(&self) -> UnixTimestamp {
        self.points[0].0
    }

    /// Returns the value of this point.
    pub fn value(&self) -> f64 {
        self.points[0].1
    }
}

/// Host and tags shared by all points of one aggregated metric.
struct Origin {
    host: Option<String>,
    tags: Tags,
}

/// A batch of data points sharing one capture time.
///
/// Serializes into the request body of the series API. The capture time and default host are not
/// part of the body; they are carried by the individual points.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeSeries {
    /// All data points in emission order.
    pub series: Vec<DataPoint>,
    #[serde(skip)]
    timestamp: UnixTimestamp,
    #[serde(skip)]
    hostname: String,
}

impl TimeSeries {
    /// Creates an empty series.
    ///
    /// An empty `hostname` means points without a host override carry no host at all.
    pub fn new(timestamp: UnixTimestamp, hostname: impl Into<String>) -> Self {
        Self {
            series: Vec::new(),
            timestamp,
            hostname: hostname.into(),
        }
    }

    /// Expands a snapshot into data points.
    ///
    /// Returns `None` if the snapshot holds no stats. Otherwise, points are emitted for counters,
    /// timers, gauges and sets in this order, each ordered by name and tags key:
    ///
    ///  - counter `x`: `x` (rate) and `x.count` (gauge),
    ///  - timer `x`: `x.lower`, `x.upper`, `x.count`, `x.count_ps` (rate), `x.mean`, `x.median`,
    ///    `x.std`, `x.sum`, `x.sum_squares`, and one `x.<label>` per percentile,
    ///  - gauge `x`: `x` with its value,
    ///  - set `x`: `x` with the set's cardinality.
    ///
    /// All points are gauges unless noted otherwise. The series ends with the health points
    /// [`NUM_STATS_METRIC`] and [`PROCESSING_TIME_METRIC`].
    pub fn build(metrics: &MetricMap, timestamp: UnixTimestamp, hostname: &str) -> Option<Self> {
        if metrics.is_empty() {
            return None;
        }

        let mut series = Self::new(timestamp, hostname);

        for (name, tags, counter) in metrics.counters() {
            let origin = series.origin(tags);
            let flush = counter.flush;
            series.push(&origin, name, MetricType::Rate, counter.per_second, flush);
            series.push(
                &origin,
                format!("{name}.count"),
                MetricType::Gauge,
                counter.value as f64,
                flush,
            );
        }

        for (name, tags, timer) in metrics.timers() {
            let origin = series.origin(tags);
            let mut point = |suffix: &str, ty: MetricType, value: f64| {
                let name = format!("{name}.{suffix}");
                series.push(&origin, name, ty, value, timer.flush);
            };

            point("lower", MetricType::Gauge, timer.min);
            point("upper", MetricType::Gauge, timer.max);
            point("count", MetricType::Gauge, timer.count as f64);
            point("count_ps", MetricType::Rate, timer.per_second);
            point("mean", MetricType::Gauge, timer.mean);
            point("median", MetricType::Gauge, timer.median);
            point("std", MetricType::Gauge, timer.std_dev);
            point("sum", MetricType::Gauge, timer.sum);
            point("sum_squares", MetricType::Gauge, timer.sum_squares);
            for percentile in &timer.percentiles {
                point(&percentile.name, MetricType::Gauge, percentile.value);
            }
        }

        for (name, tags, gauge) in metrics.gauges() {
            let origin = series.origin(tags);
            series.push(&origin, name, MetricType::Gauge, gauge.value, gauge.flush);
        }

        for (name, tags, set) in metrics.sets() {
            let origin = series.origin(tags);
            let cardinality = set.cardinality() as f64;
            series.push(&origin, name, MetricType::Gauge, cardinality, set.flush);
        }

        let origin = series.origin("");
        let interval = metrics.flush_interval;
        series.push(
            &origin,
            NUM_STATS_METRIC,
            MetricType::Gauge,
            metrics.num_stats as f64,
            interval,
        );
        series.push(
            &origin,
            PROCESSING_TIME_METRIC,
            MetricType::Gauge,
            metrics.processing_time.as_nanos() as f64 / 1_000_000.0,
            interval,
        );

        Some(series)
    }

    /// Returns the capture time shared by all points.
    pub fn timestamp(&self) -> UnixTimestamp {
        self.timestamp
    }

    /// Returns the host of points without a host override.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns `true` if the series has no points.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Returns the number of points.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns an iterator over all points.
    pub fn iter(&self) -> std::slice::Iter<'_, DataPoint> {
        self.series.iter()
    }

    /// Appends a point stamped with the capture time of this series.
    ///
    /// `tags_key` is resolved into the host and tags of the point. A zero `interval` is omitted.
    pub fn add_metric(
        &mut self,
        name: impl Into<String>,
        tags_key: &str,
        ty: MetricType,
        value: f64,
        interval: Duration,
    ) {
        let origin = self.origin(tags_key);
        self.push(&origin, name, ty, value, interval);
    }

    fn origin(&self, tags_key: &str) -> Origin {
        let (source, tags) = extract_source_from_tags(tags_key);
        let host = source.or_else(|| (!self.hostname.is_empty()).then(|| self.hostname.clone()));

        Origin {
            host,
            tags: tags.normalize(),
        }
    }

    fn push(
        &mut self,
        origin: &Origin,
        name: impl Into<String>,
        ty: MetricType,
        value: f64,
        interval: Duration,
    ) {
        self.series.push(DataPoint {
            metric: name.into(),
            points: [(self.timestamp, value)],
            host: origin.host.clone(),
            interval: (!interval.is_zero()).then(|| interval.as_secs_f64()),
            tags: origin.tags.clone(),
            ty,
        });
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a DataPoint;
    type IntoIter = std::slice::Iter<'a, DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use similar_asserts::assert_eq;
    use statsdog_metrics::{Counter, Gauge, Percentile, Set, Timer};

    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn snapshot() -> MetricMap {
        MetricMap {
            num_stats: 1,
            processing_time: Duration::from_micros(1500),
            flush_interval: Duration::from_secs(10),
            ..Default::default()
        }
    }

    fn build(metrics: &MetricMap) -> TimeSeries {
        TimeSeries::build(metrics, UnixTimestamp::from_secs(NOW), "my-host").unwrap()
    }

    fn summary(series: &TimeSeries) -> Vec<(&str, MetricType, f64)> {
        series
            .iter()
            .map(|point| (point.metric.as_str(), point.ty, point.value()))
            .collect()
    }

    fn insert<T>(group: &mut statsdog_metrics::MetricGroup<T>, name: &str, tags: &str, value: T) {
        group
            .entry(name.to_owned())
            .or_default()
            .insert(tags.to_owned(), value);
    }

    #[test]
    fn test_empty_snapshot_builds_nothing() {
        let metrics = MetricMap {
            num_stats: 0,
            ..snapshot()
        };

        assert!(TimeSeries::build(&metrics, UnixTimestamp::now(), "my-host").is_none());
    }

    #[test]
    fn test_counter_fan_out() {
        let mut metrics = snapshot();
        let counter = Counter {
            value: 5,
            per_second: 2.5,
            flush: Duration::from_secs(10),
        };
        insert(&mut metrics.counters, "x", "", counter);

        let series = build(&metrics);
        let points: Vec<_> = series.iter().take(2).collect();

        assert_eq!(series.len(), 4);
        assert_eq!(points[0].metric, "x");
        assert_eq!(points[0].ty, MetricType::Rate);
        assert_eq!(points[0].value(), 2.5);
        assert_eq!(points[0].interval, Some(10.0));
        assert_eq!(points[1].metric, "x.count");
        assert_eq!(points[1].ty, MetricType::Gauge);
        assert_eq!(points[1].value(), 5.0);
        assert_eq!(points[1].interval, Some(10.0));
    }

    #[test]
    fn test_timer_fan_out() {
        let mut metrics = snapshot();
        let timer = Timer {
            min: 1.0,
            max: 9.0,
            count: 4,
            per_second: 0.4,
            mean: 5.0,
            median: 5.0,
            std_dev: 2.0,
            sum: 20.0,
            sum_squares: 120.0,
            percentiles: vec![Percentile {
                name: "p90".to_owned(),
                value: 8.0,
            }],
            flush: Duration::from_secs(10),
        };
        insert(&mut metrics.timers, "t", "", timer);

        let series = build(&metrics);
        let points = summary(&series);

        assert_eq!(&points[..10], &[
            ("t.lower", MetricType::Gauge, 1.0),
            ("t.upper", MetricType::Gauge, 9.0),
            ("t.count", MetricType::Gauge, 4.0),
            ("t.count_ps", MetricType::Rate, 0.4),
            ("t.mean", MetricType::Gauge, 5.0),
            ("t.median", MetricType::Gauge, 5.0),
            ("t.std", MetricType::Gauge, 2.0),
            ("t.sum", MetricType::Gauge, 20.0),
            ("t.sum_squares", MetricType::Gauge, 120.0),
            ("t.p90", MetricType::Gauge, 8.0),
        ]);
        assert_eq!(points.len(), 12);
    }

    #[test]
    fn test_gauge_and_set() {
        let mut metrics = snapshot();
        let gauge = Gauge {
            value: 42.5,
            flush: Duration::from_secs(10),
        };
        let set = Set {
            values: BTreeSet::from(["a".to_owned(), "b".to_owned(), "c".to_owned()]),
            flush: Duration::from_secs(10),
        };
        insert(&mut metrics.gauges, "g", "", gauge);
        insert(&mut metrics.sets, "s", "", set);

        let series = build(&metrics);

        assert_eq!(&summary(&series)[..2], &[
            ("g", MetricType::Gauge, 42.5),
            ("s", MetricType::Gauge, 3.0),
        ]);
    }

    #[test]
    fn test_health_points() {
        let metrics = MetricMap {
            num_stats: 12,
            ..snapshot()
        };

        let series = build(&metrics);

        assert_eq!(summary(&series), vec![
            (NUM_STATS_METRIC, MetricType::Gauge, 12.0),
            (PROCESSING_TIME_METRIC, MetricType::Gauge, 1.5),
        ]);
        for point in &series {
            assert_eq!(point.interval, Some(10.0));
            assert_eq!(point.host.as_deref(), Some("my-host"));
            assert!(point.tags.is_empty());
        }
    }

    #[test]
    fn test_kind_order() {
        let mut metrics = snapshot();
        insert(&mut metrics.sets, "a.set", "", Set::default());
        insert(&mut metrics.gauges, "b.gauge", "", Gauge::default());
        insert(&mut metrics.counters, "c.counter", "", Counter::default());

        let series = build(&metrics);
        let names: Vec<_> = series.iter().map(|point| point.metric.as_str()).collect();

        assert_eq!(names, [
            "c.counter",
            "c.counter.count",
            "b.gauge",
            "a.set",
            NUM_STATS_METRIC,
            PROCESSING_TIME_METRIC,
        ]);
    }

    #[test]
    fn test_host_override_and_tags() {
        let mut metrics = snapshot();
        insert(
            &mut metrics.gauges,
            "g",
            "region:eu,statsd_source_id:web-1,env:prod,region:eu",
            Gauge::default(),
        );
        insert(&mut metrics.gauges, "g", "env:prod", Gauge::default());

        let series = build(&metrics);

        let overridden = &series.series[1];
        assert_eq!(overridden.host.as_deref(), Some("web-1"));
        assert_eq!(overridden.tags.as_slice(), ["env:prod", "region:eu"]);

        let default = &series.series[0];
        assert_eq!(default.host.as_deref(), Some("my-host"));
        assert_eq!(default.tags.as_slice(), ["env:prod"]);
    }

    #[test]
    fn test_equivalent_tags_serialize_identically() {
        let mut series = TimeSeries::new(UnixTimestamp::from_secs(NOW), "");
        series.add_metric("m", "b:2,a:1", MetricType::Gauge, 1.0, Duration::ZERO);
        series.add_metric("m", "a:1,b:2,a:1", MetricType::Gauge, 1.0, Duration::ZERO);

        let first = serde_json::to_string(&series.series[0]).unwrap();
        let second = serde_json::to_string(&series.series[1]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_timestamp_uniformity() {
        let mut metrics = snapshot();
        insert(&mut metrics.counters, "c", "", Counter::default());
        insert(&mut metrics.timers, "t", "", Timer::default());
        insert(&mut metrics.gauges, "g", "", Gauge::default());
        insert(&mut metrics.sets, "s", "", Set::default());

        let series = build(&metrics);

        assert_eq!(series.timestamp(), UnixTimestamp::from_secs(NOW));
        assert!(series.iter().all(|point| point.timestamp() == series.timestamp()));
    }

    #[test]
    fn test_serialize_counter() {
        let mut metrics = snapshot();
        let counter = Counter {
            value: 5,
            per_second: 2.5,
            flush: Duration::from_secs(10),
        };
        insert(&mut metrics.counters, "x", "env:prod", counter);

        let series = build(&metrics);

        insta::assert_json_snapshot!(series, @r#"
        {
          "series": [
            {
              "metric": "x",
              "points": [
                [
                  1700000000,
                  2.5
                ]
              ],
              "host": "my-host",
              "interval": 10.0,
              "tags": [
                "env:prod"
              ],
              "type": "rate"
            },
            {
              "metric": "x.count",
              "points": [
                [
                  1700000000,
                  5.0
                ]
              ],
              "host": "my-host",
              "interval": 10.0,
              "tags": [
                "env:prod"
              ],
              "type": "gauge"
            },
            {
              "metric": "statsd.numStats",
              "points": [
                [
                  1700000000,
                  1.0
                ]
              ],
              "host": "my-host",
              "interval": 10.0,
              "type": "gauge"
            },
            {
              "metric": "statsd.processingTime",
              "points": [
                [
                  1700000000,
                  1.5
                ]
              ],
              "host": "my-host",
              "interval": 10.0,
              "type": "gauge"
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_omits_empty_host_and_interval() {
        let mut series = TimeSeries::new(UnixTimestamp::from_secs(NOW), "");
        series.add_metric("m", "", MetricType::Gauge, 1.0, Duration::ZERO);

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(
            json,
            r#"{"series":[{"metric":"m","points":[[1700000000,1.0]],"type":"gauge"}]}"#
        );
    }
}
