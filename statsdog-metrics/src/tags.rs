//! Tag keys and their normalization.
//!
//! Aggregated metrics are keyed by a *tags key*: the metric's tags serialized as a single string,
//! separated by commas:
//!
//! ```text
//! env:prod,region:eu,statsd_source_id:web-1
//! ```
//!
//! The special tag `statsd_source_id` carries the host the metric originated from. It is not a
//! regular tag and is removed by [`extract_source_from_tags`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the tag that overrides the host of a metric.
pub const SOURCE_TAG: &str = "statsd_source_id";

/// Separator between individual tags in a tags key.
pub const TAG_SEPARATOR: char = ',';

/// An ordered list of tags.
///
/// Tags as parsed from a tags key keep their original order and may contain duplicates. Call
/// [`Tags::normalize`] to obtain the canonical form: empty tags removed, sorted, and deduplicated.
/// Two tag lists with the same members normalize to identical values regardless of their input
/// order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Creates an empty tag list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a tags key into its individual tags.
    pub fn parse(key: &str) -> Self {
        key.split(TAG_SEPARATOR).map(str::to_owned).collect()
    }

    /// Returns the canonical form of these tags.
    ///
    /// # Example
    ///
    /// ```
    /// use statsdog_metrics::Tags;
    ///
    /// let tags = Tags::parse("b:2,a:1,,b:2").normalize();
    /// assert_eq!(tags.as_slice(), ["a:1", "b:2"]);
    /// ```
    pub fn normalize(mut self) -> Self {
        self.0.retain(|tag| !tag.is_empty());
        self.0.sort_unstable();
        self.0.dedup();
        self
    }

    /// Returns `true` if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the tags as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns an iterator over the tags.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Consumes the list and returns the tags.
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl FromIterator<String> for Tags {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Tags {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, tag) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "{TAG_SEPARATOR}")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}

/// Splits a tags key into the host override and the remaining tags.
///
/// The first `statsd_source_id:<host>` tag is removed from the tags and its value returned as the
/// host. An empty host value counts as no override. The remaining tags are returned in their
/// original order and are not normalized.
///
/// # Example
///
/// ```
/// use statsdog_metrics::extract_source_from_tags;
///
/// let (host, tags) = extract_source_from_tags("env:prod,statsd_source_id:web-1");
/// assert_eq!(host.as_deref(), Some("web-1"));
/// assert_eq!(tags.as_slice(), ["env:prod"]);
/// ```
pub fn extract_source_from_tags(key: &str) -> (Option<String>, Tags) {
    let mut tags = Tags::parse(key);

    let position = tags.0.iter().position(|tag| {
        tag.strip_prefix(SOURCE_TAG)
            .is_some_and(|rest| rest.starts_with(':'))
    });

    let source = position
        .map(|index| tags.0.remove(index))
        .and_then(|tag| {
            let host = &tag[SOURCE_TAG.len() + 1..];
            (!host.is_empty()).then(|| host.to_owned())
        });

    (source, tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_key() {
        let tags = Tags::parse("");
        assert_eq!(tags.as_slice(), [""]);
        assert!(tags.normalize().is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = Tags::parse("z:1,a:1,m,a:1,,m").normalize();
        let twice = once.clone().normalize();
        assert_eq!(once, twice);
        assert_eq!(once.as_slice(), ["a:1", "m", "z:1"]);
    }

    #[test]
    fn test_normalize_ignores_input_order() {
        let left = Tags::parse("region:eu,env:prod,service:api").normalize();
        let right = Tags::parse("service:api,region:eu,env:prod,env:prod").normalize();
        assert_eq!(left, right);
        assert_eq!(left.to_string(), "env:prod,region:eu,service:api");
    }

    #[test]
    fn test_extract_source() {
        let (host, tags) = extract_source_from_tags("a:1,statsd_source_id:10.0.0.1,b:2");
        assert_eq!(host.as_deref(), Some("10.0.0.1"));
        assert_eq!(tags.as_slice(), ["a:1", "b:2"]);
    }

    #[test]
    fn test_extract_source_only_first() {
        let (host, tags) =
            extract_source_from_tags("statsd_source_id:first,statsd_source_id:second");
        assert_eq!(host.as_deref(), Some("first"));
        assert_eq!(tags.as_slice(), ["statsd_source_id:second"]);
    }

    #[test]
    fn test_extract_source_missing() {
        let (host, tags) = extract_source_from_tags("a:1,statsd_source_identity:x");
        assert_eq!(host, None);
        assert_eq!(tags.as_slice(), ["a:1", "statsd_source_identity:x"]);
    }

    #[test]
    fn test_extract_source_empty_value() {
        let (host, tags) = extract_source_from_tags("statsd_source_id:,a:1");
        assert_eq!(host, None);
        assert_eq!(tags.as_slice(), ["a:1"]);
    }

    #[test]
    fn test_serialize_transparent() {
        let tags = Tags::parse("b,a").normalize();
        assert_eq!(serde_json::to_string(&tags).unwrap(), r#"["a","b"]"#);
    }
}
