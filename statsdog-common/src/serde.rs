//! Serde helpers for common field representations.

/// (De)serializes a [`Duration`](std::time::Duration) as an integer number of milliseconds.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize, Serialize)]
/// struct Flush {
///     #[serde(with = "statsdog_common::serde::duration_millis")]
///     interval: Duration,
/// }
///
/// let flush: Flush = serde_json::from_str(r#"{"interval": 10000}"#).unwrap();
/// assert_eq!(flush.interval, Duration::from_secs(10));
/// ```
pub mod duration_millis {
    use std::time::Duration;

    use ::serde::{Deserialize, Deserializer, Serializer};

    /// Serializes the duration as milliseconds, truncating sub-millisecond precision.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserializes a duration from milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ::serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    struct Timed {
        #[serde(with = "super::duration_millis")]
        took: Duration,
    }

    #[test]
    fn test_duration_millis() {
        let timed = Timed {
            took: Duration::from_micros(2_500_700),
        };

        let json = serde_json::to_string(&timed).unwrap();
        assert_eq!(json, r#"{"took":2500}"#);

        let parsed: Timed = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.took, Duration::from_millis(2500));
    }
}
