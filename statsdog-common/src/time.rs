//! Utilities to deal with time types.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// A unix timestamp (full seconds elapsed since 1970-01-01 00:00 UTC).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Creates a unix timestamp from the given number of seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Creates a unix timestamp from the given system time.
    ///
    /// Times before the UNIX epoch saturate to zero.
    pub fn from_system(time: SystemTime) -> Self {
        let duration = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self(duration)
    }

    /// Returns the current timestamp.
    #[inline]
    pub fn now() -> Self {
        Self::from_system(SystemTime::now())
    }

    /// Returns the number of seconds since the UNIX epoch start.
    pub fn as_secs(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnixTimestamp({})", self.as_secs())
    }
}

impl fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_secs().fmt(f)
    }
}

impl std::ops::Sub for UnixTimestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration::from_secs(self.0.saturating_sub(rhs.0))
    }
}

impl Serialize for UnixTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.as_secs())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_system_before_epoch() {
        let time = SystemTime::UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(UnixTimestamp::from_system(time).as_secs(), 0);
    }

    #[test]
    fn test_from_system_truncates_subsec() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(1_500_000_000_999);
        assert_eq!(UnixTimestamp::from_system(time).as_secs(), 1_500_000_000);
    }

    #[test]
    fn test_serializes_as_integer() {
        let ts = UnixTimestamp::from_secs(1_500_000_000);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1500000000");
        assert_eq!(
            serde_json::from_str::<UnixTimestamp>("1500000000").unwrap(),
            ts
        );
    }

    #[test]
    fn test_sub_saturates() {
        let earlier = UnixTimestamp::from_secs(10);
        let later = UnixTimestamp::from_secs(25);
        assert_eq!(later - earlier, Duration::from_secs(15));
        assert_eq!(earlier - later, Duration::ZERO);
    }
}
