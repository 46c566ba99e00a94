//! Cache lifetime settings

use std::env;
use std::time::Duration;

/// How long a compiled rule set stays usable without reloading its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheSettings {
    /// Age since the last load after which a compiled set is reloaded
    /// before it is served (milliseconds)
    pub set_ttl_ms: u64,

    /// Age since the last load after which a compiled set is still served
    /// while a background refresh reloads it (milliseconds)
    pub fetch_ttl_ms: u64,
}

impl CacheSettings {
    #[must_use]
    pub fn new(set_ttl: Duration, fetch_ttl: Duration) -> Self {
        Self {
            set_ttl_ms: duration_ms(set_ttl),
            fetch_ttl_ms: duration_ms(fetch_ttl),
        }
    }

    /// Load settings from `CIRCULATION_RULES_SET_TTL_MS` and
    /// `CIRCULATION_RULES_FETCH_TTL_MS`, keeping the default for anything
    /// unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            set_ttl_ms: env::var("CIRCULATION_RULES_SET_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.set_ttl_ms),
            fetch_ttl_ms: env::var("CIRCULATION_RULES_FETCH_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_ttl_ms),
        }
    }

    #[must_use]
    pub fn set_ttl(&self) -> Duration {
        Duration::from_millis(self.set_ttl_ms)
    }

    #[must_use]
    pub fn fetch_ttl(&self) -> Duration {
        Duration::from_millis(self.fetch_ttl_ms)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            set_ttl_ms: 5000,
            fetch_ttl_ms: 4000,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.set_ttl(), Duration::from_secs(5));
        assert_eq!(settings.fetch_ttl(), Duration::from_secs(4));
    }

    #[test]
    fn new_from_durations() {
        let settings = CacheSettings::new(Duration::from_millis(250), Duration::ZERO);
        assert_eq!(settings.set_ttl_ms, 250);
        assert_eq!(settings.fetch_ttl_ms, 0);
    }

    #[test]
    fn saturates_huge_durations() {
        let settings = CacheSettings::new(Duration::MAX, Duration::MAX);
        assert_eq!(settings.set_ttl_ms, u64::MAX);
    }
}
