use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Hours a reported maghrib time may fall in; anything else is a bad scrape.
pub const PLAUSIBLE_HOURS: RangeInclusive<u8> = 15..=20;

/// A clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeValue {
    pub hour: u8,
    pub minute: u8,
}

impl TimeValue {
    /// Builds a value only if it lands inside the plausible maghrib window.
    pub fn plausible(hour: u8, minute: u8) -> Option<Self> {
        let value = Self { hour, minute };
        value.is_plausible().then_some(value)
    }

    pub fn is_plausible(&self) -> bool {
        PLAUSIBLE_HOURS.contains(&self.hour) && self.minute <= 59
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// Cached value still inside its TTL.
    #[serde(rename = "cache")]
    Cache,
    /// Just fetched from the upstream page.
    #[serde(rename = "manar")]
    Fresh,
    /// Upstream failed, serving the last known value.
    #[serde(rename = "cache_fallback")]
    StaleFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maghrib {
    pub value: TimeValue,
    pub source: Source,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_window() {
        assert!(TimeValue::plausible(15, 0).is_some());
        assert!(TimeValue::plausible(20, 59).is_some());
        assert!(TimeValue::plausible(14, 59).is_none());
        assert!(TimeValue::plausible(21, 0).is_none());
        assert!(TimeValue::plausible(17, 60).is_none());
    }

    #[test]
    fn test_display_pads_minutes() {
        let value = TimeValue { hour: 18, minute: 5 };
        assert_eq!(value.to_string(), "18:05");
    }

    #[test]
    fn test_source_wire_names() {
        assert_eq!(serde_json::to_string(&Source::Cache).unwrap(), "\"cache\"");
        assert_eq!(serde_json::to_string(&Source::Fresh).unwrap(), "\"manar\"");
        assert_eq!(
            serde_json::to_string(&Source::StaleFallback).unwrap(),
            "\"cache_fallback\""
        );
    }
}
