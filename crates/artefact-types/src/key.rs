//! Calendar key: the date that identifies one generation cycle.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

const KEY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day, rendered and stored as `YYYY-MM-DD`.
///
/// Ordering follows the calendar, and because the textual form is zero-padded
/// it also matches lexical ordering of the stored string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarKey(NaiveDate);

impl CalendarKey {
    /// Wrap an existing date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The key for the current UTC day.
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// Parse a strict `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.len() != 10 {
            return Err(Error::InvalidKey(s.to_string()));
        }
        NaiveDate::parse_from_str(s, KEY_FORMAT)
            .map(Self)
            .map_err(|_| Error::InvalidKey(s.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The previous calendar day, if representable.
    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    /// The next calendar day, if representable.
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn as_string(&self) -> String {
        self.0.format(KEY_FORMAT).to_string()
    }
}

impl fmt::Display for CalendarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}

impl FromStr for CalendarKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CalendarKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CalendarKey> for String {
    fn from(key: CalendarKey) -> Self {
        key.as_string()
    }
}

impl From<NaiveDate> for CalendarKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let key = CalendarKey::parse("2024-06-02").unwrap();
        assert_eq!(key.to_string(), "2024-06-02");
        assert_eq!(key.as_string(), "2024-06-02");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(CalendarKey::parse("2024-6-2").is_err());
        assert!(CalendarKey::parse("2024-13-01").is_err());
        assert!(CalendarKey::parse("yesterday").is_err());
        assert!(CalendarKey::parse("").is_err());
    }

    #[test]
    fn test_neighbours_cross_month_boundaries() {
        let key = CalendarKey::parse("2024-03-01").unwrap();
        assert_eq!(key.pred().unwrap().to_string(), "2024-02-29");
        assert_eq!(key.succ().unwrap().to_string(), "2024-03-02");

        let key = CalendarKey::parse("2023-12-31").unwrap();
        assert_eq!(key.succ().unwrap().to_string(), "2024-01-01");
    }

    #[test]
    fn test_ordering_matches_calendar() {
        let a = CalendarKey::parse("2024-06-01").unwrap();
        let b = CalendarKey::parse("2024-06-02").unwrap();
        let c = CalendarKey::parse("2025-01-01").unwrap();
        assert!(a < b && b < c);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_serde_as_string() {
        let key = CalendarKey::parse("2024-06-02").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-06-02\"");
        let back: CalendarKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<CalendarKey>("\"06/02/2024\"").is_err());
    }
}
