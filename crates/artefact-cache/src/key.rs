//! Cache keys, one per query shape.

use std::fmt;

use artefact_types::CalendarKey;

/// Identifies one cached query result.
///
/// Entries are keyed per calendar key and per query shape, so writes for one
/// key can never clobber another key's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Most recent completed record.
    Latest,
    /// List of all completed keys.
    AllDates,
    /// Completed record stored under this key.
    Record(CalendarKey),
    /// Nearest completed record strictly before this key.
    Prev(CalendarKey),
    /// Nearest completed record strictly after this key.
    Next(CalendarKey),
}

/// Expiry class of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Latest,
    AllDates,
    Record,
    Neighbour,
}

impl CacheKey {
    pub fn class(&self) -> KeyClass {
        match self {
            Self::Latest => KeyClass::Latest,
            Self::AllDates => KeyClass::AllDates,
            Self::Record(_) => KeyClass::Record,
            Self::Prev(_) | Self::Next(_) => KeyClass::Neighbour,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest_record"),
            Self::AllDates => f.write_str("all_dates"),
            Self::Record(k) => write!(f, "record:{k}"),
            Self::Prev(k) => write!(f, "prev:{k}"),
            Self::Next(k) => write!(f, "next:{k}"),
        }
    }
}
