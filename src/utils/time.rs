//! XMLTV timestamp helpers

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

/// Number of leading characters of an XMLTV timestamp (`yyyymmddHHMMSS`)
pub const XMLTV_TIMESTAMP_LEN: usize = 14;

const XMLTV_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Keep the first 14 characters of an XMLTV `start`/`stop` value, dropping
/// any trailing timezone offset.
pub fn truncate_xmltv_timestamp(value: &str) -> String {
    value.chars().take(XMLTV_TIMESTAMP_LEN).collect()
}

/// Parse a truncated XMLTV timestamp as UTC
///
/// Returns `None` for anything that is not exactly a 14-digit date-time.
pub fn parse_xmltv_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.len() != XMLTV_TIMESTAMP_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, XMLTV_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Inclusive forward window `[now, now + days]`
///
/// The end saturates at the latest representable instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn days_ahead(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: now,
            end: TimeDelta::try_days(i64::from(days))
                .and_then(|span| now.checked_add_signed(span))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}
