//! Date parsing and formatting shared by ingestion, storage and the CLI.
//!
//! Schedules exported from scheduling tools use a mix of ISO and US-style
//! timestamps. Everything is normalized to a naive wall-clock
//! `NaiveDateTime`; date-only values mean midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Canonical storage format (`YYYY-MM-DD HH:MM:SS`).
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

/// Parse a user- or file-supplied timestamp.
///
/// Returns `None` for empty input or text that matches none of the
/// accepted formats.
pub fn parse_user_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // Offset-carrying timestamps keep their local wall-clock time
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Format a timestamp in the canonical storage format.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

/// Fractional days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f64 {
    (*to - *from).num_seconds() as f64 / 86_400.0
}

/// Serde adapter for optional timestamps in ingest files.
///
/// Accepts any format [`parse_user_date`] understands. `null`, empty
/// strings and the placeholder `"NaT"` deserialize to `None`.
pub mod opt_datetime {
    use super::{STORAGE_FORMAT, parse_user_date};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(STORAGE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() || s.trim() == "NaT" => Ok(None),
            Some(s) => parse_user_date(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("unrecognized date: {}", s))),
        }
    }
}
