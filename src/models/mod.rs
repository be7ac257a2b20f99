//! Data models for the todo server.
//!
//! Field names match the on-disk JSON document so stored files stay readable
//! by earlier releases.

mod document;
mod todo;

pub use document::*;
pub use todo::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Current time as an ISO-8601 string.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Offset-less values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a due date given either as a calendar date or a full timestamp.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

/// Timestamp for a mutation that must never move `previous` backwards.
pub fn advance_timestamp(previous: &str) -> String {
    let now = Utc::now();
    match parse_timestamp(previous) {
        Some(prev) if prev > now => previous.to_string(),
        _ => now.to_rfc3339_opts(SecondsFormat::Micros, true),
    }
}
