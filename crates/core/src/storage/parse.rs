//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values and the matching text
//! encodings for dates and times.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{BookingStatus, Severity, SlotStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

fn conversion_error<E>(column: usize, e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

#[derive(Debug)]
struct UnknownValue(String);

impl std::fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown stored value '{}'", self.0)
    }
}

impl std::error::Error for UnknownValue {}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| conversion_error(0, e))
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(0, e))
}

/// Parse a calendar date stored as YYYY-MM-DD
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| conversion_error(0, e))
}

/// Parse a wall-clock time stored as HH:MM:SS
pub fn parse_time(s: &str) -> Result<NaiveTime, SqlError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| conversion_error(0, e))
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Zero-padded so lexical order matches time order
pub fn fmt_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_slot_status(s: &str) -> Result<SlotStatus, SqlError> {
    SlotStatus::parse(s).ok_or_else(|| conversion_error(0, UnknownValue(s.to_string())))
}

pub fn parse_booking_status(s: &str) -> Result<BookingStatus, SqlError> {
    BookingStatus::parse(s).ok_or_else(|| conversion_error(0, UnknownValue(s.to_string())))
}

/// Parse screening answers stored as a JSON array
pub fn parse_answers(s: &str) -> Result<Vec<u8>, SqlError> {
    serde_json::from_str(s).map_err(|e| conversion_error(0, e))
}

pub fn parse_severity(s: &str) -> Result<Severity, SqlError> {
    Severity::from_label(s).ok_or_else(|| conversion_error(0, UnknownValue(s.to_string())))
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
