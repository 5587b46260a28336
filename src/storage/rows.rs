//! Column decoding helpers shared by the stores.
//!
//! Text columns that fail to parse surface as
//! `rusqlite::Error::FromSqlConversionFailure` instead of falling back to a
//! default value.

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use std::str::FromStr;
use uuid::Uuid;

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

/// Parse an RFC 3339 timestamp column.
pub fn timestamp(row: &rusqlite::Row, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

/// Parse a nullable RFC 3339 timestamp column.
pub fn optional_timestamp(
    row: &rusqlite::Row,
    index: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_error(index, e))
    })
    .transpose()
}

/// Parse a UUID column.
pub fn uuid(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(index)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(index, e))
}

/// Parse a nullable "HH:MM:SS" column.
pub fn optional_time(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Option<NaiveTime>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|s| NaiveTime::parse_from_str(&s, "%H:%M:%S").map_err(|e| conversion_error(index, e)))
        .transpose()
}

/// Parse a column through `FromStr`.
pub fn parsed<T>(row: &rusqlite::Row, index: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(index)?;
    raw.parse().map_err(|e| conversion_error(index, e))
}

/// Format a timestamp for storage.
///
/// Fixed width, so stored values order correctly as text.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
