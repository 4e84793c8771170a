use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::Connection;
use thiserror::Error;

use crate::models::{AdminRole, Category, FeedbackStatus};

pub mod admin_db_operations;
pub mod feedback_db_operations;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
#[error("Timestamp out of range: {0} ms")]
struct TimestampOutOfRange(i64);

/// Current time truncated to the millisecond precision used in storage, so
/// an in-memory record equals what a later read returns.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| conversion_error(column, Type::Integer, TimestampOutOfRange(millis)))
}

pub(crate) fn conversion_error<E>(column: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
}

/// Registers `unicode_lower(text)`, a Unicode-aware `lower()` used by the
/// search filter. Must be called on every connection that runs a search.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

// --- Enum <-> TEXT column mapping ---

fn text_to_enum<T>(value: ValueRef<'_>) -> FromSqlResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.as_str()?.parse::<T>().map_err(|e| FromSqlError::Other(Box::new(e)))
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_to_enum(value)
    }
}

impl ToSql for FeedbackStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FeedbackStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_to_enum(value)
    }
}

impl ToSql for AdminRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AdminRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_to_enum(value)
    }
}
