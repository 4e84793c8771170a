//! Translates listing parameters (pagination, category, status, date range
//! and free-text search) into a SQL `WHERE` clause over the `feedback` table.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Category, FeedbackStatus, UnknownVariant};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),
    #[error("Invalid {field} '{value}'. Use YYYY-MM-DD or an RFC 3339 timestamp.")]
    InvalidDate { field: &'static str, value: String },
}

/// Raw query string of the listing endpoints. Every field is kept as text so
/// that junk like `?page=abc` falls back to defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

impl PageRequest {
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = parse_positive(page).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        PageRequest { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).filter(|n| *n >= 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeBound {
    Start,
    End,
}

/// Parses `startDate` / `endDate`. A bare date as an end bound covers the
/// whole day.
fn parse_date_bound(field: &'static str, raw: &str, bound: RangeBound) -> Result<DateTime<Utc>, FilterError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let invalid = || FilterError::InvalidDate { field, value: raw.to_string() };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = match bound {
        RangeBound::Start => date.and_hms_opt(0, 0, 0),
        RangeBound::End => date.and_hms_milli_opt(23, 59, 59, 999),
    }
    .ok_or_else(invalid)?;

    Ok(naive.and_utc())
}

fn non_blank(raw: Option<&String>) -> Option<&str> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackFilter {
    pub public_only: bool,
    pub category: Option<Category>,
    pub status: Option<FeedbackStatus>,
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// A rendered filter: `where_clause` always starts with `WHERE` and uses
/// positional `?` placeholders matching `params` in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub where_clause: String,
    pub params: Vec<Value>,
}

impl FeedbackFilter {
    /// Public listing: `page`, `limit`, `search`, `category`. Status and date
    /// parameters are ignored.
    pub fn public_from_params(params: &FeedbackListParams) -> Result<(Self, PageRequest), FilterError> {
        let filter = FeedbackFilter {
            public_only: true,
            category: non_blank(params.category.as_ref()).map(str::parse::<Category>).transpose()?,
            search: non_blank(params.search.as_ref()).map(str::to_string),
            ..Default::default()
        };
        Ok((filter, page_from(params)))
    }

    /// Admin listing: everything the public listing accepts plus `status`,
    /// `startDate` and `endDate`, with no visibility restriction.
    pub fn admin_from_params(params: &FeedbackListParams) -> Result<(Self, PageRequest), FilterError> {
        let filter = FeedbackFilter {
            public_only: false,
            category: non_blank(params.category.as_ref()).map(str::parse::<Category>).transpose()?,
            status: non_blank(params.status.as_ref()).map(str::parse::<FeedbackStatus>).transpose()?,
            search: non_blank(params.search.as_ref()).map(str::to_string),
            created_from: non_blank(params.start_date.as_ref())
                .map(|raw| parse_date_bound("startDate", raw, RangeBound::Start))
                .transpose()?,
            created_to: non_blank(params.end_date.as_ref())
                .map(|raw| parse_date_bound("endDate", raw, RangeBound::End))
                .transpose()?,
        };
        Ok((filter, page_from(params)))
    }

    pub fn to_sql(&self) -> SqlFilter {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if self.public_only {
            clauses.push("is_public = 1");
        }
        if let Some(category) = self.category {
            clauses.push("category = ?");
            params.push(Value::Text(category.as_str().to_string()));
        }
        if let Some(status) = self.status {
            clauses.push("status = ?");
            params.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(from) = self.created_from {
            clauses.push("created_at >= ?");
            params.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(to) = self.created_to {
            clauses.push("created_at <= ?");
            params.push(Value::Integer(to.timestamp_millis()));
        }
        if let Some(search) = &self.search {
            // LIKE only folds ASCII, so both sides are lower-cased first.
            clauses.push(
                "(unicode_lower(title) LIKE ? ESCAPE '\\' OR unicode_lower(content) LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            params.push(Value::Text(pattern.clone()));
            params.push(Value::Text(pattern));
        }

        let where_clause = if clauses.is_empty() {
            "WHERE 1 = 1".to_string()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        SqlFilter { where_clause, params }
    }
}

fn page_from(params: &FeedbackListParams) -> PageRequest {
    PageRequest::from_params(params.page.as_deref(), params.limit.as_deref())
}

/// Escapes LIKE wildcards so search text is matched literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
