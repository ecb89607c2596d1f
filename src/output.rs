//! Result Rendering
//!
//! Turns a [`QueryResult`] into console lines:
//!
//! ```text
//! Result 1:
//! ------------------------------
//! memberID: 7
//! copyID: 12
//! expiryDate: 2024-03-01
//! (OVERDUE!)
//! ------------------------------
//! ```
//!
//! Each command prints a fixed column set. A column the result does not carry
//! prints as `N/A` instead of failing the row; SQL `NULL` prints as `null`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::engine::QueryResult;

/// Separator printed around every result and around the menu
pub const SEPARATOR: &str = "------------------------------";

pub const BOOK_COLUMNS: &[&str] =
    &["bookID", "title", "ISBN", "edition", "publicationDate", "publisher", "copyrightYear"];

pub const MEMBER_COLUMNS: &[&str] = &["memberID", "memFirstName", "memLastName", "memdob", "memdor"];

pub const MEMBER_COPY_COLUMNS: &[&str] =
    &["memberID", "copyID", "memCopyStatus", "createdDate", "expiryDate"];

pub const AUTHOR_COLUMNS: &[&str] = &["authorID", "firstName", "lastName", "dob", "status"];

/// Column whose past values are flagged as overdue
const EXPIRY_COLUMN: &str = "expiryDate";

const OVERDUE_MARKER: &str = "(OVERDUE!)";

/// Text form of a row value
#[must_use]
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a date or timestamp as produced by the engines
///
/// A bare date resolves to midnight of that day.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Local).naive_local());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(|d| d.and_time(NaiveTime::MIN))
}

/// Whether an expiry value lies before `now`
///
/// Values that are not dates are never overdue.
#[must_use]
pub fn is_overdue(value: &serde_json::Value, now: NaiveDateTime) -> bool {
    value.as_str().and_then(parse_timestamp).is_some_and(|expiry| expiry < now)
}

/// Render every row of `result`, printing `columns` in order
#[must_use]
pub fn render_rows(result: &QueryResult, columns: &[&str], now: NaiveDateTime) -> Vec<String> {
    let mut lines = Vec::new();

    for (row_idx, _) in result.rows.iter().enumerate() {
        lines.push(format!("Result {}:", row_idx + 1));
        lines.push(SEPARATOR.to_string());

        for column in columns {
            match result.value(row_idx, column) {
                Some(value) => {
                    lines.push(format!("{column}: {}", display_value(value)));
                    if column.eq_ignore_ascii_case(EXPIRY_COLUMN) && is_overdue(value, now) {
                        lines.push(OVERDUE_MARKER.to_string());
                    }
                }
                None => lines.push(format!("{column}: N/A")),
            }
        }

        lines.push(SEPARATOR.to_string());
    }

    lines
}
