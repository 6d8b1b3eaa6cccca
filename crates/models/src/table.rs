//! Generic table rendering for record listings.
//!
//! Columns are dotted paths into each row (`team.home`). A few column names
//! get special treatment: `date` cells show only the calendar date and
//! `image` cells resolve relative upload names against a base URL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Text(String),
    Image { src: String },
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Image { src } => f.write_str(src),
        }
    }
}

/// Resolve a dotted path inside a JSON row.
pub fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn format_cell(column: &str, value: &Value, upload_base: &str) -> Cell {
    if is_falsy(value) {
        return Cell::Empty;
    }

    if column.eq_ignore_ascii_case("date") {
        if let Some(date) = parse_date(value) {
            return Cell::Text(date.format("%Y-%m-%d").to_string());
        }
    }

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if column.eq_ignore_ascii_case("image") {
        let src = if text.starts_with("http") {
            text
        } else {
            format!("{upload_base}{text}")
        };
        return Cell::Image { src };
    }

    Cell::Text(text)
}

/// Render `columns` for every row. `rows` may be a bare array or a list
/// response carrying its records under `data`.
pub fn render_rows(columns: &[&str], rows: &Value, upload_base: &str) -> Vec<Vec<Cell>> {
    let records = match rows {
        Value::Array(items) => items.as_slice(),
        other => other
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };

    records
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    let value = lookup(row, column).unwrap_or(&Value::Null);
                    format_cell(column, value, upload_base)
                })
                .collect()
        })
        .collect()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc).date_naive());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt.date());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.date());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        }
        _ => None,
    }
}
