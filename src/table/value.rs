//! Cell values.
//!
//! Cells are loaded from CSV as text and stay text until an operation needs
//! a number or a date; coercion is lazy and per-operation, mirroring how the
//! columns themselves are typed.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single cell in a table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Null,
}

impl Value {
    /// Interpret a raw CSV field. Empty fields are null.
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Value::Null
        } else {
            Value::Text(field.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell: numbers directly, digit-coercible text via
    /// parsing. Dates and free text have no numeric view.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(t) if is_digit_coercible(t) => t.parse().ok(),
            _ => None,
        }
    }

    /// Date view of the cell. Text cells are parsed as `YYYY-MM-DD`, with a
    /// date-time fallback for upstream exports that kept the time part.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(t) => parse_date(t),
            _ => None,
        }
    }

    /// Lowercased text view for case-insensitive comparisons. Null has none.
    pub fn as_comparable_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string().to_lowercase()),
        }
    }
}

impl fmt::Display for Value {
    /// Renders the persisted form: dates as `YYYY-MM-DD`, numbers without a
    /// trailing `.0`, null as the empty field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(t) => write!(f, "{t}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => Ok(()),
        }
    }
}

/// True for text made of ASCII digits with at most one decimal point.
/// This is the only shape of text the compiler will coerce to a number.
pub fn is_digit_coercible(text: &str) -> bool {
    let cleaned = text.replacen('.', "", 1);
    !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_coercible() {
        assert!(is_digit_coercible("42"));
        assert!(is_digit_coercible("3.5"));
        assert!(is_digit_coercible(".5"));
        assert!(!is_digit_coercible("3.5.1"));
        assert!(!is_digit_coercible("-1"));
        assert!(!is_digit_coercible("east"));
        assert!(!is_digit_coercible(""));
        assert!(!is_digit_coercible("."));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Value::Number(3.0).as_number(), Some(3.0));
        assert_eq!(Value::Text("70".into()).as_number(), Some(70.0));
        assert_eq!(Value::Text("east".into()).as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn test_date_view() {
        let d = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();
        assert_eq!(Value::Text("2024-08-10".into()).as_date(), Some(d));
        assert_eq!(Value::Text("2024-08-10 14:03:00".into()).as_date(), Some(d));
        assert_eq!(Value::Text("not a date".into()).as_date(), None);
        assert_eq!(Value::Date(d).as_date(), Some(d));
    }

    #[test]
    fn test_display_round_trips_csv_fields() {
        assert_eq!(Value::Number(70.0).to_string(), "70");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Null.to_string(), "");
        let d = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2024-08-10");
    }

    #[test]
    fn test_from_field() {
        assert_eq!(Value::from_field(""), Value::Null);
        assert_eq!(Value::from_field("east"), Value::Text("east".into()));
    }
}
