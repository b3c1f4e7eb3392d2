// Null-tolerant accessors over raw records
//
// Backend rows are loosely typed: numbers may arrive as strings, dates in ISO,
// US or RFC 2822 form (the API serialises datetimes that way). Every accessor
// returns None instead of failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::RawRecord;

/// Non-empty text value; numbers are rendered as text
pub fn text(record: &RawRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric value, accepting numeric strings
pub fn number(record: &RawRecord, field: &str) -> Option<f64> {
    value_as_f64(record.get(field)?)
}

/// Numeric value where missing and null count as zero
pub fn number_or_zero(record: &RawRecord, field: &str) -> f64 {
    number(record, field).unwrap_or(0.0)
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Calendar date of a field
pub fn date(record: &RawRecord, field: &str) -> Option<NaiveDate> {
    match record.get(field)? {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// True when the field holds something other than null or blank text
pub fn is_populated(record: &RawRecord, field: &str) -> bool {
    match record.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Composite key such as `po_number-item_no`; missing parts become empty
pub fn composite_key(record: &RawRecord, fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| text(record, f).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_backend_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        for raw in [
            "2025-04-01",
            "04/01/2025",
            "Tue, 01 Apr 2025 00:00:00 GMT",
            "2025-04-01T08:30:00",
            "2025-04-01 08:30:00.000",
            "2025-04-01T08:30:00Z",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn numbers_accept_strings_and_default_to_zero() {
        let r = rec(json!({"a": "12.5", "b": 3, "c": null}));
        assert_eq!(number(&r, "a"), Some(12.5));
        assert_eq!(number(&r, "b"), Some(3.0));
        assert_eq!(number(&r, "c"), None);
        assert_eq!(number_or_zero(&r, "missing"), 0.0);
    }

    #[test]
    fn blank_text_is_not_populated() {
        let r = rec(json!({"date_rcv": "  ", "po": 1001}));
        assert!(!is_populated(&r, "date_rcv"));
        assert_eq!(composite_key(&r, &["po", "item_no"]), "1001-");
    }
}
