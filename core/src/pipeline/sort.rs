// Stable multi-key sort over raw records
use serde_json::Value;
use std::cmp::Ordering;

use crate::RawRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Sort by each key in turn; records equal on every key keep their order
pub fn sort_by_keys(records: &mut [RawRecord], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ord = compare_values(a.get(&key.field), b.get(&key.field));
                if key.descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Total order over loosely typed cells.
///
/// Missing and null sort first, then booleans, numbers, text, and nested
/// values. A string counts as a number only when the whole string parses as a
/// finite number, so item numbers like "10" sort numerically while codes like
/// "270C" sort as text after every number.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    SortCell::of(a).cmp(&SortCell::of(b))
}

/// Typed view of a cell used only for ordering
#[derive(Debug)]
enum SortCell<'a> {
    Null,
    Bool(bool),
    Num(f64),
    Text(&'a str),
    Nested,
}

impl<'a> SortCell<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => SortCell::Null,
            Some(Value::Bool(b)) => SortCell::Bool(*b),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(x) if x.is_finite() => SortCell::Num(x),
                _ => SortCell::Nested,
            },
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(x) if x.is_finite() => SortCell::Num(x),
                _ => SortCell::Text(s.as_str()),
            },
            Some(Value::Array(_)) | Some(Value::Object(_)) => SortCell::Nested,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortCell::Null => 0,
            SortCell::Bool(_) => 1,
            SortCell::Num(_) => 2,
            SortCell::Text(_) => 3,
            SortCell::Nested => 4,
        }
    }
}

impl Ord for SortCell<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortCell::Bool(x), SortCell::Bool(y)) => x.cmp(y),
            (SortCell::Num(x), SortCell::Num(y)) => x.total_cmp(y),
            (SortCell::Text(x), SortCell::Text(y)) => x.cmp(y),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortCell<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortCell<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortCell<'_> {}
