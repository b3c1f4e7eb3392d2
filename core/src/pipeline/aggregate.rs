// Group-by aggregation
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::fields::{number_or_zero, text};
use crate::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Average,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub key: String,
    pub value: f64,
    pub count: usize,
    /// First non-empty value of the carried descriptive field
    pub label: Option<String>,
}

/// Group records by `key_field` and reduce `measure_field`.
///
/// Groups appear in first-seen order. Null or missing measures count as
/// zero; records without a key are skipped.
pub fn aggregate_by_key(
    records: &[RawRecord],
    key_field: &str,
    measure_field: &str,
    aggregation: Aggregation,
    carry_field: Option<&str>,
) -> Vec<AggregateRow> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();

    for record in records {
        let Some(key) = text(record, key_field) else {
            continue;
        };
        let idx = *positions.entry(key.clone()).or_insert_with(|| {
            rows.push(AggregateRow {
                key,
                value: 0.0,
                count: 0,
                label: None,
            });
            rows.len() - 1
        });

        let row = &mut rows[idx];
        row.value += number_or_zero(record, measure_field);
        row.count += 1;
        if row.label.is_none() {
            row.label = carry_field.and_then(|f| text(record, f));
        }
    }

    if aggregation == Aggregation::Average {
        for row in &mut rows {
            row.value /= row.count as f64;
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(v: Value) -> Vec<RawRecord> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn sums_with_nulls_as_zero_and_carries_label() {
        let input = rows(json!([
            {"part_code": "1130", "part_desc": null, "qty": 4},
            {"part_code": "1220", "part_desc": "Tortilla", "qty": "6"},
            {"part_code": "1130", "part_desc": "Chip", "qty": null},
            {"part_code": "1130", "part_desc": "Chip v2", "qty": 2},
            {"part_code": null, "qty": 100},
        ]));
        let out = aggregate_by_key(&input, "part_code", "qty", Aggregation::Sum, Some("part_desc"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, "1130");
        assert_eq!(out[0].value, 6.0);
        assert_eq!(out[0].count, 3);
        assert_eq!(out[0].label.as_deref(), Some("Chip"));
        assert_eq!(out[1].value, 6.0);
    }

    #[test]
    fn averages_per_group() {
        let input = rows(json!([
            {"k": "a", "v": 1}, {"k": "a", "v": 2}, {"k": "b", "v": 9}
        ]));
        let out = aggregate_by_key(&input, "k", "v", Aggregation::Average, None);
        assert_eq!(out[0].value, 1.5);
        assert_eq!(out[1].value, 9.0);
        assert_eq!(out[1].label, None);
    }
}
