// Temporal self-join: attach the previous occurrence of the same group
use serde_json::Value;

use super::fields::{date, text};
use crate::RawRecord;

/// Which fields describe the "previous occurrence" of a record
#[derive(Debug, Clone)]
pub struct PreviousOccurrence {
    /// Grouping key, e.g. `part_code`
    pub group_field: String,
    /// Date ordering the records, e.g. `date_orderd`
    pub date_field: String,
    /// Output field receiving the prior record's date
    pub date_target: String,
    /// `(source, target)` pairs copied from the prior record
    pub carried: Vec<(String, String)>,
}

impl PreviousOccurrence {
    /// Last order date and unit price of the same part
    pub fn last_order() -> Self {
        Self {
            group_field: "part_code".to_string(),
            date_field: "date_orderd".to_string(),
            date_target: "last_order_date".to_string(),
            carried: vec![(
                "unit_price".to_string(),
                "last_order_unit_price".to_string(),
            )],
        }
    }
}

/// For every record, find the most recent record of the same group with a
/// strictly earlier date and attach its date and carried fields. Records
/// without a prior occurrence get nulls in the target fields.
///
/// Quadratic in the input size; callers feed it a bounded recent history.
pub fn attach_previous_occurrence(
    records: &[RawRecord],
    join: &PreviousOccurrence,
) -> Vec<RawRecord> {
    let keyed: Vec<_> = records
        .iter()
        .map(|r| (text(r, &join.group_field), date(r, &join.date_field)))
        .collect();

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut out = record.clone();
            let prior = match &keyed[i] {
                (Some(group), Some(own_date)) => keyed
                    .iter()
                    .enumerate()
                    .filter_map(|(j, (g, d))| match (g, d) {
                        (Some(g), Some(d)) if j != i && g == group && d < own_date => {
                            Some((j, *d))
                        }
                        _ => None,
                    })
                    // max_by_key keeps the last maximum; reverse to keep the first
                    .rev()
                    .max_by_key(|(_, d)| *d)
                    .map(|(j, _)| &records[j]),
                _ => None,
            };

            match prior {
                Some(prev) => {
                    out.insert(
                        join.date_target.clone(),
                        prev.get(&join.date_field).cloned().unwrap_or(Value::Null),
                    );
                    for (source, target) in &join.carried {
                        out.insert(
                            target.clone(),
                            prev.get(source).cloned().unwrap_or(Value::Null),
                        );
                    }
                }
                None => {
                    out.insert(join.date_target.clone(), Value::Null);
                    for (_, target) in &join.carried {
                        out.insert(target.clone(), Value::Null);
                    }
                }
            }
            out
        })
        .collect()
}
