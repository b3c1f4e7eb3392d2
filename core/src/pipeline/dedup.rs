// Deduplicate records by a composite key
use std::collections::HashMap;

use super::fields::{composite_key, is_populated};
use crate::RawRecord;

/// Keep one record per `(primary, secondary)` key.
///
/// Among duplicates, the first record carrying a populated `terminal` field
/// wins (e.g. the line that already has a received date); otherwise the first
/// one seen. Output order is the order in which keys were first seen.
pub fn dedupe_by_key(
    records: Vec<RawRecord>,
    primary: &str,
    secondary: &str,
    terminal: &str,
) -> Vec<RawRecord> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<RawRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = composite_key(&record, &[primary, secondary]);
        match positions.get(&key) {
            Some(&idx) => {
                if !is_populated(&out[idx], terminal) && is_populated(&record, terminal) {
                    out[idx] = record;
                }
            }
            None => {
                positions.insert(key, out.len());
                out.push(record);
            }
        }
    }

    out
}
