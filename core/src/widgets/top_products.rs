// Unit sales per product, largest first
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::pipeline::{aggregate_by_key, Aggregation};
use crate::RawRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTotal {
    pub part_code: String,
    pub part_desc: Option<String>,
    pub units: f64,
}

pub fn top_products(records: Vec<RawRecord>, limit: usize) -> Vec<ProductTotal> {
    let mut totals: Vec<ProductTotal> = aggregate_by_key(
        &records,
        "part_code",
        "qty_ship_unt",
        Aggregation::Sum,
        Some("part_desc"),
    )
    .into_iter()
    .map(|row| ProductTotal {
        part_code: row.key,
        part_desc: row.label,
        units: row.value,
    })
    .collect();

    totals.sort_by(|a, b| {
        b.units
            .partial_cmp(&a.units)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.part_code.cmp(&b.part_code))
    });
    totals.truncate(limit);
    totals
}
