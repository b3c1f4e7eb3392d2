// Vendor include/exclude and merge policies
//
// Two near-identical due-in reports treat "hidden" vendors differently: one
// drops them, the other collapses their lines into one row per order. Both
// behaviours are kept as explicit variants.

use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};

use super::fields::{composite_key, number, text};
use crate::RawRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VendorPolicy {
    #[default]
    KeepAll,
    /// Drop records whose vendor code is listed
    Exclude(BTreeSet<String>),
    /// Collapse records of listed vendors into one row per (vendor, order)
    Merge(BTreeSet<String>),
}

impl VendorPolicy {
    pub fn exclude<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        VendorPolicy::Exclude(codes.into_iter().map(Into::into).collect())
    }

    pub fn merge<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        VendorPolicy::Merge(codes.into_iter().map(Into::into).collect())
    }
}

/// Column names the policy works with
#[derive(Debug, Clone)]
pub struct VendorFields {
    pub vendor: String,
    pub order: String,
    pub description: String,
    pub price: String,
}

impl Default for VendorFields {
    fn default() -> Self {
        Self {
            vendor: "vend_code".to_string(),
            order: "po_number".to_string(),
            description: "part_desc".to_string(),
            price: "unit_price".to_string(),
        }
    }
}

pub const GROUPED_FLAG: &str = "grouped";
pub const MERGED_COUNT: &str = "merged_count";

pub fn apply_vendor_policy(
    records: Vec<RawRecord>,
    policy: &VendorPolicy,
    fields: &VendorFields,
) -> Vec<RawRecord> {
    match policy {
        VendorPolicy::KeepAll => records,
        VendorPolicy::Exclude(codes) => records
            .into_iter()
            .filter(|r| !listed(r, codes, fields))
            .collect(),
        VendorPolicy::Merge(codes) => merge_listed(records, codes, fields),
    }
}

fn listed(record: &RawRecord, codes: &BTreeSet<String>, fields: &VendorFields) -> bool {
    text(record, &fields.vendor).is_some_and(|code| codes.contains(&code))
}

struct MergeGroup {
    position: usize,
    descriptions: Vec<String>,
    price_sum: f64,
    price_count: usize,
    members: usize,
}

fn merge_listed(
    records: Vec<RawRecord>,
    codes: &BTreeSet<String>,
    fields: &VendorFields,
) -> Vec<RawRecord> {
    let mut out: Vec<RawRecord> = Vec::with_capacity(records.len());
    let mut groups: HashMap<String, MergeGroup> = HashMap::new();

    for mut record in records {
        if !listed(&record, codes, fields) {
            record.insert(GROUPED_FLAG.to_string(), Value::Bool(false));
            out.push(record);
            continue;
        }

        let key = composite_key(&record, &[fields.vendor.as_str(), fields.order.as_str()]);
        let description = text(&record, &fields.description);
        let price = number(&record, &fields.price);

        let group = groups.entry(key).or_insert_with(|| {
            out.push(record);
            MergeGroup {
                position: out.len() - 1,
                descriptions: Vec::new(),
                price_sum: 0.0,
                price_count: 0,
                members: 0,
            }
        });

        group.members += 1;
        if let Some(d) = description {
            if !group.descriptions.contains(&d) {
                group.descriptions.push(d);
            }
        }
        if let Some(p) = price {
            group.price_sum += p;
            group.price_count += 1;
        }
    }

    // Each group owns a fixed slot, so visiting order does not matter
    for group in groups.values() {
        let row = &mut out[group.position];
        row.insert(
            fields.description.clone(),
            Value::String(group.descriptions.join(", ")),
        );
        let avg = (group.price_count > 0).then(|| group.price_sum / group.price_count as f64);
        row.insert(fields.price.clone(), json!(avg));
        row.insert(GROUPED_FLAG.to_string(), Value::Bool(true));
        row.insert(MERGED_COUNT.to_string(), json!(group.members));
    }

    out
}
