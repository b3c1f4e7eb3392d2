// Outstanding purchase orders, soonest promise date first
use chrono::{Local, NaiveDate};
use serde_json::json;

use crate::pipeline::fields::{composite_key, date, number, text};
use crate::pipeline::format::{currency_opt, display_date};
use crate::pipeline::{
    apply_vendor_policy, dedupe_by_key, sort_by_keys, SortKey, VendorFields, VendorPolicy,
};
use crate::{ProcessedRow, RawRecord};

use super::daily_due_in::KEY_FIELDS;

#[derive(Debug, Clone, Default)]
pub struct OutstandingOrdersPipeline {
    pub vendor_policy: VendorPolicy,
}

impl OutstandingOrdersPipeline {
    pub fn process(&self, records: Vec<RawRecord>) -> Vec<ProcessedRow> {
        self.process_at(records, Local::now().date_naive())
    }

    pub fn process_at(&self, records: Vec<RawRecord>, today: NaiveDate) -> Vec<ProcessedRow> {
        // The view joins in the last order; prefer the line that found one.
        let unique = dedupe_by_key(records, KEY_FIELDS[0], KEY_FIELDS[1], "last_order_date");
        let mut rows = apply_vendor_policy(unique, &self.vendor_policy, &VendorFields::default());
        // Promise dates arrive in mixed formats, so order on the parsed date
        // last; the sort is stable and keeps po/item order within a day.
        sort_by_keys(&mut rows, &[SortKey::asc("po_number"), SortKey::asc("item_no")]);
        rows.sort_by_key(|r| date(r, "vend_prom_date"));

        rows.iter()
            .map(|r| {
                let promised = date(r, "vend_prom_date");
                let days_until_due = promised.map(|d| (d - today).num_days());

                let mut row = ProcessedRow::new();
                row.insert("key".into(), json!(composite_key(r, &KEY_FIELDS)));
                for field in [
                    "po_number",
                    "po_status",
                    "item_no",
                    "vend_code",
                    "vend_name",
                    "part_code",
                    "part_desc",
                    "part_type",
                    "uom",
                    "date_prom_user",
                ] {
                    row.insert(field.into(), json!(text(r, field)));
                }
                row.insert("qty_ord".into(), json!(number(r, "qty_ord")));
                row.insert(
                    "recent_unit_price".into(),
                    json!(currency_opt(number(r, "recent_unit_price"))),
                );
                row.insert(
                    "last_order_unit_price".into(),
                    json!(currency_opt(number(r, "last_order_unit_price"))),
                );
                row.insert(
                    "recent_date_orderd".into(),
                    json!(date(r, "recent_date_orderd").map(display_date)),
                );
                row.insert(
                    "last_order_date".into(),
                    json!(date(r, "last_order_date").map(display_date)),
                );
                row.insert("vend_prom_date".into(), json!(promised.map(display_date)));
                row.insert("days_until_due".into(), json!(days_until_due));
                row.insert(
                    "overdue".into(),
                    json!(days_until_due.is_some_and(|d| d < 0)),
                );
                row
            })
            .collect()
    }
}
