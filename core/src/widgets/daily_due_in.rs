/// Daily due-in report
///
/// Purchase-order lines ordered in the last 90 days whose vendor promise date
/// was yesterday, with the previous order of the same part alongside for
/// price comparison. Lines that move into a received/closed status between
/// fetches are highlighted for a while and trigger one notification per batch.
/// Mounted as a widget pipeline, the rows are re-projected when a highlight
/// expires, with or without a new fetch.
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::pipeline::fields::{composite_key, date, is_populated, number, text};
use crate::pipeline::format::{currency, currency_opt, display_date, percent};
use crate::pipeline::{
    apply_vendor_policy, attach_previous_occurrence, dedupe_by_key, filter_due, pct_change,
    sort_by_keys, within_trailing_days, ChangeNotifier, ChangeTracker, DueWindow, HighlightSet,
    PreviousOccurrence, SortKey, VendorFields, VendorPolicy, GROUPED_FLAG,
};
use crate::widget::RowPipeline;
use crate::{ProcessedRow, RawRecord};

pub const KEY_FIELDS: [&str; 2] = ["po_number", "item_no"];

#[derive(Debug, Clone)]
pub struct DailyDueInConfig {
    pub window: DueWindow,
    pub vendor_policy: VendorPolicy,
    pub vendor_fields: VendorFields,
    pub status_field: String,
    /// Statuses after which a line is not expected to change
    pub terminal_statuses: Vec<String>,
    pub highlight_hold: Duration,
}

impl Default for DailyDueInConfig {
    fn default() -> Self {
        Self {
            window: DueWindow::due_yesterday(),
            vendor_policy: VendorPolicy::KeepAll,
            vendor_fields: VendorFields::default(),
            status_field: "po_status".to_string(),
            terminal_statuses: vec!["V".to_string(), "C".to_string()],
            highlight_hold: Duration::from_secs(30),
        }
    }
}

pub struct DailyDueInPipeline {
    config: DailyDueInConfig,
    tracker: ChangeTracker,
    highlights: HighlightSet,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    /// Filtered and sorted rows of the last batch, before formatting
    last_rows: Vec<RawRecord>,
}

impl DailyDueInPipeline {
    pub fn new(config: DailyDueInConfig) -> Self {
        let tracker = ChangeTracker::new(config.terminal_statuses.iter().cloned());
        let highlights = HighlightSet::new(config.highlight_hold);
        Self {
            config,
            tracker,
            highlights,
            notifier: None,
            last_rows: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn highlighted(&self, now: Instant) -> Vec<String> {
        self.highlights.active(now)
    }

    /// Process a fetch against the local calendar and clock
    pub fn process(&mut self, records: Vec<RawRecord>) -> Vec<ProcessedRow> {
        self.process_at(records, Local::now().date_naive(), Instant::now())
    }

    pub fn process_at(
        &mut self,
        records: Vec<RawRecord>,
        today: NaiveDate,
        now: Instant,
    ) -> Vec<ProcessedRow> {
        let cfg = &self.config;
        let recent = within_trailing_days(
            &records,
            &cfg.window.order_date_field,
            cfg.window.trailing_days,
            today,
        );
        let unique = dedupe_by_key(recent, KEY_FIELDS[0], KEY_FIELDS[1], "date_rcv");
        let joined = attach_previous_occurrence(&unique, &PreviousOccurrence::last_order());
        let due = filter_due(&joined, &cfg.window, today);
        let mut rows = apply_vendor_policy(due, &cfg.vendor_policy, &cfg.vendor_fields);
        sort_by_keys(
            &mut rows,
            &[
                SortKey::asc("vend_name"),
                SortKey::asc("po_number"),
                SortKey::asc("item_no"),
            ],
        );

        let status_field = cfg.status_field.clone();
        let batch = self.tracker.observe(
            rows.iter()
                .map(|r| (composite_key(r, &KEY_FIELDS), text(r, &status_field))),
        );
        self.highlights.purge(now);
        self.highlights.mark(&batch.changed, now);
        if let Some(notifier) = &self.notifier {
            batch.notify(notifier.as_ref());
        }

        self.last_rows = rows;
        self.project(now)
    }

    /// Format the last batch with highlights as of `now`
    pub fn project(&self, now: Instant) -> Vec<ProcessedRow> {
        self.last_rows
            .iter()
            .map(|r| {
                let key = composite_key(r, &KEY_FIELDS);
                let highlighted = self.highlights.is_active(&key, now);
                format_row(r, key, &self.config.status_field, highlighted)
            })
            .collect()
    }
}

impl RowPipeline<ProcessedRow> for DailyDueInPipeline {
    fn process(&mut self, records: Vec<RawRecord>) -> Vec<ProcessedRow> {
        DailyDueInPipeline::process(self, records)
    }

    fn refresh_at(&self) -> Option<Instant> {
        self.highlights.next_expiry(Instant::now())
    }

    fn refresh(&mut self) -> Option<Vec<ProcessedRow>> {
        let now = Instant::now();
        self.highlights.purge(now);
        Some(self.project(now))
    }
}

fn format_row(record: &RawRecord, key: String, status_field: &str, highlighted: bool) -> ProcessedRow {
    let unit_price = number(record, "unit_price");
    let last_price = number(record, "last_order_unit_price");
    let (price_change, price_change_pct) = match (unit_price, last_price) {
        (Some(now), Some(before)) => (
            Some(currency(now - before)),
            pct_change(now, before).map(percent),
        ),
        _ => (None, None),
    };
    let show_date = |field: &str| date(record, field).map(display_date);

    let mut row = ProcessedRow::new();
    row.insert("key".into(), json!(key));
    for field in [
        "po_number",
        "item_no",
        "vend_code",
        "vend_name",
        "part_code",
        "part_desc",
        "part_type",
        "uom",
    ] {
        row.insert(field.into(), json!(text(record, field)));
    }
    row.insert("po_status".into(), json!(text(record, status_field)));
    row.insert("qty_ord".into(), json!(number(record, "qty_ord")));
    row.insert("qty_recvd".into(), json!(number(record, "qty_recvd")));
    row.insert("unit_price".into(), json!(currency_opt(unit_price)));
    row.insert("last_order_unit_price".into(), json!(currency_opt(last_price)));
    row.insert("price_change".into(), json!(price_change));
    row.insert("price_change_pct".into(), json!(price_change_pct));
    row.insert("date_orderd".into(), json!(show_date("date_orderd")));
    row.insert("vend_prom_date".into(), json!(show_date("vend_prom_date")));
    row.insert("last_order_date".into(), json!(show_date("last_order_date")));
    row.insert("date_rcv".into(), json!(show_date("date_rcv")));
    row.insert("received".into(), json!(is_populated(record, "date_rcv")));
    row.insert(
        GROUPED_FLAG.into(),
        record.get(GROUPED_FLAG).cloned().unwrap_or(Value::Bool(false)),
    );
    row.insert("highlighted".into(), json!(highlighted));
    row
}
