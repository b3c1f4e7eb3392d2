// Recency window filters
use chrono::{Duration, NaiveDate};

use super::fields::date;
use crate::RawRecord;

/// "Ordered in the last N days and due on a specific relative day"
#[derive(Debug, Clone)]
pub struct DueWindow {
    pub order_date_field: String,
    pub trailing_days: i64,
    pub due_date_field: String,
    /// Offset from today of the due date to keep; -1 is yesterday
    pub due_offset_days: i64,
}

impl DueWindow {
    /// Lines ordered within 90 days whose promise date was yesterday
    pub fn due_yesterday() -> Self {
        Self {
            order_date_field: "date_orderd".to_string(),
            trailing_days: 90,
            due_date_field: "vend_prom_date".to_string(),
            due_offset_days: -1,
        }
    }
}

/// Records whose date lies in `[today - days, today]`
pub fn within_trailing_days(
    records: &[RawRecord],
    field: &str,
    days: i64,
    today: NaiveDate,
) -> Vec<RawRecord> {
    let start = today - Duration::days(days.max(0));
    records
        .iter()
        .filter(|r| date(r, field).is_some_and(|d| d >= start && d <= today))
        .cloned()
        .collect()
}

/// Apply both halves of a [`DueWindow`]
pub fn filter_due(records: &[RawRecord], window: &DueWindow, today: NaiveDate) -> Vec<RawRecord> {
    let due_day = today + Duration::days(window.due_offset_days);
    within_trailing_days(
        records,
        &window.order_date_field,
        window.trailing_days,
        today,
    )
    .into_iter()
    .filter(|r| date(r, &window.due_date_field) == Some(due_day))
    .collect()
}
