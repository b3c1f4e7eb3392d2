// Pipeline module - reusable stages that turn raw rows into display rows
//
// Stages are plain functions over records. Given the same input they return
// the same output; the only stateful pieces are `ChangeTracker` and
// `HighlightSet`, which the caller owns.

mod aggregate;
mod change;
mod dedup;
pub mod fields;
mod fill;
pub mod format;
mod join;
mod sort;
mod trailing;
mod vendor;
mod window;

pub use aggregate::{aggregate_by_key, AggregateRow, Aggregation};
pub use change::{ChangeBatch, ChangeNotifier, ChangeTracker, HighlightSet};
pub use dedup::dedupe_by_key;
pub use fill::{forward_fill, interpolate};
pub use join::{attach_previous_occurrence, PreviousOccurrence};
pub use sort::{compare_values, sort_by_keys, SortKey};
pub use trailing::{pct_change, TrailingAverages, TrailingChanges};
pub use vendor::{apply_vendor_policy, VendorFields, VendorPolicy, GROUPED_FLAG, MERGED_COUNT};
pub use window::{filter_due, within_trailing_days, DueWindow};
