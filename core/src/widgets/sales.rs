// Monthly sales: trailing averages and year-over-year comparison
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pipeline::fields::{number, number_or_zero, text};
use crate::pipeline::{pct_change, TrailingAverages, TrailingChanges};
use crate::RawRecord;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub period: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTrend {
    pub months: Vec<MonthTotal>,
    pub averages: TrailingAverages,
    pub changes: TrailingChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthComparison {
    pub month: u32,
    pub label: String,
    pub current: f64,
    pub last_year: f64,
    pub change_pct: Option<f64>,
}

/// Parse a `YYYY-MM` period into (year, month)
fn parse_period(raw: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + (month as i64 - 1)
}

/// Monthly totals from `{period, total}` rows, oldest first.
///
/// Duplicate periods are summed and months missing between the first and last
/// period are filled with zero so windows count calendar months.
pub fn monthly_totals(records: &[RawRecord]) -> Vec<MonthTotal> {
    let mut by_month: BTreeMap<i64, f64> = BTreeMap::new();
    for record in records {
        let Some((y, m)) = text(record, "period").and_then(|p| parse_period(&p)) else {
            continue;
        };
        *by_month.entry(month_index(y, m)).or_insert(0.0) += number_or_zero(record, "total");
    }

    let (Some(&first), Some(&last)) = (by_month.keys().next(), by_month.keys().next_back()) else {
        return Vec::new();
    };

    (first..=last)
        .map(|idx| MonthTotal {
            period: format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1),
            total: by_month.get(&idx).copied().unwrap_or(0.0),
        })
        .collect()
}

/// One-element trend for the sales-by-month widget; empty input yields nothing
pub fn sales_trend(records: Vec<RawRecord>) -> Vec<SalesTrend> {
    let months = monthly_totals(&records);
    if months.is_empty() {
        return Vec::new();
    }
    let totals: Vec<Option<f64>> = months.iter().map(|m| Some(m.total)).collect();
    let averages = TrailingAverages::from_monthly(&totals);
    vec![SalesTrend {
        months,
        changes: averages.changes(),
        averages,
    }]
}

/// Pair each calendar month of the newest year with the year before.
///
/// Rows are `{period, total, year?}`; the year defaults to the period's.
pub fn year_over_year(records: Vec<RawRecord>) -> Vec<MonthComparison> {
    let mut totals: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in &records {
        let Some((period_year, month)) = text(record, "period").and_then(|p| parse_period(&p))
        else {
            continue;
        };
        let year = number(record, "year").map_or(period_year, |y| y as i32);
        *totals.entry((year, month)).or_insert(0.0) += number_or_zero(record, "total");
    }

    let Some(current_year) = totals.keys().map(|(y, _)| *y).max() else {
        return Vec::new();
    };

    (1..=12u32)
        .filter(|m| {
            totals.contains_key(&(current_year, *m)) || totals.contains_key(&(current_year - 1, *m))
        })
        .map(|m| {
            let current = totals.get(&(current_year, m)).copied().unwrap_or(0.0);
            let last_year = totals.get(&(current_year - 1, m)).copied().unwrap_or(0.0);
            MonthComparison {
                month: m,
                label: MONTH_LABELS[(m - 1) as usize].to_string(),
                current,
                last_year,
                change_pct: pct_change(current, last_year),
            }
        })
        .collect()
}
