// Trailing N-month averages and their percent changes
use serde::{Deserialize, Serialize};

/// Integer-truncated averages over the newest 3, 6, 9 and 12 months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingAverages {
    pub avg3: i64,
    pub avg6: i64,
    pub avg9: i64,
    pub avg12: i64,
}

/// Percent changes between adjacent windows; `None` means "no change signal"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingChanges {
    pub avg3_vs_avg6: Option<f64>,
    pub avg6_vs_avg9: Option<f64>,
    pub avg9_vs_avg12: Option<f64>,
}

impl TrailingAverages {
    /// Each window is the newest N months of `monthly`, which is ordered
    /// oldest to newest; nulls count as zero.
    ///
    /// A window longer than the available history averages what exists, so
    /// a young series is not dragged toward zero.
    pub fn from_monthly(monthly: &[Option<f64>]) -> Self {
        let values: Vec<f64> = monthly.iter().map(|v| v.unwrap_or(0.0)).collect();
        Self {
            avg3: window_average(&values, 3),
            avg6: window_average(&values, 6),
            avg9: window_average(&values, 9),
            avg12: window_average(&values, 12),
        }
    }

    pub fn changes(&self) -> TrailingChanges {
        TrailingChanges {
            avg3_vs_avg6: pct_change(self.avg3 as f64, self.avg6 as f64),
            avg6_vs_avg9: pct_change(self.avg6 as f64, self.avg9 as f64),
            avg9_vs_avg12: pct_change(self.avg9 as f64, self.avg12 as f64),
        }
    }
}

fn window_average(values: &[f64], months: usize) -> i64 {
    let take = months.min(values.len());
    if take == 0 {
        return 0;
    }
    let sum: f64 = values[values.len() - take..].iter().sum();
    (sum / take as f64).trunc() as i64
}

/// `(current - baseline) / baseline * 100`, or `None` when the baseline is zero
pub fn pct_change(current: f64, baseline: f64) -> Option<f64> {
    if baseline == 0.0 || !baseline.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - baseline) / baseline * 100.0)
}
