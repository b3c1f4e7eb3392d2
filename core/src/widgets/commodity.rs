// Commodity price series aligned on a shared daily axis
//
// Daily reports (e.g. 50%/85% chemical lean) and weekly ones (beef heart)
// arrive at different cadences. Daily series are forward-filled across the
// days a report is missing; weekly series are interpolated between reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::pipeline::fields::{date, number};
use crate::pipeline::{forward_fill, interpolate};
use crate::RawRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityPoint {
    pub date: NaiveDate,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct CommoditySeries {
    pub date_field: String,
    /// Series reported (almost) every day; gaps are forward-filled
    pub dense: Vec<String>,
    /// Series reported sparsely; gaps are interpolated
    pub sparse: Vec<String>,
}

impl Default for CommoditySeries {
    fn default() -> Self {
        Self {
            date_field: "date".to_string(),
            dense: vec!["lean_50".to_string(), "lean_85".to_string()],
            sparse: vec!["beef_heart".to_string()],
        }
    }
}

impl CommoditySeries {
    pub fn process(&self, records: Vec<RawRecord>) -> Vec<CommodityPoint> {
        // Later records for the same day overwrite earlier ones per field.
        let mut by_day: BTreeMap<NaiveDate, BTreeMap<&str, f64>> = BTreeMap::new();
        for record in &records {
            let Some(day) = date(record, &self.date_field) else {
                continue;
            };
            for field in self.dense.iter().chain(&self.sparse) {
                if let Some(v) = number(record, field) {
                    by_day.entry(day).or_default().insert(field.as_str(), v);
                }
            }
        }

        let axis: BTreeSet<NaiveDate> = by_day.keys().copied().collect();
        if axis.is_empty() {
            return Vec::new();
        }

        let column = |field: &str| -> Vec<Option<f64>> {
            axis.iter()
                .map(|d| by_day.get(d).and_then(|vals| vals.get(field).copied()))
                .collect()
        };

        let mut filled: Vec<(&str, Vec<Option<f64>>)> = Vec::new();
        for field in &self.dense {
            filled.push((field.as_str(), forward_fill(&column(field))));
        }
        for field in &self.sparse {
            filled.push((field.as_str(), interpolate(&column(field))));
        }

        axis.iter()
            .enumerate()
            .map(|(i, d)| CommodityPoint {
                date: *d,
                values: filled
                    .iter()
                    .map(|(name, series)| (name.to_string(), series[i]))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(v: Value) -> Vec<RawRecord> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn aligns_daily_and_weekly_series() {
        let input = rows(json!([
            {"date": "06/03/2024", "lean_50": 1.0, "lean_85": 2.0},
            {"date": "06/03/2024", "beef_heart": 0.40},
            {"date": "06/04/2024", "lean_50": 1.1},
            {"date": "06/05/2024", "lean_85": 2.2},
            {"date": "06/06/2024", "beef_heart": 0.70},
        ]));
        let out = CommoditySeries::default().process(input);
        assert_eq!(out.len(), 4);

        assert_eq!(out[1].values["lean_85"], Some(2.0));
        assert_eq!(out[2].values["lean_50"], Some(1.1));
        let heart: Vec<f64> = out.iter().map(|p| p.values["beef_heart"].unwrap()).collect();
        assert!((heart[1] - 0.5).abs() < 1e-9);
        assert!((heart[2] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn points_serialize_with_iso_dates() {
        let input = rows(json!([{"date": "06/03/2024", "lean_50": 1.25}]));
        let out = CommoditySeries::default().process(input);
        let encoded = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(encoded["date"], json!("2024-06-03"));
        assert_eq!(encoded["values"]["lean_50"], json!(1.25));
        assert_eq!(encoded["values"]["beef_heart"], Value::Null);

        let decoded: CommodityPoint = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, out[0]);
    }

    #[test]
    fn undated_rows_are_skipped() {
        let input = rows(json!([{"lean_50": 1.0}]));
        assert!(CommoditySeries::default().process(input).is_empty());
    }
}
