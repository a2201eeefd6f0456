//! Read-only summaries over a [`View`]: per-state and per-month means, the
//! district ranking and the headline metrics.
//!
//! Empty views give empty vectors and `None` means; no NaN leaves this module.

use chrono::NaiveDate;
use serde::Serialize;
use std::{cmp::Ordering, collections::BTreeMap};

use crate::filter::View;

/// Number of districts in the priority list unless asked otherwise.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMean {
    pub state: String,
    pub mean_stress_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthMean {
    pub month: NaiveDate,
    pub mean_stress_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDistrict {
    pub district: String,
    pub state: String,
    pub total_stress_index: Option<f64>,
}

/// The four headline numbers of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub rows: usize,
    pub avg_demo_ratio: Option<f64>,
    pub avg_bio_ratio: Option<f64>,
    pub high_risk_count: usize,
    pub total_enrolments: i64,
}

/// Mean stress index per state, ordered by state name.
pub fn by_state(view: &View<'_>) -> Vec<StateMean> {
    let mut groups: BTreeMap<&str, Mean> = BTreeMap::new();
    for row in view.rows() {
        groups.entry(row.state()).or_default().push(row.stress_index());
    }
    groups
        .into_iter()
        .filter_map(|(state, mean)| {
            mean.value().map(|m| StateMean {
                state: state.to_string(),
                mean_stress_index: m,
            })
        })
        .collect()
}

/// Mean stress index per month, ascending. Rows without a month are skipped.
pub fn by_month(view: &View<'_>) -> Vec<MonthMean> {
    let mut groups: BTreeMap<NaiveDate, Mean> = BTreeMap::new();
    for row in view.rows() {
        if let Some(month) = row.month() {
            groups.entry(month).or_default().push(row.stress_index());
        }
    }
    groups
        .into_iter()
        .filter_map(|(month, mean)| {
            mean.value().map(|m| MonthMean {
                month,
                mean_stress_index: m,
            })
        })
        .collect()
}

/// Highest-index rows first; equal indices keep view order and missing
/// indices go last.
pub fn top_districts(view: &View<'_>, n: usize) -> Vec<RankedDistrict> {
    let mut rows: Vec<_> = view.rows().collect();
    // sort_by is stable
    rows.sort_by(|a, b| match (a.stress_index(), b.stress_index()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.into_iter()
        .take(n)
        .map(|row| RankedDistrict {
            district: row.district().to_string(),
            state: row.state().to_string(),
            total_stress_index: row.stress_index(),
        })
        .collect()
}

pub fn metrics(view: &View<'_>) -> Metrics {
    let mut demo = Mean::default();
    let mut bio = Mean::default();
    let mut out = Metrics::default();
    for row in view.rows() {
        out.rows += 1;
        demo.push(row.demo_ratio());
        bio.push(row.bio_ratio());
        if row.is_high_stress() {
            out.high_risk_count += 1;
        }
        out.total_enrolments += row.enrolments().unwrap_or(0);
    }
    out.avg_demo_ratio = demo.value();
    out.avg_bio_ratio = bio.value();
    out
}
