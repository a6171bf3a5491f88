//! Descriptive statistics over a raw numeric distribution.
//!
//! Conventions are fixed so reports are reproducible: population standard
//! deviation (divisor `n`) and inclusive linear-interpolation quantiles
//! (rank `p * (n - 1)`).

use serde::Serialize;

/// The seven descriptive statistics of a non-empty distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
}

/// Summary of one distribution; an empty input is `NoData`, never zeros.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryStats {
    NoData,
    Computed(Stats),
}

impl SummaryStats {
    pub fn stats(&self) -> Option<&Stats> {
        match self {
            Self::NoData => None,
            Self::Computed(stats) => Some(stats),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

pub fn summarize(values: &[f64]) -> SummaryStats {
    if values.is_empty() {
        return SummaryStats::NoData;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    SummaryStats::Computed(Stats {
        mean,
        median: quantile_sorted(&sorted, 0.5),
        std: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        q25: quantile_sorted(&sorted, 0.25),
        q75: quantile_sorted(&sorted, 0.75),
    })
}

/// Inclusive linear-interpolation quantile of an ascending, non-empty slice.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}
