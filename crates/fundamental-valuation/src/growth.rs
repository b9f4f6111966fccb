//! Bounded compound growth estimation over short, noisy annual series.
//!
//! Inputs are ordered most-recent-first, so `values[0]` is the latest period
//! and `values[n - 1]` the oldest.

use serde::{Deserialize, Serialize};
use valuation_core::stats::{mean, median, population_std_dev};
use valuation_core::{GrowthEstimate, GrowthMethod, ValuationConfig};

/// Year-over-year cap used by the averaging estimator (lower bound).
const AVERAGE_FLOOR: f64 = -0.30;
/// Year-over-year caps used by the median estimator.
pub const MEDIAN_FLOOR: f64 = -0.50;
pub const MEDIAN_CEILING: f64 = 1.00;
/// Ceiling for the all-candidates-negative branch.
const CONSERVATIVE_CEILING: f64 = 0.02;
const OUTLIER_MIN_POINTS: usize = 4;
const OUTLIER_Z: f64 = 2.0;
/// A rate needs at least two observations whatever the configuration says.
const MIN_POINTS_FLOOR: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMode {
    /// Single geometric rate over the full window
    Simple,
    /// Reduction over traditional, average and median estimates
    Robust,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthEstimator {
    pub max_rate: f64,
    pub default_rate: f64,
    pub mode: GrowthMode,
    /// Shorter series return `default_rate`.
    pub min_data_points: usize,
}

impl GrowthEstimator {
    pub fn new(max_rate: f64, default_rate: f64, mode: GrowthMode) -> Self {
        Self {
            max_rate,
            default_rate,
            mode,
            min_data_points: MIN_POINTS_FLOOR,
        }
    }

    pub fn with_min_data_points(mut self, min_data_points: usize) -> Self {
        self.min_data_points = min_data_points.max(MIN_POINTS_FLOOR);
        self
    }

    /// Robust estimator bounded by `max_rate`, defaulting as configured.
    pub fn robust(max_rate: f64, config: &ValuationConfig) -> Self {
        Self::new(max_rate, config.default_cagr, GrowthMode::Robust)
            .with_min_data_points(config.min_data_points)
    }

    pub fn estimate(&self, values: &[f64]) -> GrowthEstimate {
        if values.len() < self.min_data_points.max(MIN_POINTS_FLOOR) {
            return GrowthEstimate::new(self.default_rate, GrowthMethod::Default);
        }
        match self.mode {
            GrowthMode::Simple => self.simple(values),
            GrowthMode::Robust => self.robust_estimate(values),
        }
    }

    fn simple(&self, values: &[f64]) -> GrowthEstimate {
        match geometric_rate(values) {
            Some(rate) => GrowthEstimate::new(rate.min(self.max_rate), GrowthMethod::Simple),
            None => GrowthEstimate::new(self.default_rate, GrowthMethod::Default),
        }
    }

    fn robust_estimate(&self, values: &[f64]) -> GrowthEstimate {
        let (traditional, outlier_adjusted) = traditional_cagr(values, self.max_rate, self.default_rate);
        let average = average_cagr(values, self.default_rate);
        let median_rate = median_cagr(values, self.default_rate);

        let candidates: Vec<(f64, GrowthMethod)> = [
            (traditional, GrowthMethod::Traditional),
            (average, GrowthMethod::Average),
            (median_rate, GrowthMethod::Median),
        ]
        .into_iter()
        .filter(|(rate, _)| rate.is_finite() && *rate >= 0.0)
        .collect();

        if candidates.is_empty() {
            return GrowthEstimate::new(
                self.default_rate.min(CONSERVATIVE_CEILING),
                GrowthMethod::ConservativeFallback,
            );
        }

        let rates: Vec<f64> = candidates.iter().map(|(r, _)| *r).collect();
        let chosen = median(&rates).unwrap_or(self.default_rate);
        let method = match candidates.len() {
            2 => GrowthMethod::Blended,
            _ => {
                let mut sorted = candidates.clone();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
                sorted[sorted.len() / 2].1
            }
        };

        GrowthEstimate {
            rate: chosen.min(self.max_rate),
            method,
            outlier_adjusted: outlier_adjusted && method == GrowthMethod::Traditional,
        }
    }
}

/// Geometric rate from the oldest to the latest value. `None` unless both
/// endpoints are positive.
pub fn geometric_rate(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let latest = values[0];
    let oldest = values[values.len() - 1];
    if latest <= 0.0 || oldest <= 0.0 {
        return None;
    }
    let periods = (values.len() - 1) as f64;
    Some((latest / oldest).powf(1.0 / periods) - 1.0)
}

/// Geometric CAGR with a single low-outlier exclusion.
///
/// Returns the rate and whether the outlier-adjusted window was used.
pub fn traditional_cagr(values: &[f64], max_rate: f64, default_rate: f64) -> (f64, bool) {
    if values.len() >= OUTLIER_MIN_POINTS {
        if let Some(adjusted) = outlier_adjusted_rate(values) {
            if adjusted <= max_rate {
                return (adjusted, true);
            }
        }
    }
    match geometric_rate(values) {
        Some(rate) => (rate.min(max_rate), false),
        None => (default_rate, false),
    }
}

fn outlier_adjusted_rate(values: &[f64]) -> Option<f64> {
    let (min_idx, min_val) = values
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))?;
    // The latest period is never treated as an outlier.
    if min_idx == 0 {
        return None;
    }
    let m = mean(values)?;
    let sd = population_std_dev(values)?;
    if min_val >= m - OUTLIER_Z * sd {
        return None;
    }
    let adjusted: Vec<f64> = values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != min_idx)
        .map(|(_, v)| *v)
        .collect();
    geometric_rate(&adjusted)
}

/// Year-over-year rates from oldest to latest, skipping periods whose
/// earlier value is not positive.
pub fn yoy_rates(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .rev()
        .filter(|w| w[1] > 0.0)
        .map(|w| w[0] / w[1] - 1.0)
        .collect()
}

/// YoY rates clamped to the median estimator's band.
pub fn capped_yoy_rates(values: &[f64]) -> Vec<f64> {
    yoy_rates(values)
        .into_iter()
        .map(|r| r.clamp(MEDIAN_FLOOR, MEDIAN_CEILING))
        .collect()
}

/// Mean of YoY rates, each capped to `[-0.30, default_rate]`.
pub fn average_cagr(values: &[f64], default_rate: f64) -> f64 {
    let capped: Vec<f64> = yoy_rates(values)
        .into_iter()
        .map(|r| r.max(AVERAGE_FLOOR).min(default_rate))
        .collect();
    mean(&capped).unwrap_or(default_rate)
}

/// Median of YoY rates, each capped to `[-0.50, 1.00]`.
pub fn median_cagr(values: &[f64], default_rate: f64) -> f64 {
    median(&capped_yoy_rates(values)).unwrap_or(default_rate)
}
