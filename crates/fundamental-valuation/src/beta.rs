//! Beta fallback chain: vendor -> regression -> sector table -> company
//! characteristics -> configured default.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use valuation_core::stats::{covariance, mean, pct_returns, population_std_dev, sample_std_dev};
use valuation_core::{BetaSource, FinancialSnapshot, PriceBar, ValuationConfig};

const MIN_VALID_BETA: f64 = 0.1;
const MAX_VALID_BETA: f64 = 3.0;
const MIN_REGRESSION_POINTS: usize = 50;
const MIN_R_SQUARED: f64 = 0.1;

const SECTOR_BETAS: &[(&str, f64)] = &[
    ("Technology", 1.3),
    ("Healthcare", 1.0),
    ("Financial Services", 1.2),
    ("Consumer Cyclical", 1.2),
    ("Consumer Defensive", 0.8),
    ("Industrials", 1.1),
    ("Energy", 1.3),
    ("Materials", 1.2),
    ("Basic Materials", 1.2),
    ("Utilities", 0.6),
    ("Real Estate", 0.8),
    ("Communication Services", 1.1),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaEstimate {
    pub value: f64,
    pub source: BetaSource,
}

fn is_valid(beta: f64) -> bool {
    beta.is_finite() && (MIN_VALID_BETA..=MAX_VALID_BETA).contains(&beta)
}

pub fn resolve_beta(snapshot: &FinancialSnapshot, config: &ValuationConfig) -> BetaEstimate {
    if let Some(beta) = snapshot.market.beta.filter(|b| is_valid(*b)) {
        return BetaEstimate { value: beta, source: BetaSource::Vendor };
    }
    if let Some(beta) = regression_beta(&snapshot.price_history, &snapshot.benchmark_history) {
        return BetaEstimate { value: beta, source: BetaSource::Regression };
    }
    if let Some(beta) = snapshot.sector().and_then(sector_beta) {
        return BetaEstimate { value: beta, source: BetaSource::Sector };
    }
    if let Some(beta) = characteristics_beta(snapshot) {
        return BetaEstimate { value: beta, source: BetaSource::Characteristics };
    }
    tracing::warn!(symbol = %snapshot.symbol, "no beta source available, using default");
    BetaEstimate { value: config.default_beta, source: BetaSource::Default }
}

pub fn sector_beta(sector: &str) -> Option<f64> {
    SECTOR_BETAS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(sector.trim()))
        .map(|(_, beta)| *beta)
}

/// OLS slope of daily stock returns on benchmark returns over dates present
/// in both histories. Rejected when the fit explains under 10% of variance.
pub fn regression_beta(stock: &[PriceBar], benchmark: &[PriceBar]) -> Option<f64> {
    if stock.len() <= MIN_REGRESSION_POINTS || benchmark.len() <= MIN_REGRESSION_POINTS {
        return None;
    }
    let bench_by_day: BTreeMap<NaiveDate, f64> = benchmark
        .iter()
        .map(|b| (b.timestamp.date_naive(), b.close))
        .collect();
    let (stock_closes, bench_closes): (Vec<f64>, Vec<f64>) = stock
        .iter()
        .filter_map(|b| {
            bench_by_day
                .get(&b.timestamp.date_naive())
                .map(|bench| (b.close, *bench))
        })
        .filter(|(s, m)| *s > 0.0 && *m > 0.0)
        .unzip();

    let stock_returns = pct_returns(&stock_closes);
    let bench_returns = pct_returns(&bench_closes);
    if stock_returns.len() < MIN_REGRESSION_POINTS || stock_returns.len() != bench_returns.len() {
        return None;
    }

    let cov = covariance(&stock_returns, &bench_returns)?;
    let var_bench = covariance(&bench_returns, &bench_returns)?;
    if var_bench <= f64::EPSILON {
        return None;
    }
    let beta = cov / var_bench;

    let sd_stock = sample_std_dev(&stock_returns)?;
    let sd_bench = sample_std_dev(&bench_returns)?;
    if sd_stock <= f64::EPSILON {
        return None;
    }
    let r_squared = (cov / (sd_stock * sd_bench)).powi(2);
    if r_squared < MIN_R_SQUARED || !is_valid(beta) {
        return None;
    }
    Some(beta)
}

/// Size, leverage and earnings-stability adjustments around a market beta of 1.
pub fn characteristics_beta(snapshot: &FinancialSnapshot) -> Option<f64> {
    let market_cap = snapshot.market.market_cap.filter(|c| c.is_finite() && *c > 0.0);
    let leverage = snapshot.ratios.debt_to_equity.filter(|d| d.is_finite() && *d > 0.0);
    let net_incomes = snapshot.net_income_series();
    let income_volatility = if net_incomes.len() > 1 {
        match (population_std_dev(&net_incomes), mean(&net_incomes)) {
            (Some(sd), Some(m)) if m.abs() > f64::EPSILON => Some(sd / m.abs()),
            _ => None,
        }
    } else {
        None
    };

    if market_cap.is_none() && leverage.is_none() && income_volatility.is_none() {
        return None;
    }

    let mut beta: f64 = 1.0;
    if let Some(cap) = market_cap {
        beta += match cap {
            c if c > 50e9 => -0.2,
            c if c > 10e9 => 0.0,
            c if c > 2e9 => 0.2,
            _ => 0.4,
        };
    }
    if let Some(de) = leverage {
        beta += match de {
            d if d > 1.0 => 0.3,
            d if d > 0.5 => 0.1,
            _ => -0.1,
        };
    }
    if let Some(vol) = income_volatility {
        beta += match vol {
            v if v > 1.0 => 0.2,
            v if v > 0.5 => 0.1,
            _ => -0.1,
        };
    }
    Some(beta.clamp(0.2, 2.5))
}
