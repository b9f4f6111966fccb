use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

use crate::error::ValuationError;

/// Sector-level replacement for the built-in target multiples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleOverride {
    pub ev_ebitda: Option<f64>,
    pub pe: Option<f64>,
    pub ps: Option<f64>,
    pub pb: Option<f64>,
}

/// Immutable valuation settings passed into every analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    // Growth estimation
    pub default_cagr: f64,                 // 0.05
    /// Growth cap for companies with no matching industry profile. A matched
    /// profile carries its own cap, which takes precedence.
    pub max_cagr_threshold: f64,           // 0.15
    /// Series shorter than this fall back to `default_cagr`.
    pub min_data_points: usize,            // 2

    // Cost of capital
    pub risk_free_rate: f64,               // 0.045
    pub market_return: f64,                // 0.08
    pub cost_of_debt: f64,                 // 0.055
    pub tax_rate: f64,                     // 0.21
    pub default_beta: f64,                 // 1.0

    // DCF projection
    pub default_terminal_growth: f64,      // 0.025
    pub years: usize,                      // 5
    pub default_ev_ebitda_multiple: f64,   // 12.0
    pub max_ev_ebitda_multiple: f64,       // 20.0
    pub use_default_ebitda_multiple: bool,
    pub risk_adjusted_terminal_blend: bool,

    // Classification
    pub small_cap_threshold: f64,          // $5B
    pub large_cap_threshold: f64,          // $50B
    pub high_growth_threshold: f64,        // 0.15

    /// Keyed by sector name, case-insensitive
    pub sector_overrides: BTreeMap<String, MultipleOverride>,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            default_cagr: 0.05,
            max_cagr_threshold: 0.15,
            min_data_points: 2,
            risk_free_rate: 0.045,
            market_return: 0.08,
            cost_of_debt: 0.055,
            tax_rate: 0.21,
            default_beta: 1.0,
            default_terminal_growth: 0.025,
            years: 5,
            default_ev_ebitda_multiple: 12.0,
            max_ev_ebitda_multiple: 20.0,
            use_default_ebitda_multiple: false,
            risk_adjusted_terminal_blend: false,
            small_cap_threshold: 5_000_000_000.0,
            large_cap_threshold: 50_000_000_000.0,
            high_growth_threshold: 0.15,
            sector_overrides: BTreeMap::new(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ValuationError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ValuationError::InvalidConfig(format!("{key}={raw} could not be parsed"))),
        Err(_) => Ok(default),
    }
}

impl ValuationConfig {
    /// Builds a config from `VALUATION_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ValuationError> {
        let d = Self::default();
        let config = Self {
            default_cagr: env_or("VALUATION_DEFAULT_CAGR", d.default_cagr)?,
            max_cagr_threshold: env_or("VALUATION_MAX_CAGR", d.max_cagr_threshold)?,
            min_data_points: env_or("VALUATION_MIN_DATA_POINTS", d.min_data_points)?,
            risk_free_rate: env_or("VALUATION_RISK_FREE_RATE", d.risk_free_rate)?,
            market_return: env_or("VALUATION_MARKET_RETURN", d.market_return)?,
            cost_of_debt: env_or("VALUATION_COST_OF_DEBT", d.cost_of_debt)?,
            tax_rate: env_or("VALUATION_TAX_RATE", d.tax_rate)?,
            default_beta: env_or("VALUATION_DEFAULT_BETA", d.default_beta)?,
            default_terminal_growth: env_or("VALUATION_TERMINAL_GROWTH", d.default_terminal_growth)?,
            years: env_or("VALUATION_YEARS", d.years)?,
            default_ev_ebitda_multiple: env_or("VALUATION_EV_EBITDA_MULTIPLE", d.default_ev_ebitda_multiple)?,
            max_ev_ebitda_multiple: env_or("VALUATION_MAX_EV_EBITDA_MULTIPLE", d.max_ev_ebitda_multiple)?,
            use_default_ebitda_multiple: env_or("VALUATION_USE_DEFAULT_EBITDA_MULTIPLE", d.use_default_ebitda_multiple)?,
            risk_adjusted_terminal_blend: env_or("VALUATION_RISK_ADJUSTED_BLEND", d.risk_adjusted_terminal_blend)?,
            small_cap_threshold: env_or("VALUATION_SMALL_CAP_THRESHOLD", d.small_cap_threshold)?,
            large_cap_threshold: env_or("VALUATION_LARGE_CAP_THRESHOLD", d.large_cap_threshold)?,
            high_growth_threshold: env_or("VALUATION_HIGH_GROWTH_THRESHOLD", d.high_growth_threshold)?,
            sector_overrides: d.sector_overrides,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValuationError> {
        let rates = [
            ("default_cagr", self.default_cagr),
            ("max_cagr_threshold", self.max_cagr_threshold),
            ("risk_free_rate", self.risk_free_rate),
            ("market_return", self.market_return),
            ("cost_of_debt", self.cost_of_debt),
            ("tax_rate", self.tax_rate),
            ("default_terminal_growth", self.default_terminal_growth),
        ];
        for (name, value) in rates {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(ValuationError::InvalidConfig(format!(
                    "{name} must be a fraction in [-1, 1], got {value}"
                )));
            }
        }
        if self.max_cagr_threshold <= 0.0 {
            return Err(ValuationError::InvalidConfig(
                "max_cagr_threshold must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(ValuationError::InvalidConfig(format!(
                "tax_rate must be in [0, 1), got {}",
                self.tax_rate
            )));
        }
        if self.years == 0 || self.years > 30 {
            return Err(ValuationError::InvalidConfig(format!(
                "years must be in 1..=30, got {}",
                self.years
            )));
        }
        if self.min_data_points < 2 {
            return Err(ValuationError::InvalidConfig(
                "min_data_points must be at least 2".to_string(),
            ));
        }
        if !(self.default_ev_ebitda_multiple > 0.0) || !(self.max_ev_ebitda_multiple > 0.0) {
            return Err(ValuationError::InvalidConfig(
                "EV/EBITDA multiples must be positive".to_string(),
            ));
        }
        if !(self.default_beta > 0.0) {
            return Err(ValuationError::InvalidConfig(
                "default_beta must be positive".to_string(),
            ));
        }
        if self.small_cap_threshold > self.large_cap_threshold {
            return Err(ValuationError::InvalidConfig(
                "small_cap_threshold exceeds large_cap_threshold".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sector_override(&self, sector: &str) -> Option<&MultipleOverride> {
        self.sector_overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(sector))
            .map(|(_, o)| o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ValuationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.years, 5);
        assert!((config.default_ev_ebitda_multiple - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_zero_years() {
        let config = ValuationConfig {
            years: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValuationError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_cap_thresholds() {
        let config = ValuationConfig {
            small_cap_threshold: 100e9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sector_override_lookup_ignores_case() {
        let mut config = ValuationConfig::default();
        config.sector_overrides.insert(
            "Technology".to_string(),
            MultipleOverride {
                pe: Some(30.0),
                ..Default::default()
            },
        );
        assert_eq!(config.sector_override("technology").and_then(|o| o.pe), Some(30.0));
        assert!(config.sector_override("Energy").is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ValuationConfig = serde_json::from_str(r#"{"years": 7}"#).unwrap();
        assert_eq!(config.years, 7);
        assert!((config.tax_rate - 0.21).abs() < f64::EPSILON);
    }
}
