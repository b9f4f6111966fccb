//! Industry valuation profiles and the archetype/quality adjustments layered on top.

use serde::{Deserialize, Serialize};

use crate::config::ValuationConfig;
use crate::types::{CompanyArchetype, QualityGrade};

/// Target valuation multiples for the comparable and DCF valuators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetMultiples {
    pub ev_ebitda: f64,
    pub pe: f64,
    pub ps: f64,
    pub pb: f64,
}

impl TargetMultiples {
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            ev_ebitda: self.ev_ebitda * factor,
            pe: self.pe * factor,
            ps: self.ps * factor,
            pb: self.pb * factor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndustryProfile {
    pub name: &'static str,
    pub max_cagr: f64,
    pub terminal_growth: f64,
    pub multiples: TargetMultiples,
    /// Multiple haircut applied to cyclical businesses
    pub cyclical_discount: f64,
}

#[allow(clippy::too_many_arguments)]
const fn profile(
    name: &'static str,
    max_cagr: f64,
    terminal_growth: f64,
    ev_ebitda: f64,
    pe: f64,
    ps: f64,
    pb: f64,
    cyclical_discount: f64,
) -> IndustryProfile {
    IndustryProfile {
        name,
        max_cagr,
        terminal_growth,
        multiples: TargetMultiples { ev_ebitda, pe, ps, pb },
        cyclical_discount,
    }
}

/// Built-in table, matched against the industry first and then the sector.
pub const INDUSTRY_PROFILES: &[IndustryProfile] = &[
    profile("Technology", 0.20, 0.030, 18.0, 25.0, 6.0, 3.5, 0.0),
    profile("Software - Application", 0.25, 0.035, 22.0, 35.0, 8.0, 4.0, 0.0),
    profile("Software - Infrastructure", 0.15, 0.025, 16.0, 22.0, 5.0, 3.0, 0.0),
    profile("Semiconductors", 0.18, 0.030, 20.0, 28.0, 4.0, 3.5, 0.10),
    profile("Healthcare", 0.12, 0.030, 15.0, 22.0, 4.0, 2.8, 0.0),
    profile("Biotechnology", 0.30, 0.035, 25.0, 45.0, 12.0, 4.0, 0.0),
    profile("Drug Manufacturers - Major", 0.08, 0.025, 12.0, 16.0, 3.0, 2.5, 0.0),
    profile("Financial Services", 0.08, 0.020, 10.0, 12.0, 2.5, 1.2, 0.0),
    profile("Banks - Regional", 0.06, 0.020, 8.0, 10.0, 2.0, 1.0, 0.0),
    profile("Fintech", 0.25, 0.030, 20.0, 28.0, 8.0, 4.0, 0.0),
    profile("Energy", 0.08, 0.015, 8.0, 15.0, 1.0, 1.5, 0.15),
    profile("Oil & Gas E&P", 0.10, 0.010, 6.0, 12.0, 0.8, 1.2, 0.20),
    profile("Materials", 0.08, 0.020, 10.0, 16.0, 1.5, 1.8, 0.12),
    profile("Basic Materials", 0.08, 0.020, 10.0, 16.0, 1.5, 1.8, 0.12),
    profile("Consumer Cyclical", 0.10, 0.025, 12.0, 18.0, 1.5, 2.0, 0.08),
    profile("Consumer Staples", 0.06, 0.025, 14.0, 20.0, 2.0, 2.5, 0.0),
    profile("Consumer Defensive", 0.06, 0.025, 14.0, 20.0, 2.0, 2.5, 0.0),
    profile("Restaurants", 0.12, 0.025, 16.0, 24.0, 2.5, 3.0, 0.0),
    profile("Utilities", 0.04, 0.020, 10.0, 16.0, 2.0, 1.4, 0.0),
    profile("Real Estate", 0.06, 0.022, 15.0, 20.0, 3.0, 1.8, 0.0),
    profile("Communication Services", 0.08, 0.025, 12.0, 18.0, 2.5, 2.0, 0.0),
    profile("Entertainment", 0.12, 0.025, 15.0, 22.0, 3.0, 2.5, 0.0),
    profile("Industrials", 0.08, 0.025, 12.0, 18.0, 1.8, 2.2, 0.0),
    profile("Aerospace & Defense", 0.06, 0.020, 11.0, 16.0, 1.5, 2.0, 0.0),
];

/// Finds the profile for an industry, falling back to the sector.
pub fn lookup_profile(sector: Option<&str>, industry: Option<&str>) -> Option<&'static IndustryProfile> {
    let find = |key: &str| {
        INDUSTRY_PROFILES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(key.trim()))
    };
    industry.and_then(find).or_else(|| sector.and_then(find))
}

fn quality_multiplier(grade: QualityGrade) -> f64 {
    match grade {
        QualityGrade::A => 1.1,
        QualityGrade::B => 1.0,
        QualityGrade::C => 0.9,
        QualityGrade::D => 0.8,
    }
}

/// Parameters after layering industry profile, sector overrides, archetype
/// policy and quality grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedParameters {
    /// Name of the matched profile, `None` when defaults were used
    pub profile: Option<String>,
    pub max_cagr: f64,
    pub terminal_growth: f64,
    pub multiples: TargetMultiples,
    /// Haircut on the per-share DCF value
    pub valuation_discount: f64,
}

impl AdjustedParameters {
    pub fn derive(
        sector: Option<&str>,
        industry: Option<&str>,
        archetype: CompanyArchetype,
        grade: QualityGrade,
        config: &ValuationConfig,
    ) -> Self {
        let matched = lookup_profile(sector, industry);

        let (mut max_cagr, mut terminal_growth, mut multiples, cyclical_discount) = match matched {
            Some(p) => (p.max_cagr, p.terminal_growth, p.multiples, p.cyclical_discount),
            None => (
                config.max_cagr_threshold,
                config.default_terminal_growth,
                TargetMultiples {
                    ev_ebitda: config.default_ev_ebitda_multiple,
                    pe: 18.0,
                    ps: 2.5,
                    pb: 2.0,
                },
                0.0,
            ),
        };

        if let Some(o) = sector.and_then(|s| config.sector_override(s)) {
            multiples.ev_ebitda = o.ev_ebitda.unwrap_or(multiples.ev_ebitda);
            multiples.pe = o.pe.unwrap_or(multiples.pe);
            multiples.ps = o.ps.unwrap_or(multiples.ps);
            multiples.pb = o.pb.unwrap_or(multiples.pb);
        }

        let mut valuation_discount = 0.0;
        match archetype {
            CompanyArchetype::GrowthProfitable => {
                max_cagr *= 1.2;
                terminal_growth += 0.005;
            }
            CompanyArchetype::Cyclical | CompanyArchetype::Commodity => {
                max_cagr *= 0.8;
                terminal_growth -= 0.005;
                multiples = multiples.scaled(1.0 - cyclical_discount);
            }
            CompanyArchetype::Turnaround => {
                max_cagr *= 1.5;
                valuation_discount = 0.20;
                multiples = multiples.scaled(0.3);
            }
            CompanyArchetype::MatureProfitable
            | CompanyArchetype::StartupLossMaking
            | CompanyArchetype::Reit
            | CompanyArchetype::Financial => {}
        }

        let q = quality_multiplier(grade);
        max_cagr *= q;
        multiples = multiples.scaled(q);

        Self {
            profile: matched.map(|p| p.name.to_string()),
            max_cagr: max_cagr.clamp(0.02, 0.30),
            terminal_growth: terminal_growth.clamp(0.01, 0.04),
            multiples,
            valuation_discount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_industry_beats_sector() {
        let p = lookup_profile(Some("Technology"), Some("Semiconductors")).unwrap();
        assert_eq!(p.name, "Semiconductors");
        let p = lookup_profile(Some("technology"), Some("Widgets")).unwrap();
        assert_eq!(p.name, "Technology");
        assert!(lookup_profile(None, None).is_none());
    }

    #[test]
    fn test_default_profile_uses_config() {
        let config = ValuationConfig::default();
        let params = AdjustedParameters::derive(
            None,
            None,
            CompanyArchetype::MatureProfitable,
            QualityGrade::B,
            &config,
        );
        assert!(params.profile.is_none());
        assert_relative_eq!(params.max_cagr, 0.15);
        assert_relative_eq!(params.terminal_growth, 0.025);
        assert_relative_eq!(params.multiples.ev_ebitda, 12.0);
    }

    #[test]
    fn test_growth_threshold_only_caps_unmatched_companies() {
        let tight = ValuationConfig {
            max_cagr_threshold: 0.10,
            ..ValuationConfig::default()
        };
        let derive = |sector: Option<&str>, config: &ValuationConfig| {
            AdjustedParameters::derive(sector, None, CompanyArchetype::MatureProfitable, QualityGrade::B, config)
                .max_cagr
        };
        assert_relative_eq!(derive(None, &tight), 0.10);
        assert_relative_eq!(
            derive(Some("Technology"), &tight),
            derive(Some("Technology"), &ValuationConfig::default())
        );
    }

    #[test]
    fn test_quality_scales_multiples() {
        let config = ValuationConfig::default();
        let params = AdjustedParameters::derive(
            None,
            None,
            CompanyArchetype::MatureProfitable,
            QualityGrade::A,
            &config,
        );
        assert_relative_eq!(params.multiples.pe, 18.0 * 1.1, epsilon = 1e-9);
        assert_relative_eq!(params.max_cagr, 0.165, epsilon = 1e-9);
    }

    #[test]
    fn test_turnaround_discounts_multiples() {
        let config = ValuationConfig::default();
        let params = AdjustedParameters::derive(
            Some("Industrials"),
            None,
            CompanyArchetype::Turnaround,
            QualityGrade::B,
            &config,
        );
        assert_relative_eq!(params.multiples.pe, 18.0 * 0.3, epsilon = 1e-9);
        assert_relative_eq!(params.valuation_discount, 0.20);
    }

    #[test]
    fn test_clamps_growth_bounds() {
        let config = ValuationConfig::default();
        let params = AdjustedParameters::derive(
            Some("Healthcare"),
            Some("Biotechnology"),
            CompanyArchetype::GrowthProfitable,
            QualityGrade::A,
            &config,
        );
        assert_relative_eq!(params.max_cagr, 0.30);
        assert_relative_eq!(params.terminal_growth, 0.04);
    }

    #[test]
    fn test_sector_override_applies() {
        let mut config = ValuationConfig::default();
        config.sector_overrides.insert(
            "Energy".to_string(),
            crate::config::MultipleOverride {
                ev_ebitda: Some(5.0),
                ..Default::default()
            },
        );
        let params = AdjustedParameters::derive(
            Some("Energy"),
            None,
            CompanyArchetype::MatureProfitable,
            QualityGrade::B,
            &config,
        );
        assert_relative_eq!(params.multiples.ev_ebitda, 5.0);
        assert_relative_eq!(params.multiples.pe, 15.0);
    }
}
