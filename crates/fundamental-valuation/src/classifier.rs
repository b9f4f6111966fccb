use valuation_core::{CompanyArchetype, Diagnostic, FinancialSnapshot, ValuationConfig};

/// Attributes the classifier looks at, pulled from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClassifierInput<'a> {
    pub market_cap: Option<f64>,
    pub sector: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub net_income: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub revenue_growth: Option<f64>,
}

impl<'a> ClassifierInput<'a> {
    pub fn from_snapshot(snapshot: &'a FinancialSnapshot) -> Self {
        Self {
            market_cap: snapshot.market.market_cap.filter(|v| v.is_finite()),
            sector: snapshot.sector(),
            industry: snapshot.industry(),
            net_income: snapshot.latest_net_income(),
            free_cash_flow: snapshot.latest_fcf(),
            revenue_growth: snapshot.ratios.revenue_growth.filter(|v| v.is_finite()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub archetype: CompanyArchetype,
    pub diagnostics: Vec<Diagnostic>,
}

const COMMODITY_SECTORS: &[&str] = &["Energy", "Materials", "Basic Materials"];
const CYCLICAL_SECTORS: &[&str] = &["Energy", "Materials", "Basic Materials", "Industrials"];

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()))
        .unwrap_or(false)
}

fn sector_in(sector: Option<&str>, set: &[&str]) -> bool {
    sector
        .map(|s| set.iter().any(|candidate| candidate.eq_ignore_ascii_case(s.trim())))
        .unwrap_or(false)
}

/// Assigns exactly one archetype. First matching rule wins; never fails.
pub struct Classifier {
    small_cap_threshold: f64,
    large_cap_threshold: f64,
    high_growth_threshold: f64,
}

impl Classifier {
    pub fn new(config: &ValuationConfig) -> Self {
        Self {
            small_cap_threshold: config.small_cap_threshold,
            large_cap_threshold: config.large_cap_threshold,
            high_growth_threshold: config.high_growth_threshold,
        }
    }

    pub fn classify(&self, input: &ClassifierInput<'_>) -> ClassificationOutcome {
        let mut diagnostics = Vec::new();
        let archetype = self.classify_inner(input, &mut diagnostics);
        tracing::debug!(archetype = archetype.name(), "classified company");
        ClassificationOutcome {
            archetype,
            diagnostics,
        }
    }

    fn classify_inner(&self, input: &ClassifierInput<'_>, diagnostics: &mut Vec<Diagnostic>) -> CompanyArchetype {
        if input.sector.is_none() {
            diagnostics.push(Diagnostic::missing("classifier", "sector unavailable"));
        }

        if contains_ci(input.sector, "Real Estate") || contains_ci(input.industry, "REIT") {
            return CompanyArchetype::Reit;
        }
        if contains_ci(input.sector, "Financial") || contains_ci(input.industry, "Bank") {
            return CompanyArchetype::Financial;
        }
        if sector_in(input.sector, COMMODITY_SECTORS) || contains_ci(input.industry, "Mining") {
            return CompanyArchetype::Commodity;
        }

        let (net_income, fcf, market_cap) = match (input.net_income, input.free_cash_flow, input.market_cap) {
            (Some(ni), Some(fcf), Some(cap)) => (ni, fcf, cap),
            _ => {
                diagnostics.push(Diagnostic::missing(
                    "classifier",
                    "net income, free cash flow or market cap unavailable; assuming mature profitable",
                ));
                return CompanyArchetype::MatureProfitable;
            }
        };

        if net_income <= 0.0 && fcf <= 0.0 && market_cap < self.small_cap_threshold {
            return CompanyArchetype::StartupLossMaking;
        }
        if net_income <= 0.0 || fcf <= 0.0 {
            return CompanyArchetype::Turnaround;
        }
        if market_cap > self.large_cap_threshold {
            return CompanyArchetype::MatureProfitable;
        }
        match input.revenue_growth {
            Some(g) if g > self.high_growth_threshold => return CompanyArchetype::GrowthProfitable,
            Some(_) => {}
            None => diagnostics.push(Diagnostic::missing("classifier", "revenue growth unavailable")),
        }
        if sector_in(input.sector, CYCLICAL_SECTORS) {
            return CompanyArchetype::Cyclical;
        }
        CompanyArchetype::MatureProfitable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> Classifier {
        Classifier::new(&ValuationConfig::default())
    }

    fn profitable(cap: f64) -> ClassifierInput<'static> {
        ClassifierInput {
            market_cap: Some(cap),
            sector: Some("Technology"),
            industry: Some("Software - Application"),
            net_income: Some(1e9),
            free_cash_flow: Some(1e9),
            revenue_growth: Some(0.05),
        }
    }

    #[test]
    fn test_reit_wins_over_everything() {
        let input = ClassifierInput {
            sector: Some("Real Estate"),
            net_income: Some(-1.0),
            ..profitable(1e9)
        };
        assert_eq!(classifier().classify(&input).archetype, CompanyArchetype::Reit);

        let input = ClassifierInput {
            sector: Some("Financial Services"),
            industry: Some("REIT - Mortgage"),
            ..profitable(1e9)
        };
        assert_eq!(classifier().classify(&input).archetype, CompanyArchetype::Reit);
    }

    #[test]
    fn test_financial_and_commodity() {
        let bank = ClassifierInput {
            sector: Some("Something"),
            industry: Some("Banks - Regional"),
            ..profitable(1e9)
        };
        assert_eq!(classifier().classify(&bank).archetype, CompanyArchetype::Financial);

        let miner = ClassifierInput {
            sector: Some("Industrials"),
            industry: Some("Gold Mining"),
            ..profitable(1e9)
        };
        assert_eq!(classifier().classify(&miner).archetype, CompanyArchetype::Commodity);

        let oil = ClassifierInput {
            sector: Some("Energy"),
            ..profitable(100e9)
        };
        assert_eq!(classifier().classify(&oil).archetype, CompanyArchetype::Commodity);
    }

    #[test]
    fn test_startup_vs_turnaround() {
        let startup = ClassifierInput {
            net_income: Some(-5e6),
            free_cash_flow: Some(-80e6),
            ..profitable(2e9)
        };
        assert_eq!(classifier().classify(&startup).archetype, CompanyArchetype::StartupLossMaking);

        let large_loss = ClassifierInput {
            net_income: Some(-5e6),
            free_cash_flow: Some(-80e6),
            ..profitable(20e9)
        };
        assert_eq!(classifier().classify(&large_loss).archetype, CompanyArchetype::Turnaround);

        let fcf_negative = ClassifierInput {
            free_cash_flow: Some(-1.0),
            ..profitable(1e9)
        };
        assert_eq!(classifier().classify(&fcf_negative).archetype, CompanyArchetype::Turnaround);
    }

    #[test]
    fn test_size_then_growth_then_cyclical() {
        let mega = ClassifierInput {
            revenue_growth: Some(0.40),
            ..profitable(60e9)
        };
        assert_eq!(classifier().classify(&mega).archetype, CompanyArchetype::MatureProfitable);

        let grower = ClassifierInput {
            revenue_growth: Some(0.40),
            ..profitable(10e9)
        };
        assert_eq!(classifier().classify(&grower).archetype, CompanyArchetype::GrowthProfitable);

        let industrial = ClassifierInput {
            sector: Some("Industrials"),
            industry: Some("Machinery"),
            ..profitable(10e9)
        };
        assert_eq!(classifier().classify(&industrial).archetype, CompanyArchetype::Cyclical);

        assert_eq!(
            classifier().classify(&profitable(10e9)).archetype,
            CompanyArchetype::MatureProfitable
        );
    }

    #[test]
    fn test_missing_inputs_fail_soft() {
        let result = classifier().classify(&ClassifierInput::default());
        assert_eq!(result.archetype, CompanyArchetype::MatureProfitable);
        assert!(!result.diagnostics.is_empty());
    }

    proptest! {
        #[test]
        fn classify_is_total(
            cap in prop::option::of(-1e12..1e13_f64),
            ni in prop::option::of(-1e10..1e10_f64),
            fcf in prop::option::of(-1e10..1e10_f64),
            growth in prop::option::of(-1.0..3.0_f64),
            sector_idx in 0usize..6,
        ) {
            let sectors = [None, Some("Technology"), Some("Energy"), Some("Real Estate"), Some("Financial Services"), Some("Industrials")];
            let input = ClassifierInput {
                market_cap: cap,
                sector: sectors[sector_idx],
                industry: None,
                net_income: ni,
                free_cash_flow: fcf,
                revenue_growth: growth,
            };
            let archetype = classifier().classify(&input).archetype;
            prop_assert!(CompanyArchetype::ALL.contains(&archetype));
        }
    }
}
