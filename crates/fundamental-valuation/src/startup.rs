use valuation_core::stats::{median, population_std_dev};
use valuation_core::{
    CompanyArchetype, ConfidenceLevel, Diagnostic, GrowthTier, MethodDetail, MethodResult,
    SignalStrength, StartupDetail, StartupStage, StartupVerdict, ValuationContext, ValuationError,
    ValuationMethod, Valuator,
};

use crate::growth::capped_yoy_rates;

/// Number of most recent annual revenues used for the growth median.
const GROWTH_WINDOW: usize = 4;
const MAX_REVENUE_MULTIPLE: f64 = 10.0;
/// Second-year growth is damped by this factor.
const YEAR_TWO_DAMPING: f64 = 0.8;
const HIGH_RISK_SECTORS: &[&str] = &["Biotechnology", "Energy", "Materials", "Basic Materials"];

fn sector_multiplier(sector: Option<&str>) -> f64 {
    const TABLE: &[(&str, f64)] = &[
        ("Technology", 1.2),
        ("Healthcare", 1.1),
        ("Biotechnology", 1.3),
        ("Consumer Cyclical", 0.8),
        ("Energy", 0.6),
        ("Financial Services", 0.9),
        ("Communication Services", 1.0),
        ("Industrials", 0.7),
        ("Materials", 0.6),
        ("Basic Materials", 0.6),
    ];
    sector
        .and_then(|s| TABLE.iter().find(|(name, _)| name.eq_ignore_ascii_case(s.trim())))
        .map(|(_, m)| *m)
        .unwrap_or(0.9)
}

fn tier_premium(tier: GrowthTier, growth: f64) -> f64 {
    match tier {
        GrowthTier::Exceptional if growth > 1.0 => 4.0,
        GrowthTier::Exceptional => 3.0,
        GrowthTier::Strong => 2.5,
        GrowthTier::Moderate => 2.0,
        GrowthTier::Weak => 1.5,
        GrowthTier::Declining => 1.0,
    }
}

fn stage_for(revenue: f64) -> (StartupStage, f64) {
    match revenue {
        r if r < 1e6 => (StartupStage::PreRevenue, 0.5),
        r if r < 10e6 => (StartupStage::Early, 0.7),
        r if r < 100e6 => (StartupStage::Growth, 1.0),
        _ => (StartupStage::Late, 1.2),
    }
}

/// Verdict table, checked strictly in this order.
pub fn startup_verdict(runway_years: Option<f64>, growth: f64) -> StartupVerdict {
    // Not burning cash means no runway constraint.
    let runway = runway_years.unwrap_or(f64::INFINITY);
    if runway < 0.5 {
        StartupVerdict::AvoidBankruptcyRisk
    } else if runway < 1.0 && growth < 0.20 {
        StartupVerdict::AvoidWeakRunway
    } else if runway > 3.0 && growth > 0.30 {
        StartupVerdict::SpeculativeBuy
    } else if runway > 2.0 && growth > 0.20 {
        StartupVerdict::HoldWatch
    } else if growth > 0.50 {
        StartupVerdict::HighRiskHighReward
    } else {
        StartupVerdict::AvoidUncompensatedRisk
    }
}

struct RiskAssessment {
    score: u32,
    factors: Vec<String>,
}

fn assess_risk(runway_years: Option<f64>, growth: f64, rates: &[f64], sector: Option<&str>) -> RiskAssessment {
    let mut score = 0u32;
    let mut factors = Vec::new();
    let mut add = |points: u32, text: &str| {
        score += points;
        factors.push(text.to_string());
    };

    if let Some(runway) = runway_years {
        match runway {
            r if r < 0.5 => add(40, "CRITICAL: Less than 6 months of cash runway"),
            r if r < 1.0 => add(30, "HIGH: Less than 1 year of cash runway"),
            r if r < 2.0 => add(20, "HIGH: Less than 2 years of cash runway"),
            r if r < 3.0 => add(10, "MODERATE: Less than 3 years of cash runway"),
            _ => {}
        }
    }

    match growth {
        g if g < 0.0 => add(25, "Declining revenue"),
        g if g < 0.10 => add(20, "Slow revenue growth"),
        g if g < 0.20 => add(10, "Moderate revenue growth"),
        _ => {}
    }

    if rates.len() < 2 {
        add(15, "Insufficient revenue history");
    } else if let Some(vol) = population_std_dev(rates) {
        if vol > 0.5 {
            add(15, "Highly volatile revenue growth");
        } else if vol > 0.3 {
            add(10, "Volatile revenue growth");
        }
    }

    if sector.is_some_and(|s| HIGH_RISK_SECTORS.iter().any(|h| h.eq_ignore_ascii_case(s.trim()))) {
        add(10, "High-risk sector");
    }

    RiskAssessment {
        score: score.min(100),
        factors,
    }
}

fn risk_adjustment(score: u32) -> f64 {
    match score {
        s if s > 60 => 0.5,
        s if s > 40 => 0.7,
        s if s > 20 => 0.85,
        _ => 1.0,
    }
}

fn sustainability_discount(growth: f64) -> f64 {
    if growth > 0.75 {
        0.8
    } else if growth > 0.50 {
        0.9
    } else {
        1.0
    }
}

/// Cash-runway and revenue-multiple valuation for pre-profit companies.
pub struct StartupValuator {
    revenue_multiple_base: f64,
}

impl StartupValuator {
    pub fn new() -> Self {
        Self {
            revenue_multiple_base: 2.0,
        }
    }
}

impl Default for StartupValuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Valuator for StartupValuator {
    fn method(&self) -> ValuationMethod {
        ValuationMethod::Startup
    }

    fn is_applicable(&self, archetype: CompanyArchetype) -> bool {
        archetype == CompanyArchetype::StartupLossMaking
    }

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<MethodResult, ValuationError> {
        let snapshot = ctx.snapshot;
        let mut diagnostics = Vec::new();

        let fcf = snapshot
            .latest_fcf()
            .ok_or_else(|| ValuationError::MissingData("free cash flow needed for burn rate".to_string()))?;
        let cash = snapshot
            .balance
            .total_cash
            .filter(|c| c.is_finite() && *c >= 0.0)
            .ok_or_else(|| ValuationError::MissingData("total cash needed for runway".to_string()))?;

        let quarterly_burn = (fcf < 0.0).then(|| -fcf / 4.0);
        let runway_years = quarterly_burn.map(|burn| cash / burn);

        let revenues = snapshot.revenue_series();
        let window = &revenues[..revenues.len().min(GROWTH_WINDOW)];
        let rates = capped_yoy_rates(window);
        let revenue_growth = median(&rates).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::missing("revenue", "fewer than two annual revenues, assuming flat"));
            0.0
        });

        let tier = GrowthTier::from_growth(revenue_growth);
        let risk = assess_risk(runway_years, revenue_growth, &rates, snapshot.sector());
        let revenue = revenues.first().copied().unwrap_or(0.0);
        let (stage, stage_multiplier) = stage_for(revenue);

        let revenue_multiple = (self.revenue_multiple_base
            * tier_premium(tier, revenue_growth)
            * sector_multiplier(snapshot.sector())
            * sustainability_discount(revenue_growth)
            * risk_adjustment(risk.score)
            * stage_multiplier)
            .min(MAX_REVENUE_MULTIPLE);

        let net_debt = snapshot.total_debt() - cash;
        let per_share = |rev: f64| -> Option<f64> {
            let shares = snapshot.shares_outstanding()?;
            let equity = rev * revenue_multiple - net_debt;
            (equity > 0.0).then(|| equity / shares)
        };
        let revenue_1y = revenue * (1.0 + revenue_growth);
        let revenue_2y = revenue_1y * (1.0 + YEAR_TWO_DAMPING * revenue_growth);
        let price_current_revenue = per_share(revenue);
        let price_1y = per_share(revenue_1y);
        let price_2y = per_share(revenue_2y);
        if snapshot.shares_outstanding().is_none() {
            diagnostics.push(Diagnostic::missing("shares_outstanding", "per-share values unavailable"));
        }

        let verdict = startup_verdict(runway_years, revenue_growth);
        let signal = if verdict.is_speculative() {
            SignalStrength::Buy
        } else if verdict.is_avoid() {
            SignalStrength::Sell
        } else {
            SignalStrength::Neutral
        };

        tracing::debug!(
            symbol = %snapshot.symbol,
            runway_years,
            revenue_growth,
            risk_score = risk.score,
            verdict = verdict.to_label(),
            "startup valuation"
        );

        let detail = StartupDetail {
            cash,
            quarterly_burn,
            runway_years,
            revenue_growth,
            growth_tier: tier,
            stage,
            revenue_multiple,
            risk_score: risk.score,
            risk_factors: risk.factors,
            price_current_revenue,
            price_1y,
            price_2y,
            verdict,
        };

        Ok(MethodResult::applicable(
            ValuationMethod::Startup,
            price_current_revenue,
            snapshot.current_price(),
            ConfidenceLevel::LowHighRisk,
            MethodDetail::Startup(detail),
        )
        .with_signal(signal)
        .with_diagnostics(diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use valuation_core::{
        AdjustedParameters, DataCompleteness, FinancialSnapshot, IncomeStatement, QualityAssessment,
        QualityGrade, ValuationConfig,
    };

    fn run(s: &FinancialSnapshot) -> MethodResult {
        let q = QualityAssessment {
            score: 20,
            grade: QualityGrade::D,
            completeness: DataCompleteness::Medium,
            missing_penalty: 4,
            strengths: vec![],
            weaknesses: vec![],
        };
        let config = ValuationConfig::default();
        let params = AdjustedParameters::derive(
            s.sector(),
            s.industry(),
            CompanyArchetype::StartupLossMaking,
            q.grade,
            &config,
        );
        let ctx = ValuationContext {
            snapshot: s,
            archetype: CompanyArchetype::StartupLossMaking,
            quality: &q,
            parameters: &params,
            config: &config,
        };
        StartupValuator::new().evaluate(&ctx)
    }

    fn revenues(values: &[f64]) -> Vec<IncomeStatement> {
        values
            .iter()
            .map(|&r| IncomeStatement {
                revenue: Some(r),
                net_income: Some(-30e6),
                ebitda: Some(-20e6),
            })
            .collect()
    }

    fn scenario() -> FinancialSnapshot {
        let mut s = FinancialSnapshot::new("BURN");
        s.market.market_cap = Some(2e9);
        s.market.current_price = Some(20.0);
        s.market.shares_outstanding = Some(100e6);
        s.balance.total_cash = Some(50e6);
        s.free_cash_flow = vec![-80e6];
        // 35% growth every year
        s.income = revenues(&[182.25e6, 135e6, 100e6]);
        s.classification.sector = Some("Technology".into());
        s
    }

    #[test]
    fn test_runway_and_growth() {
        let result = run(&scenario());
        let detail = result.detail.as_ref().and_then(|d| d.as_startup()).unwrap();
        assert_relative_eq!(detail.quarterly_burn.unwrap(), 20e6);
        assert_relative_eq!(detail.runway_years.unwrap(), 2.5);
        assert_relative_eq!(detail.revenue_growth, 0.35, epsilon = 1e-9);
        assert_eq!(detail.growth_tier, GrowthTier::Strong);
        assert_eq!(detail.verdict, StartupVerdict::HoldWatch);
        assert_eq!(result.signal, SignalStrength::Neutral);
        assert_eq!(result.confidence, ConfidenceLevel::LowHighRisk);
    }

    #[test]
    fn test_projection_ordering() {
        let result = run(&scenario());
        let detail = result.detail.as_ref().and_then(|d| d.as_startup()).unwrap();
        let now = detail.price_current_revenue.unwrap();
        let one = detail.price_1y.unwrap();
        let two = detail.price_2y.unwrap();
        assert!(now < one && one < two);
        assert!(detail.revenue_multiple <= MAX_REVENUE_MULTIPLE);
    }

    #[test]
    fn test_verdict_priority_order() {
        assert_eq!(startup_verdict(Some(0.4), 2.0), StartupVerdict::AvoidBankruptcyRisk);
        assert_eq!(startup_verdict(Some(0.8), 0.10), StartupVerdict::AvoidWeakRunway);
        assert_eq!(startup_verdict(Some(0.8), 0.60), StartupVerdict::HighRiskHighReward);
        assert_eq!(startup_verdict(Some(3.5), 0.40), StartupVerdict::SpeculativeBuy);
        // 3.5 years at 25% fails the speculative bar but clears hold/watch
        assert_eq!(startup_verdict(Some(3.5), 0.25), StartupVerdict::HoldWatch);
        assert_eq!(startup_verdict(Some(1.5), 0.25), StartupVerdict::AvoidUncompensatedRisk);
        assert_eq!(startup_verdict(None, 0.35), StartupVerdict::SpeculativeBuy);
    }

    #[test]
    fn test_risk_factors() {
        let mut s = scenario();
        s.balance.total_cash = Some(5e6);
        s.classification.sector = Some("Biotechnology".into());
        let result = run(&s);
        let detail = result.detail.as_ref().and_then(|d| d.as_startup()).unwrap();
        // runway 0.25: critical; growth fine; steady history; biotech sector
        assert_eq!(detail.risk_score, 50);
        assert!(detail.risk_factors[0].starts_with("CRITICAL"));
        assert_eq!(detail.verdict, StartupVerdict::AvoidBankruptcyRisk);
        assert_eq!(result.signal, SignalStrength::Sell);
    }

    #[test]
    fn test_short_history_is_flat_growth() {
        let mut s = scenario();
        s.income = revenues(&[10e6]);
        let result = run(&s);
        let detail = result.detail.as_ref().and_then(|d| d.as_startup()).unwrap();
        assert_relative_eq!(detail.revenue_growth, 0.0);
        assert_eq!(detail.growth_tier, GrowthTier::Declining);
        assert!(detail.risk_factors.iter().any(|f| f == "Insufficient revenue history"));
    }

    #[test]
    fn test_missing_cash_is_inapplicable() {
        let mut s = scenario();
        s.balance.total_cash = None;
        let result = run(&s);
        assert!(!result.applicable);
        assert!(result.predicted_price.is_none());
        assert!(result.detail.is_none());
        assert_eq!(result.diagnostics[0].kind, valuation_core::DiagnosticKind::MissingData);
    }

    #[test]
    fn test_missing_fcf_is_inapplicable() {
        let mut s = scenario();
        s.free_cash_flow.clear();
        assert!(!run(&s).applicable);
    }
}
