use valuation_core::{
    CompanyArchetype, ConfidenceLevel, DcfDetail, Diagnostic, MethodDetail, MethodResult,
    ValuationConfig, ValuationContext, ValuationError, ValuationMethod, Valuator,
};

use crate::beta::resolve_beta;
use crate::growth::GrowthEstimator;

/// Gap kept between WACC and a clamped terminal growth rate.
const TERMINAL_SPREAD: f64 = 0.005;
/// Ratio between terminal values above which risk-adjusted blending kicks in.
const TERMINAL_DISAGREEMENT: f64 = 1.5;
const MAX_RISK_DISCOUNT: f64 = 0.80;

/// CAPM cost of equity.
pub fn cost_of_equity(risk_free: f64, beta: f64, market_return: f64) -> f64 {
    risk_free + beta * (market_return - risk_free)
}

/// Weighted average cost of capital from a debt-to-equity ratio. A missing or
/// zero ratio means an all-equity capital structure.
pub fn wacc(cost_of_equity: f64, cost_of_debt: f64, tax_rate: f64, debt_to_equity: Option<f64>) -> f64 {
    match debt_to_equity.filter(|de| de.is_finite() && *de > 0.0) {
        Some(de) => {
            let equity_weight = 1.0 / (1.0 + de);
            let debt_weight = de / (1.0 + de);
            equity_weight * cost_of_equity + debt_weight * cost_of_debt * (1.0 - tax_rate)
        }
        None => cost_of_equity,
    }
}

/// Projects `years` values forward from `base`. A negative base shrinks
/// toward zero at the same rate instead of growing more negative.
pub fn project(base: f64, growth: f64, years: usize) -> Vec<f64> {
    (1..=years as i32)
        .map(|i| {
            if base < 0.0 {
                base * (1.0 - growth).powi(i)
            } else {
                base * (1.0 + growth).powi(i)
            }
        })
        .collect()
}

pub fn present_value(cash_flows: &[f64], rate: f64) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32 + 1))
        .sum()
}

/// Terminal growth forced strictly below WACC. Returns the rate used and
/// whether it had to be clamped.
pub fn bounded_terminal_growth(terminal_growth: f64, wacc: f64, default_growth: f64) -> (f64, bool) {
    if terminal_growth >= wacc {
        (default_growth.min(wacc - TERMINAL_SPREAD), true)
    } else {
        (terminal_growth, false)
    }
}

/// Gordon growth terminal value. Undefined for non-positive final cash flow.
pub fn perpetuity_terminal(final_fcf: f64, terminal_growth: f64, wacc: f64) -> Option<f64> {
    if final_fcf <= 0.0 || terminal_growth >= wacc {
        return None;
    }
    Some(final_fcf * (1.0 + terminal_growth) / (wacc - terminal_growth))
}

/// Exit-multiple terminal value, net of debt.
pub fn ebitda_terminal(final_ebitda: f64, multiple: f64, total_debt: f64) -> Option<f64> {
    if final_ebitda <= 0.0 {
        return None;
    }
    Some(final_ebitda * multiple - total_debt)
}

/// Combines the two terminal values. A lone value is used as is.
pub fn blend_terminal(perpetuity: Option<f64>, ebitda: Option<f64>, risk_adjusted: bool) -> Option<f64> {
    match (perpetuity, ebitda) {
        (Some(pg), Some(em)) => {
            if risk_adjusted && pg > 0.0 && em > 0.0 {
                if pg / em > TERMINAL_DISAGREEMENT {
                    return Some(0.4 * pg + 0.6 * em);
                }
                if em / pg > TERMINAL_DISAGREEMENT {
                    return Some(0.6 * pg + 0.4 * em);
                }
            }
            Some((pg + em) / 2.0)
        }
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Confidence from how much of enterprise value sits in the terminal value.
pub fn terminal_confidence(terminal_ratio: f64) -> ConfidenceLevel {
    if terminal_ratio > 0.9 {
        ConfidenceLevel::Low
    } else if terminal_ratio > 0.8 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::High
    }
}

/// Picks the exit multiple: the vendor's when it is sane and allowed,
/// otherwise the industry-adjusted default.
pub fn exit_multiple(vendor: Option<f64>, adjusted_default: f64, config: &ValuationConfig) -> f64 {
    if config.use_default_ebitda_multiple {
        return adjusted_default;
    }
    vendor
        .filter(|m| m.is_finite() && *m > 0.0 && *m <= config.max_ev_ebitda_multiple)
        .unwrap_or(adjusted_default)
}

/// Discounted cash flow valuator blending perpetuity-growth and exit-multiple
/// terminal values.
pub struct DcfValuator;

impl DcfValuator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DcfValuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Valuator for DcfValuator {
    fn method(&self) -> ValuationMethod {
        ValuationMethod::Dcf
    }

    fn is_applicable(&self, archetype: CompanyArchetype) -> bool {
        !matches!(
            archetype,
            CompanyArchetype::Financial | CompanyArchetype::StartupLossMaking
        )
    }

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<MethodResult, ValuationError> {
        let snapshot = ctx.snapshot;
        let config = ctx.config;
        let params = ctx.parameters;
        let mut diagnostics = Vec::new();

        let fcf = snapshot.fcf_series();
        let ebitda = snapshot.ebitda_series();
        if fcf.is_empty() && ebitda.is_empty() {
            return Err(ValuationError::MissingData(
                "no free cash flow or EBITDA history".to_string(),
            ));
        }
        let shares = snapshot
            .shares_outstanding()
            .ok_or_else(|| ValuationError::MissingData("shares outstanding".to_string()))?;

        let beta = resolve_beta(snapshot, config);
        diagnostics.push(Diagnostic::info("beta", format!("{:.2} from {:?}", beta.value, beta.source)));
        let ke = cost_of_equity(config.risk_free_rate, beta.value, config.market_return);
        let rate = wacc(ke, config.cost_of_debt, config.tax_rate, snapshot.ratios.debt_to_equity);
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ValuationError::InvalidAssumption(format!(
                "discount rate {rate:.4} is not positive"
            )));
        }

        let estimator = GrowthEstimator::robust(params.max_cagr, config);
        let years = config.years;

        let fcf_growth = (!fcf.is_empty()).then(|| estimator.estimate(&fcf));
        let projected_fcf = match (fcf.first(), fcf_growth) {
            (Some(&base), Some(g)) => project(base, g.rate, years),
            _ => {
                diagnostics.push(Diagnostic::missing("free_cash_flow", "no history, valuing from EBITDA only"));
                Vec::new()
            }
        };
        let pv_fcf = present_value(&projected_fcf, rate);

        let (terminal_growth, clamped) =
            bounded_terminal_growth(params.terminal_growth, rate, config.default_terminal_growth);
        if clamped {
            tracing::warn!(
                symbol = %snapshot.symbol,
                requested = params.terminal_growth,
                applied = terminal_growth,
                wacc = rate,
                "terminal growth at or above WACC, clamped"
            );
            diagnostics.push(Diagnostic::assumption(
                "terminal_growth",
                format!(
                    "{:.4} is not below WACC {:.4}; using {:.4}",
                    params.terminal_growth, rate, terminal_growth
                ),
            ));
        }

        let terminal_perpetuity = projected_fcf
            .last()
            .and_then(|&last| perpetuity_terminal(last, terminal_growth, rate));
        if terminal_perpetuity.is_none() && !projected_fcf.is_empty() {
            diagnostics.push(Diagnostic::info("terminal_perpetuity", "final free cash flow is not positive"));
        }

        let multiple = exit_multiple(snapshot.market.enterprise_to_ebitda, params.multiples.ev_ebitda, config);
        let ebitda_growth = (!ebitda.is_empty()).then(|| estimator.estimate(&ebitda));
        let terminal_ebitda = match (ebitda.first(), ebitda_growth) {
            (Some(&base), Some(g)) => project(base, g.rate, years)
                .last()
                .and_then(|&last| ebitda_terminal(last, multiple, snapshot.total_debt())),
            _ => None,
        };

        let terminal_value = blend_terminal(terminal_perpetuity, terminal_ebitda, config.risk_adjusted_terminal_blend)
            .ok_or_else(|| {
                ValuationError::InvalidAssumption(
                    "neither cash flow nor EBITDA supports a terminal value".to_string(),
                )
            })?;

        let pv_terminal = terminal_value / (1.0 + rate).powi(years as i32);
        let enterprise_value = pv_fcf + pv_terminal;
        let equity_value = enterprise_value - snapshot.total_debt();
        let terminal_ratio = if enterprise_value > 0.0 {
            pv_terminal / enterprise_value
        } else {
            1.0
        };

        let mut risk_discount = params.valuation_discount;
        if ctx.archetype == CompanyArchetype::Turnaround && pv_fcf < 0.0 && terminal_ratio > 1.0 {
            let dominance = 0.40 + ((terminal_ratio - 1.0) * 2.0).min(0.40);
            diagnostics.push(Diagnostic::info(
                "risk_discount",
                format!("terminal value is {:.0}% of EV with negative cash flows", terminal_ratio * 100.0),
            ));
            risk_discount += dominance;
        }
        let risk_discount = risk_discount.min(MAX_RISK_DISCOUNT);
        let per_share = equity_value / shares * (1.0 - risk_discount);

        tracing::debug!(
            symbol = %snapshot.symbol,
            wacc = rate,
            terminal_growth,
            fcf_growth = fcf_growth.map(|g| g.rate),
            ebitda_growth = ebitda_growth.map(|g| g.rate),
            enterprise_value,
            per_share,
            "dcf valuation"
        );

        if per_share <= 0.0 {
            diagnostics.push(Diagnostic::info("equity_value", "equity value is not positive after debt"));
        }

        let detail = DcfDetail {
            beta: beta.value,
            beta_source: beta.source,
            cost_of_equity: ke,
            wacc: rate,
            fcf_growth,
            ebitda_growth,
            terminal_growth,
            ebitda_multiple: multiple,
            projected_fcf,
            pv_fcf,
            terminal_perpetuity,
            terminal_ebitda,
            terminal_value,
            pv_terminal,
            enterprise_value,
            equity_value,
            terminal_ratio,
            risk_discount,
        };

        Ok(MethodResult::applicable(
            ValuationMethod::Dcf,
            Some(per_share),
            snapshot.current_price(),
            terminal_confidence(terminal_ratio),
            MethodDetail::Dcf(detail),
        )
        .with_diagnostics(diagnostics))
    }
}
