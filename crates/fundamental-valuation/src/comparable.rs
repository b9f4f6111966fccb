use valuation_core::stats::mean;
use valuation_core::{
    CompanyArchetype, ComparableDetail, ConfidenceLevel, Diagnostic, ImpliedPrice, MethodDetail,
    MethodResult, MultipleKind, RelativeValuation, ValuationContext, ValuationError, ValuationMethod,
    Valuator,
};

/// Best implied price must clear the current price by this factor to count
/// as undervalued (and fall below its inverse band to count as overvalued).
const UNDERVALUED_FACTOR: f64 = 1.2;
const OVERVALUED_FACTOR: f64 = 0.8;

/// Relative valuation against sector-conditioned target multiples.
pub struct ComparableValuator;

impl ComparableValuator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComparableValuator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn relative_label(best_implied: f64, current_price: f64) -> RelativeValuation {
    if best_implied >= current_price * UNDERVALUED_FACTOR {
        RelativeValuation::Undervalued
    } else if best_implied <= current_price * OVERVALUED_FACTOR {
        RelativeValuation::Overvalued
    } else {
        RelativeValuation::Fair
    }
}

impl Valuator for ComparableValuator {
    fn method(&self) -> ValuationMethod {
        ValuationMethod::Comparable
    }

    fn is_applicable(&self, archetype: CompanyArchetype) -> bool {
        archetype != CompanyArchetype::StartupLossMaking
    }

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<MethodResult, ValuationError> {
        let snapshot = ctx.snapshot;
        let multiples = ctx.parameters.multiples;
        let shares = snapshot
            .shares_outstanding()
            .ok_or_else(|| ValuationError::MissingData("shares outstanding".to_string()))?;
        let mut diagnostics = Vec::new();
        let mut implied_prices = Vec::new();

        let mut push = |kind: MultipleKind, per_share: Option<f64>, target: f64| match per_share {
            Some(base) if base > 0.0 && base.is_finite() => implied_prices.push(ImpliedPrice {
                multiple: kind,
                target_multiple: target,
                price: base * target,
            }),
            _ => diagnostics.push(Diagnostic::missing(
                kind.name(),
                "base metric unavailable or not positive",
            )),
        };

        push(
            MultipleKind::PriceEarnings,
            snapshot.latest_net_income().map(|ni| ni / shares),
            multiples.pe,
        );
        push(
            MultipleKind::PriceSales,
            snapshot.latest_revenue().map(|rev| rev / shares),
            multiples.ps,
        );
        push(
            MultipleKind::PriceBook,
            snapshot.balance.book_value_per_share,
            multiples.pb,
        );
        // EV/EBITDA is converted to equity per share through net debt.
        let net_debt = snapshot.total_debt() - snapshot.total_cash();
        push(
            MultipleKind::EvEbitda,
            snapshot
                .latest_ebitda()
                .filter(|e| *e > 0.0)
                .map(|e| (e * multiples.ev_ebitda - net_debt) / shares / multiples.ev_ebitda),
            multiples.ev_ebitda,
        );

        let prices: Vec<f64> = implied_prices.iter().map(|p| p.price).collect();
        let average = mean(&prices).ok_or_else(|| {
            ValuationError::MissingData("no multiple could be applied".to_string())
        })?;

        let current = snapshot.current_price();
        let mut detail = ComparableDetail {
            implied_prices,
            relative: RelativeValuation::Fair,
        };
        if let (Some(best), Some(price)) = (detail.best_implied(), current) {
            detail.relative = relative_label(best, price);
        }

        let confidence = match detail.implied_prices.len() {
            n if n >= 3 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        };

        tracing::debug!(
            symbol = %snapshot.symbol,
            multiples = detail.implied_prices.len(),
            average,
            relative = ?detail.relative,
            "comparable valuation"
        );

        Ok(MethodResult::applicable(
            ValuationMethod::Comparable,
            Some(average),
            current,
            confidence,
            MethodDetail::Comparable(detail),
        )
        .with_diagnostics(diagnostics))
    }
}
