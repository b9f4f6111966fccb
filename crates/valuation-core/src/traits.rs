use crate::config::ValuationConfig;
use crate::error::ValuationError;
use crate::profiles::AdjustedParameters;
use crate::types::{
    CompanyArchetype, Diagnostic, FinancialSnapshot, MethodResult, QualityAssessment, ValuationMethod,
};

/// Everything a valuator may read for one ticker.
#[derive(Debug, Clone, Copy)]
pub struct ValuationContext<'a> {
    pub snapshot: &'a FinancialSnapshot,
    pub archetype: CompanyArchetype,
    pub quality: &'a QualityAssessment,
    pub parameters: &'a AdjustedParameters,
    pub config: &'a ValuationConfig,
}

/// A single valuation method.
pub trait Valuator: Send + Sync {
    fn method(&self) -> ValuationMethod;

    fn is_applicable(&self, archetype: CompanyArchetype) -> bool;

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<MethodResult, ValuationError>;

    /// Runs the method and folds any error into an inapplicable result.
    fn evaluate(&self, ctx: &ValuationContext<'_>) -> MethodResult {
        let current_price = ctx.snapshot.current_price();
        if !self.is_applicable(ctx.archetype) {
            return MethodResult::inapplicable(
                self.method(),
                current_price,
                Diagnostic::info(
                    self.method().name(),
                    format!("not applicable to {} companies", ctx.archetype),
                ),
            );
        }
        match self.value(ctx) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(
                    symbol = %ctx.snapshot.symbol,
                    method = self.method().name(),
                    error = %e,
                    "valuation method inapplicable"
                );
                MethodResult::inapplicable(
                    self.method(),
                    current_price,
                    Diagnostic::new(e.kind(), self.method().name(), e.message()),
                )
            }
        }
    }
}
