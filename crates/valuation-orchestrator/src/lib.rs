use fundamental_valuation::{
    Classifier, ClassifierInput, ComparableValuator, DcfValuator, QualityInputs, QualityScorer,
    StartupValuator,
};
use rayon::prelude::*;
use technical_valuation::TechnicalValuator;
use valuation_core::{
    Action, AdjustedParameters, CompanyArchetype, ConfidenceLevel, ConsensusView, DataCompleteness,
    Diagnostic, DiagnosticKind, FinancialSnapshot, MethodResult, QualityAssessment, QualityGrade,
    Recommendation, RiskLevel, ValuationConfig, ValuationContext, ValuationError, Valuator,
};

pub mod synthesizer;
pub use synthesizer::SignalSynthesizer;

/// Runs classification, quality scoring, every valuation method and the
/// synthesizer for one ticker at a time.
pub struct ValuationEngine {
    config: ValuationConfig,
    classifier: Classifier,
    quality_scorer: QualityScorer,
    valuators: Vec<Box<dyn Valuator>>,
    synthesizer: SignalSynthesizer,
}

impl ValuationEngine {
    pub fn new(config: ValuationConfig) -> Self {
        let valuators: Vec<Box<dyn Valuator>> = vec![
            Box::new(DcfValuator::new()),
            Box::new(ComparableValuator::new()),
            Box::new(TechnicalValuator::new()),
            Box::new(StartupValuator::new()),
        ];

        Self {
            classifier: Classifier::new(&config),
            quality_scorer: QualityScorer::new(),
            valuators,
            synthesizer: SignalSynthesizer::new(),
            config,
        }
    }

    /// Build an engine after validating the configuration.
    pub fn try_new(config: ValuationConfig) -> Result<Self, ValuationError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Full analysis of one snapshot. Never fails; problems surface as
    /// inapplicable methods and diagnostics.
    pub fn analyze(&self, snapshot: &FinancialSnapshot) -> Recommendation {
        tracing::info!("Starting valuation for {}", snapshot.symbol);

        let outcome = self
            .classifier
            .classify(&ClassifierInput::from_snapshot(snapshot));
        let quality = self
            .quality_scorer
            .assess(&QualityInputs::from_snapshot(snapshot));
        let parameters = AdjustedParameters::derive(
            snapshot.sector(),
            snapshot.industry(),
            outcome.archetype,
            quality.grade,
            &self.config,
        );

        tracing::debug!(
            symbol = %snapshot.symbol,
            archetype = outcome.archetype.name(),
            quality_score = quality.score,
            grade = ?quality.grade,
            profile = ?parameters.profile,
            "classified and scored"
        );

        let ctx = ValuationContext {
            snapshot,
            archetype: outcome.archetype,
            quality: &quality,
            parameters: &parameters,
            config: &self.config,
        };
        let results: Vec<MethodResult> = self.valuators.iter().map(|v| v.evaluate(&ctx)).collect();

        let applicable = results.iter().filter(|r| r.applicable).count();
        if applicable == 0 {
            tracing::warn!("No valuation method applied for {}", snapshot.symbol);
        }

        self.synthesizer.synthesize(
            snapshot,
            outcome.archetype,
            &quality,
            &results,
            outcome.diagnostics,
        )
    }

    /// Analyze independent snapshots in parallel. Output order matches input order.
    pub fn analyze_batch(&self, snapshots: &[FinancialSnapshot]) -> Vec<Recommendation> {
        tracing::info!("Analyzing batch of {} snapshots", snapshots.len());
        snapshots.par_iter().map(|s| self.analyze(s)).collect()
    }

    /// Analyze the outcome of an upstream fetch. A failed fetch becomes an
    /// insufficient-data recommendation for that ticker.
    pub fn analyze_fetched<E: std::fmt::Display>(
        &self,
        symbol: &str,
        fetched: Result<FinancialSnapshot, E>,
    ) -> Recommendation {
        match fetched {
            Ok(snapshot) => self.analyze(&snapshot),
            Err(e) => {
                tracing::warn!("Snapshot fetch failed for {}: {}", symbol, e);
                insufficient_data(symbol, e.to_string())
            }
        }
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new(ValuationConfig::default())
    }
}

/// Analyze one snapshot with the given configuration.
pub fn analyze(snapshot: &FinancialSnapshot, config: &ValuationConfig) -> Recommendation {
    ValuationEngine::new(config.clone()).analyze(snapshot)
}

/// Analyze many snapshots in parallel with a shared configuration.
pub fn analyze_batch(snapshots: &[FinancialSnapshot], config: &ValuationConfig) -> Vec<Recommendation> {
    ValuationEngine::new(config.clone()).analyze_batch(snapshots)
}

/// Placeholder recommendation for a ticker whose data never arrived.
pub fn insufficient_data(symbol: &str, reason: impl Into<String>) -> Recommendation {
    Recommendation {
        symbol: symbol.to_string(),
        as_of: None,
        archetype: CompanyArchetype::MatureProfitable,
        action: Action::Monitor,
        confidence: ConfidenceLevel::Low,
        risk_level: RiskLevel::Medium,
        bullish_signals: vec![],
        bearish_signals: vec![],
        neutral_signals: vec![],
        key_risks: vec![synthesizer::RISK_LIMITED_DATA.to_string()],
        thesis: "Insufficient data for a valuation; the snapshot could not be fetched.".to_string(),
        next_steps: vec![
            "Wait for clearer fundamental signals".to_string(),
            "Seek additional data sources before acting".to_string(),
        ],
        quality: QualityAssessment {
            score: 0,
            grade: QualityGrade::D,
            completeness: DataCompleteness::Low,
            missing_penalty: 0,
            strengths: vec![],
            weaknesses: vec![],
        },
        consensus: ConsensusView {
            score: 0.0,
            action: Action::Hold,
            target_price: None,
            upside_pct: None,
        },
        method_results: vec![],
        diagnostics: vec![Diagnostic::new(
            DiagnosticKind::AggregateFailure,
            "fetch",
            reason,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_fetch_is_monitor() {
        let engine = ValuationEngine::default();
        let rec = engine.analyze_fetched::<String>("GONE", Err("timeout".to_string()));
        assert_eq!(rec.symbol, "GONE");
        assert_eq!(rec.action, Action::Monitor);
        assert_eq!(rec.confidence, ConfidenceLevel::Low);
        assert_eq!(rec.diagnostics[0].kind, DiagnosticKind::AggregateFailure);
        assert_eq!(rec.diagnostics[0].detail, "timeout");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ValuationConfig {
            tax_rate: 1.5,
            ..ValuationConfig::default()
        };
        assert!(matches!(
            ValuationEngine::try_new(config),
            Err(ValuationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_snapshot_runs_every_method() {
        let rec = analyze(&FinancialSnapshot::new("NONE"), &ValuationConfig::default());
        assert_eq!(rec.method_results.len(), 4);
        assert!(rec.method_results.iter().all(|r| !r.applicable));
        assert_eq!(rec.action, Action::Monitor);
    }
}
