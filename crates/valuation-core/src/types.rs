use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detail::MethodDetail;

/// Daily OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Market-level quote and vendor statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub shares_outstanding: Option<f64>,
    /// Vendor-reported EV/EBITDA multiple
    pub enterprise_to_ebitda: Option<f64>,
}

/// One annual income-statement period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeStatement {
    pub ebitda: Option<f64>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSheet {
    pub total_debt: Option<f64>,
    pub total_cash: Option<f64>,
    pub book_value_per_share: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// Ratios consumed by the quality model. Growth rates, ROE and debt-to-equity are fractions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRatios {
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,
}

/// Point-in-time bundle of everything known about one ticker.
///
/// Series are ordered most-recent-first; `price_history` and
/// `benchmark_history` are chronological.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub symbol: String,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub market: MarketData,
    #[serde(default)]
    pub income: Vec<IncomeStatement>,
    #[serde(default)]
    pub free_cash_flow: Vec<f64>,
    #[serde(default)]
    pub balance: BalanceSheet,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub ratios: KeyRatios,
    #[serde(default)]
    pub price_history: Vec<PriceBar>,
    #[serde(default)]
    pub benchmark_history: Vec<PriceBar>,
}

impl FinancialSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    fn income_series(&self, field: fn(&IncomeStatement) -> Option<f64>) -> Vec<f64> {
        self.income
            .iter()
            .filter_map(field)
            .filter(|v| v.is_finite())
            .collect()
    }

    pub fn ebitda_series(&self) -> Vec<f64> {
        self.income_series(|p| p.ebitda)
    }

    pub fn revenue_series(&self) -> Vec<f64> {
        self.income_series(|p| p.revenue)
    }

    pub fn net_income_series(&self) -> Vec<f64> {
        self.income_series(|p| p.net_income)
    }

    pub fn fcf_series(&self) -> Vec<f64> {
        self.free_cash_flow
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect()
    }

    pub fn latest_net_income(&self) -> Option<f64> {
        self.net_income_series().first().copied()
    }

    pub fn latest_revenue(&self) -> Option<f64> {
        self.revenue_series().first().copied()
    }

    pub fn latest_ebitda(&self) -> Option<f64> {
        self.ebitda_series().first().copied()
    }

    pub fn latest_fcf(&self) -> Option<f64> {
        self.fcf_series().first().copied()
    }

    /// Quoted price, falling back to the last close in the price history.
    pub fn current_price(&self) -> Option<f64> {
        positive_finite(self.market.current_price)
            .or_else(|| positive_finite(self.price_history.last().map(|b| b.close)))
    }

    pub fn shares_outstanding(&self) -> Option<f64> {
        positive_finite(self.market.shares_outstanding)
    }

    pub fn sector(&self) -> Option<&str> {
        self.classification.sector.as_deref()
    }

    pub fn industry(&self) -> Option<&str> {
        self.classification.industry.as_deref()
    }

    pub fn total_debt(&self) -> f64 {
        self.balance.total_debt.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0)
    }

    pub fn total_cash(&self) -> f64 {
        self.balance.total_cash.filter(|c| c.is_finite() && *c > 0.0).unwrap_or(0.0)
    }
}

/// Keeps a value only when it is a finite, strictly positive number.
pub fn positive_finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Which estimator produced a growth rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMethod {
    Traditional,
    Average,
    Median,
    /// Median of two candidates, i.e. their mean
    Blended,
    Simple,
    Default,
    ConservativeFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub rate: f64,
    pub method: GrowthMethod,
    pub outlier_adjusted: bool,
}

impl GrowthEstimate {
    pub fn new(rate: f64, method: GrowthMethod) -> Self {
        Self {
            rate,
            method,
            outlier_adjusted: false,
        }
    }
}

/// Company archetype, the single routing key for valuation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyArchetype {
    MatureProfitable,
    GrowthProfitable,
    Cyclical,
    Turnaround,
    StartupLossMaking,
    #[serde(rename = "REIT")]
    Reit,
    Financial,
    Commodity,
}

impl CompanyArchetype {
    pub const ALL: [CompanyArchetype; 8] = [
        CompanyArchetype::MatureProfitable,
        CompanyArchetype::GrowthProfitable,
        CompanyArchetype::Cyclical,
        CompanyArchetype::Turnaround,
        CompanyArchetype::StartupLossMaking,
        CompanyArchetype::Reit,
        CompanyArchetype::Financial,
        CompanyArchetype::Commodity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CompanyArchetype::MatureProfitable => "Mature Profitable",
            CompanyArchetype::GrowthProfitable => "Growth Profitable",
            CompanyArchetype::Cyclical => "Cyclical",
            CompanyArchetype::Turnaround => "Turnaround",
            CompanyArchetype::StartupLossMaking => "Startup Loss-Making",
            CompanyArchetype::Reit => "REIT",
            CompanyArchetype::Financial => "Financial",
            CompanyArchetype::Commodity => "Commodity",
        }
    }

    pub fn is_profitable_core(&self) -> bool {
        matches!(
            self,
            CompanyArchetype::MatureProfitable | CompanyArchetype::GrowthProfitable
        )
    }
}

impl fmt::Display for CompanyArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
}

impl QualityGrade {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 80 => QualityGrade::A,
            s if s >= 60 => QualityGrade::B,
            s if s >= 40 => QualityGrade::C,
            _ => QualityGrade::D,
        }
    }

    pub fn is_investment_grade(&self) -> bool {
        matches!(self, QualityGrade::A | QualityGrade::B)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataCompleteness {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// 0..=100 after missing-data penalties
    pub score: u32,
    pub grade: QualityGrade,
    pub completeness: DataCompleteness,
    pub missing_penalty: u32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Valuation methods in canonical synthesis order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValuationMethod {
    Dcf,
    Comparable,
    Technical,
    Startup,
}

impl ValuationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ValuationMethod::Dcf => "DCF",
            ValuationMethod::Comparable => "Comparable",
            ValuationMethod::Technical => "Technical",
            ValuationMethod::Startup => "Startup",
        }
    }

    /// Weight in the consensus target price
    pub fn consensus_weight(&self) -> f64 {
        match self {
            ValuationMethod::Dcf => 0.25,
            ValuationMethod::Comparable => 0.20,
            ValuationMethod::Technical => 0.15,
            ValuationMethod::Startup => 0.40,
        }
    }
}

/// Directional signal emitted by one valuation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStrength {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl SignalStrength {
    /// Consensus score on the -2..=2 scale
    pub fn to_score(&self) -> i32 {
        match self {
            SignalStrength::StrongBuy => 2,
            SignalStrength::Buy => 1,
            SignalStrength::Neutral => 0,
            SignalStrength::Sell => -1,
            SignalStrength::StrongSell => -2,
        }
    }

    /// Bands a percentage upside into a signal.
    pub fn from_upside(upside_pct: f64) -> Self {
        match upside_pct {
            u if u > 25.0 => SignalStrength::StrongBuy,
            u if u > 10.0 => SignalStrength::Buy,
            u if u < -25.0 => SignalStrength::StrongSell,
            u if u < -10.0 => SignalStrength::Sell,
            _ => SignalStrength::Neutral,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, SignalStrength::StrongBuy | SignalStrength::Buy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, SignalStrength::StrongSell | SignalStrength::Sell)
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            SignalStrength::StrongBuy => "Strong Buy",
            SignalStrength::Buy => "Buy",
            SignalStrength::Neutral => "Neutral",
            SignalStrength::Sell => "Sell",
            SignalStrength::StrongSell => "Strong Sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    #[serde(rename = "Low - High Risk")]
    LowHighRisk,
}

impl ConfidenceLevel {
    pub fn to_label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::LowHighRisk => "Low - High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingData,
    InvalidAssumption,
    AggregateFailure,
    /// A documented fallback path was taken
    Fallback,
    Info,
}

/// Structured note explaining why a value was defaulted, clamped or skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            detail: detail.into(),
        }
    }

    pub fn missing(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::MissingData, source, detail)
    }

    pub fn assumption(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::InvalidAssumption, source, detail)
    }

    pub fn fallback(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Fallback, source, detail)
    }

    pub fn info(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, source, detail)
    }
}

/// Output of one valuation method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub method: ValuationMethod,
    pub applicable: bool,
    /// Finite and positive, or absent
    pub predicted_price: Option<f64>,
    pub current_price: Option<f64>,
    pub upside_pct: Option<f64>,
    pub confidence: ConfidenceLevel,
    pub signal: SignalStrength,
    pub diagnostics: Vec<Diagnostic>,
    pub detail: Option<MethodDetail>,
}

impl MethodResult {
    /// Result for a method that ran and formed an opinion. A non-positive or
    /// non-finite predicted price is stored as `None`.
    pub fn applicable(
        method: ValuationMethod,
        predicted_price: Option<f64>,
        current_price: Option<f64>,
        confidence: ConfidenceLevel,
        detail: MethodDetail,
    ) -> Self {
        let predicted_price = positive_finite(predicted_price);
        let current_price = positive_finite(current_price);
        let upside_pct = match (predicted_price, current_price) {
            (Some(p), Some(c)) => Some((p - c) / c * 100.0),
            _ => None,
        };
        let signal = upside_pct
            .map(SignalStrength::from_upside)
            .unwrap_or(SignalStrength::Neutral);

        Self {
            method,
            applicable: true,
            predicted_price,
            current_price,
            upside_pct,
            confidence,
            signal,
            diagnostics: Vec::new(),
            detail: Some(detail),
        }
    }

    pub fn inapplicable(method: ValuationMethod, current_price: Option<f64>, reason: Diagnostic) -> Self {
        Self {
            method,
            applicable: false,
            predicted_price: None,
            current_price: positive_finite(current_price),
            upside_pct: None,
            confidence: ConfidenceLevel::Low,
            signal: SignalStrength::Neutral,
            diagnostics: vec![reason],
            detail: None,
        }
    }

    pub fn with_signal(mut self, signal: SignalStrength) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }
}

/// Terminal recommendation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
    SpeculativeBuy,
    Avoid,
    Monitor,
}

impl Action {
    pub fn to_label(&self) -> &'static str {
        match self {
            Action::StrongBuy => "STRONG_BUY",
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
            Action::StrongSell => "STRONG_SELL",
            Action::SpeculativeBuy => "SPECULATIVE_BUY",
            Action::Avoid => "AVOID",
            Action::Monitor => "MONITOR",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Weighted view across every priced method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusView {
    /// Weighted signal score on the -2..=2 scale
    pub score: f64,
    pub action: Action,
    pub target_price: Option<f64>,
    pub upside_pct: Option<f64>,
}

/// Final synthesized recommendation for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub as_of: Option<DateTime<Utc>>,
    pub archetype: CompanyArchetype,
    pub action: Action,
    pub confidence: ConfidenceLevel,
    pub risk_level: RiskLevel,
    pub bullish_signals: Vec<String>,
    pub bearish_signals: Vec<String>,
    pub neutral_signals: Vec<String>,
    pub key_risks: Vec<String>,
    pub thesis: String,
    pub next_steps: Vec<String>,
    pub quality: QualityAssessment,
    pub consensus: ConsensusView,
    pub method_results: Vec<MethodResult>,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_positive_finite_rejects_sentinels() {
        assert_eq!(positive_finite(Some(0.0)), None);
        assert_eq!(positive_finite(Some(-3.0)), None);
        assert_eq!(positive_finite(Some(f64::NAN)), None);
        assert_eq!(positive_finite(Some(f64::INFINITY)), None);
        assert_eq!(positive_finite(Some(12.5)), Some(12.5));
    }

    #[test]
    fn test_method_result_never_stores_zero_price() {
        let detail = MethodDetail::Comparable(Default::default());
        let result = MethodResult::applicable(
            ValuationMethod::Comparable,
            Some(0.0),
            Some(50.0),
            ConfidenceLevel::Medium,
            detail,
        );
        assert!(result.applicable);
        assert_eq!(result.predicted_price, None);
        assert_eq!(result.upside_pct, None);
        assert_eq!(result.signal, SignalStrength::Neutral);
    }

    #[test]
    fn test_method_result_upside() {
        let detail = MethodDetail::Comparable(Default::default());
        let result = MethodResult::applicable(
            ValuationMethod::Comparable,
            Some(130.0),
            Some(100.0),
            ConfidenceLevel::Medium,
            detail,
        );
        assert_relative_eq!(result.upside_pct.unwrap_or_default(), 30.0, epsilon = 1e-9);
        assert_eq!(result.signal, SignalStrength::StrongBuy);
    }

    #[test]
    fn test_signal_bands() {
        assert_eq!(SignalStrength::from_upside(26.0), SignalStrength::StrongBuy);
        assert_eq!(SignalStrength::from_upside(11.0), SignalStrength::Buy);
        assert_eq!(SignalStrength::from_upside(0.0), SignalStrength::Neutral);
        assert_eq!(SignalStrength::from_upside(-11.0), SignalStrength::Sell);
        assert_eq!(SignalStrength::from_upside(-26.0), SignalStrength::StrongSell);
    }

    #[test]
    fn test_quality_grade_bands() {
        assert_eq!(QualityGrade::from_score(80), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(79), QualityGrade::B);
        assert_eq!(QualityGrade::from_score(40), QualityGrade::C);
        assert_eq!(QualityGrade::from_score(0), QualityGrade::D);
    }

    #[test]
    fn test_snapshot_series_skip_gaps() {
        let mut snapshot = FinancialSnapshot::new("TEST");
        snapshot.income = vec![
            IncomeStatement { ebitda: Some(10.0), revenue: None, net_income: Some(2.0) },
            IncomeStatement { ebitda: None, revenue: Some(50.0), net_income: Some(f64::NAN) },
        ];
        assert_eq!(snapshot.ebitda_series(), vec![10.0]);
        assert_eq!(snapshot.revenue_series(), vec![50.0]);
        assert_eq!(snapshot.net_income_series(), vec![2.0]);
        assert_eq!(snapshot.current_price(), None);
    }

    #[test]
    fn test_action_serializes_screaming_case() {
        let json = serde_json::to_string(&Action::SpeculativeBuy).unwrap();
        assert_eq!(json, "\"SPECULATIVE_BUY\"");
        let json = serde_json::to_string(&ConfidenceLevel::LowHighRisk).unwrap();
        assert_eq!(json, "\"Low - High Risk\"");
    }
}
