use std::cmp::Ordering;

use valuation_core::{
    Action, CompanyArchetype, ConfidenceLevel, ConsensusView, DataCompleteness, Diagnostic,
    DiagnosticKind, FinancialSnapshot, MethodResult, QualityAssessment, QualityGrade,
    Recommendation, RelativeValuation, RiskLevel, SignalStrength, ValuationMethod,
};

/// Upside (percent) a DCF must show before it drives a BUY or SELL.
const DCF_DECISION_BAND: f64 = 25.0;
/// Annualized volatility above which price swings count as a risk.
const HIGH_VOLATILITY: f64 = 0.5;

pub const RISK_TOTAL_LOSS: &str = "High volatility - total loss possible";
pub const RISK_BANKRUPTCY: &str = "Bankruptcy risk";
pub const RISK_WEAK_HEALTH: &str = "Weak financial health";
pub const RISK_LIMITED_DATA: &str = "Limited financial data availability";
pub const RISK_PRICE_VOLATILITY: &str = "High price volatility";

/// Signal lists and risk notes gathered while visiting method results.
#[derive(Debug, Default)]
struct SignalBook {
    bullish: Vec<String>,
    bearish: Vec<String>,
    neutral: Vec<String>,
    risks: Vec<String>,
}

impl SignalBook {
    fn push(&mut self, signal: SignalStrength, note: String) {
        if signal.is_bullish() {
            self.bullish.push(note);
        } else if signal.is_bearish() {
            self.bearish.push(note);
        } else {
            self.neutral.push(note);
        }
    }

    fn add_risk(&mut self, risk: impl Into<String>) {
        let risk = risk.into();
        if !self.risks.contains(&risk) {
            self.risks.push(risk);
        }
    }
}

/// Per-method signals the decision tables read.
#[derive(Debug, Default, Clone, Copy)]
struct MethodSignals {
    dcf_upside: Option<f64>,
    dcf_signal: Option<SignalStrength>,
    technical: Option<SignalStrength>,
    startup_speculative: bool,
    startup_avoid: bool,
    startup_label: Option<&'static str>,
}

/// Reconciles method results, quality and archetype into one recommendation.
/// Stateless; the output does not depend on the order of the input results.
pub struct SignalSynthesizer;

impl SignalSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(
        &self,
        snapshot: &FinancialSnapshot,
        archetype: CompanyArchetype,
        quality: &QualityAssessment,
        method_results: &[MethodResult],
        mut diagnostics: Vec<Diagnostic>,
    ) -> Recommendation {
        let results = canonical_order(method_results);
        let mut book = SignalBook::default();
        let mut signals = MethodSignals::default();

        for result in results.iter().filter(|r| r.applicable) {
            visit_result(result, &mut book, &mut signals);
        }
        visit_quality(quality, &mut book);

        let any_applicable = results.iter().any(|r| r.applicable);
        let (action, mut confidence) = if !any_applicable {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::AggregateFailure,
                "synthesizer",
                "no valuation method produced a result",
            ));
            (Action::Monitor, ConfidenceLevel::Low)
        } else {
            decide(archetype, quality.grade, &book, &signals)
        };

        if quality.completeness == DataCompleteness::Low {
            confidence = ConfidenceLevel::Low;
        }

        let risk_level = if archetype == CompanyArchetype::StartupLossMaking {
            RiskLevel::VeryHigh
        } else {
            match book.risks.len() {
                0 => RiskLevel::Low,
                1 | 2 => RiskLevel::Medium,
                _ => RiskLevel::High,
            }
        };

        let thesis = if any_applicable {
            thesis(archetype, quality.grade, action, &signals)
        } else {
            "Insufficient data for a valuation; no method could be applied.".to_string()
        };
        let next_steps = next_steps(action, archetype, &book.risks);
        let consensus = consensus(&results, snapshot.current_price());

        tracing::info!(
            symbol = %snapshot.symbol,
            archetype = archetype.name(),
            action = action.to_label(),
            confidence = confidence.to_label(),
            bullish = book.bullish.len(),
            bearish = book.bearish.len(),
            "synthesized recommendation"
        );

        Recommendation {
            symbol: snapshot.symbol.clone(),
            as_of: snapshot.as_of,
            archetype,
            action,
            confidence,
            risk_level,
            bullish_signals: book.bullish,
            bearish_signals: book.bearish,
            neutral_signals: book.neutral,
            key_risks: book.risks,
            thesis,
            next_steps,
            quality: quality.clone(),
            consensus,
            method_results: results,
            diagnostics,
        }
    }
}

impl Default for SignalSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

/// One result per method in DCF, Comparable, Technical, Startup order. When a
/// method appears twice the applicable result with the higher price wins;
/// remaining ties go to the stronger signal, then the fewer diagnostics, then
/// a full field comparison so the survivor never depends on input order.
fn canonical_order(results: &[MethodResult]) -> Vec<MethodResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| {
        a.method
            .cmp(&b.method)
            .then(b.applicable.cmp(&a.applicable))
            .then_with(|| compare_price(b.predicted_price, a.predicted_price))
            .then_with(|| b.signal.to_score().cmp(&a.signal.to_score()))
            .then_with(|| a.diagnostics.len().cmp(&b.diagnostics.len()))
            .then_with(|| format!("{a:?}").cmp(&format!("{b:?}")))
    });
    sorted.dedup_by_key(|r| r.method);
    sorted
}

fn compare_price(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn visit_result(result: &MethodResult, book: &mut SignalBook, signals: &mut MethodSignals) {
    match result.method {
        ValuationMethod::Dcf => {
            signals.dcf_upside = result.upside_pct;
            signals.dcf_signal = Some(result.signal);
            match result.upside_pct {
                Some(upside) if result.signal.is_bullish() => {
                    book.push(result.signal, format!("DCF shows {upside:.0}% upside"))
                }
                Some(upside) if result.signal.is_bearish() => {
                    book.push(result.signal, format!("DCF shows {upside:.0}% downside"))
                }
                Some(_) => book.push(SignalStrength::Neutral, "DCF suggests fair valuation".to_string()),
                None => book.push(
                    SignalStrength::Neutral,
                    "DCF produced no usable price".to_string(),
                ),
            }
        }
        ValuationMethod::Comparable => {
            let relative = result
                .detail
                .as_ref()
                .and_then(|d| d.as_comparable())
                .map(|c| c.relative)
                .unwrap_or_default();
            match relative {
                RelativeValuation::Undervalued => {
                    book.push(SignalStrength::Buy, "Trading below peer multiples".to_string())
                }
                RelativeValuation::Overvalued => {
                    book.push(SignalStrength::Sell, "Trading above peer multiples".to_string())
                }
                RelativeValuation::Fair => {
                    book.push(SignalStrength::Neutral, "Fair valuation vs peers".to_string())
                }
            }
        }
        ValuationMethod::Technical => {
            signals.technical = Some(result.signal);
            match result.detail.as_ref().and_then(|d| d.as_technical()) {
                Some(tech) => {
                    book.push(result.signal, format!("Technical: {}", tech.trend.name()));
                    if tech.annual_volatility > HIGH_VOLATILITY {
                        book.add_risk(RISK_PRICE_VOLATILITY);
                    }
                }
                None => book.push(result.signal, "Technical: no trend detail".to_string()),
            }
        }
        ValuationMethod::Startup => {
            let Some(startup) = result.detail.as_ref().and_then(|d| d.as_startup()) else {
                book.push(SignalStrength::Neutral, "Mixed startup fundamentals".to_string());
                return;
            };
            signals.startup_label = Some(startup.verdict.to_label());
            if startup.verdict.is_speculative() {
                signals.startup_speculative = true;
                book.push(
                    SignalStrength::Buy,
                    "Strong revenue growth with adequate runway".to_string(),
                );
                book.add_risk(RISK_TOTAL_LOSS);
            } else if startup.verdict.is_avoid() {
                signals.startup_avoid = true;
                book.push(
                    SignalStrength::Sell,
                    "Critical cash runway or poor growth".to_string(),
                );
                book.add_risk(RISK_BANKRUPTCY);
            } else {
                book.push(SignalStrength::Neutral, "Mixed startup fundamentals".to_string());
            }

            match startup.runway_years {
                Some(r) if r < 1.0 => book.add_risk("Critical: <1 year cash runway"),
                Some(r) if r < 2.0 => book.add_risk("High risk: <2 years cash runway"),
                _ => {}
            }
        }
    }
}

fn visit_quality(quality: &QualityAssessment, book: &mut SignalBook) {
    match quality.grade {
        QualityGrade::A => book.push(SignalStrength::Buy, "High quality company metrics".to_string()),
        QualityGrade::B => book.push(SignalStrength::Buy, "Good quality company metrics".to_string()),
        QualityGrade::C => {}
        QualityGrade::D => {
            book.push(SignalStrength::Sell, "Poor quality metrics".to_string());
            book.add_risk(RISK_WEAK_HEALTH);
        }
    }
    if quality.completeness == DataCompleteness::Low {
        book.add_risk(RISK_LIMITED_DATA);
    }
}

/// Terminal action and confidence per archetype policy.
fn decide(
    archetype: CompanyArchetype,
    grade: QualityGrade,
    book: &SignalBook,
    signals: &MethodSignals,
) -> (Action, ConfidenceLevel) {
    let bullish = book.bullish.len();
    let bearish = book.bearish.len();

    match archetype {
        CompanyArchetype::StartupLossMaking => {
            let technical_ok = matches!(
                signals.technical,
                Some(SignalStrength::Buy | SignalStrength::StrongBuy | SignalStrength::Neutral)
            );
            if signals.startup_speculative && technical_ok {
                (Action::SpeculativeBuy, ConfidenceLevel::LowHighRisk)
            } else if signals.startup_avoid {
                (Action::Avoid, ConfidenceLevel::High)
            } else {
                (Action::Monitor, ConfidenceLevel::Low)
            }
        }
        CompanyArchetype::MatureProfitable | CompanyArchetype::GrowthProfitable => {
            let upside = signals.dcf_upside;
            if upside.is_some_and(|u| u > DCF_DECISION_BAND) && bullish >= bearish {
                let confidence = if grade.is_investment_grade() {
                    ConfidenceLevel::High
                } else {
                    ConfidenceLevel::Medium
                };
                (Action::Buy, confidence)
            } else if upside.is_some_and(|u| u < -DCF_DECISION_BAND) || bearish > bullish + 1 {
                (Action::Sell, ConfidenceLevel::Medium)
            } else {
                (Action::Hold, ConfidenceLevel::Medium)
            }
        }
        _ => {
            if bullish > bearish + 1 && grade.is_investment_grade() {
                (Action::Buy, ConfidenceLevel::Medium)
            } else if bearish > bullish + 1 {
                (Action::Sell, ConfidenceLevel::Medium)
            } else {
                (Action::Hold, ConfidenceLevel::Low)
            }
        }
    }
}

fn thesis(
    archetype: CompanyArchetype,
    grade: QualityGrade,
    action: Action,
    signals: &MethodSignals,
) -> String {
    let action_text = action.to_label().replace('_', " ").to_lowercase();
    match archetype {
        CompanyArchetype::StartupLossMaking => format!(
            "High-risk speculative play on revenue growth potential. {} based on cash runway and growth metrics.",
            signals.startup_label.unwrap_or("Monitor")
        ),
        CompanyArchetype::MatureProfitable => format!(
            "Stable, mature company. DCF suggests {} with {:?} quality metrics.",
            signals
                .dcf_signal
                .map(|s| s.to_label().to_lowercase())
                .unwrap_or_else(|| "fair valuation".to_string()),
            grade
        ),
        CompanyArchetype::GrowthProfitable => format!(
            "Growth company with {grade:?} fundamentals. Multiple valuation methods suggest {action_text}."
        ),
        CompanyArchetype::Reit => format!(
            "Real estate investment trust valued on relative multiples. Current signals: {action_text}."
        ),
        CompanyArchetype::Financial => format!(
            "Financial company valued on earnings and book multiples. Current signals: {action_text}."
        ),
        other => format!(
            "{} company requiring careful timing. Current signals: {action_text}.",
            other.name()
        ),
    }
}

fn next_steps(action: Action, archetype: CompanyArchetype, risks: &[String]) -> Vec<String> {
    let mut steps: Vec<&str> = Vec::new();

    match action {
        Action::StrongBuy | Action::Buy => {
            steps.push("Consider position sizing based on risk tolerance");
            steps.push("Monitor quarterly earnings for confirmation of thesis");
            if archetype.is_profitable_core() {
                steps.push("Review management guidance and forward outlook");
            }
        }
        Action::SpeculativeBuy => {
            steps.push("Limit position size to <2% of portfolio");
            steps.push("Monitor cash burn rate and runway quarterly");
            steps.push("Set stop-loss at -50% to limit downside");
            steps.push("Track revenue growth sustainability");
        }
        Action::Sell | Action::StrongSell | Action::Avoid => {
            if risks.iter().any(|r| r == RISK_BANKRUPTCY) {
                steps.push("Exit position immediately if held");
            }
            steps.push("Monitor for fundamental changes before reconsidering");
        }
        Action::Hold => {
            steps.push("Monitor for catalysts that could change thesis");
            steps.push("Review position at next earnings announcement");
        }
        Action::Monitor => {
            steps.push("Wait for clearer fundamental signals");
            steps.push("Consider adding to watchlist for quarterly review");
        }
    }

    if risks.iter().any(|r| r == RISK_LIMITED_DATA) {
        steps.push("Seek additional data sources before acting");
    }

    steps.into_iter().map(String::from).collect()
}

/// Weighted signal score and target across every applicable method.
fn consensus(results: &[MethodResult], current_price: Option<f64>) -> ConsensusView {
    let mut score_sum = 0.0;
    let mut score_weight = 0.0;
    let mut price_sum = 0.0;
    let mut price_weight = 0.0;

    for result in results.iter().filter(|r| r.applicable) {
        let w = result.method.consensus_weight();
        score_sum += result.signal.to_score() as f64 * w;
        score_weight += w;
        if let Some(price) = result.predicted_price {
            price_sum += price * w;
            price_weight += w;
        }
    }

    let score = if score_weight > 0.0 {
        score_sum / score_weight
    } else {
        0.0
    };
    let target_price = (price_weight > 0.0).then(|| price_sum / price_weight);
    let upside_pct = match (target_price, current_price) {
        (Some(t), Some(c)) if c > 0.0 => Some((t - c) / c * 100.0),
        _ => None,
    };

    ConsensusView {
        score,
        action: consensus_action(score),
        target_price,
        upside_pct,
    }
}

pub fn consensus_action(score: f64) -> Action {
    match score {
        s if s >= 1.5 => Action::StrongBuy,
        s if s >= 0.5 => Action::Buy,
        s if s <= -1.5 => Action::StrongSell,
        s if s <= -0.5 => Action::Sell,
        _ => Action::Hold,
    }
}
