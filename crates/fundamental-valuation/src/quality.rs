use valuation_core::{DataCompleteness, FinancialSnapshot, QualityAssessment, QualityGrade};

/// Ratios scored by [`QualityScorer`]. Growth, ROE and debt-to-equity are fractions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityInputs {
    pub return_on_equity: Option<f64>,
    pub net_income: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,
}

impl QualityInputs {
    pub fn from_snapshot(snapshot: &FinancialSnapshot) -> Self {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let r = &snapshot.ratios;
        Self {
            return_on_equity: finite(r.return_on_equity),
            net_income: snapshot.latest_net_income(),
            debt_to_equity: finite(r.debt_to_equity),
            current_ratio: finite(r.current_ratio),
            revenue_growth: finite(r.revenue_growth),
            earnings_growth: finite(r.earnings_growth),
            pe_ratio: finite(r.pe_ratio),
            peg_ratio: finite(r.peg_ratio),
        }
    }
}

const ROE_PENALTY: u32 = 3;
const MISSING_PENALTY: u32 = 2;

/// Running tally of points, penalties and notes.
#[derive(Default)]
struct Tally {
    points: u32,
    penalty: u32,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
}

impl Tally {
    fn score<T>(&mut self, value: Option<T>, penalty: u32, rule: impl FnOnce(T) -> u32) {
        match value {
            Some(v) => self.points += rule(v),
            None => self.penalty += penalty,
        }
    }
}

/// Four-pillar quality model: profitability, financial health, growth and
/// valuation, 25 points each.
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, inputs: &QualityInputs) -> QualityAssessment {
        let mut t = Tally::default();

        // Profitability
        t.score(inputs.return_on_equity, ROE_PENALTY, |roe| match roe {
            r if r > 0.15 => 15,
            r if r > 0.10 => 10,
            r if r > 0.05 => 5,
            _ => 0,
        });
        t.score(inputs.net_income, MISSING_PENALTY, |ni| if ni > 0.0 { 10 } else { 0 });

        // Financial health
        t.score(inputs.debt_to_equity, MISSING_PENALTY, |de| match de {
            d if d < 0.0 => 0,
            d if d < 0.3 => 15,
            d if d < 0.6 => 10,
            d if d < 1.0 => 5,
            _ => 0,
        });
        t.score(inputs.current_ratio, MISSING_PENALTY, |cr| match cr {
            c if c > 2.0 => 10,
            c if c > 1.5 => 7,
            c if c > 1.0 => 5,
            _ => 0,
        });

        // Growth
        t.score(inputs.revenue_growth, MISSING_PENALTY, |g| match g {
            g if g > 0.20 => 15,
            g if g > 0.10 => 10,
            g if g > 0.05 => 5,
            _ => 0,
        });
        t.score(inputs.earnings_growth, MISSING_PENALTY, |g| match g {
            g if g > 0.15 => 10,
            g if g > 0.10 => 7,
            g if g > 0.05 => 5,
            _ => 0,
        });

        // Valuation: non-positive multiples carry no information
        t.score(inputs.pe_ratio.filter(|pe| *pe > 0.0), MISSING_PENALTY, |pe| match pe {
            p if p > 10.0 && p < 25.0 => 15,
            p if p > 8.0 && p < 35.0 => 10,
            p if p < 50.0 => 5,
            _ => 0,
        });
        t.score(inputs.peg_ratio.filter(|peg| *peg > 0.0), MISSING_PENALTY, |peg| match peg {
            p if p < 1.0 => 10,
            p if p < 1.5 => 7,
            p if p < 2.5 => 4,
            _ => 0,
        });

        self.annotate(inputs, &mut t);

        let score = t.points.saturating_sub(t.penalty).min(100);
        let completeness = match t.penalty {
            p if p <= 3 => DataCompleteness::High,
            p if p <= 7 => DataCompleteness::Medium,
            _ => DataCompleteness::Low,
        };

        QualityAssessment {
            score,
            grade: QualityGrade::from_score(score),
            completeness,
            missing_penalty: t.penalty,
            strengths: t.strengths,
            weaknesses: t.weaknesses,
        }
    }

    fn annotate(&self, inputs: &QualityInputs, t: &mut Tally) {
        let mut note = |cond: bool, bullish: bool, text: &str| {
            if cond {
                if bullish {
                    t.strengths.push(text.to_string());
                } else {
                    t.weaknesses.push(text.to_string());
                }
            }
        };
        let roe = inputs.return_on_equity;
        let de = inputs.debt_to_equity;
        note(roe.is_some_and(|r| r > 0.15), true, "Strong return on equity");
        note(roe.is_some_and(|r| r < 0.05), false, "Weak return on equity");
        note(inputs.net_income.is_some_and(|n| n <= 0.0), false, "Not profitable");
        note(de.is_some_and(|d| (0.0..0.3).contains(&d)), true, "Conservative balance sheet");
        note(de.is_some_and(|d| d >= 1.0), false, "High leverage");
        note(inputs.current_ratio.is_some_and(|c| c <= 1.0), false, "Tight liquidity");
        note(inputs.revenue_growth.is_some_and(|g| g > 0.20), true, "Rapid revenue growth");
        note(inputs.revenue_growth.is_some_and(|g| g < 0.0), false, "Shrinking revenue");
        note(inputs.peg_ratio.is_some_and(|p| p > 0.0 && p < 1.0), true, "Attractive PEG ratio");
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}
