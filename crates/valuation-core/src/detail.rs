//! Per-method result payloads carried inside [`MethodResult`](crate::MethodResult).

use serde::{Deserialize, Serialize};

use crate::types::{GrowthEstimate, SignalStrength};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MethodDetail {
    Dcf(DcfDetail),
    Comparable(ComparableDetail),
    Technical(TechnicalDetail),
    Startup(StartupDetail),
}

impl MethodDetail {
    pub fn as_technical(&self) -> Option<&TechnicalDetail> {
        match self {
            MethodDetail::Technical(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_startup(&self) -> Option<&StartupDetail> {
        match self {
            MethodDetail::Startup(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_comparable(&self) -> Option<&ComparableDetail> {
        match self {
            MethodDetail::Comparable(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dcf(&self) -> Option<&DcfDetail> {
        match self {
            MethodDetail::Dcf(d) => Some(d),
            _ => None,
        }
    }
}

// ---- DCF ----

/// Where the beta used in the cost of equity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaSource {
    Vendor,
    Regression,
    Sector,
    Characteristics,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfDetail {
    pub beta: f64,
    pub beta_source: BetaSource,
    pub cost_of_equity: f64,
    pub wacc: f64,
    pub fcf_growth: Option<GrowthEstimate>,
    pub ebitda_growth: Option<GrowthEstimate>,
    /// Terminal growth actually applied, after any clamp below WACC
    pub terminal_growth: f64,
    pub ebitda_multiple: f64,
    pub projected_fcf: Vec<f64>,
    pub pv_fcf: f64,
    pub terminal_perpetuity: Option<f64>,
    pub terminal_ebitda: Option<f64>,
    pub terminal_value: f64,
    pub pv_terminal: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    /// Share of enterprise value coming from the terminal value
    pub terminal_ratio: f64,
    /// Total discount applied to the per-share value (0..=0.8)
    pub risk_discount: f64,
}

// ---- Comparable ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleKind {
    PriceEarnings,
    PriceSales,
    PriceBook,
    EvEbitda,
}

impl MultipleKind {
    pub fn name(&self) -> &'static str {
        match self {
            MultipleKind::PriceEarnings => "P/E",
            MultipleKind::PriceSales => "P/S",
            MultipleKind::PriceBook => "P/B",
            MultipleKind::EvEbitda => "EV/EBITDA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpliedPrice {
    pub multiple: MultipleKind,
    pub target_multiple: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelativeValuation {
    Undervalued,
    #[default]
    Fair,
    Overvalued,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparableDetail {
    pub implied_prices: Vec<ImpliedPrice>,
    pub relative: RelativeValuation,
}

impl ComparableDetail {
    pub fn best_implied(&self) -> Option<f64> {
        self.implied_prices
            .iter()
            .map(|p| p.price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
    }
}

// ---- Technical ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    StrongUptrend,
    Uptrend,
    Sideways,
    Downtrend,
    StrongDowntrend,
}

impl Trend {
    pub fn is_up(&self) -> bool {
        matches!(self, Trend::StrongUptrend | Trend::Uptrend)
    }

    pub fn is_down(&self) -> bool {
        matches!(self, Trend::StrongDowntrend | Trend::Downtrend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Trend::StrongUptrend => "Strong Uptrend",
            Trend::Uptrend => "Uptrend",
            Trend::Sideways => "Sideways",
            Trend::Downtrend => "Downtrend",
            Trend::StrongDowntrend => "Strong Downtrend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDetail {
    pub trend: Trend,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub rsi_14: Option<f64>,
    /// Annualized, as a fraction
    pub annual_volatility: f64,
    pub high_52w: f64,
    pub low_52w: f64,
    pub target_6m: f64,
    pub target_12m: f64,
    /// Net bullish minus bearish indicator points
    pub indicator_score: i32,
    pub indicator_stance: SignalStrength,
    pub indicator_signals: Vec<String>,
}

// ---- Startup ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthTier {
    Exceptional,
    Strong,
    Moderate,
    Weak,
    Declining,
}

impl GrowthTier {
    pub fn from_growth(growth: f64) -> Self {
        match growth {
            g if g > 0.50 => GrowthTier::Exceptional,
            g if g > 0.30 => GrowthTier::Strong,
            g if g > 0.15 => GrowthTier::Moderate,
            g if g > 0.0 => GrowthTier::Weak,
            _ => GrowthTier::Declining,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupStage {
    PreRevenue,
    Early,
    Growth,
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupVerdict {
    AvoidBankruptcyRisk,
    AvoidWeakRunway,
    SpeculativeBuy,
    HoldWatch,
    HighRiskHighReward,
    AvoidUncompensatedRisk,
}

impl StartupVerdict {
    pub fn is_avoid(&self) -> bool {
        matches!(
            self,
            StartupVerdict::AvoidBankruptcyRisk
                | StartupVerdict::AvoidWeakRunway
                | StartupVerdict::AvoidUncompensatedRisk
        )
    }

    pub fn is_speculative(&self) -> bool {
        matches!(
            self,
            StartupVerdict::SpeculativeBuy | StartupVerdict::HighRiskHighReward
        )
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            StartupVerdict::AvoidBankruptcyRisk => "AVOID - Imminent bankruptcy risk",
            StartupVerdict::AvoidWeakRunway => "AVOID - Short runway with weak growth",
            StartupVerdict::SpeculativeBuy => "SPECULATIVE BUY - Strong growth with adequate runway",
            StartupVerdict::HoldWatch => "HOLD/WATCH - Adequate metrics, monitor closely",
            StartupVerdict::HighRiskHighReward => "HIGH RISK/HIGH REWARD - Exceptional growth, verify runway",
            StartupVerdict::AvoidUncompensatedRisk => "AVOID - Risk not compensated by growth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupDetail {
    pub cash: f64,
    pub quarterly_burn: Option<f64>,
    /// `None` when free cash flow is not negative
    pub runway_years: Option<f64>,
    pub revenue_growth: f64,
    pub growth_tier: GrowthTier,
    pub stage: StartupStage,
    pub revenue_multiple: f64,
    pub risk_score: u32,
    pub risk_factors: Vec<String>,
    pub price_current_revenue: Option<f64>,
    pub price_1y: Option<f64>,
    pub price_2y: Option<f64>,
    pub verdict: StartupVerdict,
}
