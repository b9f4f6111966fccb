use valuation_core::{
    CompanyArchetype, ConfidenceLevel, Diagnostic, MethodDetail, MethodResult, SignalStrength,
    TechnicalDetail, Trend, ValuationContext, ValuationError, ValuationMethod, Valuator,
};

use crate::indicators::*;

/// Bars needed before any moving average can describe a trend.
const MIN_TREND_BARS: usize = 20;
/// Smallest fraction of the current price a bearish target may fall to.
const DOWNSIDE_FLOOR: f64 = 0.05;

/// Price target from moving-average trend and realized volatility.
pub struct TechnicalValuator;

impl TechnicalValuator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TechnicalValuator {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify the trend from price position against whichever averages exist.
pub fn classify_trend(
    price: f64,
    sma_20: Option<f64>,
    sma_50: Option<f64>,
    sma_200: Option<f64>,
) -> Trend {
    match (sma_50, sma_200) {
        (Some(ma50), Some(ma200)) => {
            if price > ma50 && ma50 > ma200 {
                Trend::StrongUptrend
            } else if price < ma50 && ma50 < ma200 {
                Trend::StrongDowntrend
            } else {
                position_trend(price, ma50)
            }
        }
        (Some(ma50), None) => position_trend(price, ma50),
        _ => match sma_20 {
            Some(ma20) => position_trend(price, ma20),
            None => Trend::Sideways,
        },
    }
}

fn position_trend(price: f64, average: f64) -> Trend {
    if price > average {
        Trend::Uptrend
    } else if price < average {
        Trend::Downtrend
    } else {
        Trend::Sideways
    }
}

/// 6-month and 12-month targets scaled by annualized volatility.
pub fn price_targets(price: f64, trend: Trend, volatility: f64) -> (f64, f64) {
    if trend.is_up() {
        (price * (1.0 + 0.5 * volatility), price * (1.0 + volatility))
    } else if trend.is_down() {
        (
            price * (1.0 - 0.5 * volatility).max(DOWNSIDE_FLOOR),
            price * (1.0 - volatility).max(DOWNSIDE_FLOOR),
        )
    } else {
        (price, price)
    }
}

/// Map net indicator points to a stance.
pub fn indicator_stance(score: i32) -> SignalStrength {
    match score {
        s if s >= 4 => SignalStrength::StrongBuy,
        s if s >= 2 => SignalStrength::Buy,
        s if s <= -4 => SignalStrength::StrongSell,
        s if s <= -2 => SignalStrength::Sell,
        _ => SignalStrength::Neutral,
    }
}

/// Trend direction as the method's own signal.
pub fn trend_signal(trend: Trend) -> SignalStrength {
    if trend.is_up() {
        SignalStrength::Buy
    } else if trend.is_down() {
        SignalStrength::Sell
    } else {
        SignalStrength::Neutral
    }
}

/// Net indicator points and the names of the signals that fired.
fn score_indicators(
    closes: &[f64],
    price: f64,
    trend: Trend,
    rsi_14: Option<f64>,
    range: (f64, f64),
) -> (i32, Vec<String>) {
    let mut signals: Vec<(&'static str, i32)> = Vec::new();

    match trend {
        Trend::StrongUptrend => signals.push(("Strong Uptrend", 3)),
        Trend::Uptrend => signals.push(("Price Above MAs", 2)),
        Trend::Downtrend => signals.push(("Price Below MAs", -2)),
        Trend::StrongDowntrend => signals.push(("Strong Downtrend", -3)),
        Trend::Sideways => {}
    }

    // RSI (deeper oversold = stronger reversal signal)
    if let Some(r) = rsi_14 {
        if r < 25.0 {
            signals.push(("RSI Deeply Oversold", 3));
        } else if r < 30.0 {
            signals.push(("RSI Oversold", 2));
        } else if r > 70.0 {
            signals.push(("RSI Overbought", -2));
        }
    }

    let macd_result = macd(closes, 12, 26, 9);
    if let Some(&last_hist) = macd_result.histogram.last() {
        let prev_hist = macd_result
            .histogram
            .len()
            .checked_sub(2)
            .map(|i| macd_result.histogram[i]);
        match prev_hist {
            Some(prev) if last_hist > 0.0 && prev <= 0.0 => signals.push(("MACD Bullish Cross", 3)),
            Some(prev) if last_hist < 0.0 && prev >= 0.0 => signals.push(("MACD Bearish Cross", -3)),
            _ if last_hist > 0.0 => signals.push(("MACD Positive", 1)),
            _ if last_hist < 0.0 => signals.push(("MACD Negative", -1)),
            _ => {}
        }
    }

    let bb = bollinger_bands(closes, 20, 2.0);
    if let (Some(&upper), Some(&lower)) = (bb.upper.last(), bb.lower.last()) {
        if price < lower {
            signals.push(("Below Lower Bollinger Band", 2));
        } else if price > upper {
            signals.push(("Above Upper Bollinger Band", -2));
        }
    }

    let (high, low) = range;
    if high > low {
        let position = (price - low) / (high - low);
        if position < 0.2 {
            signals.push(("Near 52-Week Low", 1));
        } else if position > 0.8 {
            signals.push(("Near 52-Week High", -1));
        }
    }

    let score = signals.iter().map(|(_, points)| points).sum();
    let names = signals
        .into_iter()
        .map(|(name, points)| format!("{name} ({points:+})"))
        .collect();
    (score, names)
}

impl Valuator for TechnicalValuator {
    fn method(&self) -> ValuationMethod {
        ValuationMethod::Technical
    }

    fn is_applicable(&self, _archetype: CompanyArchetype) -> bool {
        true
    }

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<MethodResult, ValuationError> {
        let snapshot = ctx.snapshot;
        let bars: Vec<_> = snapshot
            .price_history
            .iter()
            .filter(|b| b.close.is_finite() && b.close > 0.0)
            .cloned()
            .collect();
        if bars.len() < 2 {
            return Err(ValuationError::MissingData(
                "need at least 2 daily bars".to_string(),
            ));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let price = snapshot
            .current_price()
            .ok_or_else(|| ValuationError::MissingData("current price".to_string()))?;
        let mut diagnostics = Vec::new();

        let sma_20 = last_sma(&closes, 20);
        let sma_50 = last_sma(&closes, 50);
        let sma_200 = last_sma(&closes, 200);
        if closes.len() < MIN_TREND_BARS {
            diagnostics.push(Diagnostic::missing(
                "trend",
                format!("only {} bars, trend treated as sideways", closes.len()),
            ));
        }
        let trend = classify_trend(price, sma_20, sma_50, sma_200);

        let annual_volatility = match annualized_volatility(&closes) {
            Some(v) => v,
            None => {
                diagnostics.push(Diagnostic::fallback(
                    "volatility",
                    "too few returns, volatility set to zero",
                ));
                0.0
            }
        };

        let (high_52w, low_52w) = range_52w(&bars).unwrap_or((price, price));
        let rsi_14 = rsi(&closes, 14).last().copied();
        let (target_6m, target_12m) = price_targets(price, trend, annual_volatility);

        let (indicator_score, indicator_signals) =
            score_indicators(&closes, price, trend, rsi_14, (high_52w, low_52w));
        let indicator_stance = indicator_stance(indicator_score);

        let confidence = if sma_200.is_some() {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        tracing::debug!(
            symbol = %snapshot.symbol,
            trend = trend.name(),
            annual_volatility,
            target_12m,
            indicator_score,
            "technical valuation"
        );

        let detail = TechnicalDetail {
            trend,
            sma_20,
            sma_50,
            sma_200,
            rsi_14,
            annual_volatility,
            high_52w,
            low_52w,
            target_6m,
            target_12m,
            indicator_score,
            indicator_stance,
            indicator_signals,
        };

        Ok(MethodResult::applicable(
            ValuationMethod::Technical,
            Some(target_12m),
            Some(price),
            confidence,
            MethodDetail::Technical(detail),
        )
        .with_signal(trend_signal(trend))
        .with_diagnostics(diagnostics))
    }
}
