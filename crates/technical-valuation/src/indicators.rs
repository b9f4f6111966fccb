use statrs::statistics::Statistics;
use valuation_core::PriceBar;

/// Trading days per year used to annualize daily statistics.
pub const TRADING_DAYS: usize = 252;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    data.windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Latest value of an SMA, if there is enough history for one.
pub fn last_sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let tail = &data[data.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// Exponential Moving Average, seeded with the SMA of the first `period` values.
/// Output starts at index `period - 1` of the input.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;
    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);

    for &value in &data[period..] {
        let prev = result[result.len() - 1];
        result.push((value - prev) * multiplier + prev);
    }

    result
}

/// Relative Strength Index with Wilder smoothing
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = data
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let to_rsi = |gain: f64, loss: f64| {
        if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    };

    let mut rsi_values = Vec::with_capacity(gains.len() - period + 1);
    rsi_values.push(to_rsi(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        rsi_values.push(to_rsi(avg_gain, avg_loss));
    }

    rsi_values
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdResult {
    fn empty() -> Self {
        Self {
            macd_line: vec![],
            signal_line: vec![],
            histogram: vec![],
        }
    }
}

pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || signal_period == 0 || slow_period <= fast_period {
        return MacdResult::empty();
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);
    if ema_slow.is_empty() {
        return MacdResult::empty();
    }

    // Both EMAs end on the last bar; align them from the right.
    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_line = ema(&macd_line, signal_period);
    let hist_offset = macd_line.len() - signal_line.len();
    let histogram = signal_line
        .iter()
        .enumerate()
        .map(|(i, signal)| macd_line[i + hist_offset] - signal)
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if period == 0 || data.len() < period {
        return BollingerBands { upper: vec![], middle: vec![], lower: vec![] };
    }

    let middle = sma(data, period);
    let (upper, lower): (Vec<f64>, Vec<f64>) = data
        .windows(period)
        .zip(&middle)
        .map(|(window, &mean)| {
            let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
            let band = std_dev * variance.sqrt();
            (mean + band, mean - band)
        })
        .unzip();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Annualized volatility: sample standard deviation of simple daily returns
/// scaled by the square root of the trading year.
pub fn annualized_volatility(closes: &[f64]) -> Option<f64> {
    let returns = valuation_core::stats::pct_returns(closes);
    if returns.len() < 2 {
        return None;
    }
    let sd = returns.std_dev();
    sd.is_finite().then(|| sd * (TRADING_DAYS as f64).sqrt())
}

/// Highest high and lowest low over the trailing trading year.
pub fn range_52w(bars: &[PriceBar]) -> Option<(f64, f64)> {
    let start = bars.len().saturating_sub(TRADING_DAYS);
    let window = &bars[start..];
    if window.is_empty() {
        return None;
    }
    let high = window.iter().map(|b| b.high.max(b.close)).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|b| b.low.min(b.close)).fold(f64::INFINITY, f64::min);
    Some((high, low))
}
