#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use chrono::{Duration, TimeZone, Utc};
    use valuation_core::PriceBar;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn trending(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: t0 + Duration::days(i as i64),
                open: c,
                high: c * 1.01,
                low: c * 0.99,
                close: c,
                volume: 1_000_000.0,
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        assert_eq!(sma(&data, 5).len(), 0);
        assert_eq!(last_sma(&data, 5), None);
    }

    #[test]
    fn test_last_sma_matches_series() {
        let prices = sample_prices();
        let series = sma(&prices, 5);
        let last = last_sma(&prices, 5).unwrap();
        assert!((series[series.len() - 1] - last).abs() < 1e-12);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), 3);
        let first_sma = (22.0 + 24.0 + 23.0) / 3.0;
        assert!((result[0] - first_sma).abs() < 0.01);
        // multiplier 0.5: 23 + (25 - 23) * 0.5 = 24
        assert!((result[1] - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_empty_data() {
        let data: Vec<f64> = vec![];
        assert_eq!(ema(&data, 5).len(), 0);
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data = trending(10, 1.0, 1.0);
        let result = ema(&data, 3);
        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_rsi_bounds() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert_eq!(result.len(), prices.len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 14).len(), 0);
    }

    #[test]
    fn test_rsi_extremes() {
        let up = trending(20, 100.0, 1.0);
        assert!((rsi(&up, 14).last().unwrap() - 100.0).abs() < 1e-9);

        let down = trending(20, 100.0, -1.0);
        assert!(*rsi(&down, 14).last().unwrap() < 1e-9);
    }

    #[test]
    fn test_macd_needs_slow_window() {
        let result = macd(&sample_prices(), 12, 26, 9);
        assert!(result.macd_line.is_empty());
        assert!(result.histogram.is_empty());
    }

    #[test]
    fn test_macd_lengths_and_histogram() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd_line.len(), 60 - 26 + 1);
        assert_eq!(result.signal_line.len(), result.macd_line.len() - 9 + 1);
        assert_eq!(result.histogram.len(), result.signal_line.len());

        let offset = result.macd_line.len() - result.signal_line.len();
        for (i, &hist) in result.histogram.iter().enumerate() {
            let expected = result.macd_line[i + offset] - result.signal_line[i];
            assert!((hist - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let prices = trending(60, 50.0, 0.5);
        let result = macd(&prices, 12, 26, 9);
        assert!(*result.macd_line.last().unwrap() > 0.0);
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let prices = sample_prices();
        let result = bollinger_bands(&prices, 10, 2.0);

        assert_eq!(result.upper.len(), result.middle.len());
        assert_eq!(result.middle.len(), result.lower.len());
        for i in 0..result.upper.len() {
            assert!(result.upper[i] > result.middle[i]);
            assert!(result.middle[i] > result.lower[i]);
        }
    }

    #[test]
    fn test_bollinger_bands_collapse_on_flat_prices() {
        let prices = vec![100.0; 20];
        let result = bollinger_bands(&prices, 10, 2.0);
        for i in 0..result.upper.len() {
            assert!((result.upper[i] - result.lower[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_volatility_of_flat_series_is_zero() {
        assert_eq!(annualized_volatility(&[100.0; 30]), Some(0.0));
        assert_eq!(annualized_volatility(&[100.0, 101.0]), None);
    }

    #[test]
    fn test_volatility_annualization() {
        // alternating +1% / -1% returns
        let mut closes = vec![100.0];
        for i in 0..100 {
            let r = if i % 2 == 0 { 0.01 } else { -0.01 };
            closes.push(closes.last().unwrap() * (1.0 + r));
        }
        let vol = annualized_volatility(&closes).unwrap();
        let expected = 0.01 * (100.0_f64 / 99.0).sqrt() * (252.0_f64).sqrt();
        assert!((vol - expected).abs() < 1e-9);
    }

    #[test]
    fn test_range_52w_uses_trailing_year() {
        let mut closes = vec![500.0];
        closes.extend(trending(260, 100.0, 0.1));
        let bars = bars_from(&closes);
        let (high, low) = range_52w(&bars).unwrap();
        // the 500 spike is older than 252 bars
        assert!(high < 200.0);
        assert!(low > 99.0 * 0.99);
        assert!(range_52w(&[]).is_none());
    }
}
