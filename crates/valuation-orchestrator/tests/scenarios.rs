use chrono::{Duration, TimeZone, Utc};
use valuation_core::{
    Action, CompanyArchetype, ConfidenceLevel, DiagnosticKind, FinancialSnapshot, IncomeStatement,
    PriceBar, QualityGrade, RiskLevel, StartupVerdict, ValuationConfig, ValuationMethod,
};
use valuation_orchestrator::{analyze, analyze_batch, ValuationEngine};

fn rising_history(start: f64, end: f64, days: usize) -> Vec<PriceBar> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let step = (end - start) / (days - 1) as f64;
    (0..days)
        .map(|i| {
            // small alternating wiggle so volatility is not zero
            let wiggle = if i % 2 == 0 { 0.3 } else { -0.3 };
            let close = if i == days - 1 { end } else { start + step * i as f64 + wiggle };
            PriceBar {
                timestamp: t0 + Duration::days(i as i64),
                open: close,
                high: close * 1.005,
                low: close * 0.995,
                close,
                volume: 5_000_000.0,
            }
        })
        .collect()
}

/// Large, high-quality cash generator priced well below its cash flows.
fn mature_snapshot() -> FinancialSnapshot {
    let mut s = FinancialSnapshot::new("MATURE");
    s.market.current_price = Some(150.0);
    s.market.market_cap = Some(1.5e12);
    s.market.beta = Some(1.0);
    s.market.shares_outstanding = Some(10e9);
    s.income = [
        (200e9, 400e9, 100e9),
        (190e9, 380e9, 95e9),
        (180e9, 360e9, 90e9),
        (170e9, 340e9, 85e9),
        (160e9, 320e9, 80e9),
    ]
    .into_iter()
    .map(|(ebitda, revenue, net_income)| IncomeStatement {
        ebitda: Some(ebitda),
        revenue: Some(revenue),
        net_income: Some(net_income),
    })
    .collect();
    s.free_cash_flow = vec![120e9, 115e9, 110e9, 105e9, 100e9];
    s.balance.total_debt = Some(50e9);
    s.balance.total_cash = Some(20e9);
    s.balance.book_value_per_share = Some(30.0);
    s.classification.sector = Some("Consumer Defensive".into());
    s.ratios.return_on_equity = Some(0.20);
    s.ratios.debt_to_equity = Some(0.20);
    s.ratios.current_ratio = Some(2.5);
    s.ratios.revenue_growth = Some(0.25);
    s.ratios.earnings_growth = Some(0.20);
    s.ratios.pe_ratio = Some(15.0);
    s.ratios.peg_ratio = Some(0.8);
    s.price_history = rising_history(110.0, 150.0, 252);
    s
}

/// Small loss-making company: $50M cash, $20M quarterly burn, 35% growth.
fn startup_snapshot() -> FinancialSnapshot {
    let mut s = FinancialSnapshot::new("BURN");
    s.market.current_price = Some(20.0);
    s.market.market_cap = Some(2e9);
    s.market.shares_outstanding = Some(100e6);
    s.free_cash_flow = vec![-80e6, -60e6];
    s.balance.total_cash = Some(50e6);
    s.income = [182.25e6, 135e6, 100e6]
        .into_iter()
        .map(|revenue| IncomeStatement {
            ebitda: Some(-40e6),
            revenue: Some(revenue),
            net_income: Some(-60e6),
        })
        .collect();
    s.classification.sector = Some("Technology".into());
    s
}

fn config() -> ValuationConfig {
    ValuationConfig {
        market_return: 0.10,
        ..ValuationConfig::default()
    }
}

#[test]
fn mature_company_with_dcf_upside_is_buy() {
    let rec = analyze(&mature_snapshot(), &config());

    assert_eq!(rec.archetype, CompanyArchetype::MatureProfitable);
    assert_eq!(rec.quality.grade, QualityGrade::A);

    let dcf = &rec.method_results[0];
    assert_eq!(dcf.method, ValuationMethod::Dcf);
    assert!(dcf.applicable);
    assert!(dcf.predicted_price.unwrap() > 150.0);
    assert!(dcf.upside_pct.unwrap() > 25.0);

    let detail = dcf.detail.as_ref().and_then(|d| d.as_dcf()).unwrap();
    assert!(detail.terminal_growth < detail.wacc);

    assert_eq!(rec.action, Action::Buy);
    assert_eq!(rec.confidence, ConfidenceLevel::High);
    assert!(rec.bullish_signals.len() >= rec.bearish_signals.len());
    assert!(!rec.next_steps.is_empty());
}

#[test]
fn startup_with_two_and_a_half_years_runway_is_watched() {
    let rec = analyze(&startup_snapshot(), &ValuationConfig::default());

    assert_eq!(rec.archetype, CompanyArchetype::StartupLossMaking);
    assert_eq!(rec.risk_level, RiskLevel::VeryHigh);

    let startup = rec
        .method_results
        .iter()
        .find(|r| r.method == ValuationMethod::Startup)
        .unwrap();
    let detail = startup.detail.as_ref().and_then(|d| d.as_startup()).unwrap();
    assert!((detail.runway_years.unwrap() - 2.5).abs() < 1e-9);
    assert!((detail.revenue_growth - 0.35).abs() < 1e-9);
    assert_eq!(detail.verdict, StartupVerdict::HoldWatch);

    // DCF and comparables do not run for startups
    for method in [ValuationMethod::Dcf, ValuationMethod::Comparable] {
        let r = rec.method_results.iter().find(|r| r.method == method).unwrap();
        assert!(!r.applicable);
    }

    assert_eq!(rec.action, Action::Monitor);
    assert_eq!(rec.confidence, ConfidenceLevel::Low);
}

#[test]
fn nothing_applicable_is_monitor_low() {
    let mut s = FinancialSnapshot::new("EMPTY");
    s.classification.sector = Some("Industrials".into());
    let rec = analyze(&s, &ValuationConfig::default());

    assert!(rec.method_results.iter().all(|r| !r.applicable));
    assert_eq!(rec.action, Action::Monitor);
    assert_eq!(rec.confidence, ConfidenceLevel::Low);
    assert!(rec
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::AggregateFailure));
}

#[test]
fn batch_preserves_input_order() {
    let snapshots = vec![startup_snapshot(), mature_snapshot(), FinancialSnapshot::new("EMPTY")];
    let recs = analyze_batch(&snapshots, &config());

    let symbols: Vec<&str> = recs.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BURN", "MATURE", "EMPTY"]);
    assert_eq!(recs[1], analyze(&snapshots[1], &config()));
}

#[test]
fn recommendation_survives_json() {
    let engine = ValuationEngine::new(config());
    let rec = engine.analyze(&mature_snapshot());

    let json = serde_json::to_string(&rec).unwrap();
    assert!(json.contains("\"action\":\"BUY\""));
    let back: valuation_core::Recommendation = serde_json::from_str(&json).unwrap();
    assert_eq!(back.action, rec.action);
    assert_eq!(back.method_results.len(), rec.method_results.len());
}

#[test]
fn snapshot_parses_from_sparse_json() {
    let json = r#"{"symbol": "SPARSE", "market": {"current_price": 12.5}}"#;
    let snapshot: FinancialSnapshot = serde_json::from_str(json).unwrap();
    let rec = analyze(&snapshot, &ValuationConfig::default());
    assert_eq!(rec.symbol, "SPARSE");
    assert_eq!(rec.action, Action::Monitor);
}

#[test]
fn startup_without_cash_data_is_not_avoided() {
    let mut s = startup_snapshot();
    s.balance.total_cash = None;
    let rec = analyze(&s, &ValuationConfig::default());

    let startup = rec
        .method_results
        .iter()
        .find(|r| r.method == ValuationMethod::Startup)
        .unwrap();
    assert!(!startup.applicable);
    assert!(startup
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::MissingData));
    assert_eq!(rec.action, Action::Monitor);
}
