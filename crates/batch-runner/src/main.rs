//! batch-runner: value a batch of financial snapshots from a JSON file.
//!
//! Reads a JSON array of snapshots, runs every valuation method on each in
//! parallel and writes a JSON array of recommendations in the same order.
//!
//! Usage:
//!   cargo run -p batch-runner -- --input snapshots.json
//!   cargo run -p batch-runner -- --input snapshots.json --config config.json --output out.json --pretty
//!
//! Without `--config`, configuration comes from `VALUATION_*` environment
//! variables (a `.env` file is loaded first).

use anyhow::{bail, Context};
use std::fs;
use valuation_core::{Action, FinancialSnapshot, Recommendation, ValuationConfig};
use valuation_orchestrator::ValuationEngine;

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn load_config(path: Option<&str>) -> anyhow::Result<ValuationConfig> {
    let config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            let config: ValuationConfig = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {path}"))?;
            config.validate()?;
            config
        }
        None => ValuationConfig::from_env()?,
    };
    Ok(config)
}

fn print_summary(recommendations: &[Recommendation]) {
    let count = |action: Action| recommendations.iter().filter(|r| r.action == action).count();
    tracing::info!(
        total = recommendations.len(),
        buy = count(Action::Buy) + count(Action::StrongBuy),
        speculative_buy = count(Action::SpeculativeBuy),
        hold = count(Action::Hold),
        sell = count(Action::Sell) + count(Action::StrongSell),
        avoid = count(Action::Avoid),
        monitor = count(Action::Monitor),
        "Batch complete"
    );
    for rec in recommendations {
        tracing::info!(
            "{:<8} {:<16} {:<15} {:<14} target={}",
            rec.symbol,
            rec.archetype.name(),
            rec.action.to_label(),
            rec.confidence.to_label(),
            rec.consensus
                .target_price
                .map(|t| format!("{t:.2}"))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batch_runner=info,valuation_orchestrator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let pretty = args.iter().any(|a| a == "--pretty");
    let Some(input) = arg_value(&args, "--input") else {
        bail!("usage: batch-runner --input snapshots.json [--config config.json] [--output out.json] [--pretty]");
    };
    let output = arg_value(&args, "--output");

    let config = load_config(arg_value(&args, "--config"))?;
    let engine = ValuationEngine::try_new(config)?;

    let raw = fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?;
    let snapshots: Vec<FinancialSnapshot> =
        serde_json::from_str(&raw).with_context(|| format!("{input} is not a JSON array of snapshots"))?;
    tracing::info!("Loaded {} snapshots from {}", snapshots.len(), input);

    let recommendations = engine.analyze_batch(&snapshots);
    print_summary(&recommendations);

    let json = if pretty {
        serde_json::to_string_pretty(&recommendations)?
    } else {
        serde_json::to_string(&recommendations)?
    };

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {path}"))?;
            tracing::info!("Wrote {} recommendations to {}", recommendations.len(), path);
        }
        None => println!("{json}"),
    }

    Ok(())
}
