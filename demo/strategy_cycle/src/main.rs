//! Strategy cycle demo CLI
//!
//! Runs calibration, model-surface regeneration and signal generation for
//! one underlying over a CSV or synthetic surface.
//!
//! ```text
//! strategy-cycle --spot 100 --cycles 3
//! strategy-cycle --config data/strategy.toml --surface data/sample_surface.csv --as-of 2024-01-02 --json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use infra_config::StrategyConfig;
use pricer_core::market_data::curves::FlatCurve;
use pricer_core::types::Date;
use strategy_cycle::surface::{read_surface, synthetic_surface};
use strategy_cycle::{CycleReport, MarketInputs, StrategyCycle};
use strategy_signals::OpenGate;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Heston mispricing strategy cycle
#[derive(Parser)]
#[command(name = "strategy-cycle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Strategy configuration file (TOML); HESTON__* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spot price of the underlying
    #[arg(short, long, default_value_t = 100.0)]
    spot: f64,

    /// Surface CSV; a synthetic surface is generated when omitted
    #[arg(long)]
    surface: Option<PathBuf>,

    /// Flat risk-free rate
    #[arg(long, default_value_t = 0.05)]
    rate: f64,

    /// Flat dividend yield
    #[arg(long, default_value_t = 0.02)]
    dividend: f64,

    /// Number of cycles to run
    #[arg(short = 'n', long, default_value_t = 1)]
    cycles: usize,

    /// Valuation date (YYYY-MM-DD); cycles start at 15:00 UTC on it. Defaults to now
    #[arg(long)]
    as_of: Option<Date>,

    /// Minutes between simulated cycles
    #[arg(long, default_value_t = 5)]
    interval_minutes: i64,

    /// Ignore the session gate
    #[arg(long)]
    ignore_session: bool,

    /// Print reports as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = StrategyConfig::load(cli.config.as_deref()).context("loading strategy configuration")?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    info!(underlying = %config.underlying, cycles = cli.cycles, "strategy cycle starting");

    let mut strategy = if cli.ignore_session {
        StrategyCycle::with_gate(&config, Box::new(OpenGate))?
    } else {
        StrategyCycle::new(&config)?
    };
    let (rates, dividends) = (FlatCurve::new(cli.rate), FlatCurve::new(cli.dividend));
    let file_surface = cli.surface.as_deref().map(read_surface).transpose()?;

    let start = match cli.as_of {
        Some(date) => date
            .into_inner()
            .and_hms_opt(15, 0, 0)
            .map(|t| t.and_utc())
            .context("building cycle start time")?,
        None => Utc::now(),
    };
    for cycle in 0..cli.cycles {
        let now = start + Duration::minutes(cli.interval_minutes.saturating_mul(cycle as i64));
        let surface = match &file_surface {
            Some(quotes) => quotes.clone(),
            None => synthetic_surface(Date::from(now.date_naive()), cli.spot, &rates, &dividends, cycle)?,
        };
        let report = strategy.run(&MarketInputs {
            now,
            surface: &surface,
            spot: cli.spot,
            rates: &rates,
            dividends: &dividends,
        });
        if cli.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_report(&report);
        }
    }

    let status = strategy.calibrator().status();
    info!(
        calibrated = status.calibrated,
        rejections = status.rejection_count,
        "strategy cycle finished"
    );
    Ok(())
}

fn print_report(report: &CycleReport) {
    let c = &report.calibration;
    println!("=== cycle {} ({}) {} ===", report.cycle, report.underlying, report.timestamp);
    println!(
        "calibration: {} rmse={:.5} quotes={} stage={:?} {:.0}ms",
        if c.accepted { "ACCEPTED" } else { "REJECTED" },
        c.rmse,
        c.quotes_used,
        c.stage,
        c.duration_ms
    );
    if let Some(reason) = &c.reason {
        println!("  reason: {reason}");
    }
    for (check, status) in &c.checks {
        println!("  {check:<18} {status}");
    }
    if let Some(p) = &report.live_params {
        println!(
            "live params: theta={:.4} kappa={:.3} xi={:.3} rho={:.3} v0={:.4}",
            p.theta, p.kappa, p.xi, p.rho, p.v0
        );
    }
    println!("nodes scored: {}", report.nodes_scored);
    for s in &report.signals {
        println!(
            "  {:<4} {} {:>8.2} {} z={:+.3} smoothed={:.3} threshold={:.3}",
            s.direction.as_str(),
            s.option_type.code(), s.strike, s.expiry, s.raw_z, s.smoothed_z, s.threshold
        );
    }
    for e in &report.exits {
        println!("  EXIT {} |z|={:.3} ({})", e.position_ref, e.current_z, e.reason);
    }
    println!("open positions: {}", report.open_positions);
}
