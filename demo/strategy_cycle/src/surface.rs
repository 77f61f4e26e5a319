//! Surface inputs: CSV files and a synthetic generator.

use std::path::Path;

use csv::ReaderBuilder;
use pricer_core::market_data::curves::RateCurve;
use pricer_core::market_data::surfaces::VolSurfacePoint;
use pricer_core::types::{year_fraction, Date};
use pricer_models::models::HestonParams;
use pricer_models::pricing::{HestonPricer, PricingConfig};
use tracing::info;

use crate::error::DemoError;

/// Days to expiry of the synthetic surface.
pub const SYNTHETIC_EXPIRIES: [i64; 6] = [14, 30, 45, 60, 91, 182];

/// Strike / spot ratios of the synthetic surface.
pub const SYNTHETIC_MONEYNESS: [f64; 9] = [0.9, 0.925, 0.95, 0.975, 1.0, 1.025, 1.05, 1.075, 1.1];

/// Parameters the synthetic surface is generated from.
pub fn synthetic_params() -> HestonParams {
    HestonParams::new(0.045, 1.8, 0.45, -0.65, 0.035)
}

/// Read quotes from a CSV file.
///
/// Columns: `strike`, `expiry` (`YYYY-MM-DD`), `implied_vol`, and optionally
/// `volume`, `bid`, `ask`, `option_type` (`call`/`put`).
pub fn read_surface(path: &Path) -> Result<Vec<VolSurfacePoint>, DemoError> {
    let mut reader = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_path(path)?;
    let mut quotes = Vec::new();
    for row in reader.deserialize() {
        let quote: VolSurfacePoint = row?;
        quote
            .validate()
            .map_err(|e| DemoError::surface(format!("{}: {e}", path.display())))?;
        quotes.push(quote);
    }
    if quotes.is_empty() {
        return Err(DemoError::surface(format!("{} has no quotes", path.display())));
    }
    info!(path = %path.display(), quotes = quotes.len(), "loaded surface");
    Ok(quotes)
}

/// Heston-generated surface with small deterministic noise.
///
/// From `cycle` 1 onward one wing node (95% strike, 30 days) is dislocated
/// upward by four vol points.
pub fn synthetic_surface(
    valuation: Date,
    spot: f64,
    rates: &dyn RateCurve,
    dividends: &dyn RateCurve,
    cycle: usize,
) -> Result<Vec<VolSurfacePoint>, DemoError> {
    let pricer = HestonPricer::new(synthetic_params(), PricingConfig::default())?;
    let mut quotes = Vec::with_capacity(SYNTHETIC_EXPIRIES.len() * SYNTHETIC_MONEYNESS.len());

    for (j, &days) in SYNTHETIC_EXPIRIES.iter().enumerate() {
        let expiry = valuation.add_days(days);
        let t = year_fraction(valuation, expiry);
        let (r, q) = (rates.rate(t), dividends.rate(t));
        for (i, &m) in SYNTHETIC_MONEYNESS.iter().enumerate() {
            let strike = (spot * m * 2.0).round() / 2.0;
            let noise = 0.0015 * (((i * 31 + j * 17 + cycle * 7) % 11) as f64 - 5.0) / 5.0;
            let dislocation = if cycle > 0 && i == 2 && j == 1 { 0.04 } else { 0.0 };
            let iv = pricer.model_implied_vol(spot, strike, t, r, q)? + noise + dislocation;
            let volume = 10.0 + 1_000.0 * (-m.ln().powi(2) / 0.005).exp();
            quotes.push(VolSurfacePoint::new(strike, expiry, iv).with_volume(volume.round()));
        }
    }
    Ok(quotes)
}
