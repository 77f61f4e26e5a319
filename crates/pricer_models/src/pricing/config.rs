//! Pricer configuration.

use pricer_core::math::CompositeRule;
use pricer_core::types::PricingError;

use crate::analytical::ImpliedVolConfig;

/// Quadrature and inversion settings for [`super::HestonPricer`].
///
/// The Fourier integral is truncated at `integration_upper` and split into
/// panels `[0, w], [w, 2w], [2w, 4w], ...` with `w = first_panel_width`;
/// the last panel ends exactly at the truncation point. Each panel gets a
/// `nodes_per_panel`-point Gauss-Legendre rule.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PricingConfig {
    /// Truncation point of the Fourier integral.
    pub integration_upper: f64,
    /// Width of the first panel.
    pub first_panel_width: f64,
    /// Gauss-Legendre order per panel.
    pub nodes_per_panel: usize,
    /// Black-Scholes inversion settings.
    pub implied_vol: ImpliedVolConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            integration_upper: 100.0,
            first_panel_width: 0.25,
            nodes_per_panel: 16,
            implied_vol: ImpliedVolConfig::default(),
        }
    }
}

impl PricingConfig {
    /// Check that the quadrature layout is usable.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !(self.integration_upper.is_finite() && self.integration_upper > 0.0) {
            return Err(PricingError::invalid_input(format!(
                "integration_upper must be positive, got {}",
                self.integration_upper
            )));
        }
        if !(self.first_panel_width.is_finite() && self.first_panel_width > 0.0) {
            return Err(PricingError::invalid_input(format!(
                "first_panel_width must be positive, got {}",
                self.first_panel_width
            )));
        }
        if self.nodes_per_panel < 2 {
            return Err(PricingError::invalid_input(
                "nodes_per_panel must be at least 2",
            ));
        }
        let iv = &self.implied_vol;
        if !(iv.min_vol > 0.0 && iv.min_vol < iv.max_vol && iv.max_vol.is_finite()) {
            return Err(PricingError::invalid_input(format!(
                "implied vol clamp [{}, {}] is not a valid interval",
                iv.min_vol, iv.max_vol
            )));
        }
        Ok(())
    }

    /// Panel breakpoints, doubling from `first_panel_width`.
    ///
    /// ```
    /// use pricer_models::pricing::PricingConfig;
    ///
    /// let breaks = PricingConfig::default().breakpoints();
    /// assert_eq!(breaks, vec![0.0, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 100.0]);
    /// ```
    pub fn breakpoints(&self) -> Vec<f64> {
        let upper = self.integration_upper;
        let mut breaks = vec![0.0];
        let mut edge = self.first_panel_width.min(upper);
        while edge < upper {
            breaks.push(edge);
            edge *= 2.0;
        }
        breaks.push(upper);
        breaks
    }

    /// Build the composite rule described by this configuration.
    pub fn build_rule(&self) -> Result<CompositeRule, PricingError> {
        self.validate()?;
        Ok(CompositeRule::new(&self.breakpoints(), self.nodes_per_panel)?)
    }
}
