//! Box constraints for optimisation.

/// Closed interval `[min, max]` for one parameter.
///
/// ```
/// use pricer_core::math::solvers::ParameterBounds;
///
/// let b = ParameterBounds::new(0.5, 5.0);
/// assert!(b.contains(2.0));
/// assert_eq!(b.clamp(7.0), 5.0);
/// assert_eq!(b.width(), 4.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterBounds {
    /// Minimum allowed value.
    pub min: f64,
    /// Maximum allowed value.
    pub max: f64,
}

impl ParameterBounds {
    /// Create new bounds.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Finite, non-empty interval.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Whether `value` lies in the interval (NaN never does).
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Project `value` onto the interval.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// `max - min`.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Whether every coordinate lies inside its bounds.
pub fn within_bounds(x: &[f64], bounds: &[ParameterBounds]) -> bool {
    x.len() == bounds.len() && x.iter().zip(bounds).all(|(&v, b)| b.contains(v))
}

/// Coordinate-wise projection onto the box.
pub fn project(x: &[f64], bounds: &[ParameterBounds]) -> Vec<f64> {
    x.iter().zip(bounds).map(|(&v, b)| b.clamp(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_outside() {
        let b = ParameterBounds::new(0.0, 1.0);
        assert!(!b.contains(f64::NAN));
    }

    #[test]
    fn test_within_bounds_checks_length() {
        let bounds = [ParameterBounds::new(0.0, 1.0), ParameterBounds::new(-1.0, 0.0)];
        assert!(within_bounds(&[0.5, -0.5], &bounds));
        assert!(!within_bounds(&[0.5], &bounds));
        assert!(!within_bounds(&[0.5, 0.5], &bounds));
    }

    #[test]
    fn test_project() {
        let bounds = [ParameterBounds::new(0.0, 1.0), ParameterBounds::new(-1.0, 0.0)];
        assert_eq!(project(&[2.0, -3.0], &bounds), vec![1.0, -1.0]);
    }

    #[test]
    fn test_is_valid() {
        assert!(ParameterBounds::new(1.0, 1.0).is_valid());
        assert!(!ParameterBounds::new(2.0, 1.0).is_valid());
        assert!(!ParameterBounds::new(0.0, f64::INFINITY).is_valid());
    }
}
