//! Configuration for the RANSAC primitive fitter.

use serde::{Deserialize, Serialize};

use crate::Tolerance;

/// Inclusive radius window a candidate must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeBounds {
    pub min_radius: f64,
    pub max_radius: f64,
}

impl ShapeBounds {
    pub fn new(min_radius: f64, max_radius: f64) -> Self {
        Self {
            min_radius,
            max_radius,
        }
    }

    pub fn contains(&self, radius: f64) -> bool {
        radius >= self.min_radius && radius <= self.max_radius
    }
}

/// Parameters for one `fit` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Upper bound on sampling iterations.
    pub max_iterations: usize,
    /// A point is an inlier iff its residual is at most this.
    pub distance_threshold: f64,
    /// Radius window for circle, sphere and cylinder candidates.
    pub bounds: Option<ShapeBounds>,
    /// A candidate must explain at least this fraction of the input.
    pub min_inlier_ratio: f64,
    /// Fixed RNG seed. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Grid cell size for boundary-biased circle sampling. `None` samples
    /// from the whole projected set.
    pub boundary_cell_size: Option<f64>,
    /// Cap on points used to estimate a cylinder radius per iteration.
    pub cylinder_probe_size: usize,
    pub tolerance: Tolerance,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            distance_threshold: 0.5,
            bounds: None,
            min_inlier_ratio: 0.0,
            seed: None,
            boundary_cell_size: None,
            cylinder_probe_size: 64,
            tolerance: Tolerance::default(),
        }
    }
}

impl RansacConfig {
    /// Settings for ring and hole inspection: boundary sampling at twice
    /// the distance threshold.
    pub fn ring_inspection(distance_threshold: f64, bounds: ShapeBounds) -> Self {
        Self {
            distance_threshold,
            bounds: Some(bounds),
            boundary_cell_size: Some(2.0 * distance_threshold),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if self.max_iterations == 0 {
            return Err(FitError::invalid("max_iterations", "must be greater than 0"));
        }
        if !(self.distance_threshold.is_finite() && self.distance_threshold > 0.0) {
            return Err(FitError::invalid(
                "distance_threshold",
                format!("must be a positive number, got {}", self.distance_threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_inlier_ratio) {
            return Err(FitError::invalid(
                "min_inlier_ratio",
                format!("must be within [0, 1], got {}", self.min_inlier_ratio),
            ));
        }
        if let Some(bounds) = self.bounds {
            if !(bounds.min_radius > 0.0 && bounds.max_radius > 0.0) {
                return Err(FitError::invalid("bounds", "radii must be positive"));
            }
            if bounds.min_radius > bounds.max_radius {
                return Err(FitError::invalid(
                    "bounds",
                    format!(
                        "min_radius {} exceeds max_radius {}",
                        bounds.min_radius, bounds.max_radius
                    ),
                ));
            }
        }
        if let Some(cell) = self.boundary_cell_size {
            if !(cell.is_finite() && cell > 0.0) {
                return Err(FitError::invalid(
                    "boundary_cell_size",
                    format!("must be a positive number, got {cell}"),
                ));
            }
        }
        if self.cylinder_probe_size == 0 {
            return Err(FitError::invalid("cylinder_probe_size", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Errors from fitter construction. Geometric failures are never errors;
/// they come back as the no-fit sentinel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl FitError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RansacConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_iterations() {
        let cfg = RansacConfig {
            max_iterations: 0,
            ..RansacConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(FitError::InvalidParameter {
                name: "max_iterations",
                ..
            })
        ));
    }

    #[test]
    fn rejects_bad_threshold_and_ratio() {
        for threshold in [0.0, -1.0, f64::NAN] {
            let cfg = RansacConfig {
                distance_threshold: threshold,
                ..RansacConfig::default()
            };
            assert!(cfg.validate().is_err());
        }
        let cfg = RansacConfig {
            min_inlier_ratio: 1.5,
            ..RansacConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let cfg = RansacConfig {
            bounds: Some(ShapeBounds::new(10.0, 5.0)),
            ..RansacConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RansacConfig {
            bounds: Some(ShapeBounds::new(0.0, 5.0)),
            ..RansacConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ring_preset_sets_cell_size() {
        let cfg = RansacConfig::ring_inspection(0.5, ShapeBounds::new(1.0, 10.0));
        assert_eq!(cfg.boundary_cell_size, Some(1.0));
        assert!(cfg.validate().is_ok());
    }
}
