pub mod boundary;
pub mod cancel;
pub mod config;
pub mod fitter;
pub mod projection;
pub mod sampling;
pub mod shapes;

pub use boundary::BoundaryExtractor;
pub use cancel::CancelToken;
pub use config::{FitError, RansacConfig, ShapeBounds};
pub use fitter::{FitReport, PrimitiveFitter};
pub use projection::{select_circle_frame, ProjectionFrame};

use inspect_types::DEGENERATE_EPS;

/// Numeric guards shared by the shape solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Cross-product lengths and determinants below this reject a sample.
    pub degenerate: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            degenerate: DEGENERATE_EPS,
        }
    }
}

impl Tolerance {
    pub fn is_degenerate(&self, magnitude: f64) -> bool {
        !magnitude.is_finite() || magnitude.abs() < self.degenerate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_guard() {
        let tol = Tolerance::default();
        assert!(tol.is_degenerate(0.0));
        assert!(tol.is_degenerate(-1e-12));
        assert!(tol.is_degenerate(f64::NAN));
        assert!(!tol.is_degenerate(1e-6));
    }
}
