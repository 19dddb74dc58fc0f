//! RANSAC primitive fitting entry point.

use inspect_types::{FitResult, Point3d, RegionDescriptor, ShapeKind};
use tracing::{info, instrument};

use crate::boundary::BoundaryExtractor;
use crate::cancel::CancelToken;
use crate::config::{FitError, RansacConfig};
use crate::projection::select_circle_frame;
use crate::sampling::make_rng;
use crate::shapes::circle::CircleEstimator;
use crate::shapes::cylinder::CylinderEstimator;
use crate::shapes::line::LineEstimator;
use crate::shapes::plane::PlaneEstimator;
use crate::shapes::sphere::SphereEstimator;
use crate::shapes::{run_consensus, ConsensusOutcome, Estimator};

/// A fit result plus how the search went.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub result: FitResult,
    /// RANSAC iterations started before finishing or being cancelled.
    pub iterations: usize,
    /// Number of points samples were drawn from.
    pub sample_pool: usize,
}

/// Robust fitter for circles, lines, planes, spheres and cylinders.
///
/// Too few points and failed consensus are data outcomes, not errors: both
/// return [`FitResult::no_fit`]. The input is never modified.
#[derive(Debug, Clone)]
pub struct PrimitiveFitter {
    config: RansacConfig,
}

impl PrimitiveFitter {
    pub fn new(config: RansacConfig) -> Result<Self, FitError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RansacConfig {
        &self.config
    }

    /// Fit `shape` to `points`.
    ///
    /// `region_hint` only affects circles, where a cylindrical region
    /// fixes the projection plane. Cancellation returns the best candidate
    /// accepted so far.
    pub fn fit(
        &self,
        points: &[Point3d],
        shape: ShapeKind,
        cancel: &CancelToken,
        region_hint: Option<&RegionDescriptor>,
    ) -> FitResult {
        self.fit_with_report(points, shape, cancel, region_hint).result
    }

    /// [`fit`](Self::fit), also reporting iteration and pool counts.
    #[instrument(skip(self, points, cancel, region_hint), fields(n = points.len()))]
    pub fn fit_with_report(
        &self,
        points: &[Point3d],
        shape: ShapeKind,
        cancel: &CancelToken,
        region_hint: Option<&RegionDescriptor>,
    ) -> FitReport {
        if points.len() < shape.min_points() {
            info!(
                needed = shape.min_points(),
                got = points.len(),
                "insufficient points for fit"
            );
            return FitReport {
                result: FitResult::no_fit(shape),
                iterations: 0,
                sample_pool: points.len(),
            };
        }

        let tolerance = self.config.tolerance;
        let report = match shape {
            ShapeKind::Circle => self.fit_circle(points, cancel, region_hint),
            ShapeKind::Line => self.fit_3d(shape, &LineEstimator { tolerance }, points, cancel),
            ShapeKind::Plane => self.fit_3d(shape, &PlaneEstimator { tolerance }, points, cancel),
            ShapeKind::Sphere => {
                self.fit_3d(shape, &SphereEstimator { tolerance }, points, cancel)
            }
            ShapeKind::Cylinder => {
                let estimator =
                    CylinderEstimator::new(points.len(), self.config.cylinder_probe_size, tolerance);
                self.fit_3d(shape, &estimator, points, cancel)
            }
        };

        let result = &report.result;
        if result.is_fit() {
            info!(
                shape = %shape,
                inliers = result.inlier_count,
                fit_error = result.fit_error,
                radius = ?result.radius(),
                iterations = report.iterations,
                "fit accepted"
            );
        } else {
            info!(shape = %shape, iterations = report.iterations, "no convergent model");
        }
        report
    }

    fn fit_3d<E>(
        &self,
        shape: ShapeKind,
        estimator: &E,
        points: &[Point3d],
        cancel: &CancelToken,
    ) -> FitReport
    where
        E: Estimator<Point = Point3d>,
    {
        let pool: Vec<usize> = (0..points.len()).collect();
        let mut rng = make_rng(self.config.seed);
        let outcome = run_consensus(estimator, points, &pool, &self.config, cancel, &mut rng);
        build_report(shape, estimator, points, points, pool.len(), outcome)
    }

    fn fit_circle(
        &self,
        points: &[Point3d],
        cancel: &CancelToken,
        region_hint: Option<&RegionDescriptor>,
    ) -> FitReport {
        let frame = select_circle_frame(points, region_hint);
        let projected = frame.project_all(points);
        let pool = match self.config.boundary_cell_size {
            Some(cell) => BoundaryExtractor::new(cell).extract_indices(&projected),
            None => (0..projected.len()).collect(),
        };
        let estimator = CircleEstimator {
            frame,
            tolerance: self.config.tolerance,
        };
        let mut rng = make_rng(self.config.seed);
        let outcome = run_consensus(&estimator, &projected, &pool, &self.config, cancel, &mut rng);
        build_report(ShapeKind::Circle, &estimator, &projected, points, pool.len(), outcome)
    }
}

/// Turn a consensus over `data` into a report whose inliers are the
/// matching `originals`.
fn build_report<E: Estimator>(
    shape: ShapeKind,
    estimator: &E,
    data: &[E::Point],
    originals: &[Point3d],
    sample_pool: usize,
    outcome: ConsensusOutcome<E::Model>,
) -> FitReport {
    let result = match outcome.best {
        None => FitResult::no_fit(shape),
        Some(best) => FitResult {
            shape,
            model: Some(estimator.finish(&best.model, data, &best.inliers)),
            inlier_count: best.inliers.len(),
            fit_error: best.mean_residual,
            inliers: best.inliers.iter().map(|&i| originals[i]).collect(),
        },
    };
    FitReport {
        result,
        iterations: outcome.iterations,
        sample_pool,
    }
}
