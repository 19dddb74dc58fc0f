use inspect_types::{Point3d, Primitive};
use nalgebra::{Matrix3, Vector3};

use super::Estimator;
use crate::Tolerance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereModel {
    pub center: Point3d,
    pub radius: f64,
}

/// Sphere through four points.
///
/// Subtracting `|p0 - c|² = r²` from the other three equations leaves the
/// linear system `2 (pi - p0) · c = |pi|² - |p0|²`. Coplanar samples make
/// it singular.
pub fn circumsphere(pts: [&Point3d; 4], tol: &Tolerance) -> Option<SphereModel> {
    let p0 = pts[0].to_vec3();
    let row = |p: &Point3d| {
        let d = p.to_vec3() - p0;
        [2.0 * d.x, 2.0 * d.y, 2.0 * d.z]
    };
    let rhs = |p: &Point3d| p.to_vec3().length_squared() - p0.length_squared();

    let [r1, r2, r3] = [row(pts[1]), row(pts[2]), row(pts[3])];
    let a = Matrix3::new(
        r1[0], r1[1], r1[2], //
        r2[0], r2[1], r2[2], //
        r3[0], r3[1], r3[2],
    );
    if tol.is_degenerate(a.determinant()) {
        return None;
    }
    let b = Vector3::new(rhs(pts[1]), rhs(pts[2]), rhs(pts[3]));
    let c = a.lu().solve(&b)?;
    let center = Point3d::new(c.x, c.y, c.z);
    let radius = center.distance_to(pts[0]);
    if !radius.is_finite() {
        return None;
    }
    Some(SphereModel { center, radius })
}

pub struct SphereEstimator {
    pub tolerance: Tolerance,
}

impl Estimator for SphereEstimator {
    type Point = Point3d;
    type Model = SphereModel;

    fn sample_size(&self) -> usize {
        4
    }

    fn solve(&self, data: &[Point3d], sample: &[usize]) -> Option<SphereModel> {
        circumsphere(
            [
                &data[sample[0]],
                &data[sample[1]],
                &data[sample[2]],
                &data[sample[3]],
            ],
            &self.tolerance,
        )
    }

    fn residual(&self, model: &SphereModel, p: &Point3d) -> f64 {
        (model.center.distance_to(p) - model.radius).abs()
    }

    fn radius(&self, model: &SphereModel) -> Option<f64> {
        Some(model.radius)
    }

    fn finish(&self, model: &SphereModel, _data: &[Point3d], _inliers: &[usize]) -> Primitive {
        Primitive::Sphere {
            center: model.center,
            radius: model.radius,
        }
    }
}
