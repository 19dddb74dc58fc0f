//! Circle through three points in a projection plane.

use inspect_types::{Point2d, Primitive};

use super::Estimator;
use crate::projection::ProjectionFrame;
use crate::Tolerance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle2d {
    pub center: Point2d,
    pub radius: f64,
}

/// Circumcircle of `a`, `b`, `c`, or `None` when the points are
/// (nearly) collinear.
pub fn circumcircle(a: &Point2d, b: &Point2d, c: &Point2d, tol: &Tolerance) -> Option<Circle2d> {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if tol.is_degenerate(cross) {
        return None;
    }
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if tol.is_degenerate(d) {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let center = Point2d::new(ux, uy);
    let radius = center.distance_to(a);
    if !radius.is_finite() {
        return None;
    }
    Some(Circle2d { center, radius })
}

/// Circle estimator over points already projected into `frame`.
pub struct CircleEstimator {
    pub frame: ProjectionFrame,
    pub tolerance: Tolerance,
}

impl Estimator for CircleEstimator {
    type Point = Point2d;
    type Model = Circle2d;

    fn sample_size(&self) -> usize {
        3
    }

    fn solve(&self, data: &[Point2d], sample: &[usize]) -> Option<Circle2d> {
        circumcircle(
            &data[sample[0]],
            &data[sample[1]],
            &data[sample[2]],
            &self.tolerance,
        )
    }

    fn residual(&self, model: &Circle2d, p: &Point2d) -> f64 {
        (model.center.distance_to(p) - model.radius).abs()
    }

    fn radius(&self, model: &Circle2d) -> Option<f64> {
        Some(model.radius)
    }

    fn finish(&self, model: &Circle2d, _data: &[Point2d], _inliers: &[usize]) -> Primitive {
        Primitive::Circle {
            center: self.frame.lift(&model.center),
            radius: model.radius,
            normal: self.frame.normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn circumcircle_of_right_triangle() {
        let c = circumcircle(
            &Point2d::new(0.0, 0.0),
            &Point2d::new(4.0, 0.0),
            &Point2d::new(0.0, 3.0),
            &Tolerance::default(),
        )
        .unwrap();
        assert_relative_eq!(c.center.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(c.center.y, 1.5, epsilon = 1e-12);
        assert_relative_eq!(c.radius, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn collinear_is_degenerate() {
        let c = circumcircle(
            &Point2d::new(0.0, 0.0),
            &Point2d::new(1.0, 1.0),
            &Point2d::new(2.0, 2.0),
            &Tolerance::default(),
        );
        assert!(c.is_none());
    }

    #[test]
    fn coincident_is_degenerate() {
        let p = Point2d::new(1.0, 2.0);
        assert!(circumcircle(&p, &p, &Point2d::new(3.0, 0.0), &Tolerance::default()).is_none());
    }
}
