//! Infinite 3D line through two points, bounded by its inlier extent.

use inspect_types::{Point3d, Primitive, Vec3};

use super::Estimator;
use crate::Tolerance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineModel {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl LineModel {
    pub fn through(p0: &Point3d, p1: &Point3d, tol: &Tolerance) -> Option<Self> {
        let d = *p1 - *p0;
        if tol.is_degenerate(d.length()) {
            return None;
        }
        Some(Self {
            origin: *p0,
            direction: d.normalized()?,
        })
    }

    /// Signed position of the projection of `p` along the line.
    pub fn parameter(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.direction)
    }

    pub fn distance(&self, p: &Point3d) -> f64 {
        (*p - self.origin).cross(&self.direction).length()
    }
}

pub struct LineEstimator {
    pub tolerance: Tolerance,
}

impl Estimator for LineEstimator {
    type Point = Point3d;
    type Model = LineModel;

    fn sample_size(&self) -> usize {
        2
    }

    fn solve(&self, data: &[Point3d], sample: &[usize]) -> Option<LineModel> {
        LineModel::through(&data[sample[0]], &data[sample[1]], &self.tolerance)
    }

    fn residual(&self, model: &LineModel, p: &Point3d) -> f64 {
        model.distance(p)
    }

    fn finish(&self, model: &LineModel, data: &[Point3d], inliers: &[usize]) -> Primitive {
        let mut t_min = f64::INFINITY;
        let mut t_max = f64::NEG_INFINITY;
        for &i in inliers {
            let t = model.parameter(&data[i]);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }
        if inliers.is_empty() {
            t_min = 0.0;
            t_max = 0.0;
        }
        Primitive::Line {
            origin: model.origin,
            direction: model.direction,
            start: model.origin + model.direction * t_min,
            end: model.origin + model.direction * t_max,
            length: t_max - t_min,
        }
    }
}
