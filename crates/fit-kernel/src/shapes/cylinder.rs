//! Approximate cylinder from three surface samples.
//!
//! The axis is the normal of the sample triangle and passes through its
//! centroid. That is exact only for triples taken around one cross-section,
//! which RANSAC eventually draws on ring-like scans. The radius comes from a
//! bounded probe subset so each iteration stays cheap; scoring and the final
//! inlier pass still see every point.

use inspect_types::{Point3d, Primitive, Vec3};

use super::Estimator;
use crate::sampling::strided_indices;
use crate::Tolerance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderModel {
    pub axis_point: Point3d,
    pub axis_direction: Vec3,
    pub radius: f64,
}

impl CylinderModel {
    pub fn axial_distance(&self, p: &Point3d) -> f64 {
        (*p - self.axis_point).cross(&self.axis_direction).length()
    }

    pub fn axial_parameter(&self, p: &Point3d) -> f64 {
        (*p - self.axis_point).dot(&self.axis_direction)
    }
}

pub struct CylinderEstimator {
    pub tolerance: Tolerance,
    /// Indices used for per-candidate radius estimation.
    pub probe: Vec<usize>,
}

impl CylinderEstimator {
    pub fn new(n: usize, probe_size: usize, tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            probe: strided_indices(n, probe_size),
        }
    }
}

impl Estimator for CylinderEstimator {
    type Point = Point3d;
    type Model = CylinderModel;

    fn sample_size(&self) -> usize {
        3
    }

    fn solve(&self, data: &[Point3d], sample: &[usize]) -> Option<CylinderModel> {
        let (p0, p1, p2) = (&data[sample[0]], &data[sample[1]], &data[sample[2]]);
        let cross = (*p1 - *p0).cross(&(*p2 - *p0));
        if self.tolerance.is_degenerate(cross.length()) {
            return None;
        }
        let axis_direction = cross.normalized()?;
        let axis_point = Point3d::centroid(&[*p0, *p1, *p2])?;

        if self.probe.is_empty() {
            return None;
        }
        let partial = CylinderModel {
            axis_point,
            axis_direction,
            radius: 0.0,
        };
        let radius = self
            .probe
            .iter()
            .map(|&i| partial.axial_distance(&data[i]))
            .sum::<f64>()
            / self.probe.len() as f64;
        if self.tolerance.is_degenerate(radius) {
            return None;
        }
        Some(CylinderModel { radius, ..partial })
    }

    fn residual(&self, model: &CylinderModel, p: &Point3d) -> f64 {
        (model.axial_distance(p) - model.radius).abs()
    }

    fn radius(&self, model: &CylinderModel) -> Option<f64> {
        Some(model.radius)
    }

    fn finish(&self, model: &CylinderModel, data: &[Point3d], inliers: &[usize]) -> Primitive {
        let mut t_min = f64::INFINITY;
        let mut t_max = f64::NEG_INFINITY;
        for &i in inliers {
            let t = model.axial_parameter(&data[i]);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }
        let height = if inliers.is_empty() { 0.0 } else { t_max - t_min };
        Primitive::Cylinder {
            axis_point: model.axis_point,
            axis_direction: model.axis_direction,
            radius: model.radius,
            height,
        }
    }
}
