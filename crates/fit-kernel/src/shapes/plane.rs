use inspect_types::{Point3d, Primitive, Vec3};

use super::Estimator;
use crate::Tolerance;

/// Plane in `normal · p + offset = 0` form with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    pub normal: Vec3,
    pub offset: f64,
}

impl PlaneModel {
    pub fn through(p0: &Point3d, p1: &Point3d, p2: &Point3d, tol: &Tolerance) -> Option<Self> {
        let cross = (*p1 - *p0).cross(&(*p2 - *p0));
        if tol.is_degenerate(cross.length()) {
            return None;
        }
        let normal = cross.normalized()?;
        Some(Self {
            normal,
            offset: -normal.dot(&p0.to_vec3()),
        })
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        self.normal.dot(&p.to_vec3()) + self.offset
    }
}

pub struct PlaneEstimator {
    pub tolerance: Tolerance,
}

impl Estimator for PlaneEstimator {
    type Point = Point3d;
    type Model = PlaneModel;

    fn sample_size(&self) -> usize {
        3
    }

    fn solve(&self, data: &[Point3d], sample: &[usize]) -> Option<PlaneModel> {
        PlaneModel::through(
            &data[sample[0]],
            &data[sample[1]],
            &data[sample[2]],
            &self.tolerance,
        )
    }

    fn residual(&self, model: &PlaneModel, p: &Point3d) -> f64 {
        model.signed_distance(p).abs()
    }

    fn finish(&self, model: &PlaneModel, data: &[Point3d], inliers: &[usize]) -> Primitive {
        let members: Vec<Point3d> = inliers.iter().map(|&i| data[i]).collect();
        let centroid = Point3d::centroid(&members).unwrap_or(Point3d::ORIGIN);
        // Drop the centroid onto the plane so `point` satisfies the equation.
        let point = centroid - model.normal * model.signed_distance(&centroid);
        Primitive::Plane {
            normal: model.normal,
            offset: model.offset,
            point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_through_xy_points() {
        let plane = PlaneModel::through(
            &Point3d::new(0.0, 0.0, 2.0),
            &Point3d::new(1.0, 0.0, 2.0),
            &Point3d::new(0.0, 1.0, 2.0),
            &Tolerance::default(),
        )
        .unwrap();
        assert_relative_eq!(plane.normal.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(plane.offset, -2.0, epsilon = 1e-12);
        assert_relative_eq!(plane.signed_distance(&Point3d::new(5.0, 5.0, 5.0)), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_samples_rejected() {
        let plane = PlaneModel::through(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 1.0, 1.0),
            &Point3d::new(2.0, 2.0, 2.0),
            &Tolerance::default(),
        );
        assert!(plane.is_none());
    }
}
