use serde::{Deserialize, Serialize};

use crate::point::Point3d;
use crate::vector::Vec3;

/// Geometric primitive families the fitter can recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeKind {
    Circle,
    Line,
    Plane,
    Sphere,
    Cylinder,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Circle,
        ShapeKind::Line,
        ShapeKind::Plane,
        ShapeKind::Sphere,
        ShapeKind::Cylinder,
    ];

    /// Fewest points that can define the shape at all.
    pub fn min_points(self) -> usize {
        match self {
            ShapeKind::Line => 2,
            ShapeKind::Circle | ShapeKind::Plane | ShapeKind::Cylinder => 3,
            ShapeKind::Sphere => 4,
        }
    }

    /// Size of the random subset drawn per RANSAC iteration.
    pub fn sample_size(self) -> usize {
        match self {
            ShapeKind::Line => 2,
            ShapeKind::Circle | ShapeKind::Plane | ShapeKind::Cylinder => 3,
            ShapeKind::Sphere => 4,
        }
    }

    /// Whether the shape carries a radius that bounds apply to.
    pub fn has_radius(self) -> bool {
        matches!(
            self,
            ShapeKind::Circle | ShapeKind::Sphere | ShapeKind::Cylinder
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "Circle",
            ShapeKind::Line => "Line",
            ShapeKind::Plane => "Plane",
            ShapeKind::Sphere => "Sphere",
            ShapeKind::Cylinder => "Cylinder",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape-specific model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Primitive {
    Circle {
        center: Point3d,
        radius: f64,
        /// Normal of the plane the circle was fitted in.
        normal: Vec3,
    },
    Line {
        /// First sample point; `start`/`end` are measured from here.
        origin: Point3d,
        direction: Vec3,
        start: Point3d,
        end: Point3d,
        length: f64,
    },
    Plane {
        normal: Vec3,
        /// `d` in `normal · p + d = 0`.
        offset: f64,
        /// Centroid of the inliers.
        point: Point3d,
    },
    Sphere {
        center: Point3d,
        radius: f64,
    },
    Cylinder {
        axis_point: Point3d,
        axis_direction: Vec3,
        radius: f64,
        height: f64,
    },
}

impl Primitive {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Primitive::Circle { .. } => ShapeKind::Circle,
            Primitive::Line { .. } => ShapeKind::Line,
            Primitive::Plane { .. } => ShapeKind::Plane,
            Primitive::Sphere { .. } => ShapeKind::Sphere,
            Primitive::Cylinder { .. } => ShapeKind::Cylinder,
        }
    }

    pub fn radius(&self) -> Option<f64> {
        match self {
            Primitive::Circle { radius, .. }
            | Primitive::Sphere { radius, .. }
            | Primitive::Cylinder { radius, .. } => Some(*radius),
            Primitive::Line { .. } | Primitive::Plane { .. } => None,
        }
    }
}

/// Outcome of one fitting run.
///
/// A failed consensus is still a `FitResult`: the no-fit sentinel has no
/// model, an infinite error and zero inliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub shape: ShapeKind,
    pub model: Option<Primitive>,
    pub inlier_count: usize,
    /// Mean residual over the inliers.
    pub fit_error: f64,
    pub inliers: Vec<Point3d>,
}

impl FitResult {
    pub fn no_fit(shape: ShapeKind) -> Self {
        Self {
            shape,
            model: None,
            inlier_count: 0,
            fit_error: f64::INFINITY,
            inliers: Vec::new(),
        }
    }

    pub fn is_fit(&self) -> bool {
        self.model.is_some() && self.inlier_count > 0
    }

    pub fn radius(&self) -> Option<f64> {
        self.model.as_ref().and_then(Primitive::radius)
    }
}
