use serde::{Deserialize, Serialize};

use crate::point::Point3d;
use crate::vector::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Per-axis size. Zero for an empty box.
    pub fn extents(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        self.max - self.min
    }

    pub fn center(&self) -> Point3d {
        if self.is_empty() {
            return Point3d::ORIGIN;
        }
        Point3d::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Index (0 = x, 1 = y, 2 = z) of the axis with the smallest extent.
    /// Ties resolve to the lower index.
    pub fn smallest_axis(&self) -> usize {
        let e = self.extents();
        let mut axis = 0;
        let mut best = e.x;
        if e.y < best {
            axis = 1;
            best = e.y;
        }
        if e.z < best {
            axis = 2;
        }
        axis
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// An ordered point cloud with optional per-point attributes.
///
/// `bounds` is a cache. Mutating `points` does not refresh it; call
/// [`PointSet::recompute_bounds`] when the box is needed again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointSet {
    pub points: Vec<Point3d>,
    /// RGB per point, same length as `points` when present.
    #[serde(default)]
    pub colors: Option<Vec<[f32; 3]>>,
    /// Unit normal per point, same length as `points` when present.
    #[serde(default)]
    pub normals: Option<Vec<Vec3>>,
    #[serde(default)]
    bounds: BoundingBox,
}

impl PointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from bare coordinates and compute its bounds.
    pub fn from_points(points: Vec<Point3d>) -> Self {
        let mut set = Self {
            points,
            colors: None,
            normals: None,
            bounds: BoundingBox::empty(),
        };
        set.recompute_bounds();
        set
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3d> {
        self.points.iter()
    }

    /// Append a point. Attribute arrays, if any, are dropped since they
    /// would no longer line up with `points`. Bounds are left stale.
    pub fn push(&mut self, point: Point3d) {
        self.points.push(point);
        self.colors = None;
        self.normals = None;
    }

    /// The cached bounding box as of the last recompute.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn recompute_bounds(&mut self) {
        self.bounds = BoundingBox::from_points(&self.points);
    }

    /// New set holding the given indices in order, attributes included.
    /// Out-of-range indices are skipped.
    pub fn subset(&self, indices: &[usize]) -> PointSet {
        let valid: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.points.len())
            .collect();
        let points = valid.iter().map(|&i| self.points[i]).collect();
        let colors = self
            .colors
            .as_ref()
            .filter(|c| c.len() == self.points.len())
            .map(|c| valid.iter().map(|&i| c[i]).collect());
        let normals = self
            .normals
            .as_ref()
            .filter(|n| n.len() == self.points.len())
            .map(|n| valid.iter().map(|&i| n[i]).collect());
        let mut set = PointSet {
            points,
            colors,
            normals,
            bounds: BoundingBox::empty(),
        };
        set.recompute_bounds();
        set
    }
}

impl From<Vec<Point3d>> for PointSet {
    fn from(points: Vec<Point3d>) -> Self {
        Self::from_points(points)
    }
}
