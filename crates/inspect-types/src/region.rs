use serde::{Deserialize, Serialize};

use crate::point::Point3d;
use crate::vector::Vec3;

/// Shape of a region-of-interest volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegionKind {
    Box,
    Cylinder,
    Sphere,
}

/// A sub-volume hint produced by a region-filtering stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub kind: RegionKind,
    pub center: Point3d,
    /// Full box extents along x, y, z. Used by `Box`.
    #[serde(default = "zero_size")]
    pub size: [f64; 3],
    /// Used by `Cylinder` and `Sphere`.
    #[serde(default)]
    pub radius: f64,
    /// Cylinder length along `axis`. Non-positive means unbounded.
    #[serde(default)]
    pub height: f64,
    /// Cylinder axis direction.
    #[serde(default = "default_axis")]
    pub axis: Vec3,
}

fn zero_size() -> [f64; 3] {
    [0.0; 3]
}

fn default_axis() -> Vec3 {
    Vec3::Z
}

impl RegionDescriptor {
    pub fn boxed(center: Point3d, size: [f64; 3]) -> Self {
        Self {
            kind: RegionKind::Box,
            center,
            size,
            radius: 0.0,
            height: 0.0,
            axis: Vec3::Z,
        }
    }

    pub fn cylinder(center: Point3d, axis: Vec3, radius: f64, height: f64) -> Self {
        Self {
            kind: RegionKind::Cylinder,
            center,
            size: [0.0; 3],
            radius,
            height,
            axis,
        }
    }

    pub fn sphere(center: Point3d, radius: f64) -> Self {
        Self {
            kind: RegionKind::Sphere,
            center,
            size: [0.0; 3],
            radius,
            height: 0.0,
            axis: Vec3::Z,
        }
    }

    /// Unit cylinder axis, falling back to +Z for a degenerate axis.
    pub fn unit_axis(&self) -> Vec3 {
        self.axis.normalized().unwrap_or(Vec3::Z)
    }

    /// Whether `p` lies inside the region (boundary inclusive).
    pub fn contains(&self, p: &Point3d) -> bool {
        let d = *p - self.center;
        match self.kind {
            RegionKind::Box => {
                d.x.abs() <= self.size[0] * 0.5
                    && d.y.abs() <= self.size[1] * 0.5
                    && d.z.abs() <= self.size[2] * 0.5
            }
            RegionKind::Sphere => d.length_squared() <= self.radius * self.radius,
            RegionKind::Cylinder => {
                let axis = self.unit_axis();
                let along = d.dot(&axis);
                if self.height > 0.0 && along.abs() > self.height * 0.5 {
                    return false;
                }
                let radial = d - axis * along;
                radial.length_squared() <= self.radius * self.radius
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_contains() {
        let r = RegionDescriptor::boxed(Point3d::ORIGIN, [2.0, 2.0, 2.0]);
        assert!(r.contains(&Point3d::new(1.0, -1.0, 0.5)));
        assert!(!r.contains(&Point3d::new(1.1, 0.0, 0.0)));
    }

    #[test]
    fn cylinder_contains_respects_axis_and_height() {
        let r = RegionDescriptor::cylinder(Point3d::ORIGIN, Vec3::X, 1.0, 4.0);
        assert!(r.contains(&Point3d::new(1.9, 0.5, 0.5)));
        assert!(!r.contains(&Point3d::new(2.1, 0.0, 0.0)));
        assert!(!r.contains(&Point3d::new(0.0, 1.0, 1.0)));
    }

    #[test]
    fn unbounded_cylinder() {
        let r = RegionDescriptor::cylinder(Point3d::ORIGIN, Vec3::Z, 1.0, 0.0);
        assert!(r.contains(&Point3d::new(0.0, 0.5, 1e6)));
    }

    #[test]
    fn serde_defaults_axis() {
        let json = r#"{"kind":{"type":"Cylinder"},"center":{"x":0.0,"y":0.0,"z":0.0},"radius":2.0}"#;
        let r: RegionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(r.axis, Vec3::Z);
        assert_eq!(r.kind, RegionKind::Cylinder);
    }
}
