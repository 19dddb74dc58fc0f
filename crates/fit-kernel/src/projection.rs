//! Choice of the 2D plane a circle is fitted in.

use inspect_types::{BoundingBox, Point2d, Point3d, RegionDescriptor, RegionKind, Vec3};

/// Orthonormal frame mapping 3D points to plane coordinates and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionFrame {
    pub origin: Point3d,
    pub u: Vec3,
    pub v: Vec3,
    pub normal: Vec3,
}

impl ProjectionFrame {
    /// Frame whose normal is world axis `drop_axis` (0 = x, 1 = y, 2 = z).
    /// The in-plane axes follow cyclic order so the frame is right-handed.
    pub fn axis_aligned(drop_axis: usize, origin: Point3d) -> Self {
        let (u, v, normal) = match drop_axis {
            0 => (Vec3::Y, Vec3::Z, Vec3::X),
            1 => (Vec3::Z, Vec3::X, Vec3::Y),
            _ => (Vec3::X, Vec3::Y, Vec3::Z),
        };
        Self {
            origin,
            u,
            v,
            normal,
        }
    }

    /// Frame perpendicular to `normal`, or `None` for a degenerate normal.
    pub fn from_normal(origin: Point3d, normal: Vec3) -> Option<Self> {
        let normal = normal.normalized()?;
        let u = normal.any_perpendicular()?;
        let v = normal.cross(&u);
        Some(Self {
            origin,
            u,
            v,
            normal,
        })
    }

    pub fn project(&self, p: &Point3d) -> Point2d {
        let d = *p - self.origin;
        Point2d::new(d.dot(&self.u), d.dot(&self.v))
    }

    /// Point on the frame plane at plane coordinates `q`.
    pub fn lift(&self, q: &Point2d) -> Point3d {
        self.origin + self.u * q.x + self.v * q.y
    }

    pub fn project_all(&self, points: &[Point3d]) -> Vec<Point2d> {
        points.iter().map(|p| self.project(p)).collect()
    }
}

/// Pick the projection plane for circle fitting.
///
/// A cylindrical region hint wins: project perpendicular to its axis about
/// the region center. Single-sided line scans of a bore are often thinnest
/// along the wrong axis, so the extent heuristic alone misfires there.
/// Otherwise drop the axis with the smallest bounding-box extent and
/// project about the box center.
pub fn select_circle_frame(
    points: &[Point3d],
    region_hint: Option<&RegionDescriptor>,
) -> ProjectionFrame {
    if let Some(region) = region_hint.filter(|r| r.kind == RegionKind::Cylinder) {
        if let Some(frame) = ProjectionFrame::from_normal(region.center, region.unit_axis()) {
            return frame;
        }
    }
    let bounds = BoundingBox::from_points(points);
    ProjectionFrame::axis_aligned(bounds.smallest_axis(), bounds.center())
}
