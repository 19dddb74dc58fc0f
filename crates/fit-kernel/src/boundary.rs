//! Grid-based boundary point selection for ring and hole targets.
//!
//! Restricting circle samples to the visible edge of a ring makes it far
//! more likely that a random triple lies on the true circle rather than on
//! interior scan noise. The restriction only narrows where samples are
//! drawn from; scoring still runs over every point.

use inspect_types::Point2d;
use tracing::{debug, instrument};

/// Coarsest grid resolution per axis.
pub const MIN_CELLS_PER_AXIS: usize = 10;
/// Result sizes at or below this fall back to the whole input.
pub const FALLBACK_MAX_POINTS: usize = 10;
/// Finest grid resolution per axis, to bound memory on tiny cell sizes.
const MAX_CELLS_PER_AXIS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryExtractor {
    /// Target cell edge length. Callers should pass at least twice the
    /// fitting distance threshold.
    pub cell_size: f64,
}

struct Grid {
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
    nx: usize,
    ny: usize,
}

impl Grid {
    fn cover(points: &[Point2d], cell_size: f64) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let width = max_x - min_x;
        let height = max_y - min_y;
        let nx = cells_for(width, cell_size);
        let ny = cells_for(height, cell_size);
        Self {
            min_x,
            min_y,
            cell_w: width / nx as f64,
            cell_h: height / ny as f64,
            nx,
            ny,
        }
    }

    fn cell_of(&self, p: &Point2d) -> (usize, usize) {
        (
            axis_cell(p.x - self.min_x, self.cell_w, self.nx),
            axis_cell(p.y - self.min_y, self.cell_h, self.ny),
        )
    }

    fn index(&self, cx: usize, cy: usize) -> usize {
        cy * self.nx + cx
    }

    /// True if any of the 8 neighbours is empty or off the grid.
    fn is_boundary(&self, counts: &[u32], cx: usize, cy: usize) -> bool {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = cx as i64 + dx;
                let ny = cy as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.nx as i64 || ny >= self.ny as i64 {
                    return true;
                }
                if counts[self.index(nx as usize, ny as usize)] == 0 {
                    return true;
                }
            }
        }
        false
    }
}

fn cells_for(extent: f64, cell_size: f64) -> usize {
    let wanted = if cell_size.is_finite() && cell_size > 0.0 && extent.is_finite() {
        (extent / cell_size).ceil() as usize
    } else {
        0
    };
    wanted.clamp(MIN_CELLS_PER_AXIS, MAX_CELLS_PER_AXIS)
}

fn axis_cell(offset: f64, cell: f64, n: usize) -> usize {
    if cell > 0.0 && offset.is_finite() {
        ((offset / cell).floor().max(0.0) as usize).min(n - 1)
    } else {
        0
    }
}

impl BoundaryExtractor {
    pub fn new(cell_size: f64) -> Self {
        Self { cell_size }
    }

    /// Indices of points lying in boundary cells, in input order.
    ///
    /// Falls back to every index when the boundary holds too few points
    /// for sampling to be meaningful.
    #[instrument(skip(self, points), fields(n = points.len(), cell_size = self.cell_size))]
    pub fn extract_indices(&self, points: &[Point2d]) -> Vec<usize> {
        let all = || (0..points.len()).collect::<Vec<_>>();
        if points.len() <= FALLBACK_MAX_POINTS {
            return all();
        }

        let grid = Grid::cover(points, self.cell_size);
        let cells: Vec<(usize, usize)> = points.iter().map(|p| grid.cell_of(p)).collect();
        let mut counts = vec![0u32; grid.nx * grid.ny];
        for &(cx, cy) in &cells {
            counts[grid.index(cx, cy)] += 1;
        }

        let mut boundary_cell = vec![None::<bool>; counts.len()];
        let mut selected = Vec::new();
        for (i, &(cx, cy)) in cells.iter().enumerate() {
            let idx = grid.index(cx, cy);
            let is_edge = *boundary_cell[idx]
                .get_or_insert_with(|| grid.is_boundary(&counts, cx, cy));
            if is_edge {
                selected.push(i);
            }
        }

        if selected.len() <= FALLBACK_MAX_POINTS {
            debug!(
                boundary = selected.len(),
                "boundary too sparse, using full point set"
            );
            return all();
        }
        debug!(
            boundary = selected.len(),
            grid = ?[grid.nx, grid.ny],
            "boundary points selected"
        );
        selected
    }

    /// Boundary points themselves.
    pub fn extract(&self, points: &[Point2d]) -> Vec<Point2d> {
        self.extract_indices(points)
            .into_iter()
            .map(|i| points[i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn filled_square(n: usize, size: f64) -> Vec<Point2d> {
        let mut pts = Vec::new();
        for i in 0..n {
            for j in 0..n {
                pts.push(Point2d::new(
                    i as f64 * size / (n - 1) as f64,
                    j as f64 * size / (n - 1) as f64,
                ));
            }
        }
        pts
    }

    #[test]
    fn ring_points_are_all_boundary() {
        let pts: Vec<Point2d> = (0..200)
            .map(|i| {
                let t = TAU * i as f64 / 200.0;
                Point2d::new(20.0 * t.cos(), 20.0 * t.sin())
            })
            .collect();
        let out = BoundaryExtractor::new(1.0).extract(&pts);
        assert_eq!(out.len(), 200);
    }

    #[test]
    fn dense_square_drops_interior() {
        // 50x50 lattice with unit spacing and unit cells: only the outer
        // ring of cells is boundary.
        let pts = filled_square(50, 49.0);
        let idx = BoundaryExtractor::new(1.0).extract_indices(&pts);
        assert!(idx.len() < pts.len());
        assert!(idx.len() > FALLBACK_MAX_POINTS);
        // Center point is interior.
        let center = pts
            .iter()
            .position(|p| (p.x - 24.0).abs() < 1e-9 && (p.y - 24.0).abs() < 1e-9)
            .unwrap();
        assert!(!idx.contains(&center));
        // Corner is on the edge.
        assert!(idx.contains(&0));
    }

    #[test]
    fn hole_edge_is_selected() {
        let mut pts = filled_square(60, 59.0);
        pts.retain(|p| ((p.x - 29.5).powi(2) + (p.y - 29.5).powi(2)).sqrt() > 12.0);
        let idx = BoundaryExtractor::new(2.0).extract_indices(&pts);
        let find = |x: f64, y: f64| {
            pts.iter()
                .position(|p| (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9)
                .unwrap()
        };
        // Just outside the hole, next to a fully emptied cell.
        assert!(idx.contains(&find(17.0, 29.0)));
        // Deep inside the material, far from both edges.
        assert!(!idx.contains(&find(8.0, 8.0)));
        assert!(idx.contains(&0));
    }

    #[test]
    fn tiny_input_returned_unchanged() {
        let pts: Vec<Point2d> = (0..7).map(|i| Point2d::new(i as f64, 0.0)).collect();
        assert_eq!(BoundaryExtractor::new(1.0).extract(&pts), pts);
    }

    #[test]
    fn degenerate_extent_is_handled() {
        let pts: Vec<Point2d> = (0..30).map(|_| Point2d::new(3.0, 3.0)).collect();
        let out = BoundaryExtractor::new(1.0).extract(&pts);
        assert_eq!(out.len(), 30);
    }

    #[test]
    fn empty_input() {
        assert!(BoundaryExtractor::new(1.0).extract(&[]).is_empty());
    }
}
