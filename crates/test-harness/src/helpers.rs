//! Helper functions: error type and seeded synthetic scan generators.
//!
//! Every generator takes an explicit seed so scenarios are reproducible.
//! Noise is uniform in `[-noise, noise]` along the surface normal (radial
//! for curved shapes).

use std::f64::consts::{PI, TAU};

use inspect_types::{Point3d, PointSet, Vec3};
use pipeline_engine::EngineError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("stage not found: {name}")]
    StageNotFound { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("no output under {key}")]
    MissingOutput { key: String },

    #[error("run failed: {message}")]
    RunFailed { message: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

fn jitter(rng: &mut StdRng, noise: f64) -> f64 {
    if noise > 0.0 {
        rng.gen_range(-noise..=noise)
    } else {
        0.0
    }
}

/// Orthonormal pair spanning the plane perpendicular to `normal`.
fn basis(normal: Vec3) -> (Vec3, Vec3, Vec3) {
    let n = normal.normalized().unwrap_or(Vec3::Z);
    let u = n.any_perpendicular().unwrap_or(Vec3::X);
    let v = n.cross(&u);
    (n, u, v)
}

// ── Curves ──────────────────────────────────────────────────────────────────

/// `n` evenly spaced points on a circle in the XY plane through `center`.
pub fn circle_ring(center: Point3d, radius: f64, n: usize, noise: f64, seed: u64) -> Vec<Point3d> {
    circle_ring_on(center, Vec3::Z, radius, n, noise, seed)
}

/// Circle ring in the plane with the given `normal`.
pub fn circle_ring_on(
    center: Point3d,
    normal: Vec3,
    radius: f64,
    n: usize,
    noise: f64,
    seed: u64,
) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (_, u, v) = basis(normal);
    (0..n)
        .map(|i| {
            let t = TAU * i as f64 / n as f64;
            let r = radius + jitter(&mut rng, noise);
            center + u * (r * t.cos()) + v * (r * t.sin())
        })
        .collect()
}

/// Points along a segment from `origin` in direction `direction`.
pub fn line_points(
    origin: Point3d,
    direction: Vec3,
    length: f64,
    n: usize,
    noise: f64,
    seed: u64,
) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (d, u, v) = basis(direction);
    let step = if n > 1 { length / (n - 1) as f64 } else { 0.0 };
    (0..n)
        .map(|i| {
            origin
                + d * (step * i as f64)
                + u * jitter(&mut rng, noise)
                + v * jitter(&mut rng, noise)
        })
        .collect()
}

// ── Surfaces ────────────────────────────────────────────────────────────────

/// Square patch of side `size` centered on `center`, perpendicular to
/// `normal`, sampled uniformly.
pub fn plane_patch(
    center: Point3d,
    normal: Vec3,
    size: f64,
    n: usize,
    noise: f64,
    seed: u64,
) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (nrm, u, v) = basis(normal);
    let half = size * 0.5;
    (0..n)
        .map(|_| {
            let a = rng.gen_range(-half..=half);
            let b = rng.gen_range(-half..=half);
            center + u * a + v * b + nrm * jitter(&mut rng, noise)
        })
        .collect()
}

/// Fibonacci-lattice points on a sphere.
pub fn sphere_shell(center: Point3d, radius: f64, n: usize, noise: f64, seed: u64) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    let golden = PI * (3.0 - 5f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let ring = (1.0 - y * y).sqrt();
            let t = golden * i as f64;
            let r = radius + jitter(&mut rng, noise);
            center + Vec3::new(ring * t.cos(), y, ring * t.sin()) * r
        })
        .collect()
}

/// Stacked rings on a cylinder starting at `base` and running `height`
/// along `axis`.
pub fn cylinder_shell(
    base: Point3d,
    axis: Vec3,
    radius: f64,
    height: f64,
    rings: usize,
    per_ring: usize,
    noise: f64,
    seed: u64,
) -> Vec<Point3d> {
    let (a, _, _) = basis(axis);
    let step = if rings > 1 { height / (rings - 1) as f64 } else { 0.0 };
    (0..rings)
        .flat_map(|k| {
            let center = base + a * (step * k as f64);
            circle_ring_on(center, a, radius, per_ring, noise, seed.wrapping_add(k as u64))
        })
        .collect()
}

// ── Clutter ─────────────────────────────────────────────────────────────────

/// Uniform points over a `2 * half` square in the XY plane through `center`.
pub fn uniform_square(center: Point3d, half: f64, n: usize, seed: u64) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point3d::new(
                center.x + rng.gen_range(-half..=half),
                center.y + rng.gen_range(-half..=half),
                center.z,
            )
        })
        .collect()
}

/// Uniform points in the axis-aligned box `[min, max]`.
pub fn uniform_box(min: Point3d, max: Point3d, n: usize, seed: u64) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coord = |lo: f64, hi: f64| if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    (0..n)
        .map(|_| Point3d::new(coord(min.x, max.x), coord(min.y, max.y), coord(min.z, max.z)))
        .collect()
}

/// Concatenate point groups into one set with fresh bounds.
pub fn point_set(groups: impl IntoIterator<Item = Vec<Point3d>>) -> PointSet {
    PointSet::from_points(groups.into_iter().flatten().collect())
}
