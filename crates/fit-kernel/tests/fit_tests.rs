//! End-to-end fitting scenarios over synthetic scans.

use std::f64::consts::TAU;

use fit_kernel::{CancelToken, PrimitiveFitter, RansacConfig, ShapeBounds};
use inspect_types::{Point3d, Primitive, RegionDescriptor, ShapeKind, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn ring(center: Point3d, radius: f64, n: usize) -> Vec<Point3d> {
    (0..n)
        .map(|i| {
            let t = TAU * i as f64 / n as f64;
            Point3d::new(
                center.x + radius * t.cos(),
                center.y + radius * t.sin(),
                center.z,
            )
        })
        .collect()
}

fn uniform_square(n: usize, half: f64, seed: u64) -> Vec<Point3d> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| Point3d::new(rng.gen_range(-half..half), rng.gen_range(-half..half), 0.0))
        .collect()
}

// ---------------------------------------------------------------------------
// Circles
// ---------------------------------------------------------------------------

#[test]
fn ring_with_uniform_noise() {
    let mut pts = ring(Point3d::ORIGIN, 20.0, 200);
    pts.extend(uniform_square(50, 30.0, 7));

    let config = RansacConfig {
        max_iterations: 500,
        min_inlier_ratio: 0.5,
        ..RansacConfig::ring_inspection(1.0, ShapeBounds::new(5.0, 50.0)).with_seed(2024)
    };
    assert_eq!(config.boundary_cell_size, Some(2.0));

    let fitter = PrimitiveFitter::new(config).unwrap();
    let report = fitter.fit_with_report(&pts, ShapeKind::Circle, &CancelToken::new(), None);
    let result = report.result;

    assert!(result.is_fit());
    let radius = result.radius().unwrap();
    assert!((19.0..=21.0).contains(&radius), "radius {radius}");
    assert!(result.inlier_count >= 180, "inliers {}", result.inlier_count);
    assert_eq!(result.inliers.len(), result.inlier_count);
    assert!(result.fit_error <= 1.0);
    assert!(report.sample_pool <= pts.len());
    assert_eq!(report.iterations, 500);
}

#[test]
fn cylinder_hint_fixes_projection_plane() {
    // Circle in the plane whose normal is (1, 1, 0). Its bounding box is
    // thinnest along x, which would squash it into an ellipse.
    let normal = Vec3::new(1.0, 1.0, 0.0).normalized().unwrap();
    let u = Vec3::new(1.0, -1.0, 0.0).normalized().unwrap();
    let v = Vec3::Z;
    let center = Point3d::new(3.0, -2.0, 5.0);
    let pts: Vec<Point3d> = (0..120)
        .map(|i| {
            let t = TAU * i as f64 / 120.0;
            center + u * (10.0 * t.cos()) + v * (10.0 * t.sin())
        })
        .collect();

    let fitter = PrimitiveFitter::new(RansacConfig {
        max_iterations: 200,
        distance_threshold: 0.1,
        ..RansacConfig::default().with_seed(17)
    })
    .unwrap();
    let cancel = CancelToken::new();

    let hint = RegionDescriptor::cylinder(center, normal, 12.0, 4.0);
    let hinted = fitter.fit(&pts, ShapeKind::Circle, &cancel, Some(&hint));
    assert_eq!(hinted.inlier_count, pts.len());
    let Some(Primitive::Circle {
        center: c,
        radius,
        normal: n,
    }) = hinted.model
    else {
        panic!("expected a circle");
    };
    assert!((radius - 10.0).abs() < 1e-6);
    assert!(c.distance_to(&center) < 1e-6);
    assert!(n.cross(&normal).length() < 1e-9);

    let unhinted = fitter.fit(&pts, ShapeKind::Circle, &cancel, None);
    assert!(unhinted.inlier_count < pts.len());
}

#[test]
fn pre_cancelled_run_does_no_work() {
    let pts = ring(Point3d::ORIGIN, 20.0, 200);
    let fitter = PrimitiveFitter::new(RansacConfig::default().with_seed(1)).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = fitter.fit_with_report(&pts, ShapeKind::Circle, &cancel, None);
    assert_eq!(report.iterations, 0);
    assert!(!report.result.is_fit());
    assert!(report.result.fit_error.is_infinite());

    cancel.reset();
    let report = fitter.fit_with_report(&pts, ShapeKind::Circle, &cancel, None);
    assert!(report.result.is_fit());
}

// ---------------------------------------------------------------------------
// 3D shapes
// ---------------------------------------------------------------------------

#[test]
fn sphere_with_outliers() {
    let center = Point3d::new(1.0, 2.0, 3.0);
    let radius = 5.0;
    // Fibonacci lattice, evenly spread over the sphere.
    let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    let n = 150;
    let mut pts: Vec<Point3d> = (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).sqrt();
            let t = golden * i as f64;
            center + Vec3::new(r * t.cos(), y, r * t.sin()) * radius
        })
        .collect();
    pts.push(Point3d::new(20.0, 20.0, 20.0));
    pts.push(Point3d::new(-15.0, 4.0, 0.0));
    pts.push(center);

    let fitter = PrimitiveFitter::new(RansacConfig {
        max_iterations: 200,
        distance_threshold: 0.05,
        bounds: Some(ShapeBounds::new(1.0, 10.0)),
        ..RansacConfig::default().with_seed(99)
    })
    .unwrap();
    let result = fitter.fit(&pts, ShapeKind::Sphere, &CancelToken::new(), None);

    assert_eq!(result.inlier_count, n);
    let Some(Primitive::Sphere { center: c, radius: r }) = result.model else {
        panic!("expected a sphere");
    };
    assert!(c.distance_to(&center) < 1e-6);
    assert!((r - radius).abs() < 1e-6);
}

#[test]
fn line_reports_extent() {
    let origin = Point3d::new(0.0, 1.0, 2.0);
    let dir = Vec3::new(1.0, 2.0, 2.0).normalized().unwrap();
    let mut pts: Vec<Point3d> = (0..40).map(|i| origin + dir * (i as f64 * 0.25)).collect();
    pts.extend(uniform_square(10, 10.0, 3).into_iter().map(|p| p + Vec3::Z * 30.0));

    let fitter = PrimitiveFitter::new(RansacConfig {
        max_iterations: 100,
        distance_threshold: 0.01,
        ..RansacConfig::default().with_seed(8)
    })
    .unwrap();
    let result = fitter.fit(&pts, ShapeKind::Line, &CancelToken::new(), None);

    assert_eq!(result.inlier_count, 40);
    let Some(Primitive::Line {
        direction, length, ..
    }) = result.model
    else {
        panic!("expected a line");
    };
    assert!(direction.cross(&dir).length() < 1e-9);
    assert!((length - 39.0 * 0.25).abs() < 1e-9);
}

#[test]
fn stacked_rings_fit_a_cylinder() {
    // Hexagonal cross-sections: the triples (0, 2, 4) and (1, 3, 5) of any
    // ring are equilateral and solve the axis exactly.
    let mut pts = Vec::new();
    for z in [0.0, 1.0, 2.0, 3.0] {
        pts.extend(ring(Point3d::new(0.0, 0.0, z), 5.0, 6));
    }

    let fitter = PrimitiveFitter::new(RansacConfig {
        max_iterations: 3000,
        distance_threshold: 0.05,
        ..RansacConfig::default().with_seed(21)
    })
    .unwrap();
    let result = fitter.fit(&pts, ShapeKind::Cylinder, &CancelToken::new(), None);

    assert_eq!(result.inlier_count, pts.len());
    let Some(Primitive::Cylinder {
        axis_direction,
        radius,
        height,
        ..
    }) = result.model
    else {
        panic!("expected a cylinder");
    };
    assert!(axis_direction.cross(&Vec3::Z).length() < 1e-9);
    assert!((radius - 5.0).abs() < 1e-9);
    assert!((height - 3.0).abs() < 1e-9);
}
