//! Property-based tests for fitter and boundary invariants.

use proptest::prelude::*;

use fit_kernel::boundary::FALLBACK_MAX_POINTS;
use fit_kernel::{BoundaryExtractor, CancelToken, PrimitiveFitter, RansacConfig};
use inspect_types::{Point2d, Point3d, ShapeKind};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_point3() -> impl Strategy<Value = Point3d> {
    (-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0)
        .prop_map(|(x, y, z)| Point3d::new(x, y, z))
}

fn arb_point2() -> impl Strategy<Value = Point2d> {
    (-50.0f64..50.0, -50.0f64..50.0).prop_map(|(x, y)| Point2d::new(x, y))
}

fn arb_shape() -> impl Strategy<Value = ShapeKind> {
    prop::sample::select(ShapeKind::ALL.to_vec())
}

// ---------------------------------------------------------------------------
// Undersized input is always the no-fit sentinel
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn undersized_input_is_sentinel(
        shape in arb_shape(),
        pts in prop::collection::vec(arb_point3(), 0..4),
        seed in any::<u64>(),
    ) {
        prop_assume!(pts.len() < shape.min_points());
        let fitter = PrimitiveFitter::new(RansacConfig::default().with_seed(seed)).unwrap();
        let result = fitter.fit(&pts, shape, &CancelToken::new(), None);
        prop_assert!(!result.is_fit());
        prop_assert_eq!(result.inlier_count, 0);
        prop_assert!(result.inliers.is_empty());
        prop_assert!(result.fit_error.is_infinite());
    }
}

// ---------------------------------------------------------------------------
// Accepted fits are internally consistent
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn accepted_fit_is_consistent(
        shape in arb_shape(),
        pts in prop::collection::vec(arb_point3(), 4..40),
        seed in any::<u64>(),
    ) {
        let config = RansacConfig {
            max_iterations: 50,
            distance_threshold: 5.0,
            ..RansacConfig::default().with_seed(seed)
        };
        let fitter = PrimitiveFitter::new(config).unwrap();
        let result = fitter.fit(&pts, shape, &CancelToken::new(), None);
        prop_assert_eq!(result.shape, shape);
        if result.is_fit() {
            prop_assert_eq!(result.inliers.len(), result.inlier_count);
            prop_assert!(result.inlier_count <= pts.len());
            prop_assert!(result.fit_error >= 0.0 && result.fit_error <= 5.0);
            for p in &result.inliers {
                prop_assert!(pts.contains(p));
            }
        } else {
            prop_assert_eq!(result.inlier_count, 0);
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary selection is an ordered subset, or the whole input
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn boundary_is_ordered_subset(
        pts in prop::collection::vec(arb_point2(), 0..300),
        cell in 0.5f64..10.0,
    ) {
        let idx = BoundaryExtractor::new(cell).extract_indices(&pts);
        prop_assert!(idx.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(idx.iter().all(|&i| i < pts.len()));
        if pts.len() <= FALLBACK_MAX_POINTS {
            prop_assert_eq!(idx.len(), pts.len());
        } else {
            prop_assert!(idx.len() > FALLBACK_MAX_POINTS);
        }
    }
}
