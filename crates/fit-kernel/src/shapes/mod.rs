//! Closed-form minimal solvers and the shared RANSAC consensus loop.
//!
//! Each shape implements [`Estimator`]: a candidate model from a minimal
//! sample, a residual for scoring, and a final conversion into the public
//! [`Primitive`]. [`run_consensus`] is the one loop they all share.

pub mod circle;
pub mod cylinder;
pub mod line;
pub mod plane;
pub mod sphere;

use inspect_types::Primitive;
use rand::Rng;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::RansacConfig;
use crate::sampling::sample_distinct;

/// A closed-form solver for one shape family.
pub trait Estimator {
    /// Coordinate type the estimator works in (3D, or 2D after projection).
    type Point;
    /// Candidate model parameters.
    type Model: Clone;

    /// Size of a minimal sample.
    fn sample_size(&self) -> usize;

    /// Solve a candidate from the minimal sample `sample` (indices into
    /// `data`). `None` marks a degenerate sample.
    fn solve(&self, data: &[Self::Point], sample: &[usize]) -> Option<Self::Model>;

    /// Distance from `p` to the candidate.
    fn residual(&self, model: &Self::Model, p: &Self::Point) -> f64;

    /// Radius the bounds check applies to, if the shape has one.
    fn radius(&self, _model: &Self::Model) -> Option<f64> {
        None
    }

    /// Convert the winning candidate, with its inlier indices, into the
    /// public model.
    fn finish(&self, model: &Self::Model, data: &[Self::Point], inliers: &[usize]) -> Primitive;
}

/// Best candidate found by [`run_consensus`].
#[derive(Debug, Clone)]
pub struct Consensus<M> {
    pub model: M,
    pub inliers: Vec<usize>,
    /// Mean residual over `inliers`.
    pub mean_residual: f64,
}

/// What a consensus run produced, and how long it ran.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome<M> {
    pub best: Option<Consensus<M>>,
    /// Iterations started, including rejected samples.
    pub iterations: usize,
}

/// Shared RANSAC loop.
///
/// Samples are drawn from `pool` (indices into `data`); scoring always
/// covers all of `data`. The cancel token is polled once per iteration,
/// before sampling, so a raised token yields the best complete candidate
/// so far.
pub fn run_consensus<E: Estimator>(
    estimator: &E,
    data: &[E::Point],
    pool: &[usize],
    config: &RansacConfig,
    cancel: &CancelToken,
    rng: &mut impl Rng,
) -> ConsensusOutcome<E::Model> {
    let n = data.len();
    let k = estimator.sample_size();
    if n == 0 || pool.len() < k {
        return ConsensusOutcome {
            best: None,
            iterations: 0,
        };
    }

    let mut sample = vec![0usize; k];
    let mut scratch: Vec<usize> = Vec::with_capacity(n);
    let mut best: Option<Consensus<E::Model>> = None;
    let mut best_count = 0usize;
    let mut iterations = 0usize;

    for _ in 0..config.max_iterations {
        if cancel.is_cancelled() {
            debug!(iterations, "consensus cancelled");
            break;
        }
        iterations += 1;

        if !sample_distinct(rng, pool, &mut sample) {
            break;
        }
        let Some(model) = estimator.solve(data, &sample) else {
            continue;
        };
        if let (Some(bounds), Some(r)) = (config.bounds, estimator.radius(&model)) {
            if !bounds.contains(r) {
                continue;
            }
        }

        scratch.clear();
        let mut residual_sum = 0.0;
        for (i, p) in data.iter().enumerate() {
            let r = estimator.residual(&model, p);
            if r <= config.distance_threshold {
                scratch.push(i);
                residual_sum += r;
            }
        }
        let count = scratch.len();

        if count > best_count && count as f64 / n as f64 >= config.min_inlier_ratio {
            let mean_residual = residual_sum / count as f64;
            debug!(
                iteration = iterations,
                inliers = count,
                mean_residual,
                "improved candidate"
            );
            best_count = count;
            best = Some(Consensus {
                model,
                inliers: std::mem::take(&mut scratch),
                mean_residual,
            });
        }
    }

    ConsensusOutcome { best, iterations }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use inspect_types::Point3d;

    use super::line::LineEstimator;
    use super::*;
    use crate::sampling::make_rng;
    use crate::Tolerance;

    /// Delegates to `inner` and raises `cancel` once `limit` candidates
    /// have been solved.
    struct CancelAfter<E> {
        inner: E,
        cancel: CancelToken,
        limit: usize,
        solved: Cell<usize>,
    }

    impl<E: Estimator> Estimator for CancelAfter<E> {
        type Point = E::Point;
        type Model = E::Model;

        fn sample_size(&self) -> usize {
            self.inner.sample_size()
        }

        fn solve(&self, data: &[Self::Point], sample: &[usize]) -> Option<Self::Model> {
            let model = self.inner.solve(data, sample);
            self.solved.set(self.solved.get() + 1);
            if self.solved.get() == self.limit {
                self.cancel.cancel();
            }
            model
        }

        fn residual(&self, model: &Self::Model, p: &Self::Point) -> f64 {
            self.inner.residual(model, p)
        }

        fn finish(&self, model: &Self::Model, data: &[Self::Point], inliers: &[usize]) -> Primitive {
            self.inner.finish(model, data, inliers)
        }
    }

    fn line_with_outliers() -> Vec<Point3d> {
        let mut points: Vec<Point3d> = (0..30).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect();
        points.extend((0..10).map(|i| Point3d::new(i as f64 * 3.0, 7.0 + i as f64, -4.0)));
        points
    }

    #[test]
    fn cancel_mid_fit_keeps_last_complete_candidate() {
        let data = line_with_outliers();
        let pool: Vec<usize> = (0..data.len()).collect();
        let cancel = CancelToken::new();
        let estimator = CancelAfter {
            inner: LineEstimator {
                tolerance: Tolerance::default(),
            },
            cancel: cancel.clone(),
            limit: 3,
            solved: Cell::new(0),
        };
        let config = RansacConfig {
            max_iterations: 1000,
            ..RansacConfig::default()
        };

        let outcome = run_consensus(&estimator, &data, &pool, &config, &cancel, &mut make_rng(Some(5)));

        assert!(cancel.is_cancelled());
        assert_eq!(outcome.iterations, 3);
        assert_eq!(estimator.solved.get(), 3);

        // The candidate solved in the cancelling iteration was still scored,
        // so the result is one fully scored candidate and nothing partial.
        let best = outcome.best.expect("a candidate survives cancellation");
        let rescored = data
            .iter()
            .filter(|p| estimator.residual(&best.model, *p) <= config.distance_threshold)
            .count();
        assert_eq!(best.inliers.len(), rescored);
        assert!(best.inliers.len() >= 2);
        assert!(best.inliers.len() <= data.len());
    }

    #[test]
    fn raised_token_stops_before_first_iteration() {
        let data = line_with_outliers();
        let pool: Vec<usize> = (0..data.len()).collect();
        let cancel = CancelToken::new();
        cancel.cancel();
        let estimator = LineEstimator {
            tolerance: Tolerance::default(),
        };

        let outcome = run_consensus(
            &estimator,
            &data,
            &pool,
            &RansacConfig::default(),
            &cancel,
            &mut make_rng(Some(5)),
        );
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.best.is_none());
    }
}
