//! Assertion helpers with diagnostic output.
//!
//! Each returns `Err(HarnessError::AssertionFailed)` whose detail starts
//! with the caller's `[ctx]` label and shows expected against actual.

use inspect_types::{FitResult, Primitive, ShapeKind};
use pipeline_engine::{Completion, ErrorKind, RunResult, StageOutcome};

use crate::helpers::HarnessError;

fn fail(ctx: &str, detail: String) -> HarnessError {
    HarnessError::AssertionFailed {
        detail: format!("[{ctx}] {detail}"),
    }
}

/// Assert the fit carries a model of `shape`.
pub fn assert_fitted(result: &FitResult, shape: ShapeKind, ctx: &str) -> Result<(), HarnessError> {
    if result.shape != shape {
        return Err(fail(ctx, format!("expected {shape} result, got {}", result.shape)));
    }
    match &result.model {
        Some(model) if model.kind() == shape && result.inlier_count > 0 => Ok(()),
        Some(model) => Err(fail(
            ctx,
            format!(
                "expected {shape} model with inliers, got {} with {} inliers",
                model.kind(),
                result.inlier_count
            ),
        )),
        None => Err(fail(ctx, format!("expected {shape} model, got no-fit sentinel"))),
    }
}

/// Assert the fit is the no-fit sentinel.
pub fn assert_sentinel(result: &FitResult, ctx: &str) -> Result<(), HarnessError> {
    if result.model.is_none() && result.inlier_count == 0 && result.fit_error.is_infinite() {
        Ok(())
    } else {
        Err(fail(
            ctx,
            format!(
                "expected no-fit sentinel, got {} inliers with error {:.4}",
                result.inlier_count, result.fit_error
            ),
        ))
    }
}

/// Assert the fitted radius is within `tol` of `expected`.
pub fn assert_radius(result: &FitResult, expected: f64, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    match result.radius() {
        Some(r) if (r - expected).abs() <= tol => Ok(()),
        Some(r) => Err(fail(
            ctx,
            format!("radius: expected {expected:.4}, got {r:.4} (tol={tol})"),
        )),
        None => Err(fail(ctx, format!("radius: expected {expected:.4}, model has none"))),
    }
}

/// Assert at least `min` inliers were found.
pub fn assert_inliers_at_least(result: &FitResult, min: usize, ctx: &str) -> Result<(), HarnessError> {
    if result.inlier_count >= min {
        Ok(())
    } else {
        Err(fail(
            ctx,
            format!("expected at least {min} inliers, got {}", result.inlier_count),
        ))
    }
}

/// Assert the mean residual is at most `max`.
pub fn assert_fit_error_below(result: &FitResult, max: f64, ctx: &str) -> Result<(), HarnessError> {
    if result.fit_error <= max {
        Ok(())
    } else {
        Err(fail(
            ctx,
            format!("fit error: expected <= {max}, got {:.6}", result.fit_error),
        ))
    }
}

/// Assert a line model spans `expected` within `tol`.
pub fn assert_line_length(result: &FitResult, expected: f64, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    match &result.model {
        Some(Primitive::Line { length, .. }) if (length - expected).abs() <= tol => Ok(()),
        Some(Primitive::Line { length, .. }) => Err(fail(
            ctx,
            format!("line length: expected {expected:.4}, got {length:.4} (tol={tol})"),
        )),
        _ => Err(fail(ctx, "line length: result holds no line".to_string())),
    }
}

/// Assert a stage outcome matches `expected`.
pub fn assert_stage_outcome(
    run: &RunResult,
    id: inspect_types::StageId,
    expected: &StageOutcome,
    ctx: &str,
) -> Result<(), HarnessError> {
    match run.outcome(id) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(fail(ctx, format!("stage {id}: expected {expected:?}, got {actual:?}"))),
        None => Err(fail(ctx, format!("stage {id}: expected {expected:?}, stage did not run"))),
    }
}

/// Assert a stage completed without a model.
pub fn assert_stage_sentinel(
    run: &RunResult,
    id: inspect_types::StageId,
    kind: ErrorKind,
    ctx: &str,
) -> Result<(), HarnessError> {
    assert_stage_outcome(
        run,
        id,
        &StageOutcome::Completed {
            completion: Completion::Sentinel { kind },
        },
        ctx,
    )
}
