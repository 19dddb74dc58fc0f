use fit_kernel::{CancelToken, PrimitiveFitter, RansacConfig, ShapeBounds};
use inspect_types::{PointSet, ShapeKind, StageId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::keys;
use crate::context::{ContextWrites, SharedContext};
use crate::stage::Stage;
use crate::types::{Completion, EngineError, ErrorKind, RunMode, StageError};

/// Registry kind identifier of the fitting stage for `shape`.
pub fn kind_for(shape: ShapeKind) -> &'static str {
    match shape {
        ShapeKind::Circle => "CircleFitting",
        ShapeKind::Line => "LineFitting",
        ShapeKind::Plane => "PlaneFitting",
        ShapeKind::Sphere => "SphereFitting",
        ShapeKind::Cylinder => "CylinderFitting",
    }
}

/// Editor-facing parameters shared by every fitting stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FittingParams {
    /// Stage whose `PointCloud_<id>` is fitted.
    pub source: Option<StageId>,
    /// Stage whose `Region_<id>` hints the fit, if any.
    pub region: Option<StageId>,
    pub max_iterations: usize,
    pub distance_threshold: f64,
    pub min_radius: Option<f64>,
    pub max_radius: Option<f64>,
    pub min_inlier_ratio: f64,
    pub run_mode: RunMode,
    pub seed: Option<u64>,
    /// Circle only. Defaults to twice the distance threshold.
    pub boundary_cell_size: Option<f64>,
}

impl Default for FittingParams {
    fn default() -> Self {
        let ransac = RansacConfig::default();
        Self {
            source: None,
            region: None,
            max_iterations: ransac.max_iterations,
            distance_threshold: ransac.distance_threshold,
            min_radius: None,
            max_radius: None,
            min_inlier_ratio: ransac.min_inlier_ratio,
            run_mode: RunMode::Auto,
            seed: None,
            boundary_cell_size: None,
        }
    }
}

impl FittingParams {
    pub fn from_source(source: StageId) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Fitter configuration for `shape`. Range checks are left to
    /// [`RansacConfig::validate`].
    pub fn ransac_config(&self, shape: ShapeKind) -> RansacConfig {
        let bounds = match (self.min_radius, self.max_radius) {
            (None, None) => None,
            (min, max) => Some(ShapeBounds::new(
                min.unwrap_or(f64::MIN_POSITIVE),
                max.unwrap_or(f64::INFINITY),
            )),
        };
        let boundary_cell_size = match shape {
            ShapeKind::Circle => Some(
                self.boundary_cell_size
                    .unwrap_or(2.0 * self.distance_threshold),
            ),
            _ => None,
        };
        RansacConfig {
            max_iterations: self.max_iterations,
            distance_threshold: self.distance_threshold,
            bounds,
            min_inlier_ratio: self.min_inlier_ratio,
            seed: self.seed,
            boundary_cell_size,
            ..RansacConfig::default()
        }
    }
}

/// Fits one primitive family to an upstream point cloud and publishes the
/// result as `<Shape>Fitting_<id>`. Circle stages also publish their
/// inliers as `CircleInliers_<id>`.
#[derive(Debug, Clone)]
pub struct FittingStage {
    id: StageId,
    name: String,
    shape: ShapeKind,
    params: FittingParams,
}

impl FittingStage {
    pub fn new(shape: ShapeKind, params: FittingParams) -> Self {
        Self::with_id(StageId::new(), shape, params)
    }

    pub fn with_id(id: StageId, shape: ShapeKind, params: FittingParams) -> Self {
        Self {
            id,
            name: kind_for(shape).to_string(),
            shape,
            params,
        }
    }

    pub fn from_value(
        shape: ShapeKind,
        id: StageId,
        params: serde_json::Value,
    ) -> Result<Box<dyn Stage>, EngineError> {
        let params = if params.is_null() {
            FittingParams::default()
        } else {
            serde_json::from_value(params)?
        };
        Ok(Box::new(Self::with_id(id, shape, params)))
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn params(&self) -> &FittingParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut FittingParams {
        &mut self.params
    }
}

impl Stage for FittingStage {
    fn id(&self) -> StageId {
        self.id
    }

    fn kind(&self) -> &'static str {
        kind_for(self.shape)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn parameters(&self) -> serde_json::Value {
        match serde_json::to_value(&self.params) {
            Ok(value) => value,
            Err(err) => {
                warn!(stage = %self.id, error = %err, "parameters not serializable");
                serde_json::Value::Null
            }
        }
    }

    fn set_parameters(&mut self, params: serde_json::Value) -> Result<(), EngineError> {
        self.params = serde_json::from_value(params)?;
        Ok(())
    }

    fn run_mode(&self) -> RunMode {
        self.params.run_mode
    }

    fn upstream(&self) -> Vec<StageId> {
        self.params
            .source
            .into_iter()
            .chain(self.params.region)
            .collect()
    }

    fn execute(
        &self,
        ctx: &SharedContext,
        out: &mut ContextWrites,
        cancel: &CancelToken,
    ) -> Result<Completion, StageError> {
        let source = self.params.source.ok_or_else(|| StageError::InvalidParameter {
            name: "source".into(),
            reason: "no upstream point cloud selected".into(),
        })?;
        let fitter = PrimitiveFitter::new(self.params.ransac_config(self.shape))?;

        let cloud_key = keys::point_cloud(source);
        let cloud = ctx
            .get(&cloud_key)
            .ok_or_else(|| StageError::UpstreamDataMissing {
                key: cloud_key.name().to_string(),
            })?;
        let region = match self.params.region {
            Some(region_id) => {
                let key = keys::region(region_id);
                let region = ctx.get(&key).ok_or_else(|| StageError::UpstreamDataMissing {
                    key: key.name().to_string(),
                })?;
                Some(region)
            }
            None => None,
        };

        let result = fitter.fit(&cloud.points, self.shape, cancel, region.as_deref());
        let completion = if cloud.len() < self.shape.min_points() {
            Completion::Sentinel {
                kind: ErrorKind::InsufficientData,
            }
        } else if !result.is_fit() {
            Completion::Sentinel {
                kind: ErrorKind::NoConvergentModel,
            }
        } else {
            Completion::Produced
        };
        info!(
            stage = %self.id,
            shape = %self.shape,
            points = cloud.len(),
            inliers = result.inlier_count,
            outcome = ?completion,
            "fitting stage finished"
        );

        if self.shape == ShapeKind::Circle {
            out.set(
                &keys::circle_inliers(self.id),
                PointSet::from_points(result.inliers.clone()),
            );
        }
        out.set(&keys::fit_result(self.shape, self.id), result);
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspect_types::{FitResult, Point3d};
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    fn ring_context(source: StageId, n: usize) -> SharedContext {
        let pts = (0..n)
            .map(|i| {
                let t = TAU * i as f64 / n as f64;
                Point3d::new(15.0 * t.cos(), 15.0 * t.sin(), 2.0)
            })
            .collect();
        let mut ctx = SharedContext::new();
        ctx.set(&keys::point_cloud(source), PointSet::from_points(pts));
        ctx
    }

    fn run(stage: &FittingStage, ctx: &SharedContext) -> (Result<Completion, StageError>, SharedContext) {
        let mut out = ContextWrites::new();
        let result = stage.execute(ctx, &mut out, &CancelToken::new());
        let mut merged = ctx.clone();
        merged.merge(out);
        (result, merged)
    }

    #[test]
    fn circle_stage_publishes_result_and_inliers() {
        let source = StageId::new();
        let ctx = ring_context(source, 120);
        let stage = FittingStage::new(
            ShapeKind::Circle,
            FittingParams {
                max_iterations: 200,
                seed: Some(4),
                ..FittingParams::from_source(source)
            },
        );
        let (completion, merged) = run(&stage, &ctx);
        assert_eq!(completion.unwrap(), Completion::Produced);

        let result = merged
            .get(&keys::fit_result(ShapeKind::Circle, stage.id()))
            .unwrap();
        assert_eq!(result.inlier_count, 120);
        assert_relative_eq!(result.radius().unwrap(), 15.0, epsilon = 1e-6);
        let inliers = merged.get(&keys::circle_inliers(stage.id())).unwrap();
        assert_eq!(inliers.len(), 120);
    }

    #[test]
    fn result_key_uses_shape_kind() {
        let id = StageId::new();
        let key = keys::fit_result(ShapeKind::Sphere, id);
        assert_eq!(key.name(), format!("SphereFitting_{id}"));
    }

    #[test]
    fn undersized_cloud_is_a_sentinel_not_a_failure() {
        let source = StageId::new();
        let ctx = ring_context(source, 3);
        let stage = FittingStage::new(ShapeKind::Sphere, FittingParams::from_source(source));
        let (completion, merged) = run(&stage, &ctx);
        assert_eq!(
            completion.unwrap(),
            Completion::Sentinel {
                kind: ErrorKind::InsufficientData
            }
        );
        let result: std::sync::Arc<FitResult> = merged
            .get(&keys::fit_result(ShapeKind::Sphere, stage.id()))
            .unwrap();
        assert!(!result.is_fit());
    }

    #[test]
    fn radius_bounds_can_exclude_everything() {
        let source = StageId::new();
        let ctx = ring_context(source, 60);
        let stage = FittingStage::new(
            ShapeKind::Circle,
            FittingParams {
                max_iterations: 50,
                min_radius: Some(1.0),
                max_radius: Some(5.0),
                seed: Some(2),
                ..FittingParams::from_source(source)
            },
        );
        let (completion, _) = run(&stage, &ctx);
        assert_eq!(
            completion.unwrap(),
            Completion::Sentinel {
                kind: ErrorKind::NoConvergentModel
            }
        );
    }

    #[test]
    fn invalid_parameters_fail() {
        let source = StageId::new();
        let ctx = ring_context(source, 10);
        let stage = FittingStage::new(
            ShapeKind::Line,
            FittingParams {
                distance_threshold: 0.0,
                ..FittingParams::from_source(source)
            },
        );
        let (completion, merged) = run(&stage, &ctx);
        assert!(matches!(completion, Err(StageError::Fit(_))));
        assert_eq!(merged.len(), 1);

        let unsourced = FittingStage::new(ShapeKind::Line, FittingParams::default());
        assert!(matches!(
            run(&unsourced, &ctx).0,
            Err(StageError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn missing_region_is_upstream_missing() {
        let source = StageId::new();
        let ctx = ring_context(source, 10);
        let stage = FittingStage::new(
            ShapeKind::Circle,
            FittingParams {
                region: Some(StageId::new()),
                ..FittingParams::from_source(source)
            },
        );
        assert!(matches!(
            run(&stage, &ctx).0,
            Err(StageError::UpstreamDataMissing { .. })
        ));
    }

    #[test]
    fn params_default_from_partial_json() {
        let params: FittingParams =
            serde_json::from_value(serde_json::json!({ "distance_threshold": 0.25 })).unwrap();
        assert_eq!(params.max_iterations, 1000);
        assert_eq!(params.distance_threshold, 0.25);
        let config = params.ransac_config(ShapeKind::Circle);
        assert_eq!(config.boundary_cell_size, Some(0.5));
        assert!(params.ransac_config(ShapeKind::Plane).boundary_cell_size.is_none());
    }

    #[test]
    fn parameters_survive_editor_round_trip() {
        let edited = FittingParams {
            region: Some(StageId::new()),
            max_iterations: 250,
            min_radius: Some(1.5),
            max_radius: Some(9.0),
            run_mode: RunMode::Manual,
            seed: Some(77),
            ..FittingParams::from_source(StageId::new())
        };
        let value = FittingStage::new(ShapeKind::Sphere, edited.clone()).parameters();
        assert!(value.is_object());

        let mut stage = FittingStage::new(ShapeKind::Sphere, FittingParams::default());
        stage.set_parameters(value).unwrap();
        assert_eq!(stage.params(), &edited);
        assert_eq!(stage.run_mode(), RunMode::Manual);
    }
}
