//! PipelineBuilder: fluent API for scripting inspection pipelines in tests.
//!
//! Drives the real graph, registry and orchestrator. All methods take
//! stage names instead of ids for readability.

use std::collections::HashMap;
use std::sync::Arc;

use fit_kernel::CancelToken;
use inspect_types::{FitResult, PointSet, RegionDescriptor, ShapeKind, StageId};
use pipeline_engine::stages::{
    fitting, keys, FittingParams, FittingStage, PointSetSource, RegionFilter, RegionFilterParams,
};
use pipeline_engine::{
    Orchestrator, PipelineGraph, RunResult, SharedContext, Stage, StageOutcome, StageRegistry,
};

use crate::helpers::HarnessError;

/// A fluent builder for constructing, running and inspecting pipelines.
pub struct PipelineBuilder {
    graph: PipelineGraph,
    registry: StageRegistry,
    named: HashMap<String, StageId>,
    ctx: SharedContext,
    orchestrator: Orchestrator,
    last_run: Option<RunResult>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Empty pipeline with every built-in stage kind registered.
    pub fn new() -> Self {
        Self::with_orchestrator(Orchestrator::new())
    }

    /// Use a pre-configured orchestrator, e.g. one carrying an observer.
    pub fn with_orchestrator(orchestrator: Orchestrator) -> Self {
        Self {
            graph: PipelineGraph::new(),
            registry: StageRegistry::with_builtin(),
            named: HashMap::new(),
            ctx: SharedContext::new(),
            orchestrator,
            last_run: None,
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Add a point-set source.
    pub fn source(&mut self, name: &str, points: PointSet) -> Result<StageId, HarnessError> {
        self.add(name, Box::new(PointSetSource::new(points)), &[])
    }

    /// Add a region filter cropping `source`.
    pub fn region(
        &mut self,
        name: &str,
        source: &str,
        region: RegionDescriptor,
    ) -> Result<StageId, HarnessError> {
        let source_id = self.stage_id(source)?;
        let stage = RegionFilter::new(RegionFilterParams::new(source_id, region));
        self.add(name, Box::new(stage), &[source])
    }

    /// Add a fitting stage reading the cloud published by `source`.
    /// `params.source` is overwritten.
    pub fn fit(
        &mut self,
        name: &str,
        shape: ShapeKind,
        source: &str,
        mut params: FittingParams,
    ) -> Result<StageId, HarnessError> {
        params.source = Some(self.stage_id(source)?);
        self.add(name, Box::new(FittingStage::new(shape, params)), &[source])
    }

    /// Add a fitting stage that reads both the cropped cloud and the region
    /// hint of the region filter `region`.
    pub fn fit_in_region(
        &mut self,
        name: &str,
        shape: ShapeKind,
        region: &str,
        mut params: FittingParams,
    ) -> Result<StageId, HarnessError> {
        let region_id = self.stage_id(region)?;
        params.source = Some(region_id);
        params.region = Some(region_id);
        self.add(name, Box::new(FittingStage::new(shape, params)), &[region])
    }

    /// Add a stage through the registry from its kind id and JSON
    /// parameters, wired after each stage in `after`.
    pub fn stage_from_json(
        &mut self,
        name: &str,
        kind: &str,
        params: serde_json::Value,
        after: &[&str],
    ) -> Result<StageId, HarnessError> {
        let stage = self.registry.create(kind, StageId::new(), params)?;
        self.add(name, stage, after)
    }

    /// Add an edge between two named stages.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), HarnessError> {
        let from = self.stage_id(from)?;
        let to = self.stage_id(to)?;
        self.graph.add_edge(from, to)?;
        Ok(())
    }

    fn add(
        &mut self,
        name: &str,
        mut stage: Box<dyn Stage>,
        after: &[&str],
    ) -> Result<StageId, HarnessError> {
        if self.named.contains_key(name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }
        let upstream = after
            .iter()
            .map(|n| self.stage_id(n))
            .collect::<Result<Vec<_>, _>>()?;
        stage.set_name(name.to_string());
        let id = self.graph.add_stage(stage)?;
        for from in upstream {
            if let Err(err) = self.graph.add_edge(from, id) {
                self.graph.remove_stage(id)?;
                return Err(err.into());
            }
        }
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a stage id by name.
    pub fn stage_id(&self, name: &str) -> Result<StageId, HarnessError> {
        self.named
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::StageNotFound {
                name: name.to_string(),
            })
    }

    /// Name a stage was registered under, if it was added by this builder.
    pub fn name_of(&self, id: StageId) -> Option<&str> {
        self.named
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Run the whole graph in topological order.
    pub fn run(&mut self) -> RunResult {
        let run = self.orchestrator.run_sequential(&self.graph, &mut self.ctx);
        self.last_run = Some(run.clone());
        run
    }

    /// Run the whole graph level by level with parallel fan-out.
    pub fn run_levels(&mut self) -> RunResult {
        let run = self
            .orchestrator
            .run_fan_out_levels(&self.graph, &mut self.ctx);
        self.last_run = Some(run.clone());
        run
    }

    /// Fan out the named independent stages against the current context.
    pub fn run_fan_out(&mut self, names: &[&str]) -> Result<RunResult, HarnessError> {
        let ids = names
            .iter()
            .map(|n| self.stage_id(n))
            .collect::<Result<Vec<_>, _>>()?;
        let run = self
            .orchestrator
            .run_fan_out(&self.graph, &ids, &mut self.ctx)?;
        self.last_run = Some(run.clone());
        Ok(run)
    }

    /// Execute one stage on demand against the current context.
    pub fn run_stage(&mut self, name: &str) -> Result<StageOutcome, HarnessError> {
        let id = self.stage_id(name)?;
        Ok(self.orchestrator.run_stage(&self.graph, id, &mut self.ctx)?)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.orchestrator.cancel_token()
    }

    pub fn last_run(&self) -> Option<&RunResult> {
        self.last_run.as_ref()
    }

    /// Fail unless the most recent run completed.
    pub fn assert_success(&self) -> Result<(), HarnessError> {
        match &self.last_run {
            Some(run) if run.success => Ok(()),
            Some(run) => Err(HarnessError::RunFailed {
                message: run
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", run.status)),
            }),
            None => Err(HarnessError::RunFailed {
                message: "pipeline has not been run".to_string(),
            }),
        }
    }

    // ── Outputs ─────────────────────────────────────────────────────────

    /// Fit result published by the named fitting stage.
    pub fn fit_result(&self, name: &str) -> Result<Arc<FitResult>, HarnessError> {
        let id = self.stage_id(name)?;
        let shape = self.shape_of(id).ok_or_else(|| HarnessError::StageNotFound {
            name: name.to_string(),
        })?;
        let key = keys::fit_result(shape, id);
        self.ctx
            .get(&key)
            .ok_or_else(|| HarnessError::MissingOutput {
                key: key.name().to_string(),
            })
    }

    /// Boundary inliers published by the named circle stage.
    pub fn circle_inliers(&self, name: &str) -> Result<Arc<PointSet>, HarnessError> {
        let key = keys::circle_inliers(self.stage_id(name)?);
        self.ctx.get(&key).ok_or_else(|| HarnessError::MissingOutput {
            key: key.name().to_string(),
        })
    }

    /// Point cloud published by the named source or region filter.
    pub fn cloud(&self, name: &str) -> Result<Arc<PointSet>, HarnessError> {
        let key = keys::point_cloud(self.stage_id(name)?);
        self.ctx.get(&key).ok_or_else(|| HarnessError::MissingOutput {
            key: key.name().to_string(),
        })
    }

    /// Fitted shape of a stage, `None` for non-fitting kinds.
    pub(crate) fn shape_of(&self, id: StageId) -> Option<ShapeKind> {
        let kind = self.graph.stage(id)?.kind();
        ShapeKind::ALL
            .into_iter()
            .find(|s| fitting::kind_for(*s) == kind)
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut PipelineGraph {
        &mut self.graph
    }

    pub fn context(&self) -> &SharedContext {
        &self.ctx
    }

    pub fn registry_mut(&mut self) -> &mut StageRegistry {
        &mut self.registry
    }
}
