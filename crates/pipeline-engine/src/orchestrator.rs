//! Run driver: sequential topological execution and rayon fan-out.

use std::collections::HashSet;
use std::sync::Arc;

use fit_kernel::CancelToken;
use inspect_types::StageId;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::context::{ContextWrites, SharedContext};
use crate::graph::PipelineGraph;
use crate::stage::Stage;
use crate::types::{
    Completion, EngineError, RunMode, RunResult, RunStatus, StageError, StageOutcome,
};

/// Progress callbacks. Called from worker threads during fan-out.
pub trait RunObserver: Send + Sync {
    fn on_stage_started(&self, _id: StageId, _name: &str) {}
    fn on_stage_finished(&self, _id: StageId, _outcome: &StageOutcome) {}
}

/// Executes pipeline graphs against a [`SharedContext`].
///
/// Each run starts `Running` and ends in exactly one terminal state. A
/// raised cancel token stays raised until the caller resets it, so later
/// runs are cancelled before their first stage.
#[derive(Default)]
pub struct Orchestrator {
    cancel: CancelToken,
    observer: Option<Arc<dyn RunObserver>>,
    status: RunStatus,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Handle for cancelling from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Status of the most recent run.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Clear `ctx` and run every `Auto` stage in topological order,
    /// halting at the first failure.
    #[instrument(skip(self, graph, ctx), fields(stages = graph.len()))]
    pub fn run_sequential(&mut self, graph: &PipelineGraph, ctx: &mut SharedContext) -> RunResult {
        ctx.clear();
        self.status = RunStatus::Running;
        let mut run = RunResult::new();

        for id in graph.execution_order() {
            if self.cancel.is_cancelled() {
                return self.cancelled(run);
            }
            let Some(stage) = graph.stage(id) else {
                continue;
            };
            if stage.run_mode() == RunMode::Manual {
                info!(stage = %id, name = stage.name(), "manual stage skipped");
                run.stage_results.insert(id, StageOutcome::Skipped);
                continue;
            }

            let (result, writes) = self.execute_one(stage, ctx);
            match result {
                Ok(completion) => {
                    ctx.merge(writes);
                    run.stage_results
                        .insert(id, StageOutcome::Completed { completion });
                }
                Err(err) => {
                    run.stage_results.insert(id, failed(&err));
                    return self.failed(run, stage, &err);
                }
            }
        }
        self.finish(run)
    }

    /// Execute one stage against an existing context, whatever its run
    /// mode. The context is not cleared.
    pub fn run_stage(
        &mut self,
        graph: &PipelineGraph,
        id: StageId,
        ctx: &mut SharedContext,
    ) -> Result<StageOutcome, EngineError> {
        let stage = graph.stage(id).ok_or(EngineError::StageNotFound { id })?;
        let (result, writes) = self.execute_one(stage, ctx);
        Ok(match result {
            Ok(completion) => {
                ctx.merge(writes);
                StageOutcome::Completed { completion }
            }
            Err(err) => {
                warn!(stage = %id, error = %err, "manual stage failed");
                failed(&err)
            }
        })
    }

    /// Run a set of mutually independent stages in parallel against the
    /// current context, then merge their writes.
    ///
    /// Fails without running anything if a stage is unknown, or if one of
    /// them is connected to or reads the output of another.
    #[instrument(skip(self, graph, ctx), fields(stages = ids.len()))]
    pub fn run_fan_out(
        &mut self,
        graph: &PipelineGraph,
        ids: &[StageId],
        ctx: &mut SharedContext,
    ) -> Result<RunResult, EngineError> {
        check_independent(graph, ids)?;
        self.status = RunStatus::Running;
        let mut run = RunResult::new();
        if let Some(halt) = self.fan_out_level(graph, ids, ctx, &mut run) {
            return Ok(halt);
        }
        Ok(self.finish(run))
    }

    /// Clear `ctx` and run the graph level by level, fanning out inside
    /// each level.
    pub fn run_fan_out_levels(&mut self, graph: &PipelineGraph, ctx: &mut SharedContext) -> RunResult {
        ctx.clear();
        self.status = RunStatus::Running;
        let mut run = RunResult::new();
        for level in graph.execution_levels() {
            if let Some(halt) = self.fan_out_level(graph, &level, ctx, &mut run) {
                return halt;
            }
        }
        self.finish(run)
    }

    /// Run one independent set. Returns the terminal result if the run
    /// has to stop here.
    fn fan_out_level(
        &mut self,
        graph: &PipelineGraph,
        ids: &[StageId],
        ctx: &mut SharedContext,
        run: &mut RunResult,
    ) -> Option<RunResult> {
        if self.cancel.is_cancelled() {
            return Some(self.cancelled(std::mem::replace(run, RunResult::new())));
        }

        let mut runnable = Vec::new();
        for &id in ids {
            let Some(stage) = graph.stage(id) else {
                continue;
            };
            if stage.run_mode() == RunMode::Manual {
                run.stage_results.insert(id, StageOutcome::Skipped);
            } else {
                runnable.push(stage);
            }
        }

        let snapshot: &SharedContext = ctx;
        let this: &Self = self;
        let joined: Vec<(&dyn Stage, Option<(Result<Completion, StageError>, ContextWrites)>)> =
            runnable
                .par_iter()
                .map(|&stage| {
                    if this.cancel.is_cancelled() {
                        return (stage, None);
                    }
                    (stage, Some(this.execute_one(stage, snapshot)))
                })
                .collect();

        let mut written: HashSet<String> = HashSet::new();
        let mut first_failure: Option<(&dyn Stage, StageError)> = None;
        let mut skipped_by_cancel = false;
        for (stage, executed) in joined {
            let Some((result, writes)) = executed else {
                skipped_by_cancel = true;
                continue;
            };
            let result = result.and_then(|completion| {
                match writes.keys().find(|k| written.contains(*k)) {
                    Some(key) => Err(StageError::KeyCollision {
                        key: key.to_string(),
                    }),
                    None => Ok(completion),
                }
            });
            match result {
                Ok(completion) => {
                    written.extend(writes.keys().map(str::to_string));
                    ctx.merge(writes);
                    run.stage_results
                        .insert(stage.id(), StageOutcome::Completed { completion });
                }
                Err(err) => {
                    run.stage_results.insert(stage.id(), failed(&err));
                    if first_failure.is_none() {
                        first_failure = Some((stage, err));
                    }
                }
            }
        }

        let taken = std::mem::replace(run, RunResult::new());
        if let Some((stage, err)) = first_failure {
            return Some(self.failed(taken, stage, &err));
        }
        if skipped_by_cancel {
            return Some(self.cancelled(taken));
        }
        *run = taken;
        None
    }

    fn execute_one(
        &self,
        stage: &dyn Stage,
        ctx: &SharedContext,
    ) -> (Result<Completion, StageError>, ContextWrites) {
        let id = stage.id();
        info!(stage = %id, kind = stage.kind(), name = stage.name(), "stage started");
        if let Some(observer) = &self.observer {
            observer.on_stage_started(id, stage.name());
        }

        let mut writes = ContextWrites::new();
        let result = stage.execute(ctx, &mut writes, &self.cancel);

        let outcome = match &result {
            Ok(completion) => StageOutcome::Completed {
                completion: *completion,
            },
            Err(err) => failed(err),
        };
        info!(stage = %id, outcome = ?outcome, "stage finished");
        if let Some(observer) = &self.observer {
            observer.on_stage_finished(id, &outcome);
        }
        (result, writes)
    }

    fn finish(&mut self, mut run: RunResult) -> RunResult {
        if self.cancel.is_cancelled() {
            return self.cancelled(run);
        }
        self.status = RunStatus::Completed;
        run.status = RunStatus::Completed;
        run.success = true;
        info!(stages = run.stage_results.len(), "run completed");
        run
    }

    fn failed(&mut self, mut run: RunResult, stage: &dyn Stage, err: &StageError) -> RunResult {
        warn!(stage = %stage.id(), name = stage.name(), error = %err, "run halted");
        self.status = RunStatus::Failed;
        run.status = RunStatus::Failed;
        run.success = false;
        run.first_failing_stage = Some(stage.id());
        run.message = Some(format!("{} ({}): {err}", stage.name(), stage.id()));
        run
    }

    fn cancelled(&mut self, mut run: RunResult) -> RunResult {
        warn!("run cancelled");
        self.status = RunStatus::Cancelled;
        run.status = RunStatus::Cancelled;
        run.success = false;
        run.message = Some("run cancelled before completion".to_string());
        run
    }
}

fn failed(err: &StageError) -> StageOutcome {
    StageOutcome::Failed {
        kind: err.kind(),
        message: err.to_string(),
    }
}

fn check_independent(graph: &PipelineGraph, ids: &[StageId]) -> Result<(), EngineError> {
    for &id in ids {
        if !graph.contains(id) {
            return Err(EngineError::StageNotFound { id });
        }
    }
    // A stage that reads another's output depends on it whether or not the
    // graph carries the edge.
    for &to in ids {
        let declared = graph.stage(to).map(|s| s.upstream()).unwrap_or_default();
        for &from in ids {
            if from == to {
                continue;
            }
            if graph.has_edge(from, to) || declared.contains(&from) {
                return Err(EngineError::NotIndependent { from, to });
            }
        }
    }
    Ok(())
}
