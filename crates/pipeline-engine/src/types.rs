use std::collections::HashMap;

use fit_kernel::FitError;
use inspect_types::StageId;
use serde::{Deserialize, Serialize};

/// Whether a stage takes part in full runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunMode {
    /// Executed by `run_sequential` and the fan-out runs.
    #[default]
    Auto,
    /// Skipped by full runs; only executed through `run_stage`.
    Manual,
}

/// Run lifecycle. `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunStatus {
    #[default]
    NotStarted,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Failure taxonomy reported through [`StageOutcome`] and [`RunResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ErrorKind {
    /// Fewer points than the shape's minimal sample. Not a failure.
    InsufficientData,
    /// RANSAC accepted no candidate. Not a failure.
    NoConvergentModel,
    /// A required context key was absent. Halts the run.
    UpstreamDataMissing,
    /// Any other stage error. Halts the run.
    StageFailure,
    /// The run was cancelled.
    Cancelled,
}

impl ErrorKind {
    /// Whether this kind stops a run, as opposed to a sentinel result.
    pub fn halts(self) -> bool {
        !matches!(self, Self::InsufficientData | Self::NoConvergentModel)
    }
}

/// What a successful `execute` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Completion {
    Produced,
    /// Output was written, but it is the no-fit sentinel.
    Sentinel { kind: ErrorKind },
}

/// Per-stage record in a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StageOutcome {
    Completed { completion: Completion },
    Skipped,
    Failed { kind: ErrorKind, message: String },
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Summary of one orchestrated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub success: bool,
    pub stage_results: HashMap<StageId, StageOutcome>,
    pub first_failing_stage: Option<StageId>,
    pub message: Option<String>,
}

impl RunResult {
    pub(crate) fn new() -> Self {
        Self {
            status: RunStatus::Running,
            success: false,
            stage_results: HashMap::new(),
            first_failing_stage: None,
            message: None,
        }
    }

    pub fn outcome(&self, id: StageId) -> Option<&StageOutcome> {
        self.stage_results.get(&id)
    }
}

/// Structural errors from the graph, registry and parameter handling.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("stage not found: {id}")]
    StageNotFound { id: StageId },

    #[error("stage already in graph: {id}")]
    DuplicateStage { id: StageId },

    #[error("self-loop on stage {id}")]
    SelfLoop { id: StageId },

    #[error("edge already exists: {from} -> {to}")]
    DuplicateEdge { from: StageId, to: StageId },

    #[error("no edge {from} -> {to}")]
    EdgeNotFound { from: StageId, to: StageId },

    #[error("edge {from} -> {to} would create a cycle")]
    CycleDetected { from: StageId, to: StageId },

    #[error("stage {to} depends on {from} and cannot fan out with it")]
    NotIndependent { from: StageId, to: StageId },

    #[error("unknown stage kind: {kind}")]
    UnknownStageKind { kind: String },

    #[error("invalid parameters for {kind}: {reason}")]
    InvalidParameters { kind: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while a stage executes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error("upstream data missing: {key}")]
    UpstreamDataMissing { key: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("fit configuration rejected: {0}")]
    Fit(#[from] FitError),

    #[error("context key written by more than one stage: {key}")]
    KeyCollision { key: String },

    #[error("stage failed: {reason}")]
    Failed { reason: String },
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UpstreamDataMissing { .. } => ErrorKind::UpstreamDataMissing,
            _ => ErrorKind::StageFailure,
        }
    }
}
