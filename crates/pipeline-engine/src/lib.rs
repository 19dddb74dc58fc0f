//! Dependency-graph pipeline that drives primitive fitting.
//!
//! Stages live in a [`PipelineGraph`], exchange results through a keyed
//! [`SharedContext`] and are executed by an [`Orchestrator`], either in
//! topological order or fanned out over independent sets.

pub mod context;
pub mod graph;
pub mod orchestrator;
pub mod registry;
pub mod stage;
pub mod stages;
pub mod types;

pub use context::{ContextKey, ContextWrites, SharedContext};
pub use graph::PipelineGraph;
pub use orchestrator::{Orchestrator, RunObserver};
pub use registry::{StageConstructor, StageRegistry};
pub use stage::Stage;
pub use types::{
    Completion, EngineError, ErrorKind, RunMode, RunResult, RunStatus, StageError, StageOutcome,
};
