use fit_kernel::CancelToken;
use inspect_types::StageId;

use crate::context::{ContextWrites, SharedContext};
use crate::types::{Completion, EngineError, RunMode, StageError};

/// One unit of pipeline work.
///
/// A stage owns its parameters and nothing else: everything it consumes
/// comes from the context and everything it produces goes into `out`.
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    /// Registry kind identifier, e.g. `"CircleFitting"`.
    fn kind(&self) -> &'static str;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Parameters as exposed to an editor.
    fn parameters(&self) -> serde_json::Value;

    /// Replace the parameters. Rejects values that do not decode; range
    /// checks happen at execution.
    fn set_parameters(&mut self, params: serde_json::Value) -> Result<(), EngineError>;

    fn run_mode(&self) -> RunMode {
        RunMode::Auto
    }

    /// Stages whose context entries this stage reads.
    fn upstream(&self) -> Vec<StageId> {
        Vec::new()
    }

    fn execute(
        &self,
        ctx: &SharedContext,
        out: &mut ContextWrites,
        cancel: &CancelToken,
    ) -> Result<Completion, StageError>;
}
