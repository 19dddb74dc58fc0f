use fit_kernel::CancelToken;
use inspect_types::{PointSet, StageId};
use tracing::{info, warn};

use super::keys;
use crate::context::{ContextWrites, SharedContext};
use crate::stage::Stage;
use crate::types::{Completion, EngineError, StageError};

pub const KIND: &str = "PointSetSource";

/// Publishes an in-memory scan as `PointCloud_<id>`.
///
/// This is where imported data enters a run; file parsing happens before
/// the pipeline sees it.
#[derive(Debug, Clone)]
pub struct PointSetSource {
    id: StageId,
    name: String,
    points: PointSet,
}

impl PointSetSource {
    pub fn new(points: PointSet) -> Self {
        Self::with_id(StageId::new(), points)
    }

    pub fn with_id(id: StageId, points: PointSet) -> Self {
        Self {
            id,
            name: KIND.to_string(),
            points,
        }
    }

    /// Registry constructor. `null` parameters give an empty set.
    pub fn from_value(id: StageId, params: serde_json::Value) -> Result<Box<dyn Stage>, EngineError> {
        let mut stage = Self::with_id(id, PointSet::new());
        stage.set_parameters(params)?;
        Ok(Box::new(stage))
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }
}

impl Stage for PointSetSource {
    fn id(&self) -> StageId {
        self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn parameters(&self) -> serde_json::Value {
        match serde_json::to_value(&self.points) {
            Ok(value) => value,
            Err(err) => {
                warn!(stage = %self.id, error = %err, "parameters not serializable");
                serde_json::Value::Null
            }
        }
    }

    fn set_parameters(&mut self, params: serde_json::Value) -> Result<(), EngineError> {
        let mut points: PointSet = if params.is_null() {
            PointSet::new()
        } else {
            serde_json::from_value(params)?
        };
        points.recompute_bounds();
        self.points = points;
        Ok(())
    }

    fn execute(
        &self,
        _ctx: &SharedContext,
        out: &mut ContextWrites,
        _cancel: &CancelToken,
    ) -> Result<Completion, StageError> {
        info!(stage = %self.id, points = self.points.len(), "point set published");
        out.set(&keys::point_cloud(self.id), self.points.clone());
        Ok(Completion::Produced)
    }
}
