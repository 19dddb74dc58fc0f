use fit_kernel::CancelToken;
use inspect_types::{RegionDescriptor, RegionKind, StageId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::keys;
use crate::context::{ContextWrites, SharedContext};
use crate::stage::Stage;
use crate::types::{Completion, EngineError, RunMode, StageError};

pub const KIND: &str = "RegionFilter";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFilterParams {
    /// Stage whose `PointCloud_<id>` is cropped.
    #[serde(default)]
    pub source: Option<StageId>,
    pub region: RegionDescriptor,
    #[serde(default)]
    pub run_mode: RunMode,
}

impl RegionFilterParams {
    pub fn new(source: StageId, region: RegionDescriptor) -> Self {
        Self {
            source: Some(source),
            region,
            run_mode: RunMode::Auto,
        }
    }

    fn validate(&self) -> Result<StageId, StageError> {
        let source = self.source.ok_or_else(|| StageError::InvalidParameter {
            name: "source".into(),
            reason: "no upstream point cloud selected".into(),
        })?;
        let r = &self.region;
        let ok = match r.kind {
            RegionKind::Box => r.size.iter().all(|s| s.is_finite() && *s >= 0.0),
            RegionKind::Sphere | RegionKind::Cylinder => r.radius.is_finite() && r.radius > 0.0,
        };
        if !ok {
            return Err(StageError::InvalidParameter {
                name: "region".into(),
                reason: format!("degenerate {:?} region", r.kind),
            });
        }
        Ok(source)
    }
}

/// Crops an upstream point cloud to a region of interest and publishes
/// the region itself as a hint for later fitting stages.
#[derive(Debug, Clone)]
pub struct RegionFilter {
    id: StageId,
    name: String,
    params: RegionFilterParams,
}

impl RegionFilter {
    pub fn new(params: RegionFilterParams) -> Self {
        Self::with_id(StageId::new(), params)
    }

    pub fn with_id(id: StageId, params: RegionFilterParams) -> Self {
        Self {
            id,
            name: KIND.to_string(),
            params,
        }
    }

    pub fn from_value(id: StageId, params: serde_json::Value) -> Result<Box<dyn Stage>, EngineError> {
        let params: RegionFilterParams = serde_json::from_value(params)?;
        Ok(Box::new(Self::with_id(id, params)))
    }

    pub fn params(&self) -> &RegionFilterParams {
        &self.params
    }
}

impl Stage for RegionFilter {
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
        self.params.source.into_iter().collect()
    }

    fn execute(
        &self,
        ctx: &SharedContext,
        out: &mut ContextWrites,
        _cancel: &CancelToken,
    ) -> Result<Completion, StageError> {
        let source = self.params.validate()?;
        let key = keys::point_cloud(source);
        let cloud = ctx
            .get(&key)
            .ok_or_else(|| StageError::UpstreamDataMissing {
                key: key.name().to_string(),
            })?;

        let region = &self.params.region;
        let inside: Vec<usize> = cloud
            .iter()
            .enumerate()
            .filter(|(_, p)| region.contains(p))
            .map(|(i, _)| i)
            .collect();
        info!(
            stage = %self.id,
            kept = inside.len(),
            total = cloud.len(),
            "region filter applied"
        );

        out.set(&keys::point_cloud(self.id), cloud.subset(&inside));
        out.set(&keys::region(self.id), region.clone());
        Ok(Completion::Produced)
    }
}
