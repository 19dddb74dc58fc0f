use std::collections::HashMap;

use inspect_types::{ShapeKind, StageId};
use tracing::debug;

use crate::stage::Stage;
use crate::stages::{fitting, region_filter, source, FittingStage, PointSetSource, RegionFilter};
use crate::types::EngineError;

/// Builds a stage of one kind from its id and editor parameters.
pub type StageConstructor = fn(StageId, serde_json::Value) -> Result<Box<dyn Stage>, EngineError>;

/// Explicit kind-id to constructor table.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    constructors: HashMap<&'static str, StageConstructor>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in stage kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(source::KIND, PointSetSource::from_value);
        registry.register(region_filter::KIND, RegionFilter::from_value);
        registry.register(fitting::kind_for(ShapeKind::Circle), |id, v| {
            FittingStage::from_value(ShapeKind::Circle, id, v)
        });
        registry.register(fitting::kind_for(ShapeKind::Line), |id, v| {
            FittingStage::from_value(ShapeKind::Line, id, v)
        });
        registry.register(fitting::kind_for(ShapeKind::Plane), |id, v| {
            FittingStage::from_value(ShapeKind::Plane, id, v)
        });
        registry.register(fitting::kind_for(ShapeKind::Sphere), |id, v| {
            FittingStage::from_value(ShapeKind::Sphere, id, v)
        });
        registry.register(fitting::kind_for(ShapeKind::Cylinder), |id, v| {
            FittingStage::from_value(ShapeKind::Cylinder, id, v)
        });
        registry
    }

    /// Add or replace the constructor for `kind`.
    pub fn register(&mut self, kind: &'static str, constructor: StageConstructor) {
        if self.constructors.insert(kind, constructor).is_some() {
            debug!(kind, "stage constructor replaced");
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kind ids, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.constructors.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct a stage of `kind`. Parameters must be a JSON object or
    /// `null`, which selects the kind's defaults.
    pub fn create(
        &self,
        kind: &str,
        id: StageId,
        params: serde_json::Value,
    ) -> Result<Box<dyn Stage>, EngineError> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| EngineError::UnknownStageKind {
                kind: kind.to_string(),
            })?;
        if !(params.is_null() || params.is_object()) {
            return Err(EngineError::InvalidParameters {
                kind: kind.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }
        constructor(id, params)
    }
}
