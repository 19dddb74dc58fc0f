//! Built-in stage kinds.

pub mod fitting;
pub mod region_filter;
pub mod source;

pub use fitting::{FittingParams, FittingStage};
pub use region_filter::{RegionFilter, RegionFilterParams};
pub use source::PointSetSource;

/// Context keys written by the built-in stages.
pub mod keys {
    use inspect_types::{FitResult, PointSet, RegionDescriptor, ShapeKind, StageId};

    use crate::context::ContextKey;

    pub fn point_cloud(id: StageId) -> ContextKey<PointSet> {
        ContextKey::scoped("PointCloud", id)
    }

    pub fn region(id: StageId) -> ContextKey<RegionDescriptor> {
        ContextKey::scoped("Region", id)
    }

    pub fn fit_result(shape: ShapeKind, id: StageId) -> ContextKey<FitResult> {
        ContextKey::scoped(super::fitting::kind_for(shape), id)
    }

    pub fn circle_inliers(id: StageId) -> ContextKey<PointSet> {
        ContextKey::scoped("CircleInliers", id)
    }
}
