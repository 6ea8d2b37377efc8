use crate::error::SceneError;
use crate::rendering::aggregation::{AggregatorKind, PARALLEL_THRESHOLD};

/// Depth at which an instance samples the hierarchy of its pack to bound itself in parent space.
pub const INSTANCE_FILL_DEPTH: u32 = 6;

/// Deepest level an instance bound may sample.
pub const MAX_INSTANCE_FILL_DEPTH: u32 = 16;

/// Settings used when preparing object packs for tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrepareProfile {
    /// Structure built over packs with two or more entries. Smaller packs always use `AggregatorKind::Linear`.
    pub aggregator: AggregatorKind,
    /// Ranges longer than this are built in parallel.
    pub parallel_threshold: usize,
    /// Level of a pack's hierarchy whose boxes are transformed to bound an instance of it. Higher is tighter.
    ///
    /// Must lie in `1..=MAX_INSTANCE_FILL_DEPTH`; preparing a pack with any other value fails with
    /// `SceneError::InvalidFillDepth`.
    pub instance_fill_depth: u32,
}

impl Default for PrepareProfile {
    fn default() -> Self {
        Self {
            aggregator: AggregatorKind::Quad,
            parallel_threshold: PARALLEL_THRESHOLD,
            instance_fill_depth: INSTANCE_FILL_DEPTH,
        }
    }
}

impl PrepareProfile {
    pub fn with_aggregator(mut self, aggregator: AggregatorKind) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    pub fn with_instance_fill_depth(mut self, instance_fill_depth: u32) -> Self {
        self.instance_fill_depth = instance_fill_depth;
        self
    }

    /// Checks the settings that can be out of range.
    pub fn validate(&self) -> Result<(), SceneError> {
        check_fill_depth(self.instance_fill_depth)
    }
}

pub(crate) fn check_fill_depth(depth: u32) -> Result<(), SceneError> {
    if (1..=MAX_INSTANCE_FILL_DEPTH).contains(&depth) {
        Ok(())
    } else {
        Err(SceneError::InvalidFillDepth {
            depth,
            maximum: MAX_INSTANCE_FILL_DEPTH,
        })
    }
}
