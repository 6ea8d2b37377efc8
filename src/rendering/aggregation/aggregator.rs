use super::bounding_volume_hierarchy::BoundingVolumeHierarchy;
use super::linear_aggregator::LinearAggregator;
use super::quad_bounding_volume_hierarchy::QuadBoundingVolumeHierarchy;
use super::token::Token;
use crate::error::SceneError;
use crate::rendering::{OccludeQuery, TraceQuery};
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// Resolves the geometry tokens an aggregator reaches during traversal.
///
/// Implemented by the owner of the leaf arrays an aggregator indexes into.
pub trait LeafIntersector {
    /// Intersects the geometry behind `token`, offering any hit to `query`.
    fn intersect(&self, token: Token, query: &mut TraceQuery);

    /// Whether the geometry behind `token` blocks `query`.
    fn occlude(&self, token: Token, query: &mut OccludeQuery) -> bool;

    /// Intersects the geometry behind `token`, tightening `distance` on a hit.
    /// Returns the number of primitive intersection tests performed.
    fn intersect_cost(&self, token: Token, ray: &Ray, distance: &mut f32) -> u32;
}

/// Operations shared by every acceleration structure over a set of boxed leaves.
///
/// All queries take `&self`, so one structure serves any number of concurrent traversals.
pub trait Aggregate: Send + Sync {
    /// Bounds of everything inside the structure.
    fn aabb(&self) -> AxisAlignedBoundingBox;

    /// Finds the closest hit of `query`, only ever shortening `query.distance`.
    fn trace<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut TraceQuery);

    /// Whether anything blocks `query` before `query.travel`.
    fn occlude<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut OccludeQuery) -> bool;

    /// Traces `ray` up to `distance` like `trace` and returns the number of primitive intersection tests performed.
    fn trace_cost<L: LeafIntersector + ?Sized>(&self, leaves: &L, ray: &Ray, distance: &mut f32) -> u32;

    /// Writes the boxes of every node at `depth` into `span` and returns how many were written.
    ///
    /// The root sits at depth 1. Leaves shallower than `depth` are carried down and still emitted.
    /// `span` must hold at least `2^depth` boxes.
    fn fill_aabb(&self, depth: u32, span: &mut [AxisAlignedBoundingBox]) -> usize;

    /// Hash over the exact layout of the structure. Equal structures hash equally across runs.
    fn structural_hash(&self) -> u64;
}

/// Selects which structure an `Aggregator` is built as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AggregatorKind {
    /// Brute force over every entry.
    Linear,
    /// Binary bounding volume hierarchy.
    Binary,
    /// Four-wide bounding volume hierarchy.
    #[default]
    Quad,
}

/// The closed set of acceleration structures a pack can be built with.
#[derive(Clone, Debug)]
pub enum Aggregator {
    Linear(LinearAggregator),
    Bvh(BoundingVolumeHierarchy),
    Qbvh(QuadBoundingVolumeHierarchy),
}

impl Aggregator {
    /// Builds a structure of `kind` over `aabbs`, where `tokens[i]` is the geometry inside `aabbs[i]`.
    pub fn build(
        kind: AggregatorKind,
        aabbs: &[AxisAlignedBoundingBox],
        tokens: &[Token],
        parallel_threshold: usize,
    ) -> Result<Self, SceneError> {
        Ok(match kind {
            AggregatorKind::Linear => Self::Linear(LinearAggregator::new(aabbs, tokens)?),
            AggregatorKind::Binary => {
                Self::Bvh(BoundingVolumeHierarchy::new(aabbs, tokens, parallel_threshold)?)
            }
            AggregatorKind::Quad => {
                Self::Qbvh(QuadBoundingVolumeHierarchy::new(aabbs, tokens, parallel_threshold)?)
            }
        })
    }

    pub fn kind(&self) -> AggregatorKind {
        match self {
            Self::Linear(_) => AggregatorKind::Linear,
            Self::Bvh(_) => AggregatorKind::Binary,
            Self::Qbvh(_) => AggregatorKind::Quad,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $engine:ident => $body:expr) => {
        match $self {
            Aggregator::Linear($engine) => $body,
            Aggregator::Bvh($engine) => $body,
            Aggregator::Qbvh($engine) => $body,
        }
    };
}

impl Aggregate for Aggregator {
    fn aabb(&self) -> AxisAlignedBoundingBox {
        dispatch!(self, engine => engine.aabb())
    }

    #[inline]
    fn trace<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut TraceQuery) {
        dispatch!(self, engine => engine.trace(leaves, query))
    }

    #[inline]
    fn occlude<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut OccludeQuery) -> bool {
        dispatch!(self, engine => engine.occlude(leaves, query))
    }

    fn trace_cost<L: LeafIntersector + ?Sized>(&self, leaves: &L, ray: &Ray, distance: &mut f32) -> u32 {
        dispatch!(self, engine => engine.trace_cost(leaves, ray, distance))
    }

    fn fill_aabb(&self, depth: u32, span: &mut [AxisAlignedBoundingBox]) -> usize {
        dispatch!(self, engine => engine.fill_aabb(depth, span))
    }

    fn structural_hash(&self) -> u64 {
        dispatch!(self, engine => engine.structural_hash())
    }
}

/// Checks the input of an aggregator constructor.
pub(crate) fn validate_entries(
    aabbs: &[AxisAlignedBoundingBox],
    tokens: &[Token],
    minimum: usize,
) -> Result<(), SceneError> {
    if aabbs.len() != tokens.len() {
        return Err(SceneError::MismatchedLengths {
            boxes: aabbs.len(),
            tokens: tokens.len(),
        });
    }
    if aabbs.len() < minimum {
        return Err(SceneError::TooFewEntries {
            count: aabbs.len(),
            minimum,
        });
    }
    assert!(
        tokens.iter().all(|token| token.is_geometry()),
        "Aggregators only accept geometry tokens as entries."
    );
    Ok(())
}

/// Asserts that `span` can hold every node at `depth` of a binary layout.
pub(crate) fn assert_fill_span(depth: u32, span: &[AxisAlignedBoundingBox]) {
    assert!(depth >= 1, "Depth starts at 1 for the root.");
    let required = 1usize.checked_shl(depth);
    assert!(
        required.is_some_and(|required| span.len() >= required),
        "A span of {} boxes cannot hold the nodes at depth {depth}.",
        span.len()
    );
}
