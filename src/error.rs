//! Errors raised while preparing geometry for tracing.

use glam::Vec3;
use thiserror::Error;

/// Construction-time failures. Each one indicates a malformed scene and aborts preparation of the pack that hit it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Bounding boxes and tokens must pair up one to one.
    #[error("bounding box count {boxes} does not match token count {tokens}")]
    MismatchedLengths {
        /// Number of bounding boxes supplied.
        boxes: usize,
        /// Number of tokens supplied.
        tokens: usize,
    },

    /// The aggregator cannot be built over this few entries.
    #[error("aggregator requires at least {minimum} entries, got {count}")]
    TooFewEntries {
        /// Number of entries supplied.
        count: usize,
        /// Minimum number of entries the aggregator accepts.
        minimum: usize,
    },

    /// An object pack must contain at least one geometry or instance.
    #[error("object pack contains no geometry")]
    EmptyPack,

    /// Spheres need a radius that is finite and greater than zero.
    #[error("sphere radius {radius} is not a positive finite number")]
    InvalidRadius {
        /// Radius the sphere was described with.
        radius: f32,
    },

    /// Instances sample their pack's hierarchy at a level between one and a fixed maximum.
    #[error("instance fill depth {depth} is outside 1..={maximum}")]
    InvalidFillDepth {
        /// Depth requested by the profile.
        depth: u32,
        /// Deepest level an instance may sample.
        maximum: u32,
    },

    /// Queries record the instance path of every hit, which has room for a fixed number of levels.
    #[error("instances are nested {depth} levels deep, at most {limit} are supported")]
    NestingTooDeep {
        /// Number of instances between this pack and its deepest geometry.
        depth: usize,
        /// Deepest nesting a query can follow.
        limit: usize,
    },

    /// Instances only support uniform scaling.
    #[error("instance transform has non-uniform scale {scale}")]
    NonUniformScale {
        /// Lengths of the transform's basis vectors.
        scale: Vec3,
    },

    /// The transform cannot be inverted or contains non-finite values.
    #[error("instance transform is degenerate or not finite")]
    DegenerateTransform,
}
