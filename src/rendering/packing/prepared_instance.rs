use glam::Affine3A;
use std::sync::Arc;

use super::prepared_pack::PreparedPack;
use super::profile::check_fill_depth;
use crate::error::SceneError;
use crate::rendering::aggregation::{Aggregate, Token};
use crate::rendering::{OccludeQuery, TraceQuery};
use crate::utilities::{AxisAlignedBoundingBox, Ray, UniformTransform};

/// A prepared pack placed inside a parent pack.
///
/// Queries enter the pack by moving their ray into its local space and scaling their running distance by the uniform
/// scale of the transform, then scale the result back on the way out.
#[derive(Clone, Debug)]
pub struct PreparedInstance {
    pack: Arc<PreparedPack>,
    transform: UniformTransform,
    /// Bounds in parent space.
    aabb: AxisAlignedBoundingBox,
}

impl PreparedInstance {
    /// Places `pack` with `placement` (local to parent).
    ///
    /// The parent space bounds transform the boxes at `fill_depth` of the pack's hierarchy, which is tighter than
    /// transforming the root box alone. `fill_depth` must lie in `1..=MAX_INSTANCE_FILL_DEPTH`.
    pub fn new(pack: Arc<PreparedPack>, placement: Affine3A, fill_depth: u32) -> Result<Self, SceneError> {
        check_fill_depth(fill_depth)?;
        let transform = UniformTransform::new(placement)?;

        let mut span = vec![AxisAlignedBoundingBox::NONE; 1 << fill_depth];
        let count = pack.aggregator().fill_aabb(fill_depth, &mut span);
        let parent: Vec<_> = span[..count]
            .iter()
            .map(|aabb| transform.aabb_to_parent(aabb))
            .collect();

        Ok(Self {
            aabb: AxisAlignedBoundingBox::from_boxes(&parent),
            pack,
            transform,
        })
    }

    #[inline]
    pub fn pack(&self) -> &Arc<PreparedPack> {
        &self.pack
    }

    #[inline]
    pub fn transform(&self) -> &UniformTransform {
        &self.transform
    }

    #[inline]
    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        self.aabb
    }

    /// Traces `query` through the pack. `token` is this instance's token in the parent pack.
    pub fn trace(&self, token: Token, query: &mut TraceQuery) {
        let ray = query.ray;
        let distance = query.distance;
        let local_distance = distance * self.transform.forward_scale();

        query.ray = self.transform.ray_to_local(&ray);
        query.distance = local_distance;
        query.current.push(token);

        self.pack.trace(query);

        query.current.pop();
        query.ray = ray;
        query.distance = if query.distance < local_distance {
            (query.distance * self.transform.inverse_scale()).min(distance)
        } else {
            distance
        };
    }

    /// Tests whether anything inside the pack blocks `query`.
    pub fn occlude(&self, token: Token, query: &mut OccludeQuery) -> bool {
        let ray = query.ray;
        let travel = query.travel;

        query.ray = self.transform.ray_to_local(&ray);
        query.travel = travel * self.transform.forward_scale();
        query.current.push(token);

        let occluded = self.pack.occlude(query);

        query.current.pop();
        query.ray = ray;
        query.travel = travel;
        occluded
    }

    /// Counts the primitive tests of tracing `ray` through the pack, tightening `distance` on a hit.
    pub fn intersect_cost(&self, ray: &Ray, distance: &mut f32) -> u32 {
        let local_ray = self.transform.ray_to_local(ray);
        let start = *distance * self.transform.forward_scale();
        let mut local_distance = start;

        let cost = self.pack.trace_cost(&local_ray, &mut local_distance);
        if local_distance < start {
            *distance = (local_distance * self.transform.inverse_scale()).min(*distance);
        }
        cost
    }
}
