use glam::Vec2;
use rayon::prelude::*;
use std::sync::Arc;

use super::object_pack::ObjectPack;
use super::prepared_instance::PreparedInstance;
use super::prepared_sphere::PreparedSphere;
use super::prepared_triangle::PreparedTriangle;
use super::profile::PrepareProfile;
use crate::error::SceneError;
use crate::rendering::aggregation::{
    Aggregate, Aggregator, AggregatorKind, GeometryKind, LeafIntersector, Token, INSTANCE_DEPTH_LIMIT,
};
use crate::rendering::{OccludeQuery, TraceQuery, DISTANCE_MIN};
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// Geometry of one object pack flattened for tracing, together with the structure aggregating it.
///
/// Immutable once built. Instances reference packs through `Arc`, so one pack can be placed any number of times.
#[derive(Debug)]
pub struct PreparedPack {
    triangles: Box<[PreparedTriangle]>,
    spheres: Box<[PreparedSphere]>,
    instances: Box<[PreparedInstance]>,
    aggregator: Aggregator,
    /// Instances between this pack and its most deeply nested geometry.
    nesting_depth: usize,
}

impl PreparedPack {
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(triangles = pack.triangles.len(), spheres = pack.spheres.len(), instances = pack.instances.len())
    )]
    pub fn new(pack: &ObjectPack, profile: &PrepareProfile) -> Result<Arc<Self>, SceneError> {
        let count = pack.len();
        if count == 0 {
            return Err(SceneError::EmptyPack);
        }
        profile.validate()?;
        let nesting_depth = pack
            .instances
            .iter()
            .map(|instance| instance.pack.nesting_depth + 1)
            .max()
            .unwrap_or(0);
        if nesting_depth > INSTANCE_DEPTH_LIMIT {
            return Err(SceneError::NestingTooDeep {
                depth: nesting_depth,
                limit: INSTANCE_DEPTH_LIMIT,
            });
        }
        assert!(
            count <= u32::MAX as usize,
            "An object pack cannot hold more than {} entries.",
            u32::MAX
        );

        let triangles: Vec<_> = pack
            .triangles
            .par_iter()
            .map(|triangle| PreparedTriangle::new(triangle.vertex0, triangle.vertex1, triangle.vertex2))
            .collect();
        let spheres = pack
            .spheres
            .par_iter()
            .map(|sphere| PreparedSphere::new(sphere.center, sphere.radius))
            .collect::<Result<Vec<_>, _>>()?;
        let instances = pack
            .instances
            .par_iter()
            .map(|instance| {
                PreparedInstance::new(instance.pack.clone(), instance.transform, profile.instance_fill_depth)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let aabbs: Vec<AxisAlignedBoundingBox> = triangles
            .par_iter()
            .map(PreparedTriangle::aabb)
            .chain(spheres.par_iter().map(PreparedSphere::aabb))
            .chain(instances.par_iter().map(PreparedInstance::aabb))
            .collect();
        let tokens: Vec<Token> = (0..triangles.len() as u32)
            .map(Token::triangle)
            .chain((0..spheres.len() as u32).map(Token::sphere))
            .chain((0..instances.len() as u32).map(Token::instance))
            .collect();

        let kind = if count < 2 {
            AggregatorKind::Linear
        } else {
            profile.aggregator
        };
        let aggregator = Aggregator::build(kind, &aabbs, &tokens, profile.parallel_threshold)?;
        tracing::debug!(?kind, "prepared pack");

        Ok(Arc::new(Self {
            triangles: triangles.into_boxed_slice(),
            spheres: spheres.into_boxed_slice(),
            instances: instances.into_boxed_slice(),
            aggregator,
            nesting_depth,
        }))
    }

    #[inline]
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Number of instances a query passes through to reach the most deeply nested geometry. Zero without instances.
    #[inline]
    pub fn nesting_depth(&self) -> usize {
        self.nesting_depth
    }

    #[inline]
    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        self.aggregator.aabb()
    }

    #[inline]
    pub fn triangles(&self) -> &[PreparedTriangle] {
        &self.triangles
    }

    #[inline]
    pub fn spheres(&self) -> &[PreparedSphere] {
        &self.spheres
    }

    #[inline]
    pub fn instances(&self) -> &[PreparedInstance] {
        &self.instances
    }

    /// Finds the closest hit of `query` inside this pack, in the pack's local space.
    #[inline]
    pub fn trace(&self, query: &mut TraceQuery) {
        self.aggregator.trace(self, query);
    }

    #[inline]
    pub fn occlude(&self, query: &mut OccludeQuery) -> bool {
        self.aggregator.occlude(self, query)
    }

    #[inline]
    pub fn trace_cost(&self, ray: &Ray, distance: &mut f32) -> u32 {
        self.aggregator.trace_cost(self, ray, distance)
    }

    /// Ray test against a triangle or sphere of this pack.
    ///
    /// `ignored` marks the primitive a ray is leaving. Spheres then skip the crossing at the ray origin so that the
    /// opposite side can still be found; a triangle has no second crossing.
    #[inline]
    fn intersect_primitive(&self, kind: GeometryKind, index: u32, ray: &Ray, ignored: bool) -> Option<(f32, Vec2)> {
        match kind {
            GeometryKind::Triangle => self.triangles[index as usize].intersect(ray),
            GeometryKind::Sphere => {
                let minimum = if ignored { DISTANCE_MIN } else { 0.0 };
                self.spheres[index as usize].intersect_beyond(ray, minimum)
            }
            GeometryKind::Instance => unreachable!("Instances are not primitives."),
        }
    }
}

impl LeafIntersector for PreparedPack {
    fn intersect(&self, token: Token, query: &mut TraceQuery) {
        match token {
            Token::Geometry(GeometryKind::Instance, index) => self.instances[index as usize].trace(token, query),
            Token::Geometry(kind, index) => {
                let ignored = query.ignores(token);
                if let Some((distance, uv)) = self.intersect_primitive(kind, index, &query.ray, ignored) {
                    query.record(token, distance, uv);
                }
            }
            Token::Empty | Token::Node(_) => unreachable!("Only geometry tokens reach the leaves."),
        }
    }

    fn occlude(&self, token: Token, query: &mut OccludeQuery) -> bool {
        match token {
            Token::Geometry(GeometryKind::Instance, index) => self.instances[index as usize].occlude(token, query),
            Token::Geometry(kind, index) => self
                .intersect_primitive(kind, index, &query.ray, query.ignores(token))
                .is_some_and(|(distance, _)| query.blocks(token, distance)),
            Token::Empty | Token::Node(_) => unreachable!("Only geometry tokens reach the leaves."),
        }
    }

    fn intersect_cost(&self, token: Token, ray: &Ray, distance: &mut f32) -> u32 {
        match token {
            Token::Geometry(GeometryKind::Instance, index) => {
                self.instances[index as usize].intersect_cost(ray, distance)
            }
            Token::Geometry(kind, index) => {
                if let Some((hit, _)) = self.intersect_primitive(kind, index, ray, false) {
                    *distance = distance.min(hit);
                }
                1
            }
            Token::Empty | Token::Node(_) => unreachable!("Only geometry tokens reach the leaves."),
        }
    }
}
