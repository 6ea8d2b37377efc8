use glam::{Affine3A, Vec2, Vec3};
use std::sync::Arc;

use super::object_pack::ObjectPack;
use super::prepared_pack::PreparedPack;
use super::profile::PrepareProfile;
use crate::error::SceneError;
use crate::rendering::aggregation::{GeometryKind, GeometryToken, Token};
use crate::rendering::{OccludeQuery, TraceQuery};
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// Surface information at the hit of a trace query, in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interaction {
    pub point: Vec3,
    /// Unit geometric normal. Triangle normals follow the winding of their vertices.
    pub normal: Vec3,
    pub uv: Vec2,
    pub distance: f32,
    pub token: GeometryToken,
}

/// The root pack of a scene and the entry point for queries in world space.
#[derive(Clone, Debug)]
pub struct PreparedScene {
    root: Arc<PreparedPack>,
}

impl PreparedScene {
    pub fn new(root: Arc<PreparedPack>) -> Self {
        Self { root }
    }

    /// Prepares `pack` as the root of a new scene.
    pub fn prepare(pack: &ObjectPack, profile: &PrepareProfile) -> Result<Self, SceneError> {
        Ok(Self::new(PreparedPack::new(pack, profile)?))
    }

    #[inline]
    pub fn root(&self) -> &Arc<PreparedPack> {
        &self.root
    }

    #[inline]
    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        self.root.aabb()
    }

    /// Finds the closest hit of `query`. Returns whether `query` was improved.
    pub fn trace(&self, query: &mut TraceQuery) -> bool {
        debug_assert_eq!(query.current.depth(), 0, "Queries start at the root pack.");
        let (distance, token) = (query.distance, query.token);
        self.root.trace(query);
        query.distance < distance || query.token != token
    }

    /// Whether anything blocks `query`.
    pub fn occlude(&self, query: &mut OccludeQuery) -> bool {
        self.root.occlude(query)
    }

    /// Number of primitive intersection tests a trace of `ray` performs.
    pub fn trace_cost(&self, ray: &Ray) -> u32 {
        let mut distance = f32::INFINITY;
        self.root.trace_cost(ray, &mut distance)
    }

    /// Resolves the hit of a traced `query`.
    ///
    /// Returns `None` if `query` hit nothing or its token does not belong to this scene.
    pub fn interact(&self, query: &TraceQuery) -> Option<Interaction> {
        if !query.hit() {
            return None;
        }

        let mut pack = &self.root;
        let mut to_world = Affine3A::IDENTITY;
        for instance in query.token.instances() {
            let instance = pack.instances().get(instance.index()? as usize)?;
            to_world = to_world * *instance.transform().inverse();
            pack = instance.pack();
        }

        let normal = match query.token.geometry {
            Token::Geometry(GeometryKind::Triangle, index) => pack.triangles().get(index as usize)?.normal,
            Token::Geometry(GeometryKind::Sphere, index) => pack.spheres().get(index as usize)?.normal(query.uv),
            _ => return None,
        };

        Some(Interaction {
            point: query.point(),
            normal: to_world.transform_vector3(normal).normalize_or_zero(),
            uv: query.uv,
            distance: query.distance,
            token: query.token,
        })
    }
}
