use glam::{Affine3A, Vec3};
use std::sync::Arc;

use super::prepared_pack::PreparedPack;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertex0: Vec3,
    pub vertex1: Vec3,
    pub vertex2: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Places an already prepared pack inside another pack.
#[derive(Clone, Debug)]
pub struct InstanceDescription {
    pub pack: Arc<PreparedPack>,
    /// Local space of `pack` to the space of the pack holding the instance. Must be a rotation, uniform scale and
    /// translation.
    pub transform: Affine3A,
}

/// Scene assembly input for one pack: loose geometry plus instances of other packs.
///
/// A prepared pack assigns tokens in this order: triangles, spheres, then instances, each indexed within its own list.
#[derive(Clone, Debug, Default)]
pub struct ObjectPack {
    pub triangles: Vec<Triangle>,
    pub spheres: Vec<Sphere>,
    pub instances: Vec<InstanceDescription>,
}

impl ObjectPack {
    pub fn add_triangle(&mut self, vertex0: Vec3, vertex1: Vec3, vertex2: Vec3) -> &mut Self {
        self.triangles.push(Triangle {
            vertex0,
            vertex1,
            vertex2,
        });
        self
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32) -> &mut Self {
        self.spheres.push(Sphere { center, radius });
        self
    }

    pub fn add_instance(&mut self, pack: Arc<PreparedPack>, transform: Affine3A) -> &mut Self {
        self.instances.push(InstanceDescription { pack, transform });
        self
    }

    /// Number of entries the pack will aggregate.
    pub fn len(&self) -> usize {
        self.triangles.len() + self.spheres.len() + self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
