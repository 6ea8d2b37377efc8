//! Scenes shared by the tests of the aggregation engines.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::aggregation::{LeafIntersector, Token};
use super::packing::PreparedTriangle;
use super::{OccludeQuery, TraceQuery};
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// Loose triangles with one token each, resolved without any pack in between.
pub struct TriangleSoup {
    pub triangles: Vec<PreparedTriangle>,
    pub aabbs: Vec<AxisAlignedBoundingBox>,
    pub tokens: Vec<Token>,
}

impl TriangleSoup {
    pub fn new(triangles: Vec<PreparedTriangle>) -> Self {
        let aabbs = triangles.iter().map(PreparedTriangle::aabb).collect();
        let tokens = (0..triangles.len() as u32).map(Token::triangle).collect();
        Self {
            triangles,
            aabbs,
            tokens,
        }
    }

    /// Small triangles scattered through a cube of side 20 around the origin.
    pub fn random(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut point = |range: f32| {
            Vec3::new(
                rng.random_range(-range..range),
                rng.random_range(-range..range),
                rng.random_range(-range..range),
            )
        };
        let triangles = (0..count)
            .map(|_| {
                let center = point(10.0);
                PreparedTriangle::new(center + point(1.5), center + point(1.5), center + point(1.5))
            })
            .collect();
        Self::new(triangles)
    }

    /// Unit squares covering `[0, size]²` of the z = 0 plane, two triangles each.
    pub fn grid(size: u32) -> Self {
        let mut triangles = Vec::new();
        for y in 0..size {
            for x in 0..size {
                triangles.extend(Self::square(Vec3::new(x as f32, y as f32, 0.0)));
            }
        }
        Self::new(triangles)
    }

    /// Unit squares over `[0, 1]²` stacked at z = 0, 2, 4 and so on, two triangles each.
    pub fn layers(count: u32) -> Self {
        let triangles = (0..count)
            .flat_map(|layer| Self::square(Vec3::new(0.0, 0.0, 2.0 * layer as f32)))
            .collect();
        Self::new(triangles)
    }

    fn square(corner: Vec3) -> [PreparedTriangle; 2] {
        [
            PreparedTriangle::new(corner, corner + Vec3::X, corner + Vec3::Y),
            PreparedTriangle::new(corner + Vec3::X, corner + Vec3::new(1.0, 1.0, 0.0), corner + Vec3::Y),
        ]
    }
}

impl LeafIntersector for TriangleSoup {
    fn intersect(&self, token: Token, query: &mut TraceQuery) {
        if let Some((distance, uv)) = self.triangle(token).intersect(&query.ray) {
            query.record(token, distance, uv);
        }
    }

    fn occlude(&self, token: Token, query: &mut OccludeQuery) -> bool {
        self.triangle(token)
            .intersect(&query.ray)
            .is_some_and(|(distance, _)| query.blocks(token, distance))
    }

    fn intersect_cost(&self, token: Token, ray: &Ray, distance: &mut f32) -> u32 {
        if let Some((hit, _)) = self.triangle(token).intersect(ray) {
            *distance = distance.min(hit);
        }
        1
    }
}

impl TriangleSoup {
    fn triangle(&self, token: Token) -> &PreparedTriangle {
        let index = token.index().expect("soup tokens carry an index");
        &self.triangles[index as usize]
    }
}

/// A ray from somewhere around the scenes above, aimed into their bounds.
pub fn random_ray(rng: &mut StdRng) -> Ray {
    let origin = Vec3::new(
        rng.random_range(-15.0..15.0),
        rng.random_range(-15.0..15.0),
        rng.random_range(-15.0..15.0),
    );
    let target = Vec3::new(
        rng.random_range(-8.0..8.0),
        rng.random_range(-8.0..8.0),
        rng.random_range(-8.0..8.0),
    );
    Ray::new(origin, target - origin)
}
