use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::aggregator::{assert_fill_span, validate_entries, Aggregate, LeafIntersector};
use super::token::Token;
use crate::error::SceneError;
use crate::rendering::{OccludeQuery, TraceQuery};
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// Tests every entry against every query.
///
/// Serves packs too small for a hierarchy and is the reference the hierarchies are checked against.
#[derive(Clone, Debug)]
pub struct LinearAggregator {
    aabb: AxisAlignedBoundingBox,
    aabbs: Box<[AxisAlignedBoundingBox]>,
    tokens: Box<[Token]>,
}

impl LinearAggregator {
    pub fn new(aabbs: &[AxisAlignedBoundingBox], tokens: &[Token]) -> Result<Self, SceneError> {
        validate_entries(aabbs, tokens, 1)?;
        Ok(Self {
            aabb: AxisAlignedBoundingBox::from_boxes(aabbs),
            aabbs: aabbs.into(),
            tokens: tokens.into(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = (&AxisAlignedBoundingBox, Token)> {
        self.aabbs.iter().zip(self.tokens.iter().copied())
    }
}

impl Aggregate for LinearAggregator {
    fn aabb(&self) -> AxisAlignedBoundingBox {
        self.aabb
    }

    fn trace<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut TraceQuery) {
        for (aabb, token) in self.entries() {
            if aabb.intersect(&query.ray) < query.distance {
                leaves.intersect(token, query);
            }
        }
    }

    fn occlude<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut OccludeQuery) -> bool {
        self.entries()
            .any(|(aabb, token)| aabb.intersect(&query.ray) < query.travel && leaves.occlude(token, query))
    }

    fn trace_cost<L: LeafIntersector + ?Sized>(&self, leaves: &L, ray: &Ray, distance: &mut f32) -> u32 {
        let mut cost = 0;
        for (aabb, token) in self.entries() {
            if aabb.intersect(ray) < *distance {
                cost += leaves.intersect_cost(token, ray, distance);
            }
        }
        cost
    }

    fn fill_aabb(&self, depth: u32, span: &mut [AxisAlignedBoundingBox]) -> usize {
        assert_fill_span(depth, span);

        // Entries sit right below the root, so they are emitted once the requested level has room for all of them.
        let room = 1usize << (depth - 1);
        if depth == 1 || self.aabbs.len() > room {
            span[0] = self.aabb;
            1
        } else {
            span[..self.aabbs.len()].copy_from_slice(&self.aabbs);
            self.aabbs.len()
        }
    }

    fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (aabb, token) in self.entries() {
            aabb.hash_bits(&mut hasher);
            token.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::test_scenes::TriangleSoup;
    use glam::Vec3;

    #[test]
    fn accepts_a_single_entry() {
        let soup = TriangleSoup::random(1, 0);
        let linear = LinearAggregator::new(&soup.aabbs, &soup.tokens).unwrap();
        assert_eq!(linear.len(), 1);
        assert_eq!(linear.aabb(), soup.aabbs[0]);
    }

    #[test]
    fn counts_one_test_per_reached_entry() {
        let soup = TriangleSoup::grid(4);
        let linear = LinearAggregator::new(&soup.aabbs, &soup.tokens).unwrap();

        let mut distance = f32::INFINITY;
        let down = Ray::new(Vec3::new(0.25, 0.25, 10.0), Vec3::NEG_Z);
        let cost = linear.trace_cost(&soup, &down, &mut distance);
        assert!(cost >= 1 && cost <= 2, "cost was {cost}");
        assert!((distance - 10.0).abs() < 1e-4);

        let mut distance = f32::INFINITY;
        let away = Ray::new(Vec3::new(0.25, 0.25, 10.0), Vec3::Z);
        assert_eq!(linear.trace_cost(&soup, &away, &mut distance), 0);
        assert_eq!(distance, f32::INFINITY);
    }

    #[test]
    fn fill_aabb_emits_entries_once_they_fit() {
        let soup = TriangleSoup::grid(2);
        let linear = LinearAggregator::new(&soup.aabbs, &soup.tokens).unwrap();
        let count = soup.aabbs.len();
        assert_eq!(count, 8);

        let mut span = vec![AxisAlignedBoundingBox::NONE; 16];
        assert_eq!(linear.fill_aabb(1, &mut span), 1);
        assert_eq!(span[0], linear.aabb());
        assert_eq!(linear.fill_aabb(3, &mut span), 1);
        assert_eq!(linear.fill_aabb(4, &mut span), count);
        assert_eq!(&span[..count], &soup.aabbs[..]);
    }
}
