use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::aggregator::{assert_fill_span, validate_entries, Aggregate, LeafIntersector};
use super::branch_builder::{self, BranchBuilder};
use super::token::{Token, Token4};
use crate::error::SceneError;
use crate::rendering::{OccludeQuery, TraceQuery};
use crate::utilities::collections::TraversalStack;
use crate::utilities::{AxisAlignedBoundingBox, AxisAlignedBoundingBox4, Ray};

/// Four-wide node produced by collapsing two levels of a binary tree.
///
/// Slots 0 and 1 hold the children of the lower binary child, slots 2 and 3 those of the upper one. A binary child
/// that is already a leaf takes its even slot and leaves the odd slot `Token::Empty`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub aabb4: AxisAlignedBoundingBox4,
    pub token4: Token4,
    /// Axis separating slots 0 and 1 from slots 2 and 3.
    pub axis_major: u8,
    /// Axis separating slot 0 from slot 1.
    pub axis_minor0: u8,
    /// Axis separating slot 2 from slot 3.
    pub axis_minor1: u8,
}

impl Node {
    /// Slots in the order a ray should visit them, nearest first.
    #[inline]
    fn order(&self, ray: &Ray) -> [usize; 4] {
        let pair = |base: usize, axis: u8| {
            if ray.is_negative(axis as usize) {
                [base + 1, base]
            } else {
                [base, base + 1]
            }
        };
        let [a0, a1] = pair(0, self.axis_minor0);
        let [b0, b1] = pair(2, self.axis_minor1);
        if ray.is_negative(self.axis_major as usize) {
            [b0, b1, a0, a1]
        } else {
            [a0, a1, b0, b1]
        }
    }

    /// Bounds of the binary child that slots `2 * half` and `2 * half + 1` came from.
    fn half_aabb(&self, half: usize) -> AxisAlignedBoundingBox {
        let first = self.aabb4.get(2 * half);
        if self.token4[2 * half + 1].is_empty() {
            first
        } else {
            first.encapsulate(&self.aabb4.get(2 * half + 1))
        }
    }
}

/// Bounding volume hierarchy whose nodes test four boxes at once.
#[derive(Clone, Debug)]
pub struct QuadBoundingVolumeHierarchy {
    aabb: AxisAlignedBoundingBox,
    /// Pre-order layout; the root occupies slot 0.
    nodes: Box<[Node]>,
    /// Depth of the binary tree this hierarchy was collapsed from.
    depth: u32,
}

impl QuadBoundingVolumeHierarchy {
    /// Builds a hierarchy over `aabbs`, where `tokens[i]` is the geometry inside `aabbs[i]`. Needs two or more entries.
    pub fn new(
        aabbs: &[AxisAlignedBoundingBox],
        tokens: &[Token],
        parallel_threshold: usize,
    ) -> Result<Self, SceneError> {
        validate_entries(aabbs, tokens, 2)?;
        let tree = BranchBuilder::new(aabbs)
            .with_parallel_threshold(parallel_threshold)
            .build();

        let mut nodes = Vec::with_capacity(tree.node_count as usize / 2 + 1);
        Self::collapse(&tree.root, tokens, &mut nodes);
        tracing::debug!(quad_nodes = nodes.len(), "collapsed quad hierarchy");

        Ok(Self {
            aabb: *tree.root.aabb(),
            nodes: nodes.into_boxed_slice(),
            depth: tree.depth,
        })
    }

    /// Appends the quad node covering `branch` and its descendants, returning its index.
    fn collapse(branch: &branch_builder::Node, tokens: &[Token], nodes: &mut Vec<Node>) -> u32 {
        let branch_builder::Node::Branch { children, axis, .. } = branch else {
            unreachable!("Only branches collapse into quad nodes.");
        };

        let index = nodes.len();
        nodes.push(Node {
            aabb4: AxisAlignedBoundingBox4::new([AxisAlignedBoundingBox::NONE; 4]),
            token4: [Token::Empty; 4],
            axis_major: *axis,
            axis_minor0: 0,
            axis_minor1: 0,
        });

        let mut sources: [Option<&branch_builder::Node>; 4] = [None; 4];
        let mut minor_axes = [0u8; 2];
        for (half, child) in children.iter().enumerate() {
            match child {
                branch_builder::Node::Leaf { .. } => sources[2 * half] = Some(child),
                branch_builder::Node::Branch { children, axis, .. } => {
                    sources[2 * half] = Some(&children[0]);
                    sources[2 * half + 1] = Some(&children[1]);
                    minor_axes[half] = *axis;
                }
            }
        }

        let mut boxes = [AxisAlignedBoundingBox::NONE; 4];
        let mut token4 = [Token::Empty; 4];
        for (slot, source) in sources.iter().enumerate() {
            let Some(source) = source else { continue };
            boxes[slot] = *source.aabb();
            token4[slot] = match source {
                branch_builder::Node::Leaf { index, .. } => tokens[*index as usize],
                branch_builder::Node::Branch { .. } => Token::Node(Self::collapse(source, tokens, nodes)),
            };
        }

        let node = &mut nodes[index];
        node.aabb4 = AxisAlignedBoundingBox4::new(boxes);
        node.token4 = token4;
        node.axis_minor0 = minor_axes[0];
        node.axis_minor1 = minor_axes[1];
        index as u32
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Depth of the binary tree this hierarchy was collapsed from.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Closest hit search over a caller provided stack.
    fn trace_on<L: LeafIntersector + ?Sized>(
        &self,
        leaves: &L,
        query: &mut TraceQuery,
        stack: &mut TraversalStack<(u32, f32)>,
    ) {
        let entry = self.aabb.intersect(&query.ray);
        if !(entry < query.distance) {
            return;
        }
        stack.push((0, entry));

        while let Some((index, entry)) = stack.pop() {
            if entry >= query.distance {
                continue;
            }

            let node = &self.nodes[index as usize];
            let entries = node.aabb4.intersect(&query.ray);
            let order = node.order(&query.ray);

            for slot in order {
                let token = node.token4[slot];
                if token.is_geometry() && entries[slot] < query.distance {
                    leaves.intersect(token, query);
                }
            }
            for slot in order.into_iter().rev() {
                if let Token::Node(child) = node.token4[slot] {
                    if entries[slot] < query.distance {
                        stack.push((child, entries[slot]));
                    }
                }
            }
        }
    }

    fn cost_node<L: LeafIntersector + ?Sized>(&self, index: u32, leaves: &L, ray: &Ray, distance: &mut f32) -> u32 {
        let node = &self.nodes[index as usize];
        let entries = node.aabb4.intersect(ray);
        let mut cost = 0;
        for slot in node.order(ray) {
            if !(entries[slot] < *distance) {
                continue;
            }
            cost += match node.token4[slot] {
                Token::Node(child) => self.cost_node(child, leaves, ray, distance),
                Token::Empty => 0,
                geometry => leaves.intersect_cost(geometry, ray, distance),
            };
        }
        cost
    }
}

impl Aggregate for QuadBoundingVolumeHierarchy {
    fn aabb(&self) -> AxisAlignedBoundingBox {
        self.aabb
    }

    fn trace<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut TraceQuery) {
        self.trace_on(leaves, query, &mut TraversalStack::new());
    }

    fn occlude<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut OccludeQuery) -> bool {
        if !(self.aabb.intersect(&query.ray) < query.travel) {
            return false;
        }

        let mut stack = TraversalStack::new();
        stack.push(0u32);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let entries = node.aabb4.intersect(&query.ray);
            for slot in 0..4 {
                if !(entries[slot] < query.travel) {
                    continue;
                }
                match node.token4[slot] {
                    Token::Node(child) => stack.push(child),
                    Token::Empty => {}
                    geometry => {
                        if leaves.occlude(geometry, query) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    fn trace_cost<L: LeafIntersector + ?Sized>(&self, leaves: &L, ray: &Ray, distance: &mut f32) -> u32 {
        if !(self.aabb.intersect(ray) < *distance) {
            return 0;
        }
        self.cost_node(0, leaves, ray, distance)
    }

    fn fill_aabb(&self, depth: u32, span: &mut [AxisAlignedBoundingBox]) -> usize {
        assert_fill_span(depth, span);

        // Each entry is a box plus the quad node it expands into, if any.
        let mut current = vec![(self.aabb, Some(0u32))];
        let mut next = Vec::with_capacity(4);
        for _ in 0..(depth - 1) / 2 {
            next.clear();
            for &(aabb, index) in &current {
                let Some(index) = index else {
                    next.push((aabb, None));
                    continue;
                };
                let node = &self.nodes[index as usize];
                for slot in 0..4 {
                    match node.token4[slot] {
                        Token::Empty => {}
                        Token::Node(child) => next.push((node.aabb4.get(slot), Some(child))),
                        _ => next.push((node.aabb4.get(slot), None)),
                    }
                }
            }
            std::mem::swap(&mut current, &mut next);
        }

        let mut count = 0;
        let mut emit = |aabb: AxisAlignedBoundingBox| {
            span[count] = aabb;
            count += 1;
        };
        for &(aabb, index) in &current {
            match index {
                // An even depth stops halfway through a quad node, at the binary children it was collapsed from.
                Some(index) if depth % 2 == 0 => {
                    let node = &self.nodes[index as usize];
                    emit(node.half_aabb(0));
                    emit(node.half_aabb(1));
                }
                _ => emit(aabb),
            }
        }
        count
    }

    fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.aabb.hash_bits(&mut hasher);
        for node in self.nodes.iter() {
            node.aabb4.hash_bits(&mut hasher);
            node.token4.hash(&mut hasher);
            [node.axis_major, node.axis_minor0, node.axis_minor1].hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::aggregation::{BoundingVolumeHierarchy, LinearAggregator};
    use crate::rendering::packing::PreparedTriangle;
    use crate::rendering::test_scenes::TriangleSoup;
    use glam::Vec3;

    #[test]
    fn two_leaves_fill_the_even_slots() {
        let soup = TriangleSoup::random(2, 21);
        let qbvh = QuadBoundingVolumeHierarchy::new(&soup.aabbs, &soup.tokens, 32).unwrap();
        let [root] = qbvh.nodes() else {
            panic!("two entries collapse into a single quad node");
        };
        assert!(root.token4[0].is_geometry() && root.token4[2].is_geometry());
        assert!(root.token4[1].is_empty() && root.token4[3].is_empty());
        assert!(root.aabb4.get(1).is_none() && root.aabb4.get(3).is_none());
    }

    #[test]
    fn every_leaf_is_referenced_once() {
        let soup = TriangleSoup::random(1000, 22);
        let qbvh = QuadBoundingVolumeHierarchy::new(&soup.aabbs, &soup.tokens, 64).unwrap();

        let mut leaves = Vec::new();
        let mut children = Vec::new();
        for (index, node) in qbvh.nodes().iter().enumerate() {
            for slot in 0..4 {
                match node.token4[slot] {
                    Token::Node(child) => {
                        assert!(child as usize > index, "children must follow their parent");
                        children.push(child);
                    }
                    Token::Geometry(_, leaf) => {
                        assert_eq!(node.aabb4.get(slot), soup.aabbs[leaf as usize]);
                        leaves.push(leaf);
                    }
                    Token::Empty => assert!(node.aabb4.get(slot).is_none()),
                }
            }
        }
        leaves.sort_unstable();
        assert_eq!(leaves, (0..1000).collect::<Vec<_>>());
        children.sort_unstable();
        assert_eq!(children, (1..qbvh.nodes().len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn fill_aabb_matches_binary_levels() {
        let soup = TriangleSoup::random(400, 23);
        let bvh = BoundingVolumeHierarchy::new(&soup.aabbs, &soup.tokens, usize::MAX).unwrap();
        let qbvh = QuadBoundingVolumeHierarchy::new(&soup.aabbs, &soup.tokens, usize::MAX).unwrap();
        assert_eq!(qbvh.aabb(), bvh.aabb());

        let mut binary = vec![AxisAlignedBoundingBox::NONE; 1 << 9];
        let mut quad = binary.clone();
        for depth in 1..=8 {
            let count = bvh.fill_aabb(depth, &mut binary);
            assert_eq!(qbvh.fill_aabb(depth, &mut quad), count, "depth {depth}");
            let key = |aabb: &AxisAlignedBoundingBox| {
                (aabb.min.to_array().map(f32::to_bits), aabb.max.to_array().map(f32::to_bits))
            };
            binary[..count].sort_by_key(key);
            quad[..count].sort_by_key(key);
            assert_eq!(binary[..count], quad[..count], "depth {depth}");
        }
    }

    #[test]
    fn deep_hierarchies_trace_without_spilling_the_stack() {
        // Nested cubes [0, s]³. The area of the j-th smallest exceeds j times the area of the one below it, so every
        // split peels off the largest box alone and the tree degenerates into a chain.
        let mut exponent = -72;
        let triangles = (0..50u32)
            .map(|rank| {
                if rank > 0 {
                    exponent += rank.ilog2() as i32 / 2 + 1;
                }
                let size = 2f32.powi(exponent);
                PreparedTriangle::new(size * Vec3::X, size * Vec3::Y, size * Vec3::Z)
            })
            .collect();
        let soup = TriangleSoup::new(triangles);
        let qbvh = QuadBoundingVolumeHierarchy::new(&soup.aabbs, &soup.tokens, usize::MAX).unwrap();
        assert!(qbvh.depth() >= 42, "depth was {}", qbvh.depth());

        let ray = Ray::new(Vec3::ZERO, Vec3::ONE);
        let mut stack = TraversalStack::new();
        let mut query = TraceQuery::new(ray);
        qbvh.trace_on(&soup, &mut query, &mut stack);
        assert!(stack.is_inline());

        let linear = LinearAggregator::new(&soup.aabbs, &soup.tokens).unwrap();
        let mut reference = TraceQuery::new(ray);
        linear.trace(&soup, &mut reference);
        assert!(reference.hit());
        assert_eq!(query.token, reference.token);
        assert_eq!(query.distance, reference.distance);
    }

    #[test]
    fn direction_signs_pick_the_near_layer_first() {
        let soup = TriangleSoup::layers(64);
        let qbvh = QuadBoundingVolumeHierarchy::new(&soup.aabbs, &soup.tokens, 32).unwrap();

        for (origin, direction, expected) in [
            (Vec3::new(0.25, 0.25, -1.0), Vec3::Z, 1.0),
            (Vec3::new(0.25, 0.25, 133.0), Vec3::NEG_Z, 7.0),
        ] {
            let ray = Ray::new(origin, direction);
            let mut distance = f32::INFINITY;
            let cost = qbvh.trace_cost(&soup, &ray, &mut distance);
            assert!((distance - expected).abs() < 1e-4, "distance was {distance}");
            assert!(cost <= 2, "cost was {cost}");

            let mut query = TraceQuery::new(ray);
            qbvh.trace(&soup, &mut query);
            assert!((query.distance - expected).abs() < 1e-4);
        }
    }
}
