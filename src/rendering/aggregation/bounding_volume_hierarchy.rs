use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::aggregator::{assert_fill_span, validate_entries, Aggregate, LeafIntersector};
use super::branch_builder::{self, BranchBuilder};
use super::token::Token;
use crate::error::SceneError;
use crate::rendering::{OccludeQuery, TraceQuery};
use crate::utilities::collections::TraversalStack;
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// Flattened node of a binary hierarchy.
///
/// A branch stores `Token::Node(children)`, its two children live at `children` and `children + 1`.
/// A leaf stores the geometry token it was built with.
#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub aabb: AxisAlignedBoundingBox,
    pub token: Token,
}

/// Binary bounding volume hierarchy built with the surface area heuristic.
#[derive(Clone, Debug)]
pub struct BoundingVolumeHierarchy {
    /// Pre-order layout; the root occupies slot 0.
    nodes: Box<[Node]>,
    depth: u32,
}

impl BoundingVolumeHierarchy {
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

        let mut nodes = Vec::with_capacity(tree.node_count as usize);
        nodes.push(Node {
            aabb: *tree.root.aabb(),
            token: Token::Empty,
        });
        Self::flatten(&tree.root, 0, tokens, &mut nodes);
        debug_assert_eq!(nodes.len(), tree.node_count as usize);

        Ok(Self {
            nodes: nodes.into_boxed_slice(),
            depth: tree.depth,
        })
    }

    /// Fills in the token of the node already placed at `slot` and appends its descendants.
    fn flatten(source: &branch_builder::Node, slot: usize, tokens: &[Token], nodes: &mut Vec<Node>) {
        match source {
            branch_builder::Node::Leaf { index, .. } => nodes[slot].token = tokens[*index as usize],
            branch_builder::Node::Branch { children, .. } => {
                // The larger child goes first; traversal order is decided by distance anyway.
                let [first, second] = if children[0].aabb().area() >= children[1].aabb().area() {
                    [&children[0], &children[1]]
                } else {
                    [&children[1], &children[0]]
                };

                let children_index = nodes.len();
                nodes[slot].token = Token::Node(children_index as u32);
                for child in [first, second] {
                    nodes.push(Node {
                        aabb: *child.aabb(),
                        token: Token::Empty,
                    });
                }
                Self::flatten(first, children_index, tokens, nodes);
                Self::flatten(second, children_index + 1, tokens, nodes);
            }
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of levels, counting the root and the deepest leaf.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Children of the branch whose children start at `children`, each with the distance at which `ray` enters it.
    #[inline]
    fn intersect_children(&self, children: u32, ray: &Ray) -> [(Token, f32); 2] {
        let child0 = &self.nodes[children as usize];
        let child1 = &self.nodes[children as usize + 1];
        [
            (child0.token, child0.aabb.intersect(ray)),
            (child1.token, child1.aabb.intersect(ray)),
        ]
    }

    /// Orders a pair of children so the one entered first comes first.
    #[inline]
    fn near_far(mut pair: [(Token, f32); 2]) -> [(Token, f32); 2] {
        if pair[1].1 < pair[0].1 {
            pair.swap(0, 1);
        }
        pair
    }

    fn cost_children<L: LeafIntersector + ?Sized>(
        &self,
        children: u32,
        leaves: &L,
        ray: &Ray,
        distance: &mut f32,
    ) -> u32 {
        let mut cost = 0;
        for (token, entry) in Self::near_far(self.intersect_children(children, ray)) {
            if entry < *distance {
                cost += match token {
                    Token::Node(grandchildren) => self.cost_children(grandchildren, leaves, ray, distance),
                    geometry => leaves.intersect_cost(geometry, ray, distance),
                };
            }
        }
        cost
    }
}

impl Aggregate for BoundingVolumeHierarchy {
    fn aabb(&self) -> AxisAlignedBoundingBox {
        self.nodes[0].aabb
    }

    fn trace<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut TraceQuery) {
        let root = &self.nodes[0];
        let entry = root.aabb.intersect(&query.ray);
        if !(entry < query.distance) {
            return;
        }
        let Token::Node(children) = root.token else {
            leaves.intersect(root.token, query);
            return;
        };

        let mut stack = TraversalStack::new();
        stack.push((children, entry));

        while let Some((children, entry)) = stack.pop() {
            // The best distance may have shrunk since this pair was pushed.
            if entry >= query.distance {
                continue;
            }

            let [near, far] = Self::near_far(self.intersect_children(children, &query.ray));
            // Geometry is resolved right away, near side first. Branches are pushed far side first so the near one is
            // popped next.
            for (token, entry) in [near, far] {
                if entry < query.distance && token.is_geometry() {
                    leaves.intersect(token, query);
                }
            }
            for (token, entry) in [far, near] {
                if let Token::Node(grandchildren) = token {
                    if entry < query.distance {
                        stack.push((grandchildren, entry));
                    }
                }
            }
        }
    }

    fn occlude<L: LeafIntersector + ?Sized>(&self, leaves: &L, query: &mut OccludeQuery) -> bool {
        let root = &self.nodes[0];
        if !(root.aabb.intersect(&query.ray) < query.travel) {
            return false;
        }
        let Token::Node(children) = root.token else {
            return leaves.occlude(root.token, query);
        };

        let mut stack = TraversalStack::new();
        stack.push(children);

        while let Some(children) = stack.pop() {
            for (token, entry) in self.intersect_children(children, &query.ray) {
                if !(entry < query.travel) {
                    continue;
                }
                match token {
                    Token::Node(grandchildren) => stack.push(grandchildren),
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
        let root = &self.nodes[0];
        if !(root.aabb.intersect(ray) < *distance) {
            return 0;
        }
        match root.token {
            Token::Node(children) => self.cost_children(children, leaves, ray, distance),
            geometry => leaves.intersect_cost(geometry, ray, distance),
        }
    }

    fn fill_aabb(&self, depth: u32, span: &mut [AxisAlignedBoundingBox]) -> usize {
        assert_fill_span(depth, span);

        let mut current = vec![0usize];
        let mut next = Vec::with_capacity(2);
        for _ in 1..depth {
            next.clear();
            for &slot in &current {
                match self.nodes[slot].token {
                    Token::Node(children) => next.extend([children as usize, children as usize + 1]),
                    _ => next.push(slot),
                }
            }
            std::mem::swap(&mut current, &mut next);
        }

        for (target, &slot) in span.iter_mut().zip(&current) {
            *target = self.nodes[slot].aabb;
        }
        current.len()
    }

    fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for node in self.nodes.iter() {
            node.aabb.hash_bits(&mut hasher);
            node.token.hash(&mut hasher);
        }
        hasher.finish()
    }
}
