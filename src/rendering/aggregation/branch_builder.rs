use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU32, Ordering};

use super::box_sorter::BoxSorter;
use crate::utilities::AxisAlignedBoundingBox;

/// Ranges longer than this are split across the rayon thread pool.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// Intermediate binary tree produced by `BranchBuilder` and consumed by the flattening step of an aggregator.
#[derive(Clone, Debug)]
pub enum Node {
    Leaf {
        aabb: AxisAlignedBoundingBox,
        /// Index of the source box.
        index: u32,
    },
    Branch {
        /// Union of both children.
        aabb: AxisAlignedBoundingBox,
        /// Children in split order; `children[0]` holds the boxes lower along `axis`.
        children: Box<[Node; 2]>,
        axis: u8,
    },
}

impl Node {
    #[inline]
    pub fn aabb(&self) -> &AxisAlignedBoundingBox {
        match self {
            Self::Leaf { aabb, .. } | Self::Branch { aabb, .. } => aabb,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Branch { children, .. } => children[0].leaf_count() + children[1].leaf_count(),
        }
    }

    /// Number of levels in this subtree; a lone leaf has depth 1.
    pub fn depth(&self) -> u32 {
        match self {
            Self::Leaf { .. } => 1,
            Self::Branch { children, .. } => 1 + children[0].depth().max(children[1].depth()),
        }
    }
}

/// The product of a build.
#[derive(Debug)]
pub struct BranchTree {
    pub root: Node,
    /// Total number of nodes, leaves included.
    pub node_count: u32,
    /// Number of levels, see `Node::depth`.
    pub depth: u32,
}

/// Builds a binary tree over a set of boxes with a surface area heuristic sweep.
///
/// Every level sorts its range along the major axis of the range's bounds and picks the cut minimizing
/// `area(head) * head_count + area(tail) * tail_count`.
#[derive(Clone, Copy, Debug)]
pub struct BranchBuilder<'a> {
    aabbs: &'a [AxisAlignedBoundingBox],
    parallel_threshold: usize,
}

impl<'a> BranchBuilder<'a> {
    pub fn new(aabbs: &'a [AxisAlignedBoundingBox]) -> Self {
        Self {
            aabbs,
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }

    /// Sets the range length above which building forks onto other threads.
    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold.max(2);
        self
    }

    #[tracing::instrument(level = "debug", skip_all, fields(count = self.aabbs.len()))]
    pub fn build(&self) -> BranchTree {
        assert!(!self.aabbs.is_empty(), "Cannot build a tree without any boxes.");
        assert!(
            self.aabbs.len() <= u32::MAX as usize,
            "Box count exceeds the addressable index range."
        );

        let node_count = CachePadded::new(AtomicU32::new(0));
        let mut indices: Vec<u32> = (0..self.aabbs.len() as u32).collect();
        let volume = AxisAlignedBoundingBox::from_boxes(self.aabbs);

        let mut worker = Worker::new(self, &node_count, indices.len());
        let root = worker.build(&mut indices, volume, None);

        let node_count = node_count.load(Ordering::Acquire);
        let depth = root.depth();
        tracing::debug!(node_count, depth, "built branch tree");
        BranchTree {
            root,
            node_count,
            depth,
        }
    }
}

/// Chosen cut of a range and the volumes on both sides of it.
struct Split {
    cut: usize,
    head_volume: AxisAlignedBoundingBox,
    tail_volume: AxisAlignedBoundingBox,
}

/// Builds one contiguous range of indices. Each thread participating in a build owns its own worker.
struct Worker<'a> {
    aabbs: &'a [AxisAlignedBoundingBox],
    parallel_threshold: usize,
    node_count: &'a AtomicU32,
    sorter: BoxSorter,
    cut_tail_volumes: Vec<AxisAlignedBoundingBox>,
}

impl<'a> Worker<'a> {
    fn new(builder: &BranchBuilder<'a>, node_count: &'a AtomicU32, capacity: usize) -> Self {
        Self {
            aabbs: builder.aabbs,
            parallel_threshold: builder.parallel_threshold,
            node_count,
            sorter: BoxSorter::new(capacity),
            cut_tail_volumes: Vec::with_capacity(capacity),
        }
    }

    /// Creates a worker for a range of `capacity` indices that will be built on another thread.
    fn fork(&self, capacity: usize) -> Self {
        Self {
            aabbs: self.aabbs,
            parallel_threshold: self.parallel_threshold,
            node_count: self.node_count,
            sorter: BoxSorter::new(capacity),
            cut_tail_volumes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn aabb(&self, index: u32) -> &AxisAlignedBoundingBox {
        &self.aabbs[index as usize]
    }

    /// Builds the subtree over `indices`, whose union is `volume`. `sorted_axis` names the axis the indices are
    /// already sorted along, if any.
    fn build(&mut self, indices: &mut [u32], volume: AxisAlignedBoundingBox, sorted_axis: Option<usize>) -> Node {
        self.node_count.fetch_add(1, Ordering::Relaxed);

        if let [index] = *indices {
            return Node::Leaf {
                aabb: *self.aabb(index),
                index,
            };
        }

        let axis = volume.major_axis();
        if sorted_axis != Some(axis) {
            self.sorter.sort(self.aabbs, indices, axis);
        }

        let Split {
            cut,
            head_volume,
            tail_volume,
        } = self.search_split(indices);
        let parallel = indices.len() > self.parallel_threshold;
        let (head, tail) = indices.split_at_mut(cut);

        let children = if !parallel {
            let child0 = self.build(head, head_volume, Some(axis));
            let child1 = self.build(tail, tail_volume, Some(axis));
            [child0, child1]
        } else if head_volume.area() >= tail_volume.area() {
            let mut forked = self.fork(head.len());
            let (child0, child1) = rayon::join(
                || forked.build(head, head_volume, Some(axis)),
                || self.build(tail, tail_volume, Some(axis)),
            );
            [child0, child1]
        } else {
            let mut forked = self.fork(tail.len());
            let (child1, child0) = rayon::join(
                || forked.build(tail, tail_volume, Some(axis)),
                || self.build(head, head_volume, Some(axis)),
            );
            [child0, child1]
        };

        Node::Branch {
            aabb: volume,
            children: Box::new(children),
            axis: axis as u8,
        }
    }

    /// Sweeps every cut position of a sorted range and returns the cheapest one.
    fn search_split(&mut self, indices: &[u32]) -> Split {
        let count = indices.len();
        debug_assert!(count >= 2, "Only ranges of two or more boxes can be split.");

        // cut_tail_volumes[i] is the union of every box at position i or later.
        self.cut_tail_volumes.clear();
        self.cut_tail_volumes.resize(count, AxisAlignedBoundingBox::NONE);
        let mut tail_volume = *self.aabb(indices[count - 1]);
        self.cut_tail_volumes[count - 1] = tail_volume;
        for i in (0..count - 1).rev() {
            tail_volume = tail_volume.encapsulate(self.aabb(indices[i]));
            self.cut_tail_volumes[i] = tail_volume;
        }

        let middle = count / 2;
        let mut best_cost = f32::INFINITY;
        let mut best: Option<Split> = None;
        let mut head_volume = *self.aabb(indices[0]);

        for cut in 1..count {
            let tail_volume = self.cut_tail_volumes[cut];
            let cost = head_volume.area() * cut as f32 + tail_volume.area() * (count - cut) as f32;

            // Ties go to the cut closest to the middle, which keeps degenerate inputs balanced.
            let better = match &best {
                None => cost < best_cost,
                Some(current) => {
                    cost < best_cost
                        || (cost == best_cost && cut.abs_diff(middle) < current.cut.abs_diff(middle))
                }
            };
            if better {
                best_cost = cost;
                best = Some(Split {
                    cut,
                    head_volume,
                    tail_volume,
                });
            }

            head_volume = head_volume.encapsulate(self.aabb(indices[cut]));
        }

        // Every cost was NaN or infinite: fall back to splitting in the middle.
        best.unwrap_or_else(|| {
            let head_volume = indices[..middle]
                .iter()
                .fold(*self.aabb(indices[0]), |volume, &index| volume.encapsulate(self.aabb(index)));
            Split {
                cut: middle,
                head_volume,
                tail_volume: self.cut_tail_volumes[middle],
            }
        })
    }
}
