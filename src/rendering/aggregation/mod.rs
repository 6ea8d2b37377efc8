mod token;
pub use self::token::*;

mod geometry_token;
pub use self::geometry_token::*;

mod box_sorter;
pub use self::box_sorter::*;

pub mod branch_builder;
pub use self::branch_builder::{BranchBuilder, BranchTree, PARALLEL_THRESHOLD};

mod aggregator;
pub use self::aggregator::*;

mod linear_aggregator;
pub use self::linear_aggregator::*;

pub mod bounding_volume_hierarchy;
pub use self::bounding_volume_hierarchy::BoundingVolumeHierarchy;

pub mod quad_bounding_volume_hierarchy;
pub use self::quad_bounding_volume_hierarchy::QuadBoundingVolumeHierarchy;
