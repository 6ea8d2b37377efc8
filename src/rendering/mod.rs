pub mod aggregation;
pub mod packing;

mod queries;
pub use self::queries::*;

#[cfg(test)]
pub(crate) mod test_scenes;
