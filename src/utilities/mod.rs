mod affine_transform;
pub use self::affine_transform::*;

pub mod collections;

mod bounding_box;
pub use self::bounding_box::*;

mod bounding_box4;
pub use self::bounding_box4::*;

mod ray;
pub use self::ray::*;
