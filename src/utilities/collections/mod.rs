pub mod insertion_sort;
pub mod lsb_radix_sort;

mod traversal_stack;
pub use self::traversal_stack::*;
