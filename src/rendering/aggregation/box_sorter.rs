use crate::utilities::collections::{insertion_sort, lsb_radix_sort};
use crate::utilities::AxisAlignedBoundingBox;

/// Runs at most this long are insertion sorted; longer runs go through the radix sort.
pub const INSERTION_SORT_THRESHOLD: usize = 32;

/// Maps a float onto an unsigned integer with the same ordering.
///
/// Positive values get their sign bit set; negative values have every bit flipped, which reverses their magnitude
/// order and places them below all positive values.
#[inline]
pub fn sortable_key(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

/// Sorts box indices by the position of their boxes along an axis.
///
/// Owns preallocated key and value buffers, so a sorter is reused across every sort of one build worker.
#[derive(Debug)]
pub struct BoxSorter {
    keys: Vec<u32>,
    values: Vec<u32>,
    keys_scratch: Vec<u32>,
    values_scratch: Vec<u32>,
}

impl BoxSorter {
    /// Creates a sorter able to sort up to `capacity` indices at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            keys: vec![0; capacity],
            values: vec![0; capacity],
            keys_scratch: vec![0; capacity],
            values_scratch: vec![0; capacity],
        }
    }

    /// Maximum number of indices a single sort accepts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Reorders `indices` by ascending `min[axis] + max[axis]` of the boxes they reference. Stable.
    ///
    /// The sum is proportional to the box center and avoids a division.
    pub fn sort(&mut self, aabbs: &[AxisAlignedBoundingBox], indices: &mut [u32], axis: usize) {
        let count = indices.len();
        assert!(
            count <= self.capacity(),
            "Cannot sort {count} indices with a sorter of capacity {}.",
            self.capacity()
        );
        debug_assert!(axis < 3, "Axis must be within 0 and 2.");

        let keys = &mut self.keys[..count];
        let values = &mut self.values[..count];
        for ((key, value), &index) in keys.iter_mut().zip(values.iter_mut()).zip(indices.iter()) {
            let aabb = &aabbs[index as usize];
            *key = sortable_key(aabb.min[axis] + aabb.max[axis]);
            *value = index;
        }

        if count <= INSERTION_SORT_THRESHOLD {
            insertion_sort::sort(keys, values);
        } else {
            lsb_radix_sort::sort_u32(keys, values, &mut self.keys_scratch, &mut self.values_scratch);
        }

        indices.copy_from_slice(values);
    }
}
