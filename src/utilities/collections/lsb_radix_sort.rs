/// Number of buckets per radix pass; one per possible byte value.
const BUCKET_COUNT: usize = 256;

#[inline]
fn reorder_for_byte<T: Copy>(
    source_keys: &[u32],
    target_keys: &mut [u32],
    source_values: &[T],
    target_values: &mut [T],
    bucket_start_indices: &mut [u32; BUCKET_COUNT],
    shift: u32,
) {
    for (&key, &value) in source_keys.iter().zip(source_values) {
        let bucket = &mut bucket_start_indices[((key >> shift) & 0xFF) as usize];
        target_keys[*bucket as usize] = key;
        target_values[*bucket as usize] = value;
        *bucket += 1;
    }
}

/// Sorts 32 bit keys and their paired values in ascending key order with four least significant byte passes.
///
/// The passes alternate between the input and scratch buffers; after the fourth pass the sorted data is back in
/// `keys` and `values`. Stable. The scratch buffers must be at least as long as the input.
pub fn sort_u32<T: Copy>(keys: &mut [u32], values: &mut [T], keys_scratch: &mut [u32], values_scratch: &mut [T]) {
    let key_count = keys.len();
    debug_assert_eq!(key_count, values.len(), "Keys and values must pair up.");
    assert!(
        keys_scratch.len() >= key_count && values_scratch.len() >= key_count,
        "Scratch buffers must be able to hold every key."
    );
    let keys_scratch = &mut keys_scratch[..key_count];
    let values_scratch = &mut values_scratch[..key_count];

    let mut bucket_counts = [[0u32; BUCKET_COUNT]; 4];
    for &key in keys.iter() {
        bucket_counts[0][(key & 0xFF) as usize] += 1;
        bucket_counts[1][((key >> 8) & 0xFF) as usize] += 1;
        bucket_counts[2][((key >> 16) & 0xFF) as usize] += 1;
        bucket_counts[3][(key >> 24) as usize] += 1;
    }

    // Convert counts into exclusive partial sums, the start index of each bucket.
    for counts in bucket_counts.iter_mut() {
        let mut sum = 0;
        for count in counts.iter_mut() {
            let previous = *count;
            *count = sum;
            sum += previous;
        }
    }

    let [byte0_counts, byte1_counts, byte2_counts, byte3_counts] = &mut bucket_counts;
    reorder_for_byte(keys, keys_scratch, values, values_scratch, byte0_counts, 0);
    reorder_for_byte(keys_scratch, keys, values_scratch, values, byte1_counts, 8);
    reorder_for_byte(keys, keys_scratch, values, values_scratch, byte2_counts, 16);
    reorder_for_byte(keys_scratch, keys, values_scratch, values, byte3_counts, 24);
}
