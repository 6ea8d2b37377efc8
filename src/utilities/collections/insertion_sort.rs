/// Sorts keys and their paired values in ascending key order.
///
/// Stable: values with equal keys keep their relative order. Intended for short runs only.
#[inline]
pub fn sort<TKey, TValue>(keys: &mut [TKey], values: &mut [TValue])
where
    TKey: Ord + Copy,
    TValue: Copy,
{
    debug_assert_eq!(keys.len(), values.len(), "Keys and values must pair up.");
    for i in 1..keys.len() {
        let original_key = keys[i];
        let original_value = values[i];
        let mut compare_index = i;

        while compare_index > 0 && keys[compare_index - 1] > original_key {
            keys[compare_index] = keys[compare_index - 1];
            values[compare_index] = values[compare_index - 1];
            compare_index -= 1;
        }

        keys[compare_index] = original_key;
        values[compare_index] = original_value;
    }
}
