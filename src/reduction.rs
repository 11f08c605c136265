//! Min/max reduction seeding the initial pivot bracket.
//!
//! Short arrays are folded sequentially; longer ones are reduced in two
//! levels: parallel blocks each fold one chunk down to a `(min, max)` pair,
//! and the pairs are folded on the host. A `min == max` result is the
//! distribution-zero signal: the input is constant and already sorted.

use rayon::prelude::*;

use crate::constants::{reduction_chunk, MAX_VAL, MIN_VAL, THRESHOLD_PARALLEL_REDUCTION};

/// Returns the `(min, max)` pair over `keys`.
///
/// Callers must not pass an empty slice; the driver rejects empty inputs
/// before reducing.
pub fn min_max(keys: &[u32]) -> (u32, u32) {
    debug_assert!(!keys.is_empty());

    if keys.len() <= THRESHOLD_PARALLEL_REDUCTION {
        return fold(keys);
    }

    // One (min, max) pair per block, folded on the host.
    let pairs: Vec<(u32, u32)> = keys.par_chunks(reduction_chunk()).map(fold).collect();

    let mut min_val = MAX_VAL;
    let mut max_val = MIN_VAL;
    for &(lo, hi) in &pairs {
        min_val = min_val.min(lo);
        max_val = max_val.max(hi);
    }
    (min_val, max_val)
}

fn fold(chunk: &[u32]) -> (u32, u32) {
    let mut min_val = MAX_VAL;
    let mut max_val = MIN_VAL;
    for &key in chunk {
        min_val = min_val.min(key);
        max_val = max_val.max(key);
    }
    (min_val, max_val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_min_max_small() {
        assert_eq!(min_max(&[5, 3, 9, 1, 7]), (1, 9));
    }

    #[test]
    fn test_min_max_single() {
        assert_eq!(min_max(&[42]), (42, 42));
    }

    #[test]
    fn test_min_max_constant_input() {
        let data = vec![7u32; 1000];
        assert_eq!(min_max(&data), (7, 7));
    }

    #[test]
    fn test_min_max_includes_extremes() {
        let data = vec![17, u32::MAX, 4, u32::MIN, 23];
        assert_eq!(min_max(&data), (u32::MIN, u32::MAX));
    }

    #[test]
    fn test_min_max_parallel_path() {
        // Longer than the reduction threshold so the block path runs.
        let n = THRESHOLD_PARALLEL_REDUCTION + 1234;
        let mut rng = rand::thread_rng();
        let mut data: Vec<u32> = (0..n).map(|_| rng.gen_range(10..1_000_000)).collect();
        data[n / 3] = 3;
        data[2 * n / 3] = 2_000_000;

        assert_eq!(min_max(&data), (3, 2_000_000));
    }

    #[test]
    fn test_min_max_parallel_matches_sequential() {
        let n = THRESHOLD_PARALLEL_REDUCTION * 2 + 77;
        let mut rng = rand::thread_rng();
        let data: Vec<u32> = (0..n).map(|_| rng.gen()).collect();

        let expected = (
            *data.iter().min().unwrap(),
            *data.iter().max().unwrap(),
        );
        assert_eq!(min_max(&data), expected);
    }
}
