//! Global partition pass: many blocks cooperate on one sequence.
//!
//! Each participating block looks up its sequence through the
//! block-to-sequence table, then work-steals stripes of that sequence via
//! the sequence's `work_counter`. A stripe is partitioned in two passes:
//! a count pass tallies how many of its keys fall below and above the
//! pivot (tracking min/max candidates for both sides), then the block
//! claims contiguous output ranges with one atomic add per side and
//! scatters the keys into the opposite buffer. Keys equal to the pivot are
//! only counted; in key-value mode their values are staged so the pivot
//! run can be materialized once its final position is known.
//!
//! The block that finishes a sequence last writes the pivot run, keys and
//! staged values both, into the gap between the two partitions of the
//! result buffer.

use rayon::prelude::*;
use std::sync::atomic::Ordering;

use crate::constants::{stripe_elems, MAX_VAL, MIN_VAL};
use crate::sequence::{Direction, GridSeq, SortOrder};
use crate::workspace::{ValueViews, Workspace};

/// Runs one global partition pass over every entry of the block table.
///
/// Blocks assigned to the same sequence must be consecutive in
/// `block_to_seq`; the pass returns once every block has finished.
pub fn partition_pass(ws: &Workspace, seqs: &[GridSeq], block_to_seq: &[u32], order: SortOrder) {
    (0..block_to_seq.len())
        .into_par_iter()
        .for_each(|block| partition_block(ws, &seqs[block_to_seq[block] as usize], order));
}

fn partition_block(ws: &Workspace, seq: &GridSeq, order: SortOrder) {
    let stripe = stripe_elems(ws.key_only());
    let src_keys = ws.keys_atomic(seq.direction);
    let dst_keys = ws.keys_atomic(seq.direction.flipped());
    let values = ws.value_views();

    let mut lower_min = MAX_VAL;
    let mut lower_max = MIN_VAL;
    let mut greater_min = MAX_VAL;
    let mut greater_max = MIN_VAL;

    loop {
        let begin = seq.work_counter.fetch_add(1, Ordering::Relaxed) * stripe;
        if begin >= seq.length {
            break;
        }
        let end = seq.length.min(begin + stripe);

        // Count pass over the stripe.
        let mut cnt_lower = 0usize;
        let mut cnt_greater = 0usize;
        let mut cnt_pivot = 0usize;
        for i in seq.start + begin..seq.start + end {
            let key = src_keys[i].load(Ordering::Relaxed);
            if order.precedes(key, seq.pivot) {
                cnt_lower += 1;
                lower_min = lower_min.min(key);
                lower_max = lower_max.max(key);
            } else if order.precedes(seq.pivot, key) {
                cnt_greater += 1;
                greater_min = greater_min.min(key);
                greater_max = greater_max.max(key);
            } else {
                cnt_pivot += 1;
            }
        }

        // Claim contiguous output ranges for the stripe.
        let lower_base = seq.offset_lower.fetch_add(cnt_lower, Ordering::Relaxed);
        let greater_base = seq.offset_greater.fetch_add(cnt_greater, Ordering::Relaxed);
        let pivot_base = if values.is_some() {
            seq.offset_pivot.fetch_add(cnt_pivot, Ordering::Relaxed)
        } else {
            0
        };

        // Scatter pass. Lower keys fill their range upward from the start
        // of the sequence, greater keys fill theirs downward from the end;
        // the gap left in the middle becomes the pivot run.
        let mut placed_lower = 0usize;
        let mut placed_greater = 0usize;
        let mut placed_pivot = 0usize;
        match &values {
            Some(v) => {
                let src_vals = v.get(seq.direction);
                let dst_vals = v.get(seq.direction.flipped());
                for i in seq.start + begin..seq.start + end {
                    let key = src_keys[i].load(Ordering::Relaxed);
                    let val = src_vals[i].load(Ordering::Relaxed);
                    if order.precedes(key, seq.pivot) {
                        let at = seq.start + lower_base + placed_lower;
                        dst_keys[at].store(key, Ordering::Relaxed);
                        dst_vals[at].store(val, Ordering::Relaxed);
                        placed_lower += 1;
                    } else if order.precedes(seq.pivot, key) {
                        let at = seq.start + seq.length - 1 - (greater_base + placed_greater);
                        dst_keys[at].store(key, Ordering::Relaxed);
                        dst_vals[at].store(val, Ordering::Relaxed);
                        placed_greater += 1;
                    } else {
                        v.staged[seq.start + pivot_base + placed_pivot].store(val, Ordering::Relaxed);
                        placed_pivot += 1;
                    }
                }
            }
            None => {
                for i in seq.start + begin..seq.start + end {
                    let key = src_keys[i].load(Ordering::Relaxed);
                    if order.precedes(key, seq.pivot) {
                        let at = seq.start + lower_base + placed_lower;
                        dst_keys[at].store(key, Ordering::Relaxed);
                        placed_lower += 1;
                    } else if order.precedes(seq.pivot, key) {
                        let at = seq.start + seq.length - 1 - (greater_base + placed_greater);
                        dst_keys[at].store(key, Ordering::Relaxed);
                        placed_greater += 1;
                    }
                }
            }
        }
    }

    // Fold this block's bracket candidates into the sequence. Blocks that
    // claimed no stripe fold the identity sentinels, which is a no-op.
    seq.lower_min.fetch_min(lower_min, Ordering::Relaxed);
    seq.lower_max.fetch_max(lower_max, Ordering::Relaxed);
    seq.greater_min.fetch_min(greater_min, Ordering::Relaxed);
    seq.greater_max.fetch_max(greater_max, Ordering::Relaxed);

    // AcqRel: the block that arrives last must observe every other block's
    // scatter and staging writes before it fills the pivot run.
    if seq.finished_blocks.fetch_add(1, Ordering::AcqRel) == seq.block_count - 1 {
        write_pivot_run(ws, seq, values);
    }
}

/// Writes the pivot run into the gap the scatters left in the result
/// buffer, and publishes the final pivot count.
fn write_pivot_run(ws: &Workspace, seq: &GridSeq, values: Option<ValueViews<'_>>) {
    let lower_total = seq.offset_lower.load(Ordering::Relaxed);
    let greater_total = seq.offset_greater.load(Ordering::Relaxed);
    let pivot_total = seq.length - lower_total - greater_total;
    let gap_start = seq.start + lower_total;

    let out_keys = ws.keys_atomic(Direction::Buffer);
    for i in gap_start..gap_start + pivot_total {
        out_keys[i].store(seq.pivot, Ordering::Relaxed);
    }
    if let Some(v) = values {
        debug_assert_eq!(seq.offset_pivot.load(Ordering::Relaxed), pivot_total);
        for t in 0..pivot_total {
            let val = v.staged[seq.start + t].load(Ordering::Relaxed);
            v.buffer[gap_start + t].store(val, Ordering::Relaxed);
        }
    }
    seq.offset_pivot.store(pivot_total, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::HostSeq;
    use rand::Rng;

    /// Launches one pass over a single root sequence, the way the driver
    /// would: true bracket from the input, blocks sized by the stripe.
    fn run_root_pass(
        keys: &[u32],
        values: Option<&[u32]>,
        order: SortOrder,
    ) -> (Workspace, GridSeq) {
        let min_val = *keys.iter().min().unwrap();
        let max_val = *keys.iter().max().unwrap();
        let ws = Workspace::new(keys, values);
        let host = HostSeq::root(keys.len(), min_val, max_val);
        let blocks = (keys.len() - 1) / stripe_elems(ws.key_only()) + 1;
        let grid = GridSeq::from_host(&host, 0, blocks);
        let table: Vec<u32> = vec![0; blocks];
        partition_pass(&ws, std::slice::from_ref(&grid), &table, order);
        (ws, grid)
    }

    #[test]
    fn test_counts_cover_the_sequence() {
        // Dense permuted range: every value in 0..1000 occurs, so the
        // midpoint pivot is guaranteed to be present.
        let keys: Vec<u32> = (0..10_000u32).map(|i| (i * 7) % 1000).collect();
        let (_, grid) = run_root_pass(&keys, None, SortOrder::Ascending);

        assert_eq!(
            grid.lower_total() + grid.greater_total() + grid.pivot_total(),
            keys.len()
        );
        assert!(grid.pivot_total() >= 1, "pivot keys exist in a dense range");
    }

    #[test]
    fn test_partitions_respect_the_pivot() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..20_000).map(|_| rng.gen()).collect();
        let (ws, grid) = run_root_pass(&keys, None, SortOrder::Ascending);

        let n = keys.len();
        let out = &ws.keys_buffer;
        let lower_end = grid.lower_total();
        let greater_start = n - grid.greater_total();
        assert!(out[..lower_end].iter().all(|&k| k < grid.pivot));
        assert!(out[lower_end..greater_start].iter().all(|&k| k == grid.pivot));
        assert!(out[greater_start..].iter().all(|&k| k > grid.pivot));
    }

    #[test]
    fn test_partition_is_a_permutation() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..12_345).map(|_| rng.gen_range(0..5000)).collect();
        let (ws, _) = run_root_pass(&keys, None, SortOrder::Ascending);

        let mut before = keys.clone();
        let mut after = ws.keys_buffer.clone();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn test_bracket_candidates_are_sound() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..9_999).map(|_| rng.gen_range(100..100_000)).collect();
        let min_val = *keys.iter().min().unwrap();
        let max_val = *keys.iter().max().unwrap();
        let (_, grid) = run_root_pass(&keys, None, SortOrder::Ascending);

        if grid.lower_total() > 0 {
            assert!(grid.lower_min.load(Ordering::Relaxed) >= min_val);
            assert!(grid.lower_max.load(Ordering::Relaxed) < grid.pivot);
        }
        if grid.greater_total() > 0 {
            assert!(grid.greater_min.load(Ordering::Relaxed) > grid.pivot);
            assert!(grid.greater_max.load(Ordering::Relaxed) <= max_val);
        }
    }

    #[test]
    fn test_descending_swaps_the_sides() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..8_000).map(|_| rng.gen_range(0..10_000)).collect();
        let (ws, grid) = run_root_pass(&keys, None, SortOrder::Descending);

        let n = keys.len();
        let out = &ws.keys_buffer;
        let lower_end = grid.lower_total();
        let greater_start = n - grid.greater_total();
        assert!(out[..lower_end].iter().all(|&k| k > grid.pivot));
        assert!(out[lower_end..greater_start].iter().all(|&k| k == grid.pivot));
        assert!(out[greater_start..].iter().all(|&k| k < grid.pivot));
    }

    #[test]
    fn test_values_travel_with_their_keys() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..6_000).map(|_| rng.gen_range(0..64)).collect();
        // Tag every key with its original index so pairs are checkable.
        let values: Vec<u32> = (0..keys.len() as u32).collect();
        let (ws, grid) = run_root_pass(&keys, Some(&values), SortOrder::Ascending);

        let out_keys = &ws.keys_buffer;
        let out_values = ws.values_buffer.as_ref().unwrap();
        let lower_end = grid.lower_total();
        let greater_start = keys.len() - grid.greater_total();
        for i in 0..keys.len() {
            let original = out_values[i] as usize;
            if i < lower_end || i >= greater_start {
                assert_eq!(out_keys[i], keys[original]);
            } else {
                // Pivot run: the key was rebuilt from the pivot, the value
                // must still belong to a pivot-keyed input element.
                assert_eq!(keys[original], grid.pivot);
            }
        }
    }

    #[test]
    fn test_single_block_sequence() {
        // Shorter than one stripe: one block does everything, including the
        // pivot run.
        let keys = vec![9u32, 1, 5, 5, 3, 7, 5, 2];
        let (ws, grid) = run_root_pass(&keys, None, SortOrder::Ascending);
        assert_eq!(grid.block_count, 1);
        assert_eq!(
            grid.lower_total() + grid.greater_total() + grid.pivot_total(),
            keys.len()
        );
        let mut out = ws.keys_buffer.clone();
        out.sort_unstable();
        let mut expected = keys.clone();
        expected.sort_unstable();
        assert_eq!(out, expected);
    }
}
