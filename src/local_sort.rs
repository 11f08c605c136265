//! Local phase: one block owns one sequence end-to-end.
//!
//! Each block walks an explicit stack of `(start, length, direction)`
//! frames. Frames at or below the bitonic threshold are loaded into block
//! scratch, sorted by a bitonic network and written to the result buffer.
//! Larger frames are partitioned around the midpoint of their freshly
//! computed min/max bracket with the same count-then-scatter scheme as the
//! global pass, except everything happens inside one block: the pivot run
//! needs no cross-block coordination and is finalized as soon as the
//! scatter completes. Child frames ping-pong to the opposite buffer.
//!
//! Frames that turn out to be constant (`min == max`) are already sorted;
//! they only need their bytes moved to the result buffer if they do not
//! live there yet.

use rayon::prelude::*;
use std::sync::atomic::Ordering;

use crate::constants::{bitonic_threshold, local_scratch_len, MAX_VAL, MIN_VAL};
use crate::sequence::{pivot_midpoint, Direction, LocalSeq, SortOrder};
use crate::workspace::{ValueViews, Workspace};

/// Frames outstanding per block: the midpoint pivot halves the value
/// bracket every level, and each level parks at most two frames.
const STACK_CAPACITY: usize = 2 * u32::BITS as usize + 8;

/// Runs the local phase: one block per sequence, all in parallel.
pub fn local_pass(ws: &Workspace, seqs: &[LocalSeq], order: SortOrder) {
    seqs.par_iter().for_each(|seq| sort_block(ws, *seq, order));
}

fn sort_block(ws: &Workspace, seq: LocalSeq, order: SortOrder) {
    let key_only = ws.key_only();
    let threshold = bitonic_threshold(key_only);
    let values = ws.value_views();

    // Block scratch for the bitonic tail, reused across frames.
    let mut keys_scratch: Vec<u32> = Vec::with_capacity(local_scratch_len(true));
    let mut pairs_scratch: Vec<(u64, u32)> = Vec::with_capacity(local_scratch_len(false) / 2);

    let mut stack: Vec<LocalSeq> = Vec::with_capacity(STACK_CAPACITY);
    stack.push(seq);

    while let Some(frame) = stack.pop() {
        if frame.length == 0 {
            continue;
        }
        if frame.length <= threshold {
            match &values {
                Some(v) => bitonic_tail_pairs(ws, &frame, order, v, &mut pairs_scratch),
                None => bitonic_tail_keys(ws, &frame, order, &mut keys_scratch),
            }
            continue;
        }

        let src_keys = ws.keys_atomic(frame.direction);
        let span = frame.start..frame.start + frame.length;

        // In-block min/max pass; the bracket picks the pivot.
        let mut min_val = MAX_VAL;
        let mut max_val = MIN_VAL;
        for i in span.clone() {
            let key = src_keys[i].load(Ordering::Relaxed);
            min_val = min_val.min(key);
            max_val = max_val.max(key);
        }
        if min_val == max_val {
            finish_constant_run(ws, &frame, min_val, values.as_ref());
            continue;
        }
        let pivot = pivot_midpoint(min_val, max_val);

        // Count pass.
        let mut cnt_lower = 0usize;
        let mut cnt_greater = 0usize;
        for i in span.clone() {
            let key = src_keys[i].load(Ordering::Relaxed);
            if order.precedes(key, pivot) {
                cnt_lower += 1;
            } else if order.precedes(pivot, key) {
                cnt_greater += 1;
            }
        }
        let cnt_pivot = frame.length - cnt_lower - cnt_greater;

        // Scatter pass into the opposite buffer; pivot values are staged
        // until all reads of the frame are done.
        let dst_keys = ws.keys_atomic(frame.direction.flipped());
        let mut placed_lower = 0usize;
        let mut placed_greater = 0usize;
        let mut placed_pivot = 0usize;
        match &values {
            Some(v) => {
                let src_vals = v.get(frame.direction);
                let dst_vals = v.get(frame.direction.flipped());
                for i in span {
                    let key = src_keys[i].load(Ordering::Relaxed);
                    let val = src_vals[i].load(Ordering::Relaxed);
                    if order.precedes(key, pivot) {
                        let at = frame.start + placed_lower;
                        dst_keys[at].store(key, Ordering::Relaxed);
                        dst_vals[at].store(val, Ordering::Relaxed);
                        placed_lower += 1;
                    } else if order.precedes(pivot, key) {
                        let at = frame.start + frame.length - 1 - placed_greater;
                        dst_keys[at].store(key, Ordering::Relaxed);
                        dst_vals[at].store(val, Ordering::Relaxed);
                        placed_greater += 1;
                    } else {
                        v.staged[frame.start + placed_pivot].store(val, Ordering::Relaxed);
                        placed_pivot += 1;
                    }
                }
            }
            None => {
                for i in span {
                    let key = src_keys[i].load(Ordering::Relaxed);
                    if order.precedes(key, pivot) {
                        dst_keys[frame.start + placed_lower].store(key, Ordering::Relaxed);
                        placed_lower += 1;
                    } else if order.precedes(pivot, key) {
                        dst_keys[frame.start + frame.length - 1 - placed_greater]
                            .store(key, Ordering::Relaxed);
                        placed_greater += 1;
                    }
                }
            }
        }

        // The pivot run is final; it goes straight to the result buffer.
        let gap_start = frame.start + cnt_lower;
        let out_keys = ws.keys_atomic(Direction::Buffer);
        for t in 0..cnt_pivot {
            out_keys[gap_start + t].store(pivot, Ordering::Relaxed);
        }
        if let Some(v) = &values {
            for t in 0..cnt_pivot {
                let val = v.staged[frame.start + t].load(Ordering::Relaxed);
                v.buffer[gap_start + t].store(val, Ordering::Relaxed);
            }
        }

        stack.push(LocalSeq {
            start: frame.start + frame.length - cnt_greater,
            length: cnt_greater,
            direction: frame.direction.flipped(),
        });
        stack.push(LocalSeq {
            start: frame.start,
            length: cnt_lower,
            direction: frame.direction.flipped(),
        });
    }
}

/// A constant frame is already sorted; make sure its bytes reach the
/// result buffer.
fn finish_constant_run(
    ws: &Workspace,
    frame: &LocalSeq,
    key: u32,
    values: Option<&ValueViews<'_>>,
) {
    if frame.direction == Direction::Buffer {
        return;
    }
    let out_keys = ws.keys_atomic(Direction::Buffer);
    for i in frame.start..frame.start + frame.length {
        out_keys[i].store(key, Ordering::Relaxed);
    }
    if let Some(v) = values {
        for i in frame.start..frame.start + frame.length {
            v.buffer[i].store(v.primary[i].load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }
}

/// Key-only bitonic tail: load the frame into scratch padded to a power of
/// two with the order's sentinel, sort, write the leading `length` keys to
/// the result buffer.
fn bitonic_tail_keys(ws: &Workspace, frame: &LocalSeq, order: SortOrder, scratch: &mut Vec<u32>) {
    let n = frame.length;
    let src = ws.keys_atomic(frame.direction);
    scratch.clear();
    scratch.extend((0..n).map(|t| src[frame.start + t].load(Ordering::Relaxed)));
    scratch.resize(n.next_power_of_two(), order.padding());

    bitonic_network(scratch, order);

    let out = ws.keys_atomic(Direction::Buffer);
    for t in 0..n {
        out[frame.start + t].store(scratch[t], Ordering::Relaxed);
    }
}

/// Key-value bitonic tail.
///
/// Padding cannot reuse the sentinel key directly: a real key can equal the
/// sentinel, and the network is free to place a pad ahead of it, which
/// would leak the pad's dummy value. Keys are therefore widened by one bit
/// into ranks that order pads strictly after every real element, with the
/// rank inverted in descending mode so the network always sorts ranks
/// ascending.
fn bitonic_tail_pairs(
    ws: &Workspace,
    frame: &LocalSeq,
    order: SortOrder,
    values: &ValueViews<'_>,
    scratch: &mut Vec<(u64, u32)>,
) {
    let n = frame.length;
    let src_keys = ws.keys_atomic(frame.direction);
    let src_vals = values.get(frame.direction);
    let mask = match order {
        SortOrder::Ascending => 0u32,
        SortOrder::Descending => u32::MAX,
    };

    scratch.clear();
    scratch.extend((0..n).map(|t| {
        let key = src_keys[frame.start + t].load(Ordering::Relaxed);
        let val = src_vals[frame.start + t].load(Ordering::Relaxed);
        ((((key ^ mask) as u64) << 1), val)
    }));
    scratch.resize(n.next_power_of_two(), (u64::MAX, 0));

    bitonic_network_pairs(scratch);

    let out_keys = ws.keys_atomic(Direction::Buffer);
    let out_vals = values.buffer;
    for t in 0..n {
        let (rank, val) = scratch[t];
        out_keys[frame.start + t].store(((rank >> 1) as u32) ^ mask, Ordering::Relaxed);
        out_vals[frame.start + t].store(val, Ordering::Relaxed);
    }
}

/// In-block bitonic sorting network. Requires a power-of-two length.
fn bitonic_network(data: &mut [u32], order: SortOrder) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());

    let mut k = 2;
    while k <= n {
        let mut j = k / 2;
        while j > 0 {
            for i in 0..n {
                let ixj = i ^ j;
                if ixj > i {
                    let ascending = ((i & k) == 0) == (order == SortOrder::Ascending);
                    let should_swap = if ascending {
                        data[i] > data[ixj]
                    } else {
                        data[i] < data[ixj]
                    };
                    if should_swap {
                        data.swap(i, ixj);
                    }
                }
            }
            j /= 2;
        }
        k *= 2;
    }
}

/// Rank-ascending bitonic network over `(rank, value)` pairs.
fn bitonic_network_pairs(data: &mut [(u64, u32)]) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());

    let mut k = 2;
    while k <= n {
        let mut j = k / 2;
        while j > 0 {
            for i in 0..n {
                let ixj = i ^ j;
                if ixj > i {
                    let ascending = (i & k) == 0;
                    let should_swap = if ascending {
                        data[i].0 > data[ixj].0
                    } else {
                        data[i].0 < data[ixj].0
                    };
                    if should_swap {
                        data.swap(i, ixj);
                    }
                }
            }
            j /= 2;
        }
        k *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::THRESHOLD_BITONIC_SORT_KO;
    use rand::Rng;

    fn run_local_root(keys: &[u32], values: Option<&[u32]>, order: SortOrder) -> Workspace {
        let ws = Workspace::new(keys, values);
        let seqs = vec![LocalSeq::root(keys.len())];
        local_pass(&ws, &seqs, order);
        ws
    }

    fn assert_sorted(data: &[u32], order: SortOrder) {
        assert!(
            data.windows(2).all(|w| !order.precedes(w[1], w[0])),
            "output out of order"
        );
    }

    #[test]
    fn test_bitonic_network_sorts_both_orders() {
        let mut rng = rand::thread_rng();
        let mut data: Vec<u32> = (0..256).map(|_| rng.gen()).collect();
        let mut expected = data.clone();
        expected.sort_unstable();

        bitonic_network(&mut data, SortOrder::Ascending);
        assert_eq!(data, expected);

        bitonic_network(&mut data, SortOrder::Descending);
        expected.reverse();
        assert_eq!(data, expected);
    }

    #[test]
    fn test_tail_only_frame() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..300).map(|_| rng.gen()).collect();
        let ws = run_local_root(&keys, None, SortOrder::Ascending);

        let mut expected = keys.clone();
        expected.sort_unstable();
        assert_eq!(ws.keys_buffer, expected);
    }

    #[test]
    fn test_tail_frame_at_exact_threshold() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..THRESHOLD_BITONIC_SORT_KO).map(|_| rng.gen()).collect();
        let ws = run_local_root(&keys, None, SortOrder::Ascending);

        let mut expected = keys.clone();
        expected.sort_unstable();
        assert_eq!(ws.keys_buffer, expected);
    }

    #[test]
    fn test_single_element_frame() {
        let ws = run_local_root(&[42], None, SortOrder::Ascending);
        assert_eq!(ws.keys_buffer, vec![42]);
    }

    #[test]
    fn test_recursive_frame_key_only() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..5_000).map(|_| rng.gen()).collect();
        let ws = run_local_root(&keys, None, SortOrder::Ascending);

        let mut expected = keys.clone();
        expected.sort_unstable();
        assert_eq!(ws.keys_buffer, expected);
    }

    #[test]
    fn test_recursive_frame_descending() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..4_000).map(|_| rng.gen_range(0..500)).collect();
        let ws = run_local_root(&keys, None, SortOrder::Descending);

        let mut expected = keys.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(ws.keys_buffer, expected);
    }

    #[test]
    fn test_constant_frame_copies_to_result() {
        // Longer than the bitonic threshold so the partition path sees the
        // constant bracket.
        let keys = vec![77u32; 3_000];
        let values: Vec<u32> = (0..3_000).collect();
        let ws = run_local_root(&keys, Some(&values), SortOrder::Ascending);

        assert_eq!(ws.keys_buffer, keys);
        assert_eq!(ws.values_buffer.as_ref().unwrap(), &values);
    }

    #[test]
    fn test_pairs_stay_together() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..3_000).map(|_| rng.gen_range(0..100)).collect();
        let values: Vec<u32> = (0..keys.len() as u32).collect();
        let ws = run_local_root(&keys, Some(&values), SortOrder::Ascending);

        let out_keys = &ws.keys_buffer;
        let out_values = ws.values_buffer.as_ref().unwrap();
        assert_sorted(out_keys, SortOrder::Ascending);
        for i in 0..keys.len() {
            assert_eq!(out_keys[i], keys[out_values[i] as usize]);
        }
    }

    #[test]
    fn test_pairs_with_sentinel_keys() {
        // Real keys equal to the padding sentinel must keep their own
        // values through the tail sort.
        let keys = vec![u32::MAX, 3, u32::MAX, 1, u32::MAX, 2, 9];
        let values = vec![10, 30, 11, 31, 12, 32, 90];
        let ws = run_local_root(&keys, Some(&values), SortOrder::Ascending);

        let out_keys = &ws.keys_buffer;
        let out_values = ws.values_buffer.as_ref().unwrap();
        assert_eq!(out_keys, &[1, 2, 3, 9, u32::MAX, u32::MAX, u32::MAX]);
        assert_eq!(&out_values[..4], &[31, 32, 30, 90]);
        let mut tail: Vec<u32> = out_values[4..].to_vec();
        tail.sort_unstable();
        assert_eq!(tail, vec![10, 11, 12]);
    }

    #[test]
    fn test_pairs_with_sentinel_keys_descending() {
        let keys = vec![0, 5, 0, 7, 0];
        let values = vec![100, 50, 101, 70, 102];
        let ws = run_local_root(&keys, Some(&values), SortOrder::Descending);

        let out_keys = &ws.keys_buffer;
        let out_values = ws.values_buffer.as_ref().unwrap();
        assert_eq!(out_keys, &[7, 5, 0, 0, 0]);
        assert_eq!(&out_values[..2], &[70, 50]);
        let mut tail: Vec<u32> = out_values[2..].to_vec();
        tail.sort_unstable();
        assert_eq!(tail, vec![100, 101, 102]);
    }

    #[test]
    fn test_many_frames_in_parallel() {
        // Two independent sequences in one pass, like a real local launch.
        let mut rng = rand::thread_rng();
        let keys: Vec<u32> = (0..2_048).map(|_| rng.gen_range(0..10_000)).collect();
        let ws = Workspace::new(&keys, None);
        let seqs = vec![
            LocalSeq {
                start: 0,
                length: 1_024,
                direction: Direction::Primary,
            },
            LocalSeq {
                start: 1_024,
                length: 1_024,
                direction: Direction::Primary,
            },
        ];
        local_pass(&ws, &seqs, SortOrder::Ascending);

        let mut left: Vec<u32> = keys[..1024].to_vec();
        let mut right: Vec<u32> = keys[1024..].to_vec();
        left.sort_unstable();
        right.sort_unstable();
        assert_eq!(&ws.keys_buffer[..1024], &left[..]);
        assert_eq!(&ws.keys_buffer[1024..], &right[..]);
    }
}
