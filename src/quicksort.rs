//! Host driver and entry points for the two-phase parallel quicksort.
//!
//! The driver keeps two lists of live sequences (`active`, the ones the
//! next global pass will partition, and `backlog`, where their children
//! collect) plus a `local` list of sequences that have shrunk enough for
//! a single block to finish. Each round it projects `active` into grid
//! descriptors, assigns consecutive blocks to every sequence, launches one
//! global partition pass, reads the returned counts and bracket candidates
//! back, and builds the children. Splitting stops when the queue empties
//! or saturates the sequence limit; everything still pending drains into
//! the local list, and a single local pass finishes the sort.
//!
//! Children whose bracket collapsed (`min == max`) are constant runs and
//! are not queued: if they already live in the result buffer they are
//! done, otherwise the local phase moves them across.

use std::mem;

use crate::constants::{partition_threshold, stripe_elems};
use crate::global_partition::partition_pass;
use crate::local_sort::local_pass;
use crate::reduction::min_max;
use crate::sequence::{Direction, GridSeq, HostSeq, LocalSeq, SortOrder};
use crate::workspace::{max_num_blocks, max_num_sequences, Workspace};

/// Sorts a slice of keys.
pub fn sort_keys(keys: &mut [u32], order: SortOrder) -> Result<(), String> {
    sort_impl(keys, None, order)
}

/// Sorts keys and carries the paired values along.
///
/// Pairs stay together: after the sort, `values[i]` is a value that was
/// paired with an input key equal to `keys[i]`. The sort is not stable, so
/// ties may exchange their values.
pub fn sort_pairs(keys: &mut [u32], values: &mut [u32], order: SortOrder) -> Result<(), String> {
    if keys.len() != values.len() {
        return Err(format!(
            "Key and value lengths differ: {} keys, {} values.",
            keys.len(),
            values.len()
        ));
    }
    sort_impl(keys, Some(values), order)
}

fn sort_impl(keys: &mut [u32], values: Option<&mut [u32]>, order: SortOrder) -> Result<(), String> {
    let n = keys.len();
    if n <= 1 {
        return Ok(());
    }

    let (min_val, max_val) = min_max(keys);
    if min_val == max_val {
        // Distribution zero: every key is equal, the input is its own
        // sorted output and never leaves the caller's buffers.
        return Ok(());
    }

    let key_only = values.is_none();
    let threshold = partition_threshold(key_only);
    let stripe = stripe_elems(key_only);
    let ws = Workspace::new(keys, values.as_deref());

    let mut active: Vec<HostSeq> = Vec::with_capacity(max_num_sequences(n));
    let mut backlog: Vec<HostSeq> = Vec::with_capacity(max_num_sequences(n));
    let mut local: Vec<LocalSeq> = Vec::with_capacity(max_num_sequences(n));
    let mut grid: Vec<GridSeq> = Vec::with_capacity(max_num_sequences(n));
    let mut block_to_seq: Vec<u32> = Vec::with_capacity(max_num_blocks(n));

    if n > threshold {
        let num_seq_limit = (n - 1) / threshold + 1;
        active.push(HostSeq::root(n, min_val, max_val));

        while !active.is_empty() && active.len() < num_seq_limit {
            // Project the host queue onto the grid and hand every sequence
            // a consecutive range of blocks.
            grid.clear();
            block_to_seq.clear();
            for host in &active {
                let block_count = (host.length - 1) / stripe + 1;
                let seq = GridSeq::from_host(host, block_to_seq.len(), block_count);
                let seq_index = grid.len() as u32;
                for _ in seq.first_block..seq.first_block + seq.block_count {
                    block_to_seq.push(seq_index);
                }
                grid.push(seq);
            }

            partition_pass(&ws, &grid, &block_to_seq, order);

            // Build children from the returned counts and brackets.
            backlog.clear();
            for (host, seq) in active.iter().zip(&grid) {
                debug_assert_eq!(
                    seq.lower_total() + seq.greater_total() + seq.pivot_total(),
                    host.length
                );
                if seq.lower_total() > 0 {
                    route_child(
                        HostSeq::lower_child(host, seq),
                        &mut backlog,
                        &mut local,
                        threshold,
                        num_seq_limit,
                    );
                }
                if seq.greater_total() > 0 {
                    route_child(
                        HostSeq::greater_child(host, seq),
                        &mut backlog,
                        &mut local,
                        threshold,
                        num_seq_limit,
                    );
                }
            }
            mem::swap(&mut active, &mut backlog);
        }

        // Queue saturated: splitting further gains no parallelism, the
        // local phase takes whatever is left.
        for host in active.drain(..) {
            local.push(LocalSeq::from_host(&host));
        }
    } else {
        local.push(LocalSeq::root(n));
    }

    local_pass(&ws, &local, order);

    keys.copy_from_slice(&ws.keys_buffer);
    if let Some(v) = values {
        v.copy_from_slice(ws.values_buffer.as_ref().expect("key-value workspace"));
    }
    Ok(())
}

/// Queues a freshly built child: big ones back to the global queue while
/// it has room, the rest to the local phase. Constant runs are already
/// sorted and only pass through the local phase when their bytes still
/// need to reach the result buffer.
fn route_child(
    child: HostSeq,
    backlog: &mut Vec<HostSeq>,
    local: &mut Vec<LocalSeq>,
    threshold: usize,
    num_seq_limit: usize,
) {
    if child.min_val == child.max_val {
        if child.direction == Direction::Primary {
            local.push(LocalSeq::from_host(&child));
        }
        return;
    }
    if child.length > threshold && backlog.len() < num_seq_limit {
        backlog.push(child);
    } else {
        local.push(LocalSeq::from_host(&child));
    }
}
