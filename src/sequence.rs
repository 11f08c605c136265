//! Sequence descriptors for the two-phase parallel quicksort.
//!
//! A *sequence* is a contiguous sub-range of the working array that still
//! needs sorting. The host tracks them as [`HostSeq`] records; for each
//! global partition pass they are projected into [`GridSeq`] records whose
//! atomic fields the worker blocks hammer on; sub-ranges small enough for a
//! single block to own end-to-end travel as [`LocalSeq`] records.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::constants::{MAX_VAL, MIN_VAL};

/// Requested output ordering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Whether `a` must come strictly before `b` in the output.
    #[inline]
    pub fn precedes(self, a: u32, b: u32) -> bool {
        match self {
            SortOrder::Ascending => a < b,
            SortOrder::Descending => a > b,
        }
    }

    /// Padding sentinel that sorts after every real key in this order.
    #[inline]
    pub fn padding(self) -> u32 {
        match self {
            SortOrder::Ascending => MAX_VAL,
            SortOrder::Descending => MIN_VAL,
        }
    }
}

/// Which of the two ping-pong buffer pairs currently holds a sequence's
/// live data. `Primary` is the pair the input was staged into; `Buffer` is
/// the pair the sorted result accumulates in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Primary,
    Buffer,
}

impl Direction {
    /// The opposite buffer pair; partition output always lands there.
    #[inline]
    pub fn flipped(self) -> Direction {
        match self {
            Direction::Primary => Direction::Buffer,
            Direction::Buffer => Direction::Primary,
        }
    }
}

/// Midpoint of a `[min, max]` value bracket, used as the partition pivot.
///
/// With the bracket maintained exactly by the reduction and by per-pass
/// candidate folding, halving it every level bounds the recursion depth by
/// the bit width of the key regardless of the key distribution.
#[inline]
pub fn pivot_midpoint(min_val: u32, max_val: u32) -> u32 {
    (min_val >> 1) + (max_val >> 1) + (min_val & max_val & 1)
}

/// A sequence as the host work queue tracks it.
///
/// Queued sequences satisfy `length >= 2` and `min_val < max_val`; constant
/// runs never enter the queue.
#[derive(Clone, Copy, Debug)]
pub struct HostSeq {
    /// Absolute offset of the sub-range in the working array.
    pub start: usize,
    /// Number of elements in the sub-range.
    pub length: usize,
    /// Inclusive lower bound on the keys currently in the sub-range.
    pub min_val: u32,
    /// Inclusive upper bound on the keys currently in the sub-range.
    pub max_val: u32,
    /// Buffer pair holding the sub-range's live data.
    pub direction: Direction,
}

impl HostSeq {
    /// Root sequence covering the whole array, with the bracket the initial
    /// reduction produced.
    pub fn root(length: usize, min_val: u32, max_val: u32) -> HostSeq {
        HostSeq {
            start: 0,
            length,
            min_val,
            max_val,
            direction: Direction::Primary,
        }
    }

    /// Child covering the parent's lower partition, built from the counts
    /// and narrowed bracket a global pass returned.
    pub fn lower_child(parent: &HostSeq, grid: &GridSeq) -> HostSeq {
        HostSeq {
            start: parent.start,
            length: grid.lower_total(),
            min_val: grid.lower_min.load(Ordering::Relaxed),
            max_val: grid.lower_max.load(Ordering::Relaxed),
            direction: parent.direction.flipped(),
        }
    }

    /// Child covering the parent's greater partition.
    pub fn greater_child(parent: &HostSeq, grid: &GridSeq) -> HostSeq {
        let length = grid.greater_total();
        HostSeq {
            start: parent.start + parent.length - length,
            length,
            min_val: grid.greater_min.load(Ordering::Relaxed),
            max_val: grid.greater_max.load(Ordering::Relaxed),
            direction: parent.direction.flipped(),
        }
    }
}

/// Host-to-grid projection of a sequence for one global partition pass.
///
/// The plain fields are inputs the host fills before the launch; the atomic
/// fields are claimed, folded and incremented by the participating blocks
/// and read back by the host after the pass completes.
pub struct GridSeq {
    pub start: usize,
    pub length: usize,
    /// Partition pivot, the midpoint of the host sequence's bracket.
    pub pivot: u32,
    pub direction: Direction,
    /// First entry in the block-to-sequence table assigned to this sequence.
    pub first_block: usize,
    /// Number of consecutive blocks assigned to this sequence.
    pub block_count: usize,

    /// Elements partitioned into the lower side so far; final value is the
    /// lower child's length.
    pub offset_lower: AtomicUsize,
    /// Elements partitioned into the greater side so far.
    pub offset_greater: AtomicUsize,
    /// Elements equal to the pivot. Claimed per stripe in key-value mode
    /// (staging slots for the pivot values); written by the last block in
    /// key-only mode.
    pub offset_pivot: AtomicUsize,

    /// Narrowed bracket candidates for the two children.
    pub lower_min: AtomicU32,
    pub lower_max: AtomicU32,
    pub greater_min: AtomicU32,
    pub greater_max: AtomicU32,

    /// Next stripe index to process; blocks work-steal stripes from here.
    pub work_counter: AtomicUsize,
    /// Blocks done with this sequence; the block that brings this to
    /// `block_count` writes the pivot run.
    pub finished_blocks: AtomicUsize,
}

impl GridSeq {
    /// Projects a host sequence, assigns it `block_count` blocks starting at
    /// `first_block`, picks the pivot and zeroes all counters.
    pub fn from_host(host: &HostSeq, first_block: usize, block_count: usize) -> GridSeq {
        GridSeq {
            start: host.start,
            length: host.length,
            pivot: pivot_midpoint(host.min_val, host.max_val),
            direction: host.direction,
            first_block,
            block_count,
            offset_lower: AtomicUsize::new(0),
            offset_greater: AtomicUsize::new(0),
            offset_pivot: AtomicUsize::new(0),
            lower_min: AtomicU32::new(MAX_VAL),
            lower_max: AtomicU32::new(MIN_VAL),
            greater_min: AtomicU32::new(MAX_VAL),
            greater_max: AtomicU32::new(MIN_VAL),
            work_counter: AtomicUsize::new(0),
            finished_blocks: AtomicUsize::new(0),
        }
    }

    /// Final size of the lower partition. Meaningful once the pass is done.
    pub fn lower_total(&self) -> usize {
        self.offset_lower.load(Ordering::Relaxed)
    }

    /// Final size of the greater partition.
    pub fn greater_total(&self) -> usize {
        self.offset_greater.load(Ordering::Relaxed)
    }

    /// Final size of the pivot run.
    pub fn pivot_total(&self) -> usize {
        self.offset_pivot.load(Ordering::Relaxed)
    }
}

/// A sub-range handed wholesale to one block of the local phase.
#[derive(Clone, Copy, Debug)]
pub struct LocalSeq {
    pub start: usize,
    pub length: usize,
    pub direction: Direction,
}

impl LocalSeq {
    /// Root local sequence covering the whole array; used when the input is
    /// short enough to skip the global phase entirely.
    pub fn root(length: usize) -> LocalSeq {
        LocalSeq {
            start: 0,
            length,
            direction: Direction::Primary,
        }
    }

    /// Projection of a host sequence spilling into the local phase.
    pub fn from_host(host: &HostSeq) -> LocalSeq {
        LocalSeq {
            start: host.start,
            length: host.length,
            direction: host.direction,
        }
    }
}
