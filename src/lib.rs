//! Massively parallel quicksort over `u32` keys and key-value pairs.
//!
//! The engine partitions in two phases, mirroring how a GPU grid would run
//! it, with worker blocks scheduled on a thread pool:
//!
//! 1. **Global phase**: many blocks cooperate on one large sequence. Blocks
//!    work-steal stripes of the sequence, count keys below and above the
//!    pivot, claim contiguous output ranges with single atomic adds, and
//!    scatter into the opposite buffer. The last block to finish writes the
//!    run of pivot-equal keys into the gap between the two partitions.
//! 2. **Local phase**: each remaining sequence is owned end-to-end by one
//!    block, which recurses over an explicit frame stack and finishes small
//!    sub-ranges with an in-block bitonic network.
//!
//! ## Pivot selection
//!
//! Pivots are not sampled. An initial min/max reduction brackets the input,
//! every partition narrows the bracket of both children exactly, and the
//! pivot is always the bracket midpoint. The bracket halves every level, so
//! recursion depth is bounded by the key width even on adversarial inputs;
//! a collapsed bracket (`min == max`) means the run is constant and already
//! sorted, which is also how a constant input short-circuits the whole sort.
//!
//! ## Buffers
//!
//! Partition levels ping-pong between a primary and an opposite buffer pair.
//! Final writes (pivot runs, bitonic tails, constant runs) always target
//! the opposite pair, where the sorted result accumulates.
//!
//! ## Example
//!
//! ```
//! use parallel_quicksort::{sort_keys, SortOrder};
//!
//! let mut keys = vec![4u32, 2, 7, 2, 9];
//! sort_keys(&mut keys, SortOrder::Ascending).unwrap();
//! assert_eq!(keys, vec![2, 2, 4, 7, 9]);
//! ```

pub mod constants;
pub mod global_partition;
pub mod local_sort;
pub mod quicksort;
pub mod reduction;
pub mod sequence;
pub mod workspace;

pub use quicksort::{sort_keys, sort_pairs};
pub use sequence::SortOrder;
