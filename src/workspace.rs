//! Buffer management for one sort.
//!
//! A [`Workspace`] owns every array the engine touches: the primary key and
//! value buffers the input is staged into, the opposite buffers the sorted
//! result accumulates in, and the staging buffer for pivot values in
//! key-value mode. Everything is allocated once, at worst-case size, when
//! the sort starts.
//!
//! During a pass the buffers are shared across worker blocks. Blocks access
//! them through `&[AtomicU32]` views with relaxed loads and stores; the
//! partition logic guarantees every location is written by at most one block
//! per pass.

use std::sync::atomic::AtomicU32;

use crate::constants::{
    stripe_elems, THRESHOLD_PARTITION_GLOBAL_KO, THRESHOLD_PARTITION_GLOBAL_KV,
};
use crate::sequence::Direction;

/// All buffers for one sort, keyed by ping-pong [`Direction`].
pub struct Workspace {
    /// Primary keys; holds a copy of the input.
    pub keys: Vec<u32>,
    /// Opposite key buffer; the sorted keys accumulate here.
    pub keys_buffer: Vec<u32>,
    /// Primary values (key-value mode only).
    pub values: Option<Vec<u32>>,
    /// Opposite value buffer (key-value mode only).
    pub values_buffer: Option<Vec<u32>>,
    /// Staging area for values tied to the pivot. Duplicate keys can tie
    /// against the pivot, and the pivot run's final position is unknown
    /// until the last block of a sequence finishes, so the values park here
    /// in the meantime.
    pub values_pivot: Option<Vec<u32>>,
}

impl Workspace {
    /// Stages the input and allocates every buffer at full size.
    pub fn new(keys: &[u32], values: Option<&[u32]>) -> Workspace {
        let n = keys.len();
        Workspace {
            keys: keys.to_vec(),
            keys_buffer: vec![0; n],
            values: values.map(|v| v.to_vec()),
            values_buffer: values.map(|_| vec![0; n]),
            values_pivot: values.map(|_| vec![0; n]),
        }
    }

    #[inline]
    pub fn key_only(&self) -> bool {
        self.values.is_none()
    }

    /// Atomic view of the key buffer a direction selects.
    #[inline]
    pub fn keys_atomic(&self, direction: Direction) -> &[AtomicU32] {
        match direction {
            Direction::Primary => atomic_view(&self.keys),
            Direction::Buffer => atomic_view(&self.keys_buffer),
        }
    }

    /// Atomic views of all three value buffers, or `None` in key-only mode.
    pub fn value_views(&self) -> Option<ValueViews<'_>> {
        match (&self.values, &self.values_buffer, &self.values_pivot) {
            (Some(primary), Some(buffer), Some(staged)) => Some(ValueViews {
                primary: atomic_view(primary),
                buffer: atomic_view(buffer),
                staged: atomic_view(staged),
            }),
            _ => None,
        }
    }
}

/// Atomic views of the value buffers for one pass.
#[derive(Clone, Copy)]
pub struct ValueViews<'a> {
    pub primary: &'a [AtomicU32],
    pub buffer: &'a [AtomicU32],
    pub staged: &'a [AtomicU32],
}

impl ValueViews<'_> {
    /// The value buffer a direction selects.
    #[inline]
    pub fn get(&self, direction: Direction) -> &[AtomicU32] {
        match direction {
            Direction::Primary => self.primary,
            Direction::Buffer => self.buffer,
        }
    }
}

/// Reinterprets a shared slice as atomics so concurrent blocks can scatter
/// into disjoint claimed ranges of it.
#[inline]
fn atomic_view(data: &[u32]) -> &[AtomicU32] {
    // SAFETY: AtomicU32 has the same size and alignment as u32, and every
    // access that can race goes through this view.
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const AtomicU32, data.len()) }
}

/// Upper bound on sequences the global phase can have in flight at once.
/// Splitting stops once the host queue reaches `len / threshold`, and each
/// stopped sequence can still fork two children on its final pass.
pub fn max_num_sequences(array_length: usize) -> usize {
    let min_threshold = THRESHOLD_PARTITION_GLOBAL_KO.min(THRESHOLD_PARTITION_GLOBAL_KV);
    2 * ((array_length - 1) / min_threshold + 1)
}

/// Upper bound on blocks a single global pass can launch.
pub fn max_num_blocks(array_length: usize) -> usize {
    let max_threshold = THRESHOLD_PARTITION_GLOBAL_KO.max(THRESHOLD_PARTITION_GLOBAL_KV);
    let min_stripe = stripe_elems(true).min(stripe_elems(false));
    max_num_sequences(array_length) * ((max_threshold - 1) / min_stripe + 1)
}
