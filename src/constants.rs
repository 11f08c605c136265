//! Tuning constants for the two-phase parallel quicksort.
//!
//! The engine runs in two flavours: key-only (KO) sorts bare keys, key-value
//! (KV) carries an equally wide value payload alongside every key. KV moves
//! twice the data per element and needs twice the scratch per element in the
//! bitonic tail, so its thresholds are set separately from the KO ones.
//!
//! All constants are independent: tightening one does not require touching
//! the others, though `THRESHOLD_BITONIC_SORT_*` must stay at or below the
//! matching `THRESHOLD_PARTITION_GLOBAL_*`.

/// Arrays at or below this length have their min/max computed by a plain
/// sequential fold; longer arrays use the parallel block reduction.
pub const THRESHOLD_PARALLEL_REDUCTION: usize = 1 << 16;

/// Block width of the min/max reduction.
pub const THREADS_REDUCTION: usize = 128;
/// Elements each reduction thread folds before the block combines results.
pub const ELEMENTS_REDUCTION: usize = 64;

/// Sequences at or below this length leave the global phase and are handed
/// to the local phase, where a single block owns them end-to-end.
pub const THRESHOLD_PARTITION_GLOBAL_KO: usize = 1 << 13;
pub const THRESHOLD_PARTITION_GLOBAL_KV: usize = 1 << 12;

/// Block width of the global partition pass.
pub const THREADS_SORT_GLOBAL_KO: usize = 128;
pub const THREADS_SORT_GLOBAL_KV: usize = 128;
/// Elements each global-partition thread handles per stripe.
pub const ELEMENTS_GLOBAL_KO: usize = 8;
pub const ELEMENTS_GLOBAL_KV: usize = 4;

/// Block width of the local sort pass.
pub const THREADS_SORT_LOCAL_KO: usize = 128;
pub const THREADS_SORT_LOCAL_KV: usize = 128;

/// Sub-ranges at or below this length stop recursing and are finished by the
/// in-block bitonic network.
pub const THRESHOLD_BITONIC_SORT_KO: usize = 1 << 9;
pub const THRESHOLD_BITONIC_SORT_KV: usize = 1 << 8;

/// Sentinels seeding the min/max reduction.
pub const MIN_VAL: u32 = u32::MIN;
pub const MAX_VAL: u32 = u32::MAX;

/// Length threshold below which a sequence migrates to the local phase.
pub const fn partition_threshold(key_only: bool) -> usize {
    if key_only {
        THRESHOLD_PARTITION_GLOBAL_KO
    } else {
        THRESHOLD_PARTITION_GLOBAL_KV
    }
}

/// Elements a block claims per stripe in the global partition pass.
pub const fn stripe_elems(key_only: bool) -> usize {
    if key_only {
        THREADS_SORT_GLOBAL_KO * ELEMENTS_GLOBAL_KO
    } else {
        THREADS_SORT_GLOBAL_KV * ELEMENTS_GLOBAL_KV
    }
}

/// Length threshold below which the local phase switches to the bitonic tail.
pub const fn bitonic_threshold(key_only: bool) -> usize {
    if key_only {
        THRESHOLD_BITONIC_SORT_KO
    } else {
        THRESHOLD_BITONIC_SORT_KV
    }
}

/// Elements folded per block in the min/max reduction.
pub const fn reduction_chunk() -> usize {
    THREADS_REDUCTION * ELEMENTS_REDUCTION
}

/// Per-block scratch size for the local phase: the larger of the scan
/// counters (two per local thread) and the bitonic working set (doubled in
/// key-value mode, where values travel with keys).
pub const fn local_scratch_len(key_only: bool) -> usize {
    let threads = if key_only {
        THREADS_SORT_LOCAL_KO
    } else {
        THREADS_SORT_LOCAL_KV
    };
    let scan = 2 * threads;
    let slots_per_elem = if key_only { 1 } else { 2 };
    let bitonic = slots_per_elem * bitonic_threshold(key_only);
    if scan > bitonic {
        scan
    } else {
        bitonic
    }
}
