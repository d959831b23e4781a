//! Slot storage for the ring buffer (§4.1).
//!
//! Each slot carries one tagged `AtomicU64` marker instead of a separate
//! "published" flag and "is this a timeout placeholder" flag: bit 0 is the
//! placeholder bit, the remaining bits hold `sequence + 1` (so `0` means
//! "never published", distinguishing it from sequence `0`). A consumer
//! reads the marker with `Acquire` and only then touches `value`, which
//! the producer wrote with a prior `Release` — one word carries the full
//! happens-before edge.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;

pub(super) struct Slot<E> {
    pub(super) marker: CachePadded<std::sync::atomic::AtomicU64>,
    pub(super) value: UnsafeCell<Option<E>>,
}

// SAFETY: `value` is written by the single producer before the marker's
// Release store, and only read by a consumer after observing that marker
// with Acquire — the atomic is the synchronization, not a lock.
unsafe impl<E: Send> Send for Slot<E> {}
unsafe impl<E: Send> Sync for Slot<E> {}

impl<E> Slot<E> {
    pub(super) fn empty() -> Self {
        Self {
            marker: CachePadded::new(std::sync::atomic::AtomicU64::new(0)),
            value: UnsafeCell::new(None),
        }
    }
}

#[inline]
pub(super) fn encode_marker(sequence: u64, placeholder: bool) -> u64 {
    ((sequence + 1) << 1) | placeholder as u64
}

/// Decodes a marker into `(sequence, is_placeholder)`, or `None` if the
/// slot has never been published (marker `0`).
#[inline]
pub(super) fn decode_marker(marker: u64) -> Option<(u64, bool)> {
    if marker == 0 {
        None
    } else {
        Some(((marker >> 1) - 1, marker & 1 == 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trips() {
        for seq in [0u64, 1, 2, 9_999, u64::MAX >> 2] {
            for placeholder in [false, true] {
                let m = encode_marker(seq, placeholder);
                assert_eq!(decode_marker(m), Some((seq, placeholder)));
            }
        }
    }

    #[test]
    fn zero_marker_is_unpublished() {
        assert_eq!(decode_marker(0), None);
    }
}
