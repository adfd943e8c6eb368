//! Process-wide memory gauges.
//!
//! Two numbers tell the whole story of this allocator's footprint: how much
//! address space the reservation spans and how much of it is actually backed
//! by committed pages. Both are plain relaxed counters; they are monitoring
//! data, not synchronization.

use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) static TOTAL_RESERVED: AtomicUsize = AtomicUsize::new(0);
pub(crate) static TOTAL_COMMITTED: AtomicUsize = AtomicUsize::new(0);

/// Bytes of address space currently reserved.
pub fn reserved_bytes() -> usize {
    TOTAL_RESERVED.load(Ordering::Relaxed)
}

/// Bytes currently backed by committed pages (data pages plus metadata).
pub fn committed_bytes() -> usize {
    TOTAL_COMMITTED.load(Ordering::Relaxed)
}

/// Subtract without wrapping if the gauge drifted low.
pub(crate) fn sub_saturating(gauge: &AtomicUsize, amount: usize) {
    let mut current = gauge.load(Ordering::Relaxed);
    loop {
        let next = current.saturating_sub(amount);
        match gauge.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}
