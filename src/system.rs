use std::cell::UnsafeCell;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::enclave::EnclaveAllocator;
use crate::error::{MemError, Result};
use crate::kernel;
use crate::layout::{
    ENCLAVE_STRIDE, MAX_ENCLAVES, MEDIUM_DIVISION_SIZE, MEDIUM_PAGE_SIZE, MEDIUM_POOL_OFFSET,
    MEDIUM_QUANTUM, NODES_OFFSET, RECORDS_OFFSET, RECORDS_REGION_SIZE, SMALL_DIVISION_SIZE,
    SMALL_PAGE_SIZE, SMALL_QUANTUM,
};
use crate::pagelist::{BlockNode, PageRecord};
use crate::pool::Pool;
use crate::stats;

/// Everything `startup` builds: the reservation plus the per-enclave pool
/// bank. Pools sit in `UnsafeCell`s because handles mutate them through
/// shared references to this one `System`.
struct System {
    base: NonNull<u8>,
    enclave_ct: usize,
    small: Box<[UnsafeCell<Pool>]>,
    medium: Box<[UnsafeCell<Pool>]>,
}

// The pool bank is only ever driven through EnclaveAllocator handles, whose
// contract confines each enclave to one thread at a time.
unsafe impl Sync for System {}
unsafe impl Send for System {}

/// One-shot global: null until `startup`, null again after `shutdown`.
static SYSTEM: AtomicPtr<System> = AtomicPtr::new(ptr::null_mut());

/// Reserves the whole address range and carves out every enclave's pools.
/// Must run before any allocation; at most one startup can be live at a
/// time.
///
/// # Errors
///
/// - [`MemError::OutOfAddressSpace`] if the OS refuses the reservation.
/// - [`MemError::OutOfMemory`] if the records regions cannot be committed.
/// - [`MemError::AlreadyInitialized`] if a previous startup is still live.
pub fn startup(enclave_ct: usize) -> Result<()> {
    assert!(enclave_ct > 0, "at least one enclave");
    assert!(enclave_ct <= MAX_ENCLAVES, "at most {MAX_ENCLAVES} enclaves");
    assert!(
        SMALL_PAGE_SIZE % kernel::page_size() == 0,
        "unsupported OS page size"
    );

    if !SYSTEM.load(Ordering::Acquire).is_null() {
        return Err(MemError::AlreadyInitialized);
    }

    let total = enclave_ct * ENCLAVE_STRIDE;
    let base = unsafe { kernel::reserve(total) }.ok_or(MemError::OutOfAddressSpace)?;

    let mut small = Vec::with_capacity(enclave_ct);
    let mut medium = Vec::with_capacity(enclave_ct);

    for enclave in 0..enclave_ct {
        let enclave_base = unsafe { base.as_ptr().add(enclave * ENCLAVE_STRIDE) };

        // Page records are small and index-critical, so they are committed
        // up front; the zero fill is immediately overwritten by the page
        // chains. Node storage stays uncommitted until pages need it.
        let records_ok =
            unsafe { kernel::commit(enclave_base.add(RECORDS_OFFSET), RECORDS_REGION_SIZE) };
        if !records_ok {
            unsafe { kernel::release(base.as_ptr(), total) };
            return Err(MemError::OutOfMemory);
        }

        let mut records = unsafe { enclave_base.add(RECORDS_OFFSET) }.cast::<PageRecord>();
        let mut nodes = unsafe { enclave_base.add(NODES_OFFSET) }.cast::<BlockNode>();

        unsafe {
            small.push(UnsafeCell::new(Pool::new(
                NonNull::new_unchecked(enclave_base),
                SMALL_QUANTUM,
                SMALL_PAGE_SIZE,
                SMALL_DIVISION_SIZE,
                &mut records,
                &mut nodes,
            )));
            medium.push(UnsafeCell::new(Pool::new(
                NonNull::new_unchecked(enclave_base.add(MEDIUM_POOL_OFFSET)),
                MEDIUM_QUANTUM,
                MEDIUM_PAGE_SIZE,
                MEDIUM_DIVISION_SIZE,
                &mut records,
                &mut nodes,
            )));

            // Both cursors must land exactly on their region boundaries.
            debug_assert_eq!(
                records.cast::<u8>(),
                enclave_base.add(NODES_OFFSET),
            );
            debug_assert_eq!(
                nodes.cast::<u8>(),
                enclave_base.add(ENCLAVE_STRIDE),
            );
        }
    }

    let system = Box::into_raw(Box::new(System {
        base,
        enclave_ct,
        small: small.into_boxed_slice(),
        medium: medium.into_boxed_slice(),
    }));

    if SYSTEM
        .compare_exchange(ptr::null_mut(), system, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        // Lost the race against a concurrent startup; hand everything back.
        unsafe {
            drop(Box::from_raw(system));
            kernel::release(base.as_ptr(), total);
        }
        return Err(MemError::AlreadyInitialized);
    }

    stats::TOTAL_RESERVED.fetch_add(total, Ordering::Relaxed);
    stats::TOTAL_COMMITTED.fetch_add(enclave_ct * RECORDS_REGION_SIZE, Ordering::Relaxed);

    log::debug!(
        "reserved {} GiB for {enclave_ct} enclave(s) at {:p}",
        total >> 30,
        base.as_ptr()
    );
    Ok(())
}

/// Releases the reservation and every committed page inside it.
///
/// **SAFETY**: no allocation obtained from any enclave may be used after
/// this call, no handle may be used again, and no other thread may be inside
/// `alloc`/`free` while this runs.
pub unsafe fn shutdown() {
    let system = SYSTEM.swap(ptr::null_mut(), Ordering::AcqRel);
    if system.is_null() {
        return;
    }

    let system = unsafe { Box::from_raw(system) };
    let total = system.enclave_ct * ENCLAVE_STRIDE;
    unsafe { kernel::release(system.base.as_ptr(), total) };

    stats::sub_saturating(&stats::TOTAL_RESERVED, total);
    // One reservation per process, so everything committed went with it.
    stats::TOTAL_COMMITTED.store(0, Ordering::Relaxed);

    log::debug!("released {} GiB of address space", total >> 30);
}

/// Builds a handle for `enclave`. Panics if `startup` has not run or the
/// id is out of range.
pub fn get_allocator(enclave: usize) -> EnclaveAllocator {
    let system = SYSTEM.load(Ordering::Acquire);
    assert!(!system.is_null(), "allocator startup has not run");

    let system = unsafe { &*system };
    assert!(
        enclave < system.enclave_ct,
        "enclave {enclave} out of range, {} configured",
        system.enclave_ct
    );

    unsafe {
        EnclaveAllocator {
            enclave,
            small: NonNull::new_unchecked(system.small[enclave].get()),
            medium: NonNull::new_unchecked(system.medium[enclave].get()),
        }
    }
}
