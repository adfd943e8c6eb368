use std::mem;
use std::ptr::NonNull;

use crate::error::{MemError, Result};
use crate::layout::{MEDIUM_MAX, MEDIUM_QUANTUM, SMALL_MAX, SMALL_QUANTUM};
use crate::pagelist::{ExpandError, PageList};
use crate::pool::Pool;

impl From<ExpandError> for MemError {
    fn from(_: ExpandError) -> Self {
        // A division with no pages left and a refused commit look the same
        // from the outside.
        MemError::OutOfMemory
    }
}

/// Block size of the class serving `size` bytes, or None above the largest
/// implemented class. `size` must be non-zero.
#[inline]
pub(crate) fn class_block_size(size: usize) -> Option<usize> {
    debug_assert!(size > 0);
    if size <= SMALL_MAX {
        Some(((size - 1) / SMALL_QUANTUM + 1) * SMALL_QUANTUM)
    } else if size <= MEDIUM_MAX {
        Some(((size - 1) / MEDIUM_QUANTUM + 1) * MEDIUM_QUANTUM)
    } else {
        None
    }
}

/// A lightweight handle onto one enclave's pools.
///
/// The handle is a value: copy it freely, every copy shares the same state,
/// and dropping one releases nothing. One enclave is single-threaded by
/// contract; different enclaves touch disjoint bytes and can run on
/// different threads at the same time.
#[derive(Clone, Copy)]
pub struct EnclaveAllocator {
    pub(crate) enclave: usize,
    pub(crate) small: NonNull<Pool>,
    pub(crate) medium: NonNull<Pool>,
}

// A handle may hop between threads as long as only one of them drives the
// enclave at a time, which is already the alloc/free safety contract.
unsafe impl Send for EnclaveAllocator {}

impl EnclaveAllocator {
    /// The enclave this handle is bound to.
    pub fn enclave(&self) -> usize {
        self.enclave
    }

    /// Hands out storage for `count` values of `T` from the division whose
    /// block size is the request rounded up to its class. The storage is
    /// aligned to at least `align_of::<T>()` and is *not* guaranteed to be
    /// zeroed: a fresh page reads as zeros, a recycled block keeps whatever
    /// its previous tenant wrote.
    ///
    /// Requests beyond the largest class (1024 bytes) fail with
    /// [`MemError::OutOfMemory`]; the large and giant bands are reserved in
    /// address space but not implemented.
    ///
    /// **SAFETY**: the caller must be the only thread currently using this
    /// enclave.
    pub unsafe fn alloc<T>(&self, count: usize) -> Result<NonNull<[T]>> {
        assert!(count > 0, "zero-length allocation");
        let size = count
            .checked_mul(mem::size_of::<T>())
            .ok_or(MemError::OutOfMemory)?;
        if size == 0 {
            // Zero-sized types need no storage.
            return Ok(NonNull::slice_from_raw_parts(NonNull::dangling(), count));
        }

        let list = match unsafe { self.division(size) } {
            Some(list) => list,
            None => return Err(MemError::OutOfMemory),
        };
        debug_assert_eq!(Some(list.block_size), class_block_size(size));
        debug_assert!(mem::align_of::<T>() <= list.block_size);

        let block = list.alloc_block()?;
        Ok(NonNull::slice_from_raw_parts(block.cast::<T>(), count))
    }

    /// Returns a slice handed out by [`Self::alloc`] to its division's free
    /// list. Never fails and never blocks.
    ///
    /// A slice longer than the largest class cannot have come from the live
    /// pools and is ignored, matching the unimplemented large and giant
    /// bands.
    ///
    /// **SAFETY**: `slice` must have been returned by this enclave's
    /// `alloc` with the same length, must not already be free, and the
    /// caller must be the only thread currently using this enclave.
    pub unsafe fn free<T>(&self, slice: NonNull<[T]>) {
        let size = slice.len() * mem::size_of::<T>();
        if size == 0 {
            return;
        }
        if size > MEDIUM_MAX {
            log::debug!("ignoring free of {size} bytes: beyond the largest implemented class");
            return;
        }

        if let Some(list) = unsafe { self.division(size) } {
            unsafe { list.free(slice.cast::<u8>()) };
        }
    }

    /// The division serving `size` bytes, or None above the medium band.
    ///
    /// **SAFETY**: caller must guarantee exclusive use of this enclave, as
    /// the returned reference mutates pool state owned by the process-wide
    /// bank.
    #[inline]
    unsafe fn division(&self, size: usize) -> Option<&mut PageList> {
        unsafe {
            if size <= SMALL_MAX {
                Some(&mut (*self.small.as_ptr()).lists[(size - 1) / SMALL_QUANTUM])
            } else if size <= MEDIUM_MAX {
                Some(&mut (*self.medium.as_ptr()).lists[(size - 1) / MEDIUM_QUANTUM])
            } else {
                None
            }
        }
    }
}
