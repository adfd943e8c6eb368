use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Virtual memory page size of the computer. This is usually 4096.
/// This value should be a constant, but we can't do that since we
/// don't know the value at compile time. Queried once, then cached.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// The low level side of the allocator. Here is where we manage the
/// memory syscalls as well as platform-dependant stuff. `Kernel` itself
/// carries no state: the whole reservation dance is
///
/// ```text
/// reserve(len) ---> a huge range, addressable but not backed
/// commit(p, n) ---> [p, p+n) becomes readable/writable, zero-filled
/// release(p)   ---> the range and every committed page inside it go away
/// ```
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. As the allocator, our top level view of this, has nothing
/// to do with the concrete implementations / APIs offered by each kernel.
trait PlatformMemory {
    /// Reserve a contiguous address range of `len` bytes without backing it.
    /// Returns a pointer to the range or None if the underlying syscall fails.
    unsafe fn reserve(len: usize) -> Option<NonNull<u8>>;

    /// Back `[addr, addr + len)` with real, zero-initialized memory.
    /// Both `addr` and `len` must be aligned to [`PlatformMemory::page_size`].
    /// Committing an already-committed page again is allowed and keeps
    /// its contents.
    unsafe fn commit(addr: *mut u8, len: usize) -> bool;

    /// Undo a reservation, giving `len` bytes starting at `addr` back to the
    /// kernel together with everything committed inside them.
    unsafe fn release(addr: *mut u8, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Wrapper to calculate the computer's page size.
#[inline]
pub(crate) fn page_size() -> usize {
    let mut size = PAGE_SIZE.load(Ordering::Relaxed);
    if size == 0 {
        size = unsafe { Kernel::page_size() };
        PAGE_SIZE.store(size, Ordering::Relaxed);
    }
    size
}

/// Wrapper to use [`Kernel::reserve`]
#[inline]
pub(crate) unsafe fn reserve(len: usize) -> Option<NonNull<u8>> {
    unsafe { Kernel::reserve(len) }
}

/// Wrapper to use [`Kernel::commit`]
#[inline]
pub(crate) unsafe fn commit(addr: *mut u8, len: usize) -> bool {
    debug_assert!(addr as usize % page_size() == 0);
    debug_assert!(len % page_size() == 0);
    unsafe { Kernel::commit(addr, len) }
}

/// Wrapper to use [`Kernel::release`]
#[inline]
pub(crate) unsafe fn release(addr: *mut u8, len: usize) {
    unsafe { Kernel::release(addr, len) }
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, mprotect, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for Kernel {
        unsafe fn reserve(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // No access at all until a page is committed.
            const PROT: c_int = libc::PROT_NONE;
            // MAP_NORESERVE keeps multi-terabyte reservations from counting
            // against the overcommit accounting.
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => Some(NonNull::new_unchecked(addr).cast::<u8>()),
                }
            }
        }

        unsafe fn commit(addr: *mut u8, len: usize) -> bool {
            // Fresh anonymous pages are zero-filled on first touch; pages
            // that were already readable/writable keep their contents.
            unsafe {
                mprotect(
                    addr as *mut c_void,
                    len as size_t,
                    libc::PROT_READ | libc::PROT_WRITE,
                ) == 0
            }
        }

        unsafe fn release(addr: *mut u8, len: usize) {
            unsafe {
                munmap(addr as *mut c_void, len as size_t);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use crate::kernel::{Kernel, PlatformMemory};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Kernel {
        unsafe fn reserve(len: usize) -> Option<NonNull<u8>> {
            unsafe {
                let addr =
                    Memory::VirtualAlloc(None, len, Memory::MEM_RESERVE, Memory::PAGE_NOACCESS);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn commit(addr: *mut u8, len: usize) -> bool {
            unsafe {
                let addr = Memory::VirtualAlloc(
                    Some(addr as *const c_void),
                    len,
                    Memory::MEM_COMMIT,
                    Memory::PAGE_READWRITE,
                );

                !addr.is_null()
            }
        }

        unsafe fn release(addr: *mut u8, _len: usize) {
            unsafe {
                let _ = Memory::VirtualFree(addr as *mut c_void, 0, Memory::MEM_RELEASE);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
