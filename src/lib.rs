//! Pagepool is a segregated-fit, paged memory allocator. One enormous
//! contiguous address range is reserved up front and fixed-size blocks are
//! handed out from per-enclave, per-size-class pools, so allocations in
//! different enclaves never contend and tearing a subsystem down is cheap.
//!
//! The reservation is carved like this, once per enclave:
//!
//! ```text
//! +-------------+-------------+------------+------------+---------+-------------+
//! | Small pool  | Medium pool | Large pool | Giant pool | Records | Block nodes |
//! | 8 classes   | 8 classes   | (reserved) | (reserved) |  page   |  free-list  |
//! | 8..64 B     | 128..1024 B |            |            |  state  |   threads   |
//! +-------------+-------------+------------+------------+---------+-------------+
//! ```
//!
//! Each size class owns a division of its pool and commits OS pages lazily,
//! one at a time, threading the fresh blocks onto an index-based free list
//! kept out-of-band in the node region:
//!
//! ```text
//!     free_block                 Next free block
//!         +--------------------------+  +---------+
//!         |                          |  |         |
//! +-------|-----+      +-------+   +-|--|-+   +---|---+
//! | PageList    |      | Block |   | Free |   | Free  |   ... NO_BLOCK
//! +-------------+      +-------+   +------+   +-------+
//!                        in use     threaded through BlockNode indices
//! ```
//!
//! Allocation and free are O(1) with no locks and no syscalls outside of
//! page expansion. An enclave is single-threaded by contract; distinct
//! enclaves touch disjoint bytes and can run in parallel.
//!
//! ```no_run
//! use pagepool::{get_allocator, shutdown, startup};
//!
//! fn main() -> pagepool::Result<()> {
//!     startup(2)?;
//!
//!     let frame = get_allocator(0);
//!     unsafe {
//!         let samples = frame.alloc::<u32>(12)?;
//!         // ... fill and use the slice ...
//!         frame.free(samples);
//!     }
//!
//!     unsafe { shutdown() };
//!     Ok(())
//! }
//! ```

mod enclave;
mod error;
mod kernel;
mod layout;
mod pagelist;
mod pool;
pub mod stats;
mod system;
mod utils;

pub use enclave::EnclaveAllocator;
pub use error::{MemError, Result};
pub use system::{get_allocator, shutdown, startup};

/// Shared scaffolding for the in-crate tests: the process-wide state is
/// started once for the whole test binary and every test gets a private
/// enclave, so tests stay safe on parallel threads.
#[cfg(test)]
pub(crate) mod testkit {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Once;

    use crate::layout::MAX_ENCLAVES;

    static INIT: Once = Once::new();
    static NEXT_ENCLAVE: AtomicUsize = AtomicUsize::new(0);

    pub(crate) fn fresh_enclave() -> crate::EnclaveAllocator {
        INIT.call_once(|| crate::startup(MAX_ENCLAVES).expect("test startup"));
        let enclave = NEXT_ENCLAVE.fetch_add(1, Ordering::Relaxed);
        assert!(enclave < MAX_ENCLAVES, "test binary ran out of enclaves");
        crate::get_allocator(enclave)
    }
}
