//! Fixed geometry of the reserved address range.
//!
//! Everything here is known at compile time. The reservation is a flat
//! repetition of one enclave stride:
//!
//! ```text
//! +-------------+-------------+------------+------------+---------+------------+
//! | Small pool  | Medium pool | Large pool | Giant pool | Records | Block nodes|
//! |   512 MiB   |    8 GiB    |  160 GiB   |  256 GiB   | ~1.3 MiB|  ~168 MiB  |
//! +-------------+-------------+------------+------------+---------+------------+
//!  ... repeated once per enclave
//! ```
//!
//! The large and giant pools exist only as address space; nothing in the
//! crate ever commits a byte of them.

use std::mem;

use crate::pagelist::{BlockNode, PageRecord};

/// Hard cap on enclaves per process.
pub(crate) const MAX_ENCLAVES: usize = 32;

/// Size classes per pool.
pub(crate) const CLASS_CT: usize = 8;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Small classes go 8, 16, .. 64 bytes.
pub(crate) const SMALL_QUANTUM: usize = 8;
pub(crate) const SMALL_MAX: usize = SMALL_QUANTUM * CLASS_CT;
pub(crate) const SMALL_PAGE_SIZE: usize = 16 * KIB;
pub(crate) const SMALL_DIVISION_SIZE: usize = 64 * MIB;
pub(crate) const SMALL_POOL_SIZE: usize = CLASS_CT * SMALL_DIVISION_SIZE;
pub(crate) const SMALL_PAGES_PER_DIVISION: usize = SMALL_DIVISION_SIZE / SMALL_PAGE_SIZE;

/// Medium classes go 128, 256, .. 1024 bytes.
pub(crate) const MEDIUM_QUANTUM: usize = 128;
pub(crate) const MEDIUM_MAX: usize = MEDIUM_QUANTUM * CLASS_CT;
pub(crate) const MEDIUM_PAGE_SIZE: usize = 64 * KIB;
pub(crate) const MEDIUM_DIVISION_SIZE: usize = GIB;
pub(crate) const MEDIUM_POOL_SIZE: usize = CLASS_CT * MEDIUM_DIVISION_SIZE;
pub(crate) const MEDIUM_PAGES_PER_DIVISION: usize = MEDIUM_DIVISION_SIZE / MEDIUM_PAGE_SIZE;

/// Reserved for a future large band; never committed.
pub(crate) const LARGE_POOL_SIZE: usize = 160 * GIB;
/// Reserved for a future giant band; never committed.
pub(crate) const GIANT_POOL_SIZE: usize = 256 * GIB;

/// One record per page of both live pools.
pub(crate) const RECORD_CT_PER_ENCLAVE: usize =
    CLASS_CT * (SMALL_PAGES_PER_DIVISION + MEDIUM_PAGES_PER_DIVISION);
pub(crate) const RECORDS_REGION_SIZE: usize =
    RECORD_CT_PER_ENCLAVE * mem::size_of::<PageRecord>();

/// Sums blocks over the eight divisions of one pool.
const fn pool_node_ct(pages_per_division: usize, page_size: usize, quantum: usize) -> usize {
    let mut total = 0;
    let mut class = 0;
    while class < CLASS_CT {
        total += pages_per_division * (page_size / ((class + 1) * quantum));
        class += 1;
    }
    total
}

/// One node per block of both live pools.
pub(crate) const NODE_CT_PER_ENCLAVE: usize =
    pool_node_ct(SMALL_PAGES_PER_DIVISION, SMALL_PAGE_SIZE, SMALL_QUANTUM)
        + pool_node_ct(MEDIUM_PAGES_PER_DIVISION, MEDIUM_PAGE_SIZE, MEDIUM_QUANTUM);
pub(crate) const NODES_REGION_SIZE: usize = NODE_CT_PER_ENCLAVE * mem::size_of::<BlockNode>();

// Byte offsets of the sub-regions inside one enclave stride.
pub(crate) const MEDIUM_POOL_OFFSET: usize = SMALL_POOL_SIZE;
pub(crate) const LARGE_POOL_OFFSET: usize = MEDIUM_POOL_OFFSET + MEDIUM_POOL_SIZE;
pub(crate) const GIANT_POOL_OFFSET: usize = LARGE_POOL_OFFSET + LARGE_POOL_SIZE;
pub(crate) const RECORDS_OFFSET: usize = GIANT_POOL_OFFSET + GIANT_POOL_SIZE;
pub(crate) const NODES_OFFSET: usize = RECORDS_OFFSET + RECORDS_REGION_SIZE;

/// Bytes of address space one enclave occupies.
pub(crate) const ENCLAVE_STRIDE: usize = NODES_OFFSET + NODES_REGION_SIZE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_sizes() {
        assert_eq!(SMALL_POOL_SIZE, 512 * MIB);
        assert_eq!(MEDIUM_POOL_SIZE, 8 * GIB);
        assert_eq!(SMALL_PAGES_PER_DIVISION, 4096);
        assert_eq!(MEDIUM_PAGES_PER_DIVISION, 16384);
    }

    #[test]
    fn metadata_region_sizes() {
        assert_eq!(RECORD_CT_PER_ENCLAVE, 163_840);
        assert_eq!(RECORDS_REGION_SIZE, 1_310_720);

        // Hand-computed: small divisions hold 4096 pages of
        // 2048/1024/682/512/409/341/292/256 blocks, medium divisions hold
        // 16384 pages of 512/256/170/128/102/85/73/64 blocks.
        assert_eq!(
            NODE_CT_PER_ENCLAVE,
            4096 * (2048 + 1024 + 682 + 512 + 409 + 341 + 292 + 256)
                + 16384 * (512 + 256 + 170 + 128 + 102 + 85 + 73 + 64)
        );
    }

    #[test]
    fn sub_regions_stay_page_aligned() {
        // Every offset must be a multiple of the coarsest page size we
        // commit with, so no commit ever straddles a region boundary.
        for offset in [
            MEDIUM_POOL_OFFSET,
            LARGE_POOL_OFFSET,
            GIANT_POOL_OFFSET,
            RECORDS_OFFSET,
            NODES_OFFSET,
            ENCLAVE_STRIDE,
        ] {
            assert_eq!(offset % 4096, 0);
        }
    }
}
