use std::ptr::NonNull;

use crate::layout::CLASS_CT;
use crate::pagelist::{BlockNode, PageList, PageRecord};

/// One size band of an enclave: a contiguous address range split into
/// [`CLASS_CT`] equally sized divisions, one per size class.
///
/// ```text
/// base
///  |  division 0   division 1          division 7
///  +--------------+--------------+ .. +--------------+
///  |  blocks of   |  blocks of   |    |  blocks of   |
///  |  1 * quantum |  2 * quantum |    |  8 * quantum |
///  +--------------+--------------+ .. +--------------+
/// ```
pub(crate) struct Pool {
    pub(crate) lists: [PageList; CLASS_CT],
}

impl Pool {
    /// Carves `base .. base + CLASS_CT * division_size` into one division
    /// per class and binds each division's metadata, advancing the shared
    /// record and node cursors past what this pool consumed.
    ///
    /// **SAFETY**: `base` must point at a reserved range large enough for
    /// all divisions; the cursors must point at committed record storage and
    /// reserved node storage for every page and block of this pool.
    pub(crate) unsafe fn new(
        base: NonNull<u8>,
        quantum: usize,
        page_size: usize,
        division_size: usize,
        records: &mut *mut PageRecord,
        nodes: &mut *mut BlockNode,
    ) -> Self {
        let pages_per_division = division_size / page_size;

        let lists = std::array::from_fn(|class| {
            let block_size = (class + 1) * quantum;

            unsafe {
                let bytes = NonNull::new_unchecked(base.as_ptr().add(class * division_size));
                let list = PageList::new(
                    bytes,
                    NonNull::new_unchecked(*records),
                    NonNull::new_unchecked(*nodes),
                    block_size,
                    page_size,
                    pages_per_division,
                );

                *records = records.add(pages_per_division);
                *nodes = nodes.add(pages_per_division * (page_size / block_size));

                list
            }
        });

        Self { lists }
    }
}
