use std::fmt;

/// Errors surfaced by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// The OS refused the initial address range reservation
    OutOfAddressSpace,
    /// A page commit failed, a division ran out of pages, or the requested
    /// size is beyond the largest implemented class
    OutOfMemory,
    /// `startup` was called while a previous startup is still live
    AlreadyInitialized,
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfAddressSpace => write!(f, "address space reservation failed"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::AlreadyInitialized => write!(f, "allocator already initialized"),
        }
    }
}

impl std::error::Error for MemError {}

pub type Result<T> = std::result::Result<T, MemError>;
