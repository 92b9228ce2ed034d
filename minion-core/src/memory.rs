//! The collaborator interfaces through which the minion reaches memory.
//!
//! Address translation and physical memory belong to the surrounding system model. The decoder
//! only needs [`Mmu::translate`] and [`PhysicalMemory::fetch16`]; the cache operations
//! additionally need whole-line reads and writes, the cache-op permission check, and the L1
//! scratchpad clear.

use crate::cache::{CacheLine, LINE_SIZE};
use crate::minion::MinionId;
use std::fmt;
use thiserror::Error;

/// The kind of access an address is translated for.
///
/// The translation tables may grant different permissions to instruction fetches and to each of
/// the cache-management operations, so every translation names the operation it serves.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AccessType {
    /// An instruction fetch.
    Fetch,
    /// An evict, flush, lock or unlock by virtual address.
    CacheOp(CacheOp),
    /// A prefetch by virtual address.
    Prefetch(CacheOp),
}

/// Cache-management operation tags, used to select translation permissions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CacheOp {
    EvictL2,
    EvictL3,
    EvictMemory,
    FlushL2,
    FlushL3,
    FlushMemory,
    PrefetchL1,
    PrefetchL2,
    PrefetchL3,
    Lock,
    Unlock,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheOp::EvictL2 => "EvictL2",
            CacheOp::EvictL3 => "EvictL3",
            CacheOp::EvictMemory => "EvictMem",
            CacheOp::FlushL2 => "FlushL2",
            CacheOp::FlushL3 => "FlushL3",
            CacheOp::FlushMemory => "FlushMem",
            CacheOp::PrefetchL1 => "PrefetchL1",
            CacheOp::PrefetchL2 => "PrefetchL2",
            CacheOp::PrefetchL3 => "PrefetchL3",
            CacheOp::Lock => "Lock",
            CacheOp::Unlock => "Unlock",
        };
        f.write_str(name)
    }
}

/// Virtual to physical address translation, as seen by one hart.
pub trait Mmu {
    /// Translate `vaddr` for an access of kind `access`.
    ///
    /// Returns [`MemoryError::PageFault`] or [`MemoryError::AccessFault`] if the access is not
    /// permitted. Only the page-offset bits of `vaddr` are expected to carry over unchanged into
    /// the returned physical address.
    fn translate(&mut self, vaddr: u64, access: AccessType) -> Result<u64, MemoryError>;

    /// Returns `true` if the physical memory attributes of `paddr` allow the cache operation `op`.
    ///
    /// Used by operations that take a physical address directly and so bypass translation.
    fn check_cacheop_access(&self, paddr: u64, op: CacheOp) -> bool;
}

/// Physical memory, as reached from one minion.
///
/// Line accesses are always made with a `paddr` aligned to [`LINE_SIZE`].
pub trait PhysicalMemory {
    /// Fetch a little-endian 16-bit instruction parcel.
    fn fetch16(&mut self, paddr: u64) -> Result<u16, MemoryError>;

    /// Read a full cache line.
    fn read_line(&mut self, paddr: u64) -> Result<CacheLine, MemoryError>;

    /// Write a full cache line.
    fn write_line(&mut self, paddr: u64, line: &CacheLine) -> Result<(), MemoryError>;

    /// Zero the L1 scratchpad of `minion`, which happens whenever its scratchpad gets enabled.
    fn clear_l1_scratchpad(&mut self, minion: MinionId);
}

/// Align `address` down to the start of its cache line.
pub const fn line_base(address: u64) -> u64 {
    address & !(LINE_SIZE as u64 - 1)
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum MemoryError {
    #[error("page fault")]
    PageFault,
    #[error("access fault")]
    AccessFault,
    #[error("bus error")]
    BusError,
}

impl MemoryError {
    /// Returns `true` if the error was raised by the memory system rather than by translation.
    pub fn is_bus_error(&self) -> bool {
        matches!(self, MemoryError::BusError)
    }
}
