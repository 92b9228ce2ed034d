//! The L1 data cache of a minion, as far as cache-management operations can observe it.
//!
//! Cache contents are not modeled. What is modeled is the state software can rely on: which
//! (set, way) entries are locked, to which physical line, and the cache mode that decides how
//! physical addresses map onto sets. The operations themselves live in [`CacheController`].
//!
//! The cache has [`NUM_SETS`] sets of [`NUM_WAYS`] ways, each holding one [`LINE_SIZE`]-byte line.
//! At most [`MAX_LOCKED_WAYS`] ways of a set can be locked, so every set keeps one way for
//! ordinary replacement.

pub mod csr;
mod lock_table;
mod ops;

use crate::address_range::AddressRange;
use crate::tensor::TensorMask;
use bitvec::{order::Lsb0, view::BitView};
use std::fmt;

pub use lock_table::LockTable;
pub use ops::{AddressWalk, CacheController, SetWayWalk};

/// The number of sets in the L1 data cache.
pub const NUM_SETS: usize = 16;

/// The number of ways in each set.
pub const NUM_WAYS: usize = 4;

/// The size of a cache line in bytes.
pub const LINE_SIZE: usize = 64;

/// The maximum number of ways that can be locked in a single set.
pub const MAX_LOCKED_WAYS: usize = NUM_WAYS - 1;

/// The number of sets at the top of the cache that are reserved for hardware use, and keep their
/// locks when only the scratchpad is enabled or disabled.
pub const RESERVED_SETS: usize = 2;

/// The maximum repeat count of a multi-line cache operation.
pub const MAX_REPEAT: usize = 16;

/// The number of harts sharing one minion, and thus one L1 data cache.
pub const HARTS_PER_MINION: usize = 2;

/// The contents of one cache line.
pub type CacheLine = [u8; LINE_SIZE];

/// The physical window of the L2 scratchpad. Lines locked at these addresses may not be pushed
/// past the L2.
pub const SCRATCHPAD_REGION: AddressRange = match AddressRange::with_size(0x8000_0000, 1 << 31) {
    Ok(range) => range,
    Err(_) => panic!("invalid scratchpad region"),
};

const_assert!(MAX_LOCKED_WAYS < NUM_WAYS);
const_assert!(RESERVED_SETS < NUM_SETS);
const_assert!(LINE_SIZE.is_power_of_two());
const_assert!(NUM_SETS.is_power_of_two());
const_assert!(MAX_REPEAT <= TensorMask::LANES);
// Split mode gives each hart half of the sets, scratchpad mode two sets each
const_assert_eq!(NUM_SETS, 8 * HARTS_PER_MINION);
const_assert_eq!(NUM_SETS - RESERVED_SETS, 12 + 2 * (HARTS_PER_MINION - 1));

/// Returns `true` if `paddr` lies in the L2 scratchpad window.
pub fn is_scratchpad_address(paddr: u64) -> bool {
    SCRATCHPAD_REGION.contains(paddr)
}

/// The level of the memory hierarchy that a cache operation pushes lines to, or pulls lines into.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CacheLevel {
    L1 = 0,
    L2 = 1,
    L3 = 2,
    Memory = 3,
}

impl CacheLevel {
    /// Convert a 2-bit destination field into a cache level.
    ///
    /// Panics if the value doesn't fit.
    pub fn from_u2(value: u8) -> Self {
        match value {
            0 => Self::L1,
            1 => Self::L2,
            2 => Self::L3,
            3 => Self::Memory,
            _ => panic!("out of range u2 used"),
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::Memory => "Mem",
        };
        f.write_str(name)
    }
}

/// The cache mode of a minion, as held in the low two bits of `mcache_control`.
///
/// Bit 0 splits the cache between the two harts (and makes every line lockable by its hart),
/// bit 1 turns part of the cache into the L1 scratchpad. The scratchpad requires the split, so
/// `0b10` is never a valid mode.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CacheMode(u8);

impl CacheMode {
    // Bit indices for the fields of the cache mode.
    const SPLIT: usize = 0;
    const SCRATCHPAD: usize = 1;

    /// Both harts share all sets.
    pub const SHARED: Self = Self(0b00);
    /// Each hart owns half of the sets.
    pub const SPLIT_MODE: Self = Self(0b01);
    /// Each hart owns two sets, the rest of the cache is scratchpad.
    pub const SCRATCHPAD_MODE: Self = Self(0b11);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_split(&self) -> bool {
        self.0.view_bits::<Lsb0>()[Self::SPLIT]
    }

    pub fn scratchpad_enabled(&self) -> bool {
        self.0.view_bits::<Lsb0>()[Self::SCRATCHPAD]
    }

    /// Returns the mode that a write of `value` to `mcache_control` switches to, or `None` if
    /// the write is ignored.
    ///
    /// From the shared mode only the split mode can be reached. From the split and scratchpad
    /// modes any valid mode can be reached.
    pub fn legalize_write(&self, value: u64) -> Option<Self> {
        let requested = Self(value as u8 & 0b11);
        let accepted = if *self == Self::SHARED {
            requested == Self::SPLIT_MODE
        } else {
            requested.0 != 0b10
        };
        accepted.then_some(requested)
    }

    /// Returns the set that line `paddr` maps to, for the hart with index `hart_in_minion`
    /// within its minion.
    pub fn set_index(&self, paddr: u64, hart_in_minion: usize) -> usize {
        let line = (paddr / LINE_SIZE as u64) as usize;
        if self.scratchpad_enabled() {
            12 + 2 * hart_in_minion + line % 2
        } else if self.is_split() {
            8 * hart_in_minion + line % 8
        } else {
            line % NUM_SETS
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04b}", self.0)
    }
}

/// The cache state shared by the harts of one minion.
#[derive(Debug, Clone, Default)]
pub struct MinionCache {
    mode: CacheMode,
    locks: LockTable,
}

impl MinionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }
}
