//! The CSRs that trigger cache-management operations, and the layouts of the values written to
//! them.
//!
//! Every cache operation is started by a single CSR write. The 64-bit value packs all operands of
//! the operation; the by-address operations additionally take their stride from `x31`.

use super::{AddressWalk, CacheLevel, SetWayWalk};
use bitvec::{field::BitField, order::Lsb0, view::BitView};
use thiserror::Error;

/// General 12-bit value representing a CSR specifier.
pub type CsrSpecifier = u16;

/// The CSRs handled by [`CacheRequest::decode`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum CacheCsr {
    /// Cache mode of the minion.
    CacheControl = 0x7E0,
    EvictSetWay = 0x7F9,
    FlushSetWay = 0x7FB,
    LockSetWay = 0x7FD,
    UnlockSetWay = 0x7FF,
    /// Lane predicate of masked operations.
    TensorMask = 0x805,
    /// Accumulated non-fatal faults.
    TensorError = 0x808,
    PrefetchVirtual = 0x81F,
    EvictVirtual = 0x89F,
    FlushVirtual = 0x8BF,
    LockVirtual = 0x8DF,
    UnlockVirtual = 0x8FF,
}

impl CacheCsr {
    pub const fn specifier(self) -> CsrSpecifier {
        self as CsrSpecifier
    }
}

impl TryFrom<CsrSpecifier> for CacheCsr {
    type Error = UnknownCacheCsr;

    fn try_from(specifier: CsrSpecifier) -> Result<Self, Self::Error> {
        Ok(match specifier {
            0x7E0 => Self::CacheControl,
            0x7F9 => Self::EvictSetWay,
            0x7FB => Self::FlushSetWay,
            0x7FD => Self::LockSetWay,
            0x7FF => Self::UnlockSetWay,
            0x805 => Self::TensorMask,
            0x808 => Self::TensorError,
            0x81F => Self::PrefetchVirtual,
            0x89F => Self::EvictVirtual,
            0x8BF => Self::FlushVirtual,
            0x8DF => Self::LockVirtual,
            0x8FF => Self::UnlockVirtual,
            _ => return Err(UnknownCacheCsr(specifier)),
        })
    }
}

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
#[error("CSR {0:#05x} does not trigger a cache operation")]
pub struct UnknownCacheCsr(pub CsrSpecifier);

/// A decoded write to one of the [`CacheCsr`]s.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CacheRequest {
    WriteCacheControl(u64),
    WriteTensorMask(u64),
    WriteTensorError(u64),
    EvictSetWay { dest: CacheLevel, walk: SetWayWalk },
    FlushSetWay { dest: CacheLevel, walk: SetWayWalk },
    LockSetWay { way: usize, paddr: u64 },
    UnlockSetWay { set: usize, way: usize },
    EvictVirtual { dest: CacheLevel, walk: AddressWalk },
    FlushVirtual { dest: CacheLevel, walk: AddressWalk },
    PrefetchVirtual { dest: CacheLevel, walk: AddressWalk },
    LockVirtual { walk: AddressWalk },
    UnlockVirtual { walk: AddressWalk },
}

// Bit positions of the fields of the packed values.
mod idx {
    use std::ops::Range;

    pub const MASKED: usize = 63;
    pub const DEST: Range<usize> = 58..60;
    pub const COUNT: Range<usize> = 0..4;
    pub const LINE_ADDRESS: Range<usize> = 6..48;
    pub const SW_SET: Range<usize> = 14..18;
    pub const SW_WAY: Range<usize> = 6..8;
    pub const LOCK_SW_WAY: Range<usize> = 55..57;
    pub const LOCK_SW_PADDR: Range<usize> = 6..40;
    pub const UNLOCK_SW_WAY: Range<usize> = 55..63;
    pub const UNLOCK_SW_SET: Range<usize> = 6..10;
}

impl CacheRequest {
    /// Decode a write of `value` to CSR `csr`, made while `x31` holds `x31`.
    pub fn decode(csr: CsrSpecifier, value: u64, x31: u64) -> Result<Self, UnknownCacheCsr> {
        let bits = value.view_bits::<Lsb0>();
        let masked = bits[idx::MASKED];
        let dest = || CacheLevel::from_u2(bits[idx::DEST].load_le());
        let count = bits[idx::COUNT].load_le::<usize>() + 1;
        let set_way = || SetWayWalk {
            masked,
            set: bits[idx::SW_SET].load_le(),
            way: bits[idx::SW_WAY].load_le(),
            count,
        };
        let addresses = || AddressWalk {
            masked,
            vaddr: line_address(value),
            count,
            stride: line_address(x31),
        };

        Ok(match CacheCsr::try_from(csr)? {
            CacheCsr::CacheControl => Self::WriteCacheControl(value),
            CacheCsr::TensorMask => Self::WriteTensorMask(value),
            CacheCsr::TensorError => Self::WriteTensorError(value),
            CacheCsr::EvictSetWay => Self::EvictSetWay {
                dest: dest(),
                walk: set_way(),
            },
            CacheCsr::FlushSetWay => Self::FlushSetWay {
                dest: dest(),
                walk: set_way(),
            },
            CacheCsr::LockSetWay => Self::LockSetWay {
                way: bits[idx::LOCK_SW_WAY].load_le(),
                paddr: bits[idx::LOCK_SW_PADDR].load_le::<u64>() << idx::LOCK_SW_PADDR.start,
            },
            CacheCsr::UnlockSetWay => Self::UnlockSetWay {
                set: bits[idx::UNLOCK_SW_SET].load_le(),
                way: bits[idx::UNLOCK_SW_WAY].load_le(),
            },
            CacheCsr::EvictVirtual => Self::EvictVirtual {
                dest: dest(),
                walk: addresses(),
            },
            CacheCsr::FlushVirtual => Self::FlushVirtual {
                dest: dest(),
                walk: addresses(),
            },
            CacheCsr::PrefetchVirtual => Self::PrefetchVirtual {
                dest: dest(),
                walk: addresses(),
            },
            CacheCsr::LockVirtual => Self::LockVirtual { walk: addresses() },
            CacheCsr::UnlockVirtual => Self::UnlockVirtual { walk: addresses() },
        })
    }
}

/// Extract the line-aligned 48-bit address field of a packed value.
fn line_address(value: u64) -> u64 {
    value.view_bits::<Lsb0>()[idx::LINE_ADDRESS].load_le::<u64>() << idx::LINE_ADDRESS.start
}
