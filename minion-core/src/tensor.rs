//! The per-hart tensor CSRs that cache-management operations interact with.

use bitvec::{order::Lsb0, view::BitView};
use std::fmt;

/// A non-fatal fault reported through the `tensor_error` CSR, named by its bit position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum TensorFault {
    /// A tensor load requested an unsupported transform.
    LoadTransform = 1,
    /// A credit counter overflowed.
    CreditOverflow = 3,
    /// A scratchpad access was made while the scratchpad is disabled.
    ScratchpadDisabled = 4,
    /// A lock was refused: double lock, or no way left to lock.
    LockConflict = 5,
    /// A tensor load found an inconsistent setup.
    LoadSetup = 6,
    /// A cache operation faulted, or targeted a line it may not touch.
    CacheOpFault = 7,
    /// A tensor store faulted.
    TensorStore = 8,
    /// A tensor reduction faulted.
    Reduce = 9,
}

impl TensorFault {
    const ALL: [Self; 8] = [
        Self::LoadTransform,
        Self::CreditOverflow,
        Self::ScratchpadDisabled,
        Self::LockConflict,
        Self::LoadSetup,
        Self::CacheOpFault,
        Self::TensorStore,
        Self::Reduce,
    ];

    /// The bit index of this fault in the `tensor_error` CSR.
    pub const fn bit(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Self::LoadTransform => "tensor load transform",
            Self::CreditOverflow => "credit counter overflow",
            Self::ScratchpadDisabled => "scratchpad disabled",
            Self::LockConflict => "lock conflict",
            Self::LoadSetup => "tensor load setup",
            Self::CacheOpFault => "cache operation fault",
            Self::TensorStore => "tensor store",
            Self::Reduce => "reduce",
        };
        f.write_str(description)
    }
}

/// The `tensor_error` CSR.
///
/// Faults accumulate: raising one never clears another, and nothing but an explicit CSR write
/// (or [`clear`](Self::clear)) lowers a bit.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct TensorError(u16);

impl TensorError {
    /// Bits that a CSR write can set.
    const WRITE_MASK: u16 = 0x03FF;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn read(&self) -> u64 {
        u64::from(self.0)
    }

    pub fn write(&mut self, value: u64) {
        self.0 = value as u16 & Self::WRITE_MASK;
    }

    pub fn raise(&mut self, fault: TensorFault) {
        self.0.view_bits_mut::<Lsb0>().set(fault.bit(), true);
    }

    pub fn is_raised(&self, fault: TensorFault) -> bool {
        self.0.view_bits::<Lsb0>()[fault.bit()]
    }

    /// Iterate over the raised faults, in bit order.
    pub fn raised(&self) -> impl Iterator<Item = TensorFault> + '_ {
        TensorFault::ALL
            .into_iter()
            .filter(move |fault| self.is_raised(*fault))
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_clear(&self) -> bool {
        self.0 == 0
    }
}

/// The `tensor_mask` CSR: one predicate bit per iteration of a masked multi-line operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TensorMask(u16);

impl Default for TensorMask {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorMask {
    /// The number of iterations a mask can predicate.
    pub const LANES: usize = u16::BITS as usize;

    /// A mask that lets every iteration pass.
    pub const fn new() -> Self {
        Self(0xFFFF)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn read(&self) -> u64 {
        u64::from(self.0)
    }

    pub fn write(&mut self, value: u64) {
        self.0 = value as u16;
    }

    /// Returns `true` if iteration `index` of a masked operation should be performed.
    ///
    /// Iterations past [`LANES`](Self::LANES) never pass.
    pub fn passes(&self, index: usize) -> bool {
        self.0
            .view_bits::<Lsb0>()
            .get(index)
            .map_or(false, |bit| *bit)
    }
}
