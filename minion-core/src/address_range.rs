use std::fmt;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A non-empty range in the 64-bit physical address space, bounded inclusively below and above.
///
/// Enforces the invariant that `self.start() <= self.end()`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AddressRange {
    start: u64,
    end: u64,
}

impl Display for AddressRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x}]", self.start, self.end)
    }
}

impl AddressRange {
    pub const fn new(start: u64, end: u64) -> Result<Self, InvalidBoundsError> {
        if start <= end {
            Ok(Self { start, end })
        } else {
            Err(InvalidBoundsError { start, end })
        }
    }

    /// Create the range of `size` bytes starting at `start`.
    ///
    /// Returns an error if `size == 0` or if the range would wrap past `u64::MAX`.
    pub const fn with_size(start: u64, size: u64) -> Result<Self, InvalidBoundsError> {
        let Some(delta) = size.checked_sub(1) else {
            return Err(InvalidBoundsError {
                start,
                end: start.wrapping_sub(1),
            });
        };
        match start.checked_add(delta) {
            Some(end) => Ok(Self { start, end }),
            None => Err(InvalidBoundsError {
                start,
                end: u64::MAX,
            }),
        }
    }

    pub const fn start(self) -> u64 {
        self.start
    }

    pub const fn end(self) -> u64 {
        self.end
    }

    /// Check if an address is contained within this address range.
    pub const fn contains(self, address: u64) -> bool {
        self.start <= address && address <= self.end
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("invalid address range bounds: start ({start:#x}) must not exceed end ({end:#x})")]
pub struct InvalidBoundsError {
    pub start: u64,
    pub end: u64,
}
