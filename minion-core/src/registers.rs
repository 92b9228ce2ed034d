//! Register specifiers as they appear in encoded instructions.
//!
//! The minion has three register files that instructions can name: 32 integer `x` registers,
//! 32 floating point `f` registers (each 256 bits wide, holding 8 packed singles), and 8 mask `m`
//! registers. Only the specifiers live here; register state belongs to the execution engine.

use core::fmt;
use std::fmt::Formatter;

/// The type of a single `x` register.
pub type X = u64;

/// The bit width of the `x` registers.
pub const XLEN: u32 = X::BITS;

/// The number of `x` and `f` registers available (indices start at `0`).
pub const LEN: u8 = 32;

/// The number of mask registers available.
pub const MASK_LEN: u8 = 8;

/// The number of 32-bit lanes in an `f` register.
pub const VLEN: u8 = 8;

macro_rules! specifier {
    (
        $(#[$attr:meta])*
        $name:ident, $count:expr, $bits:literal, $from_fn:ident, $prefix:literal
    ) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u8);

        impl $name {
            /// Create a register specifier from its index, returning `None` if it is out of range.
            pub fn new<U: TryInto<u8>>(index: U) -> Option<Self> {
                let index = index.try_into().ok()?;
                (index < $count).then_some(Self(index))
            }

            #[doc = concat!("Convert a ", stringify!($bits), "-bit value into a register specifier.")]
            ///
            /// Panics if the value doesn't fit.
            pub fn $from_fn(value: u8) -> Self {
                if value >= $count {
                    panic!(concat!("out of range u", stringify!($bits), " used"));
                }
                Self(value)
            }

            /// Return an iterator over all specifiers of this register file, in index order.
            pub fn iter_all() -> impl Iterator<Item = Self> {
                (0..$count).map(Self)
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0 as u32
            }
        }

        impl From<$name> for usize {
            fn from(value: $name) -> Self {
                value.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

specifier! {
    /// An `x` register specifier. Can take values in the range `0..LEN`.
    XReg, LEN, 5, from_u5, "x"
}

specifier! {
    /// An `f` register specifier. Can take values in the range `0..LEN`.
    FReg, LEN, 5, from_u5, "f"
}

specifier! {
    /// A mask register specifier. Can take values in the range `0..MASK_LEN`.
    MReg, MASK_LEN, 3, from_u3, "m"
}

impl XReg {
    /// Register `x0`, a.k.a. register `zero`.
    pub const X0: Self = XReg(0);
    /// Register `x2`, the stack pointer, implied by several compressed instructions.
    pub const SP: Self = XReg(2);
    /// Register `x31`, which carries the stride operand of the address-based cache operations.
    pub const X31: Self = XReg(31);

    /// Map a 3-bit compressed register field onto `x8..=x15`.
    pub fn from_compressed(value_u3: u8) -> Self {
        Self(8 + (value_u3 & 0x7))
    }
}

impl FReg {
    /// Map a 3-bit compressed register field onto `f8..=f15`.
    pub fn from_compressed(value_u3: u8) -> Self {
        Self(8 + (value_u3 & 0x7))
    }
}

impl MReg {
    /// Mask register `m0`, which gates execution of masked packed instructions.
    pub const M0: Self = MReg(0);
}

const_assert_eq!(LEN, 32);
const_assert_eq!(MASK_LEN, 8);
const_assert_eq!(XLEN, 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        assert_eq!(Some(XReg::X0), XReg::new(0));
        assert_eq!(Some(XReg::X31), XReg::new(31u32));
        assert_eq!(None, XReg::new(32));
        assert_eq!(None, XReg::new(-1));
        assert_eq!(None, MReg::new(8));
        assert_eq!(Some(MReg::M0), MReg::new(0usize));
    }

    #[test]
    fn test_iter_all() {
        assert_eq!(32, XReg::iter_all().count());
        assert_eq!(32, FReg::iter_all().count());
        assert_eq!(8, MReg::iter_all().count());
        for (i, r) in FReg::iter_all().enumerate() {
            assert_eq!(i, usize::from(r));
        }
    }

    #[test]
    fn test_compressed() {
        assert_eq!(8, u8::from(XReg::from_compressed(0)));
        assert_eq!(15, u8::from(XReg::from_compressed(7)));
        assert_eq!(9, u8::from(FReg::from_compressed(0b1001)));
    }

    #[test]
    #[should_panic]
    fn test_from_u3_out_of_range() {
        MReg::from_u3(8);
    }

    #[test]
    fn test_display() {
        assert_eq!("x2", XReg::SP.to_string());
        assert_eq!("f17", FReg::from_u5(17).to_string());
        assert_eq!("m7", MReg::from_u3(7).to_string());
    }
}
