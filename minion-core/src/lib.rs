//! Functional core of an instruction-set simulator for the ET minion: a RISC-V derived in-order
//! core with packed-single/packed-integer vector extensions, tensor CSRs, and a lockable L1 data
//! cache that doubles as a software scratchpad.
//!
//! The crate covers two subsystems:
//!
//! - [`decode`]: classifying a fetched 16-bit or 32-bit instruction word into a [`Handler`] plus
//!   the [`InstructionFlags`] side information the execution stage needs.
//! - [`cache`]: the cache-management operations (evict, flush, prefetch, lock, unlock) and the
//!   per-minion lock state they maintain, reporting policy violations through [`TensorError`].
//!
//! Memory is reached only through the collaborator traits in [`memory`].

#[macro_use]
extern crate static_assertions;

pub mod address_range;
pub mod cache;
pub mod decode;
pub mod handler;
pub mod instruction;
pub mod memory;
pub mod minion;
pub mod registers;
pub mod tensor;

/// Re-export of [`AddressRange`] for convenience.
pub use address_range::AddressRange;
pub use decode::{decode, fetch_and_decode, FetchError};
pub use handler::Handler;
pub use instruction::{Instruction, InstructionFlags};
pub use minion::{Hart, HartId, Minion, MinionId};
pub use tensor::{TensorError, TensorMask};
