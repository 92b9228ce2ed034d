//! Instruction decoding.
//!
//! Decoding is a two-level table lookup. The first level selects an opcode class from a
//! fixed bit field: bits 6:2 for 32-bit words ([`full`]), or funct3 and the quadrant for 16-bit
//! words ([`compressed`]). The second level switches on the remaining fields of that class.
//! Every bit pattern decodes to some [`Handler`], possibly [`Handler::Unknown`].

use crate::handler::Handler;
use crate::instruction::{is_compressed, Instruction, InstructionFlags};
use crate::memory::{AccessType, MemoryError, Mmu, PhysicalMemory};
use log::trace;
use thiserror::Error;

mod compressed;
mod full;

/// Decode an instruction word into its handler and flags.
///
/// If `is_compressed` is set, only the low 16 bits of `word` are considered.
///
/// This is a pure function of its arguments, and it is total: unrecognized encodings resolve to
/// [`Handler::Unknown`], and the all-zero compressed word resolves to [`Handler::CIllegal`].
pub fn decode(word: u32, is_compressed: bool) -> (InstructionFlags, Handler) {
    let mut flags = InstructionFlags::empty();
    let handler = if is_compressed {
        compressed::decode(word as u16, &mut flags)
    } else {
        full::decode(word, &mut flags)
    };
    (flags, handler)
}

/// Fetch the instruction at virtual address `vaddr` and decode it.
///
/// The first halfword decides the instruction length. The second halfword of a 32-bit
/// instruction is fetched from the same translation when it lies in the same 4 KiB page, and
/// is translated separately otherwise.
///
/// Translation and fetch failures are returned with the virtual address of the parcel that
/// failed.
pub fn fetch_and_decode<M: Mmu + PhysicalMemory>(
    memory: &mut M,
    vaddr: u64,
) -> Result<Instruction, FetchError> {
    let paddr = translate_fetch(memory, vaddr)?;
    let low = memory
        .fetch16(paddr)
        .map_err(|cause| FetchError::new(vaddr, cause))?;

    let bits = if is_compressed(u32::from(low)) {
        trace!("Fetched compressed instruction from PC {vaddr:#018x}: {low:#06x}");
        u32::from(low)
    } else {
        let high_vaddr = vaddr.wrapping_add(2);
        let high_paddr = if paddr & PAGE_OFFSET_MASK <= PAGE_OFFSET_MASK - 3 {
            paddr + 2
        } else {
            translate_fetch(memory, high_vaddr)?
        };
        let high = memory
            .fetch16(high_paddr)
            .map_err(|cause| FetchError::new(high_vaddr, cause))?;
        let bits = u32::from(low) | (u32::from(high) << 16);
        trace!("Fetched instruction from PC {vaddr:#018x}: {bits:#010x}");
        bits
    };

    let instruction = Instruction::decode(bits);
    trace!(
        "Decoded {:#010x} as {} with {:?}",
        instruction.bits(),
        instruction.handler(),
        instruction.flags()
    );
    Ok(instruction)
}

/// Offset bits within a 4 KiB page.
const PAGE_OFFSET_MASK: u64 = 0xFFF;

fn translate_fetch<M: Mmu>(memory: &mut M, vaddr: u64) -> Result<u64, FetchError> {
    memory
        .translate(vaddr, AccessType::Fetch)
        .map_err(|cause| FetchError::new(vaddr, cause))
}

/// An instruction could not be fetched.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("instruction fetch from {address:#018x} failed")]
pub struct FetchError {
    /// The virtual address of the halfword whose translation or fetch failed.
    pub address: u64,
    #[source]
    pub cause: MemoryError,
}

impl FetchError {
    fn new(address: u64, cause: MemoryError) -> Self {
        Self { address, cause }
    }
}

/// Returns the 3-bit *funct3* value in bits 14:12.
fn funct3(raw_instruction: u32) -> u32 {
    (raw_instruction >> 12) & 0b111
}

/// Returns the 7-bit *funct7* value in bits 31:25.
fn funct7(raw_instruction: u32) -> u32 {
    raw_instruction >> 25
}

/// Returns the 5-bit *rd* field in bits 11:7.
///
/// For compressed instructions this is the *rs1/rd* field.
fn rd(raw_instruction: u32) -> u32 {
    (raw_instruction >> 7) & 0x1F
}

/// Returns the 5-bit *rs1* field in bits 19:15.
fn rs1(raw_instruction: u32) -> u32 {
    (raw_instruction >> 15) & 0x1F
}

/// Returns the 5-bit *rs2* field in bits 24:20.
fn rs2(raw_instruction: u32) -> u32 {
    (raw_instruction >> 20) & 0x1F
}

/// Returns the 12-bit unsigned immediate in bits 31:20.
fn imm12(raw_instruction: u32) -> u32 {
    (raw_instruction >> 20) & 0xFFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::fake::FakeMemory;

    #[test]
    fn test_fields() {
        // fadd.ps f1, f2, f3 with rm=dyn
        let bits = 0x0031_70FB;
        assert_eq!(0b111, funct3(bits));
        assert_eq!(0, funct7(bits));
        assert_eq!(1, rd(bits));
        assert_eq!(2, rs1(bits));
        assert_eq!(3, rs2(bits));
        assert_eq!(0xFFF, imm12(0xFFF0_0000));
    }

    #[test]
    fn test_decode_add() {
        let (flags, handler) = decode(0x00a5_0533, false);
        assert_eq!(Handler::Add, handler);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_decode_zero() {
        assert_eq!(
            (InstructionFlags::empty(), Handler::CIllegal),
            decode(0x0000, true)
        );
        // A 32-bit word of all zeros is not a valid 32-bit encoding
        assert_eq!(Handler::Unknown, decode(0x0000_0000, false).1);
    }

    #[test]
    fn test_compressed_totality() {
        for word in 0..=u16::MAX {
            let (flags, handler) = decode(u32::from(word), true);
            assert_eq!((flags, handler), decode(u32::from(word), true));
            if word & 0b11 == 0b11 {
                assert_eq!(Handler::Unknown, handler);
            }
        }
    }

    #[test]
    fn test_full_totality() {
        // Walk every opcode and funct3 with a spread of the upper bits
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..200_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let word = seed | 0b11;
            let first = decode(word, false);
            assert_eq!(first, decode(word, false));
            assert!(!first.1.is_compressed(), "{word:#010x} decoded as {}", first.1);
        }
    }

    #[test]
    fn test_fetch_compressed() {
        let mut memory = FakeMemory::new();
        // c.addi a0, -1
        memory.store_instruction(0x1000, 0x157D, 2);
        let instruction = fetch_and_decode(&mut memory, 0x1000).unwrap();
        assert_eq!(Handler::CAddi, instruction.handler());
        assert_eq!(2, instruction.size());
        assert_eq!(vec![0x1000], memory.fetches);
        assert_eq!(1, memory.translations.len());
    }

    #[test]
    fn test_fetch_same_page() {
        let mut memory = FakeMemory::new();
        memory.offset = 0x10_0000;
        memory.store_instruction(0x10_1ffc, 0x00a5_0533, 4);
        let instruction = fetch_and_decode(&mut memory, 0x1ffc).unwrap();
        assert_eq!(Handler::Add, instruction.handler());
        assert_eq!(vec![0x10_1ffc, 0x10_1ffe], memory.fetches);
        assert_eq!(vec![(0x1ffc, AccessType::Fetch)], memory.translations);
    }

    #[test]
    fn test_fetch_page_crossing() {
        let mut memory = FakeMemory::new();
        memory.store_instruction(0x1ffe, 0x00a5_0533, 4);
        let instruction = fetch_and_decode(&mut memory, 0x1ffe).unwrap();
        assert_eq!(Handler::Add, instruction.handler());
        assert_eq!(
            vec![(0x1ffe, AccessType::Fetch), (0x2000, AccessType::Fetch)],
            memory.translations
        );
    }

    #[test]
    fn test_fetch_page_crossing_fault() {
        let mut memory = FakeMemory::new();
        memory.store_instruction(0x1ffe, 0x00a5_0533, 4);
        memory.unmapped_pages.insert(0x2);
        assert_eq!(
            Err(FetchError {
                address: 0x2000,
                cause: MemoryError::PageFault
            }),
            fetch_and_decode(&mut memory, 0x1ffe)
        );
        // A compressed instruction at the end of a page does not touch the next page
        memory.store_instruction(0x1ffe, 0x0001, 2);
        assert_eq!(
            Handler::CNop,
            fetch_and_decode(&mut memory, 0x1ffe).unwrap().handler()
        );
    }

    #[test]
    fn test_fetch_bus_error() {
        let mut memory = FakeMemory::new();
        memory.bus_errors.insert(0x3000);
        let error = fetch_and_decode(&mut memory, 0x3004).unwrap_err();
        assert_eq!(0x3004, error.address);
        assert!(error.cause.is_bus_error());
    }
}
