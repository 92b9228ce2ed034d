//! Decoding of 16-bit compressed instructions.
//!
//! Only the RV64 integer subset is supported. The compressed double precision loads and stores
//! decode as [`Handler::Unknown`].

use super::rd;
use crate::handler::Handler;
use crate::handler::Handler::*;
use crate::instruction::InstructionFlags;

/// Compressed instruction families, selected by funct3 and the quadrant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum CompressedOpcode {
    Addi4spn,
    Fld,
    Lw,
    Ld,
    Reserved,
    Fsd,
    Sw,
    Sd,
    Addi,
    Addiw,
    Li,
    LuiAddi16sp,
    MiscAlu,
    J,
    Beqz,
    Bnez,
    Slli,
    Fldsp,
    Lwsp,
    Ldsp,
    JalrMvAdd,
    Fsdsp,
    Swsp,
    Sdsp,
}

/// Indexed by `funct3 | quadrant`. Quadrant `11` holds 32-bit instructions and has no entries.
#[rustfmt::skip]
static COMPRESSED_TABLE: [Option<CompressedOpcode>; 32] = {
    use CompressedOpcode::*;
    [
        Some(Addi4spn), Some(Addi),        Some(Slli),      None,
        Some(Fld),      Some(Addiw),       Some(Fldsp),     None,
        Some(Lw),       Some(Li),          Some(Lwsp),      None,
        Some(Ld),       Some(LuiAddi16sp), Some(Ldsp),      None,
        Some(Reserved), Some(MiscAlu),     Some(JalrMvAdd), None,
        Some(Fsd),      Some(J),           Some(Fsdsp),     None,
        Some(Sw),       Some(Beqz),        Some(Swsp),      None,
        Some(Sd),       Some(Bnez),        Some(Sdsp),      None,
    ]
};

/// Returns the family of a 16-bit instruction, or `None` if the low bits mark a 32-bit one.
fn compressed_opcode(raw_instruction: u16) -> Option<CompressedOpcode> {
    let bits = u32::from(raw_instruction);
    COMPRESSED_TABLE[(((bits >> 11) & 0x1C) | (bits & 0b11)) as usize]
}

/// Decode a 16-bit instruction.
pub(super) fn decode(raw_instruction: u16, flags: &mut InstructionFlags) -> Handler {
    let bits = u32::from(raw_instruction);
    let Some(opcode) = compressed_opcode(raw_instruction) else {
        return Unknown;
    };
    match opcode {
        CompressedOpcode::Addi4spn => addi4spn(bits),
        CompressedOpcode::Fld | CompressedOpcode::Fsd => Unknown,
        CompressedOpcode::Lw => {
            flags.insert(InstructionFlags::LOAD);
            CLw
        }
        CompressedOpcode::Ld => {
            flags.insert(InstructionFlags::LOAD);
            CLd
        }
        CompressedOpcode::Reserved => Unknown,
        CompressedOpcode::Sw => CSw,
        CompressedOpcode::Sd => CSd,
        CompressedOpcode::Addi if rd(bits) == 0 => CNop,
        CompressedOpcode::Addi => CAddi,
        CompressedOpcode::Addiw if rd(bits) == 0 => Unknown,
        CompressedOpcode::Addiw => CAddiw,
        CompressedOpcode::Li => CLi,
        CompressedOpcode::LuiAddi16sp => lui_addi16sp(bits),
        CompressedOpcode::MiscAlu => misc_alu(bits),
        CompressedOpcode::J => CJ,
        CompressedOpcode::Beqz => CBeqz,
        CompressedOpcode::Bnez => CBnez,
        CompressedOpcode::Slli => CSlli,
        CompressedOpcode::Fldsp | CompressedOpcode::Fsdsp => Unknown,
        CompressedOpcode::Lwsp => stack_load(bits, CLwsp, flags),
        CompressedOpcode::Ldsp => stack_load(bits, CLdsp, flags),
        CompressedOpcode::JalrMvAdd => jalr_mv_add(bits),
        CompressedOpcode::Swsp => CSwsp,
        CompressedOpcode::Sdsp => CSdsp,
    }
}

/// The all-zero word is the canonical illegal instruction. Any other word with a zero immediate is
/// merely reserved.
fn addi4spn(bits: u32) -> Handler {
    if bits == 0 {
        CIllegal
    } else if (bits >> 5) & 0xFF == 0 {
        Unknown
    } else {
        CAddi4spn
    }
}

fn lui_addi16sp(bits: u32) -> Handler {
    let nzimm = ((bits >> 7) & 0x20) | ((bits >> 2) & 0x1F);
    match (nzimm, rd(bits)) {
        (0, _) => Unknown,
        (_, 2) => CAddi16sp,
        _ => CLui,
    }
}

/// Shifts, `c.andi`, and the register-register ALU operations.
fn misc_alu(bits: u32) -> Handler {
    /// Indexed by bits 12, 11:10 and 6:5.
    #[rustfmt::skip]
    const TABLE: [Handler; 32] = [
        CSrli, CSrli, CSrli, CSrli,
        CSrai, CSrai, CSrai, CSrai,
        CAndi, CAndi, CAndi, CAndi,
        CSub,  CXor,  COr,   CAnd,
        CSrli, CSrli, CSrli, CSrli,
        CSrai, CSrai, CSrai, CSrai,
        CAndi, CAndi, CAndi, CAndi,
        CSubw, CAddw, Unknown, Unknown,
    ];
    TABLE[(((bits >> 8) & 0x1C) | ((bits >> 5) & 0b11)) as usize]
}

/// `c.lwsp` and `c.ldsp` are loads even when the reserved `rd == x0` form makes them invalid.
fn stack_load(bits: u32, handler: Handler, flags: &mut InstructionFlags) -> Handler {
    flags.insert(InstructionFlags::LOAD);
    if rd(bits) == 0 {
        Unknown
    } else {
        handler
    }
}

fn jalr_mv_add(bits: u32) -> Handler {
    // [bit 12, rd != 0, rs2 != 0]
    const TABLE: [Handler; 8] = [Unknown, CMv, CJr, CMv, CEbreak, CAdd, CJalr, CAdd];
    let index = ((bits >> 10) & 0b100)
        | (u32::from(rd(bits) != 0) << 1)
        | u32::from(compressed_rs2(bits) != 0);
    TABLE[index as usize]
}

/// Returns the 5-bit *rs2* field of a compressed instruction, in bits 6:2.
fn compressed_rs2(bits: u32) -> u32 {
    (bits >> 2) & 0x1F
}
