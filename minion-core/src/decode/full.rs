//! Decoding of 32-bit instruction words.

use super::{funct3, funct7, imm12, rd, rs1, rs2};
use crate::handler::Handler;
use crate::handler::Handler::*;
use crate::instruction::InstructionFlags;

/// Major opcode classes of 32-bit instructions, selected by bits 6:2.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Opcode {
    Load,
    LoadFp,
    Custom0,
    MiscMem,
    OpImm,
    Auipc,
    OpImm32,
    /// Packed-single broadcast immediate, in the slot of the 48-bit encodings.
    Wide48A,
    Store,
    StoreFp,
    Custom1,
    Amo,
    Op,
    Lui,
    Op32,
    /// Packed immediates, in the slot of the 64-bit encodings.
    Wide64,
    Madd,
    Msub,
    Nmsub,
    Nmadd,
    OpFp,
    Reserved0,
    Custom2,
    /// Packed-integer broadcast immediate, in the slot of the 48-bit encodings.
    Wide48B,
    Branch,
    Jalr,
    Reserved1,
    Jal,
    System,
    Reserved2,
    Custom3,
    Wide80,
}

/// Indexed by bits 6:2 of the instruction.
#[rustfmt::skip]
static OPCODE_TABLE: [Opcode; 32] = {
    use Opcode::*;
    [
        Load,   LoadFp,  Custom0,   MiscMem, OpImm,  Auipc,     OpImm32, Wide48A,
        Store,  StoreFp, Custom1,   Amo,     Op,     Lui,       Op32,    Wide64,
        Madd,   Msub,    Nmsub,     Nmadd,   OpFp,   Reserved0, Custom2, Wide48B,
        Branch, Jalr,    Reserved1, Jal,     System, Reserved2, Custom3, Wide80,
    ]
};

/// Returns the opcode class of a 32-bit instruction.
fn opcode(raw_instruction: u32) -> Opcode {
    OPCODE_TABLE[((raw_instruction >> 2) & 0x1F) as usize]
}

/// Decode a 32-bit instruction. The two low bits are assumed to be `11`.
pub(super) fn decode(bits: u32, flags: &mut InstructionFlags) -> Handler {
    match opcode(bits) {
        Opcode::Load => load(bits, flags),
        Opcode::LoadFp => load_fp(bits, flags),
        Opcode::Custom0 => custom0(bits),
        Opcode::MiscMem => misc_mem(bits),
        Opcode::OpImm => op_imm(bits),
        Opcode::Auipc => Auipc,
        Opcode::OpImm32 => op_imm_32(bits),
        Opcode::Wide48A => FbciPs,
        Opcode::Store => store(bits),
        Opcode::StoreFp => store_fp(bits),
        Opcode::Custom1 => Unknown,
        Opcode::Amo => amo(bits, flags),
        Opcode::Op => op(bits),
        Opcode::Lui => Lui,
        Opcode::Op32 => op_32(bits),
        Opcode::Wide64 => wide_64(bits),
        Opcode::Madd => fused(bits, FmaddS),
        Opcode::Msub => fused(bits, FmsubS),
        Opcode::Nmsub => fused(bits, FnmsubS),
        Opcode::Nmadd => fused(bits, FnmaddS),
        Opcode::OpFp => op_fp(bits),
        Opcode::Reserved0 => Unknown,
        Opcode::Custom2 => custom2(bits),
        Opcode::Wide48B => FbciPi,
        Opcode::Branch => branch(bits),
        Opcode::Jalr => Jalr,
        Opcode::Reserved1 => Unknown,
        Opcode::Jal => Jal,
        Opcode::System => system(bits, flags),
        Opcode::Reserved2 => reserved2(bits),
        Opcode::Custom3 => custom3(bits, flags),
        Opcode::Wide80 => Unknown,
    }
}

/// Returns `handler` if `condition` holds, [`Handler::Unknown`] otherwise.
fn only_if(condition: bool, handler: Handler) -> Handler {
    if condition {
        handler
    } else {
        Unknown
    }
}

fn load(bits: u32, flags: &mut InstructionFlags) -> Handler {
    const TABLE: [Handler; 8] = [Lb, Lh, Lw, Ld, Lbu, Lhu, Lwu, Unknown];
    flags.insert(InstructionFlags::LOAD);
    TABLE[funct3(bits) as usize]
}

fn load_fp(bits: u32, flags: &mut InstructionFlags) -> Handler {
    let handler = match funct3(bits) {
        0b010 => Flw,
        0b101 => Flq2,
        _ => return Unknown,
    };
    flags.insert(InstructionFlags::LOAD);
    handler
}

/// Packed memory operations: broadcasts, gathers, scatters, and packed atomics.
fn custom0(bits: u32) -> Handler {
    match funct3(bits) {
        0b000 => FbcPs,
        0b001 => match funct7(bits) {
            0x04 => Fg32bPs,
            0x08 => Fg32hPs,
            0x10 => Fg32wPs,
            0x24 => FgbPs,
            0x28 => FghPs,
            0x30 => FgwPs,
            0x44 => Fsc32bPs,
            0x48 => Fsc32hPs,
            0x50 => Fsc32wPs,
            0x64 => FscbPs,
            0x68 => FschPs,
            0x70 => FscwPs,
            _ => Unknown,
        },
        0b010 => FlwPs,
        0b011 => FbcxPs,
        0b100 => match funct7(bits) {
            0x03 => FamoaddlPi,
            0x07 => FamoswaplPi,
            0x0b => FamoandlPi,
            0x0f => FamoorlPi,
            0x13 => FamoxorlPi,
            0x14 => FamominlPs,
            0x17 => FamominlPi,
            0x18 => FamomaxlPs,
            0x1b => FamomaxlPi,
            0x1f => FamominulPi,
            0x23 => FamomaxulPi,
            0x43 => FamoaddgPi,
            0x47 => FamoswapgPi,
            0x4b => FamoandgPi,
            0x4f => FamoorgPi,
            0x53 => FamoxorgPi,
            0x54 => FamomingPs,
            0x57 => FamomingPi,
            0x58 => FamomaxgPs,
            0x5b => FamomaxgPi,
            0x5f => FamominugPi,
            0x63 => FamomaxugPi,
            _ => Unknown,
        },
        0b110 => FswPs,
        0b111 => {
            let no_rs2 = rs2(bits) == 0;
            match funct7(bits) {
                0x08 => only_if(no_rs2, FlwlPs),
                0x09 => only_if(no_rs2, FlwgPs),
                0x28 => only_if(no_rs2, FswlPs),
                0x29 => only_if(no_rs2, FswgPs),
                0x48 => FgwlPs,
                0x49 => FgwgPs,
                0x68 => FscwlPs,
                0x69 => FscwgPs,
                _ => Unknown,
            }
        }
        _ => Unknown,
    }
}

fn misc_mem(bits: u32) -> Handler {
    match funct3(bits) {
        0b000 if bits >> 28 == 0b1000 => FenceTso,
        0b000 => Fence,
        0b001 => FenceI,
        _ => Unknown,
    }
}

fn op_imm(bits: u32) -> Handler {
    let funct6 = bits >> 26;
    match funct3(bits) {
        0b000 => Addi,
        0b001 => only_if(funct6 == 0, Slli),
        0b010 => Slti,
        0b011 => Sltiu,
        0b100 => Xori,
        0b101 => match funct6 {
            0x00 => Srli,
            0x10 => Srai,
            _ => Unknown,
        },
        0b110 => Ori,
        _ => Andi,
    }
}

fn op_imm_32(bits: u32) -> Handler {
    match (funct3(bits), funct7(bits)) {
        (0b000, _) => Addiw,
        (0b001, 0x00) => Slliw,
        (0b101, 0x00) => Srliw,
        (0b101, 0x20) => Sraiw,
        _ => Unknown,
    }
}

fn store(bits: u32) -> Handler {
    const TABLE: [Handler; 8] = [Sb, Sh, Sw, Sd, Unknown, Unknown, Unknown, Unknown];
    TABLE[funct3(bits) as usize]
}

fn store_fp(bits: u32) -> Handler {
    match funct3(bits) {
        0b010 => Fsw,
        0b101 => Fsq2,
        _ => Unknown,
    }
}

/// The standard atomic memory operations.
fn amo(bits: u32, flags: &mut InstructionFlags) -> Handler {
    const WORD: [Handler; 11] = [
        AmoaddW, AmoswapW, LrW, ScW, AmoxorW, AmoorW, AmoandW, AmominW, AmomaxW, AmominuW,
        AmomaxuW,
    ];
    const DOUBLE: [Handler; 11] = [
        AmoaddD, AmoswapD, LrD, ScD, AmoxorD, AmoorD, AmoandD, AmominD, AmomaxD, AmominuD,
        AmomaxuD,
    ];
    let table = match funct3(bits) {
        0b010 => &WORD,
        0b011 => &DOUBLE,
        _ => return Unknown,
    };
    let index = match bits >> 27 {
        0x00 => 0,
        0x01 => 1,
        0x02 => 2,
        0x03 => 3,
        0x04 => 4,
        0x08 => 5,
        0x0c => 6,
        0x10 => 7,
        0x14 => 8,
        0x18 => 9,
        0x1c => 10,
        _ => return Unknown,
    };
    flags.insert(InstructionFlags::AMO);
    table[index]
}

fn op(bits: u32) -> Handler {
    const BASE: [Handler; 8] = [Add, Sll, Slt, Sltu, Xor, Srl, Or, And];
    const MULDIV: [Handler; 8] = [Mul, Mulh, Mulhsu, Mulhu, Div, Divu, Rem, Remu];
    const ALT: [Handler; 8] = [Sub, Unknown, Unknown, Unknown, Unknown, Sra, Unknown, Unknown];
    let funct3 = funct3(bits) as usize;
    match funct7(bits) {
        0x00 => BASE[funct3],
        0x01 => MULDIV[funct3],
        0x20 => ALT[funct3],
        _ => Unknown,
    }
}

/// 32-bit arithmetic, plus the local and global scalar atomics.
fn op_32(bits: u32) -> Handler {
    let funct7 = funct7(bits);
    match funct3(bits) {
        0b000 => match funct7 {
            0x00 => Addw,
            0x01 => Mulw,
            0x20 => Subw,
            _ => Unknown,
        },
        0b001 => only_if(funct7 == 0, Sllw),
        0b010 => match funct7 {
            0x00 => AmoaddlW,
            0x01 => AmoaddgW,
            0x04 => AmoswaplW,
            0x05 => AmoswapgW,
            0x10 => AmoxorlW,
            0x11 => AmoxorgW,
            0x20 => AmoorlW,
            0x21 => AmoorgW,
            0x30 => AmoandlW,
            0x31 => AmoandgW,
            0x40 => AmominlW,
            0x41 => AmomingW,
            0x50 => AmomaxlW,
            0x51 => AmomaxgW,
            0x60 => AmominulW,
            0x61 => AmominugW,
            0x70 => AmomaxulW,
            0x71 => AmomaxugW,
            _ => Unknown,
        },
        0b011 => match funct7 {
            0x00 => AmoaddlD,
            0x01 => AmoaddgD,
            0x04 => AmoswaplD,
            0x05 => AmoswapgD,
            0x10 => AmoxorlD,
            0x11 => AmoxorgD,
            0x20 => AmoorlD,
            0x21 => AmoorgD,
            0x30 => AmoandlD,
            0x31 => AmoandgD,
            0x40 => AmominlD,
            0x41 => AmomingD,
            0x50 => AmomaxlD,
            0x51 => AmomaxgD,
            0x60 => AmominulD,
            0x61 => AmominugD,
            0x70 => AmomaxulD,
            0x71 => AmomaxugD,
            _ => Unknown,
        },
        0b100 => only_if(funct7 == 0x01, Divw),
        0b101 => match funct7 {
            0x00 => Srlw,
            0x01 => Divuw,
            0x20 => Sraw,
            _ => Unknown,
        },
        0b110 => match funct7 {
            0x01 => Remw,
            0x40 => Packb,
            _ => Unknown,
        },
        _ => match funct7 {
            0x01 => Remuw,
            0x40 => Bitmixb,
            _ => Unknown,
        },
    }
}

/// Packed immediates. Only format `10` is defined.
fn wide_64(bits: u32) -> Handler {
    if (bits >> 25) & 0b11 != 0b10 {
        return Unknown;
    }
    match funct3(bits) {
        0b000 => FaddiPi,
        0b001 => FandiPi,
        0b010 => FcmovPs,
        _ => Unknown,
    }
}

/// Scalar fused multiply-add. Formats with bit 1 set are not defined.
fn fused(bits: u32, handler: Handler) -> Handler {
    only_if((bits >> 25) & 0b10 == 0, handler)
}

fn op_fp(bits: u32) -> Handler {
    let funct3 = funct3(bits);
    let rs2 = rs2(bits);
    match funct7(bits) {
        0x00 => FaddS,
        0x04 => FsubS,
        0x08 => FmulS,
        0x0c => FdivS,
        0x10 => match funct3 {
            0b000 => FsgnjS,
            0b001 => FsgnjnS,
            0b010 => FsgnjxS,
            _ => Unknown,
        },
        0x14 => match funct3 {
            0b000 => FminS,
            0b001 => FmaxS,
            _ => Unknown,
        },
        0x2c => only_if(rs2 == 0, FsqrtS),
        0x50 => match funct3 {
            0b000 => FleS,
            0b001 => FltS,
            0b010 => FeqS,
            _ => Unknown,
        },
        0x60 => match rs2 {
            0 => FcvtWS,
            1 => FcvtWuS,
            2 => FcvtLS,
            3 => FcvtLuS,
            _ => Unknown,
        },
        0x68 => match rs2 {
            0 => FcvtSW,
            1 => FcvtSWu,
            2 => FcvtSL,
            3 => FcvtSLu,
            _ => Unknown,
        },
        0x70 => match funct3 {
            0b000 => only_if(rs2 == 0, FmvXW),
            0b001 => only_if(rs2 == 0, FclassS),
            _ => Unknown,
        },
        0x78 => only_if(rs2 == 0 && funct3 == 0, FmvWX),
        _ => Unknown,
    }
}

/// Packed-single fused multiply-add, selected by the format field.
fn custom2(bits: u32) -> Handler {
    const TABLE: [Handler; 4] = [FmaddPs, FmsubPs, FnmsubPs, FnmaddPs];
    TABLE[((bits >> 25) & 0b11) as usize]
}

fn branch(bits: u32) -> Handler {
    const TABLE: [Handler; 8] = [Beq, Bne, Unknown, Unknown, Blt, Bge, Bltu, Bgeu];
    TABLE[funct3(bits) as usize]
}

fn system(bits: u32, flags: &mut InstructionFlags) -> Handler {
    let imm12 = imm12(bits);
    let funct3 = funct3(bits);
    if funct3 == 0 {
        let no_operands = rd(bits) == 0 && rs1(bits) == 0;
        return match imm12 {
            0x000 => only_if(no_operands, Ecall),
            0x001 => only_if(no_operands, Ebreak),
            0x102 => only_if(no_operands, Sret),
            0x302 => only_if(no_operands, Mret),
            0x105 => only_if(no_operands, Wfi),
            0x120..=0x13f => only_if(rd(bits) == 0, SfenceVma),
            _ => Unknown,
        };
    }

    // csrr{w,s,c}[i], flagged as reads even when rd is x0
    flags.insert(InstructionFlags::CSR_READ);
    flags.insert(match imm12 {
        0x800 => InstructionFlags::REDUCE,
        0x801 => InstructionFlags::TENSOR_FMA,
        0x806 => InstructionFlags::TENSOR_QUANT,
        0x820 => InstructionFlags::FLB,
        0x821 => InstructionFlags::FCC,
        0x822 => InstructionFlags::STALL,
        0x83f => InstructionFlags::TENSOR_LOAD,
        _ => InstructionFlags::empty(),
    });
    match funct3 {
        0b001 => Csrrw,
        0b010 => Csrrs,
        0b011 => Csrrc,
        0b101 => Csrrwi,
        0b110 => Csrrsi,
        0b111 => Csrrci,
        _ => Unknown,
    }
}

fn reserved2(bits: u32) -> Handler {
    only_if(funct3(bits) == 0 && funct7(bits) == 0, FcmovmPs)
}

/// Packed-single and packed-integer arithmetic, mask operations, and conversions.
///
/// Several encodings reuse the upper bits of register fields as reserved-zero bits, because the
/// operand is a mask register (3 bits) rather than an `x` or `f` register (5 bits).
fn custom3(bits: u32, flags: &mut InstructionFlags) -> Handler {
    let funct3 = funct3(bits);
    let rs2 = rs2(bits);
    let reserved_zero = |mask: u32| bits & mask == 0;
    match funct7(bits) {
        0x00 => FaddPs,
        0x03 => match funct3 {
            0b000 => FaddPi,
            0b001 => FsllPi,
            0b010 => only_if(rs2 == 0, FnotPi),
            0b011 => match rs2 {
                0 => Fsat8Pi,
                1 => Fsatu8Pi,
                _ => Unknown,
            },
            0b100 => FxorPi,
            0b101 => FsrlPi,
            0b110 => ForPi,
            _ => FandPi,
        },
        0x04 => FsubPs,
        0x07 => match funct3 {
            0b000 => FsubPi,
            0b101 => FsraPi,
            _ => Unknown,
        },
        0x08 => FmulPs,
        0x0b => match funct3 {
            0b000 => FmulPi,
            0b001 => FmulhPi,
            0b010 => FmulhuPi,
            _ => Unknown,
        },
        0x0c => FdivPs,
        0x0f => match funct3 {
            0b000 => FdivPi,
            0b001 => FdivuPi,
            0b010 => FremPi,
            0b011 => FremuPi,
            _ => Unknown,
        },
        0x10 => match funct3 {
            0b000 => FsgnjPs,
            0b001 => FsgnjnPs,
            0b010 => FsgnjxPs,
            _ => Unknown,
        },
        0x13 => match funct3 {
            0b000 => only_if(rs2 == 0, FpackrepbPi),
            0b001 => only_if(rs2 == 0, FpackrephPi),
            _ => Unknown,
        },
        0x14 => match funct3 {
            0b000 => FminPs,
            0b001 => FmaxPs,
            _ => Unknown,
        },
        0x17 => match funct3 {
            0b000 => FminPi,
            0b001 => FmaxPi,
            0b010 => FminuPi,
            0b011 => FmaxuPi,
            _ => Unknown,
        },
        0x18 => FrcpFixRast,
        // funct3 | rd[4:3]
        0x1f => only_if(reserved_zero(0x0000_7c00), FltmPi),
        0x27 => match funct3 {
            0b001 => FslliPi,
            0b101 => FsrliPi,
            0b111 => FsraiPi,
            _ => Unknown,
        },
        // rs2 | rs1[4:3] | funct3
        0x29 => only_if(reserved_zero(0x01fc_7000), Maskpopc),
        0x2a => only_if(reserved_zero(0x01fc_7000), Maskpopcz),
        // rd[4:3]
        0x2b => only_if(reserved_zero(0x0000_0c00), MovMX),
        0x2c => transcendental(rs2, funct3, flags),
        0x2f => only_if(funct3 == 0, MaskpopcRast),
        0x33 => match funct3 {
            // rs2 | rs1[4:3] | rd[4:3]
            0b010 => only_if(reserved_zero(0x01fc_0c00), Masknot),
            // rs2[4:3] | rs1[4:3] | rd[4:3]
            0b100 => only_if(reserved_zero(0x018c_0c00), Maskxor),
            0b110 => only_if(reserved_zero(0x018c_0c00), Maskor),
            0b111 => only_if(reserved_zero(0x018c_0c00), Maskand),
            _ => Unknown,
        },
        0x44 => match funct3 {
            0b000 => CubefacePs,
            0b001 => CubefaceidxPs,
            0b010 => CubesgnscPs,
            0b011 => CubesgntcPs,
            _ => Unknown,
        },
        0x50 => match funct3 {
            0b000 => FlePs,
            0b001 => FltPs,
            0b010 => FeqPs,
            // rd[4:3]
            0b100 => only_if(reserved_zero(0x0000_0c00), FlemPs),
            0b101 => only_if(reserved_zero(0x0000_0c00), FltmPs),
            0b110 => only_if(reserved_zero(0x0000_0c00), FeqmPs),
            _ => Unknown,
        },
        0x53 => match funct3 {
            0b000 => FlePi,
            0b001 => FltPi,
            0b010 => FeqPi,
            0b011 => FltuPi,
            _ => Unknown,
        },
        0x60 => match rs2 {
            0x00 => FcvtPwPs,
            0x01 => FcvtPwuPs,
            0x02 => only_if(funct3 == 0, FcvtRastPs),
            _ => Unknown,
        },
        0x68 => match rs2 {
            0x00 => FcvtPsPw,
            0x01 => FcvtPsPwu,
            0x02 => FcvtPsRast,
            0x08 => only_if(funct3 == 0, FcvtPsF10),
            0x09 => only_if(funct3 == 0, FcvtPsF11),
            0x0a => only_if(funct3 == 0, FcvtPsF16),
            0x10 => only_if(funct3 == 0, FcvtPsUn24),
            0x11 => only_if(funct3 == 0, FcvtPsUn16),
            0x12 => only_if(funct3 == 0, FcvtPsUn10),
            0x13 => only_if(funct3 == 0, FcvtPsUn8),
            0x17 => only_if(funct3 == 0, FcvtPsUn2),
            0x19 => only_if(funct3 == 0, FcvtPsSn16),
            0x1b => only_if(funct3 == 0, FcvtPsSn8),
            _ => Unknown,
        },
        0x6b => {
            // rs2 | rs1 | funct3
            if bits & 0x01ff_f000 == 0 {
                MovaXM
            // rs2 | rd[4:3], with funct3 == 1
            } else if bits & 0x01f0_7f80 == 0x0000_1000 {
                MovaMX
            } else {
                Unknown
            }
        }
        0x6c => match rs2 {
            0x08 => only_if(funct3 == 0, FcvtF11Ps),
            0x09 => only_if(funct3 == 0, FcvtF16Ps),
            0x0b => only_if(funct3 == 0, FcvtF10Ps),
            0x10 => only_if(funct3 == 0, FcvtUn24Ps),
            0x11 => only_if(funct3 == 0, FcvtUn16Ps),
            0x12 => only_if(funct3 == 0, FcvtUn10Ps),
            0x13 => only_if(funct3 == 0, FcvtUn8Ps),
            0x17 => only_if(funct3 == 0, FcvtUn2Ps),
            0x19 => only_if(funct3 == 0, FcvtSn16Ps),
            0x1b => only_if(funct3 == 0, FcvtSn8Ps),
            _ => Unknown,
        },
        0x70 => match funct3 {
            // rs2[4:3]
            0b000 => only_if(reserved_zero(0x0180_0000), FmvzXPs),
            // rs2
            0b001 => only_if(reserved_zero(0x01f0_0000), FclassPs),
            0b010 => only_if(reserved_zero(0x0180_0000), FmvsXPs),
            // rs2 | rd[4:3]
            0b101 => only_if(reserved_zero(0x01f0_0c00), FlemPs),
            _ => Unknown,
        },
        0x73 => FswizzPs,
        _ => Unknown,
    }
}

/// Packed-single unary operations, selected by the *rs2* field.
///
/// The approximated transcendentals are flagged [`InstructionFlags::ONE_ULP`] even when a
/// reserved rounding mode makes the encoding itself invalid.
fn transcendental(rs2: u32, funct3: u32, flags: &mut InstructionFlags) -> Handler {
    match rs2 {
        0x00 => only_if(funct3 == 0, FsqrtPs),
        0x01 => FroundPs,
        0x02 => FfrcPs,
        0x03 | 0x04 | 0x06 | 0x08 => {
            flags.insert(InstructionFlags::ONE_ULP);
            let handler = match rs2 {
                0x03 => FlogPs,
                0x04 => FexpPs,
                0x06 => FsinPs,
                _ => FrsqPs,
            };
            only_if(funct3 == 0, handler)
        }
        0x07 => only_if(funct3 == 0, FrcpPs),
        _ => Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::super::decode as decode_word;
    use super::*;

    fn decode(bits: u32) -> (InstructionFlags, Handler) {
        decode_word(bits, false)
    }

    fn handler(bits: u32) -> Handler {
        decode(bits).1
    }

    /// Assemble an R-type word from its fields.
    fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    const LOAD: u32 = 0x03;
    const LOAD_FP: u32 = 0x07;
    const CUSTOM0: u32 = 0x0b;
    const OP_IMM: u32 = 0x13;
    const OP_IMM_32: u32 = 0x1b;
    const WIDE48A: u32 = 0x1f;
    const AMO: u32 = 0x2f;
    const OP: u32 = 0x33;
    const OP_32: u32 = 0x3b;
    const WIDE64: u32 = 0x3f;
    const MADD: u32 = 0x43;
    const OP_FP: u32 = 0x53;
    const CUSTOM2: u32 = 0x5b;
    const SYSTEM: u32 = 0x73;
    const RESERVED2: u32 = 0x77;
    const CUSTOM3: u32 = 0x7b;
    const WIDE80: u32 = 0x7f;

    #[test]
    fn test_opcode_table() {
        assert_eq!(Opcode::Load, opcode(0x0000_0003));
        assert_eq!(Opcode::Op, opcode(0x00a5_0533));
        assert_eq!(Opcode::Custom3, opcode(0x0000_007b));
        assert_eq!(Opcode::Wide80, opcode(0x0000_007f));
        for (index, opcode) in OPCODE_TABLE.iter().enumerate() {
            assert_eq!(*opcode, super::opcode(((index as u32) << 2) | 0b11));
        }
    }

    #[test]
    fn test_loads() {
        // ld a0, 8(sp)
        assert_eq!((InstructionFlags::LOAD, Ld), decode(0x0081_3503));
        assert_eq!(Lwu, handler(r_type(0, 0, 2, 0b110, 10, LOAD)));
        // The load flag is set even for the unused funct3
        assert_eq!(
            (InstructionFlags::LOAD, Unknown),
            decode(r_type(0, 0, 2, 0b111, 10, LOAD))
        );
        assert_eq!(
            (InstructionFlags::LOAD, Flq2),
            decode(r_type(0, 0, 2, 0b101, 1, LOAD_FP))
        );
        assert_eq!(
            (InstructionFlags::empty(), Unknown),
            decode(r_type(0, 0, 2, 0b011, 1, LOAD_FP))
        );
    }

    #[test]
    fn test_custom0() {
        assert_eq!(FbcPs, handler(r_type(0, 0, 2, 0b000, 1, CUSTOM0)));
        assert_eq!(FgwPs, handler(r_type(0x30, 3, 2, 0b001, 1, CUSTOM0)));
        assert_eq!(Unknown, handler(r_type(0x31, 3, 2, 0b001, 1, CUSTOM0)));
        assert_eq!(FbcxPs, handler(r_type(0x7f, 3, 2, 0b011, 1, CUSTOM0)));
        assert_eq!(FamomaxugPi, handler(r_type(0x63, 3, 2, 0b100, 1, CUSTOM0)));
        assert_eq!(FamominlPs, handler(r_type(0x14, 3, 2, 0b100, 1, CUSTOM0)));
        assert_eq!(FlwlPs, handler(r_type(0x08, 0, 2, 0b111, 1, CUSTOM0)));
        assert_eq!(Unknown, handler(r_type(0x08, 1, 2, 0b111, 1, CUSTOM0)));
        assert_eq!(FscwgPs, handler(r_type(0x69, 3, 2, 0b111, 1, CUSTOM0)));
        // Packed memory operations carry no flags
        assert!(decode(r_type(0, 0, 2, 0b010, 1, CUSTOM0)).0.is_empty());
    }

    #[test]
    fn test_misc_mem() {
        assert_eq!(Fence, handler(0x0ff0_000f));
        assert_eq!(FenceTso, handler(0x8330_000f));
        assert_eq!(FenceI, handler(0x0000_100f));
        assert_eq!(Unknown, handler(0x0000_200f));
    }

    #[test]
    fn test_shifts() {
        // slli a0, a0, 63
        assert_eq!(Slli, handler(0x03f5_1513));
        // srai a0, a0, 1
        assert_eq!(Srai, handler(0x4015_5513));
        assert_eq!(Unknown, handler(0x8015_5513));
        assert_eq!(Unknown, handler(r_type(0x01, 0, 10, 0b001, 10, OP_IMM)));
        assert_eq!(Sraiw, handler(r_type(0x20, 1, 10, 0b101, 10, OP_IMM_32)));
        assert_eq!(Unknown, handler(r_type(0x01, 1, 10, 0b001, 10, OP_IMM_32)));
        assert_eq!(Unknown, handler(r_type(0, 0, 10, 0b010, 10, OP_IMM_32)));
    }

    #[test]
    fn test_op() {
        assert_eq!(Sub, handler(r_type(0x20, 11, 10, 0b000, 10, OP)));
        assert_eq!(Remu, handler(r_type(0x01, 11, 10, 0b111, 10, OP)));
        assert_eq!(Unknown, handler(r_type(0x20, 11, 10, 0b001, 10, OP)));
        assert_eq!(Unknown, handler(r_type(0x02, 11, 10, 0b000, 10, OP)));
    }

    #[test]
    fn test_op_32() {
        assert_eq!(Subw, handler(r_type(0x20, 11, 10, 0b000, 10, OP_32)));
        assert_eq!(Divw, handler(r_type(0x01, 11, 10, 0b100, 10, OP_32)));
        assert_eq!(Unknown, handler(r_type(0x00, 11, 10, 0b100, 10, OP_32)));
        assert_eq!(AmomaxugD, handler(r_type(0x71, 11, 10, 0b011, 10, OP_32)));
        assert_eq!(AmoswaplW, handler(r_type(0x04, 11, 10, 0b010, 10, OP_32)));
        assert_eq!(Packb, handler(r_type(0x40, 11, 10, 0b110, 10, OP_32)));
        assert_eq!(Bitmixb, handler(r_type(0x40, 11, 10, 0b111, 10, OP_32)));
        // Local and global atomics are not flagged as AMO
        assert!(decode(r_type(0x00, 11, 10, 0b010, 10, OP_32)).0.is_empty());
    }

    #[test]
    fn test_amo() {
        // amoadd.w a0, a1, (a2)
        assert_eq!(
            (InstructionFlags::AMO, AmoaddW),
            decode(0x00b6_252f)
        );
        // lr.d a0, (a2)
        assert_eq!((InstructionFlags::AMO, LrD), decode(0x1006_352f));
        // amomaxu.d with aq and rl set
        assert_eq!(AmomaxuD, handler(0xe6b6_352f));
        assert_eq!(
            (InstructionFlags::empty(), Unknown),
            decode(r_type(0x28, 11, 12, 0b010, 10, AMO))
        );
        assert_eq!(Unknown, handler(r_type(0, 11, 12, 0b000, 10, AMO)));
    }

    #[test]
    fn test_wide_slots() {
        assert_eq!(FbciPs, handler(0x3f80_009f | WIDE48A));
        assert_eq!(FaddiPi, handler(r_type(0b10, 0, 2, 0b000, 1, WIDE64)));
        assert_eq!(FcmovPs, handler(r_type(0b10, 0, 2, 0b010, 1, WIDE64)));
        assert_eq!(Unknown, handler(r_type(0b11, 0, 2, 0b000, 1, WIDE64)));
        assert_eq!(Unknown, handler(r_type(0b10, 0, 2, 0b011, 1, WIDE64)));
        assert_eq!(FbciPi, handler(0xffff_f0df));
        assert_eq!(Unknown, handler(0xffff_ffff));
        assert_eq!(Unknown, handler(WIDE80));
    }

    #[test]
    fn test_fp() {
        // fmadd.s f1, f2, f3, f4
        assert_eq!(FmaddS, handler(0x2031_00c3));
        // Only bit 1 of the format is checked
        assert_eq!(FmaddS, handler(0x2231_00c3));
        assert_eq!(Unknown, handler(0x2431_00c3 | MADD));
        assert_eq!(FsgnjxS, handler(r_type(0x10, 3, 2, 0b010, 1, OP_FP)));
        assert_eq!(FsqrtS, handler(r_type(0x2c, 0, 2, 0b111, 1, OP_FP)));
        assert_eq!(Unknown, handler(r_type(0x2c, 1, 2, 0b111, 1, OP_FP)));
        assert_eq!(FcvtLuS, handler(r_type(0x60, 3, 2, 0b001, 1, OP_FP)));
        assert_eq!(FcvtSWu, handler(r_type(0x68, 1, 2, 0b001, 1, OP_FP)));
        assert_eq!(FclassS, handler(r_type(0x70, 0, 2, 0b001, 1, OP_FP)));
        assert_eq!(FmvWX, handler(r_type(0x78, 0, 2, 0b000, 1, OP_FP)));
        assert_eq!(Unknown, handler(r_type(0x78, 0, 2, 0b001, 1, OP_FP)));
        assert_eq!(FnmaddPs, handler(r_type(0b11, 3, 2, 0b000, 1, CUSTOM2)));
    }

    #[test]
    fn test_branch() {
        // beq a0, a1, +16
        assert_eq!(Beq, handler(0x00b5_0863));
        assert_eq!(Unknown, handler(0x00b5_2863));
        assert_eq!(Bgeu, handler(0x00b5_7863));
    }

    #[test]
    fn test_system() {
        assert_eq!((InstructionFlags::empty(), Ecall), decode(0x0000_0073));
        assert_eq!(Ebreak, handler(0x0010_0073));
        assert_eq!(Mret, handler(0x3020_0073));
        assert_eq!(Sret, handler(0x1020_0073));
        assert_eq!(Wfi, handler(0x1050_0073));
        // ecall with rd != 0
        assert_eq!(Unknown, handler(0x0000_00f3));
        // uret is not supported
        assert_eq!(Unknown, handler(0x0020_0073));
        // sfence.vma a0, a1
        assert_eq!(SfenceVma, handler(0x12b5_0073));
        assert_eq!(Unknown, handler(0x12b5_00f3));
    }

    #[test]
    fn test_csr_flags() {
        // csrr a0, mstatus
        assert_eq!(
            (InstructionFlags::CSR_READ, Csrrs),
            decode(0x3000_2573)
        );
        let special = [
            (0x800, InstructionFlags::REDUCE),
            (0x801, InstructionFlags::TENSOR_FMA),
            (0x806, InstructionFlags::TENSOR_QUANT),
            (0x820, InstructionFlags::FLB),
            (0x821, InstructionFlags::FCC),
            (0x822, InstructionFlags::STALL),
            (0x83f, InstructionFlags::TENSOR_LOAD),
        ];
        for (csr, flag) in special {
            let (flags, handler) = decode((csr << 20) | (0b001 << 12) | SYSTEM);
            assert_eq!(InstructionFlags::CSR_READ | flag, flags);
            assert_eq!(Csrrw, handler);
        }
        assert_eq!(Csrrci, handler((0x808 << 20) | (0b111 << 12) | SYSTEM));
        // funct3 == 0b100 is not a CSR instruction, but still flagged
        assert_eq!(
            (InstructionFlags::CSR_READ, Unknown),
            decode((0x300 << 20) | (0b100 << 12) | SYSTEM)
        );
    }

    #[test]
    fn test_reserved2() {
        assert_eq!(FcmovmPs, handler(r_type(0, 3, 2, 0, 1, RESERVED2)));
        assert_eq!(Unknown, handler(r_type(1, 3, 2, 0, 1, RESERVED2)));
        assert_eq!(Unknown, handler(r_type(0, 3, 2, 1, 1, RESERVED2)));
    }

    #[test]
    fn test_custom3_arith() {
        // fadd.ps f1, f2, f3 with rm=dyn
        assert_eq!(FaddPs, handler(0x0031_70fb));
        assert_eq!(FandPi, handler(r_type(0x03, 3, 2, 0b111, 1, CUSTOM3)));
        assert_eq!(FnotPi, handler(r_type(0x03, 0, 2, 0b010, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x03, 3, 2, 0b010, 1, CUSTOM3)));
        assert_eq!(Fsatu8Pi, handler(r_type(0x03, 1, 2, 0b011, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x03, 2, 2, 0b011, 1, CUSTOM3)));
        assert_eq!(FsraPi, handler(r_type(0x07, 3, 2, 0b101, 1, CUSTOM3)));
        assert_eq!(FremuPi, handler(r_type(0x0f, 3, 2, 0b011, 1, CUSTOM3)));
        assert_eq!(FrcpFixRast, handler(r_type(0x18, 3, 2, 0b011, 1, CUSTOM3)));
        assert_eq!(FsraiPi, handler(r_type(0x27, 3, 2, 0b111, 1, CUSTOM3)));
        assert_eq!(FswizzPs, handler(r_type(0x73, 3, 2, 0b111, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x7f, 3, 2, 0b000, 1, CUSTOM3)));
    }

    #[test]
    fn test_custom3_mask_fields() {
        // maskpopc a0, m1
        assert_eq!(Maskpopc, handler(r_type(0x29, 0, 1, 0, 10, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x29, 0, 9, 0, 10, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x2a, 0, 1, 1, 10, CUSTOM3)));
        assert_eq!(MovMX, handler(r_type(0x2b, 0, 10, 0, 7, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x2b, 0, 10, 0, 8, CUSTOM3)));
        assert_eq!(Masknot, handler(r_type(0x33, 0, 2, 0b010, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x33, 1, 2, 0b010, 1, CUSTOM3)));
        assert_eq!(Maskand, handler(r_type(0x33, 7, 7, 0b111, 7, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x33, 8, 7, 0b111, 7, CUSTOM3)));
        assert_eq!(FltmPi, handler(r_type(0x1f, 3, 2, 0, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x1f, 3, 2, 0, 9, CUSTOM3)));
        assert_eq!(FeqmPs, handler(r_type(0x50, 3, 2, 0b110, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x50, 3, 2, 0b110, 8, CUSTOM3)));
        assert_eq!(MovaXM, handler(r_type(0x6b, 0, 0, 0, 10, CUSTOM3)));
        assert_eq!(MovaMX, handler(r_type(0x6b, 0, 10, 1, 0, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x6b, 0, 10, 1, 1, CUSTOM3)));
        assert_eq!(FclassPs, handler(r_type(0x70, 0, 2, 0b001, 10, CUSTOM3)));
        assert_eq!(FmvzXPs, handler(r_type(0x70, 7, 2, 0b000, 10, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x70, 8, 2, 0b000, 10, CUSTOM3)));
        assert_eq!(FlemPs, handler(r_type(0x70, 0, 2, 0b101, 1, CUSTOM3)));
    }

    #[test]
    fn test_custom3_conversions() {
        assert_eq!(FcvtPsF16, handler(r_type(0x68, 0x0a, 2, 0, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x68, 0x0a, 2, 1, 1, CUSTOM3)));
        assert_eq!(FcvtPsPwu, handler(r_type(0x68, 0x01, 2, 7, 1, CUSTOM3)));
        assert_eq!(FcvtF10Ps, handler(r_type(0x6c, 0x0b, 2, 0, 1, CUSTOM3)));
        assert_eq!(FcvtSn8Ps, handler(r_type(0x6c, 0x1b, 2, 0, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x6c, 0x0a, 2, 0, 1, CUSTOM3)));
        assert_eq!(FcvtRastPs, handler(r_type(0x60, 0x02, 2, 0, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x60, 0x02, 2, 1, 1, CUSTOM3)));
    }

    #[test]
    fn test_transcendentals() {
        assert_eq!(
            (InstructionFlags::ONE_ULP, FexpPs),
            decode(r_type(0x2c, 0x04, 2, 0, 1, CUSTOM3))
        );
        // The flag is set even when the rounding mode is invalid
        assert_eq!(
            (InstructionFlags::ONE_ULP, Unknown),
            decode(r_type(0x2c, 0x08, 2, 1, 1, CUSTOM3))
        );
        assert_eq!(
            (InstructionFlags::empty(), FroundPs),
            decode(r_type(0x2c, 0x01, 2, 3, 1, CUSTOM3))
        );
        assert_eq!(FrcpPs, handler(r_type(0x2c, 0x07, 2, 0, 1, CUSTOM3)));
        assert_eq!(Unknown, handler(r_type(0x2c, 0x05, 2, 0, 1, CUSTOM3)));
    }
}
