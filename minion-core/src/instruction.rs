use crate::decode;
use crate::handler::Handler;
use crate::registers::{FReg, MReg, XReg};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A fetched and decoded instruction: its raw encoding, the handler executing it, and the side
/// information the pipeline needs before execution.
///
/// For a compressed instruction only the low 16 bits of [`bits`](Self::bits) are set.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Instruction {
    bits: u32,
    flags: InstructionFlags,
    handler: Handler,
}

impl Instruction {
    /// Decode a raw instruction word.
    ///
    /// The encoding length follows from the two low bits. A compressed instruction only uses the
    /// lower halfword, the upper one is ignored.
    pub fn decode(raw_instruction: u32) -> Self {
        let compressed = is_compressed(raw_instruction);
        let bits = if compressed {
            raw_instruction & 0xFFFF
        } else {
            raw_instruction
        };
        let (flags, handler) = decode::decode(bits, compressed);
        Self {
            bits,
            flags,
            handler,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn flags(&self) -> InstructionFlags {
        self.flags
    }

    pub fn handler(&self) -> Handler {
        self.handler
    }

    /// The length of the instruction in bytes: 2 or 4.
    pub fn size(&self) -> u64 {
        if self.is_compressed() {
            2
        } else {
            4
        }
    }

    pub fn is_compressed(&self) -> bool {
        is_compressed(self.bits)
    }

    pub fn is_load(&self) -> bool {
        self.flags.contains(InstructionFlags::LOAD)
    }

    pub fn is_amo(&self) -> bool {
        self.flags.contains(InstructionFlags::AMO)
    }

    pub fn is_csr_read(&self) -> bool {
        self.flags.contains(InstructionFlags::CSR_READ)
    }

    // 32-bit operand fields

    /// Returns the 5-bit *rd* field as an `x` register.
    pub fn rd(&self) -> XReg {
        XReg::from_u5(field(self.bits, 7, 0x1F))
    }

    /// Returns the 5-bit *rs1* field as an `x` register.
    pub fn rs1(&self) -> XReg {
        XReg::from_u5(field(self.bits, 15, 0x1F))
    }

    /// Returns the 5-bit *rs2* field as an `x` register.
    pub fn rs2(&self) -> XReg {
        XReg::from_u5(field(self.bits, 20, 0x1F))
    }

    pub fn fd(&self) -> FReg {
        FReg::from_u5(field(self.bits, 7, 0x1F))
    }

    pub fn fs1(&self) -> FReg {
        FReg::from_u5(field(self.bits, 15, 0x1F))
    }

    pub fn fs2(&self) -> FReg {
        FReg::from_u5(field(self.bits, 20, 0x1F))
    }

    /// Returns the third source of the fused multiply-add formats, in bits 31:27.
    pub fn fs3(&self) -> FReg {
        FReg::from_u5(field(self.bits, 27, 0x1F))
    }

    pub fn md(&self) -> MReg {
        MReg::from_u3(field(self.bits, 7, 0x7))
    }

    pub fn ms1(&self) -> MReg {
        MReg::from_u3(field(self.bits, 15, 0x7))
    }

    pub fn ms2(&self) -> MReg {
        MReg::from_u3(field(self.bits, 20, 0x7))
    }

    /// Returns the 3-bit rounding mode field.
    pub fn rm(&self) -> u8 {
        field(self.bits, 12, 0x7)
    }

    // 32-bit immediates

    /// Returns the 12-bit I-immediate sign-extended to 64 bits.
    pub fn i_imm(&self) -> i64 {
        sign_extend((self.bits >> 20) & 0xFFF, 12)
    }

    /// Returns the 12-bit S-immediate sign-extended to 64 bits.
    pub fn s_imm(&self) -> i64 {
        let b = self.bits;
        sign_extend(((b >> 20) & 0xFE0) | ((b >> 7) & 0x1F), 12)
    }

    /// Returns the 13-bit B-immediate sign-extended to 64 bits.
    pub fn b_imm(&self) -> i64 {
        let b = self.bits;
        sign_extend(
            ((b >> 7) & 0x1E) | ((b >> 20) & 0x7E0) | ((b << 4) & 0x800) | ((b >> 19) & 0x1000),
            13,
        )
    }

    /// Returns the U-immediate sign-extended to 64 bits.
    pub fn u_imm(&self) -> i64 {
        sign_extend(self.bits & 0xFFFF_F000, 32)
    }

    /// Returns the 21-bit J-immediate sign-extended to 64 bits.
    pub fn j_imm(&self) -> i64 {
        let b = self.bits;
        sign_extend(
            ((b >> 20) & 0x7FE) | ((b >> 9) & 0x800) | (b & 0xF_F000) | ((b >> 11) & 0x10_0000),
            21,
        )
    }

    /// Returns the zero-extended 5-bit immediate of the CSR-immediate instructions.
    pub fn uimm5(&self) -> u32 {
        (self.bits >> 15) & 0x1F
    }

    pub fn shamt5(&self) -> u32 {
        (self.bits >> 20) & 0x1F
    }

    pub fn shamt6(&self) -> u32 {
        (self.bits >> 20) & 0x3F
    }

    /// Returns the 12-bit CSR address.
    pub fn csr(&self) -> u16 {
        ((self.bits >> 20) & 0xFFF) as u16
    }

    pub fn uimm3(&self) -> u32 {
        (self.bits >> 20) & 0x7
    }

    /// Returns the 8-bit immediate of `fswizz.ps`, split over bits 14:12 and 24:20.
    pub fn uimm8(&self) -> u32 {
        ((self.bits >> 12) & 0x7) | ((self.bits >> 17) & 0xF8)
    }

    /// Returns the single precision value built from the 20-bit immediate of `fbci.ps`.
    ///
    /// The low mantissa bits are filled by replicating the lowest immediate nibble.
    pub fn f32imm(&self) -> u32 {
        let value = self.bits & 0xFFFF_F000;
        let low4 = (value >> 12) & 0xF;
        let fill = if low4 < 8 { low4 } else { low4 + 1 };
        value | (low4 << 8) | (low4 << 4) | fill
    }

    /// Returns the 20-bit immediate of `fbci.pi` sign-extended to 64 bits.
    pub fn i32imm(&self) -> i64 {
        sign_extend((self.bits & 0xFFFF_F000) >> 12, 20)
    }

    /// Returns the 10-bit immediate of the packed-integer immediate formats.
    pub fn v_imm(&self) -> i64 {
        let b = self.bits;
        sign_extend(((b >> 20) & 0x1F) | ((b >> 22) & 0x3E0), 10)
    }

    /// Returns the 4-bit unsigned mask immediate.
    pub fn umsk4(&self) -> u32 {
        ((self.bits >> 18) & 0x3) | ((self.bits >> 21) & 0xC)
    }

    // Compressed operand fields

    pub fn c_rs1(&self) -> XReg {
        XReg::from_u5(field(self.bits, 7, 0x1F))
    }

    pub fn c_rs2(&self) -> XReg {
        XReg::from_u5(field(self.bits, 2, 0x1F))
    }

    /// Returns the 3-bit *rs1'* field, mapped onto `x8..=x15`.
    pub fn c_rs1p(&self) -> XReg {
        XReg::from_compressed(field(self.bits, 7, 0x7))
    }

    /// Returns the 3-bit *rs2'* field, mapped onto `x8..=x15`.
    pub fn c_rs2p(&self) -> XReg {
        XReg::from_compressed(field(self.bits, 2, 0x7))
    }

    // Compressed immediates

    pub fn c_imm6(&self) -> i64 {
        let b = self.bits;
        sign_extend(((b >> 2) & 0x1F) | ((b >> 7) & 0x20), 6)
    }

    pub fn c_nzimm_addi16sp(&self) -> i64 {
        let b = self.bits;
        sign_extend(
            ((b >> 2) & 0x10)
                | ((b << 3) & 0x20)
                | ((b << 1) & 0x40)
                | ((b << 4) & 0x180)
                | ((b >> 3) & 0x200),
            10,
        )
    }

    pub fn c_nzuimm_addi4spn(&self) -> u32 {
        let b = self.bits;
        ((b >> 4) & 0x4) | ((b >> 2) & 0x8) | ((b >> 7) & 0x30) | ((b >> 1) & 0x3C0)
    }

    pub fn c_nzimm_lui(&self) -> i64 {
        let b = self.bits;
        sign_extend(((b << 10) & 0x1_F000) | ((b << 5) & 0x2_0000), 18)
    }

    pub fn c_imm_lwsp(&self) -> u32 {
        let b = self.bits;
        ((b >> 2) & 0x1C) | ((b >> 7) & 0x20) | ((b << 4) & 0xC0)
    }

    pub fn c_imm_ldsp(&self) -> u32 {
        let b = self.bits;
        ((b >> 2) & 0x18) | ((b >> 7) & 0x20) | ((b << 4) & 0x1C0)
    }

    pub fn c_imm_swsp(&self) -> u32 {
        let b = self.bits;
        ((b >> 7) & 0x3C) | ((b >> 1) & 0xC0)
    }

    pub fn c_imm_sdsp(&self) -> u32 {
        let b = self.bits;
        ((b >> 7) & 0x38) | ((b >> 1) & 0x1C0)
    }

    /// Returns the offset of `c.lw` and `c.sw`.
    pub fn c_imm_lsw(&self) -> u32 {
        let b = self.bits;
        ((b >> 4) & 0x4) | ((b >> 7) & 0x38) | ((b << 1) & 0x40)
    }

    /// Returns the offset of `c.ld` and `c.sd`.
    pub fn c_imm_lsd(&self) -> u32 {
        let b = self.bits;
        ((b >> 7) & 0x38) | ((b << 1) & 0xC0)
    }

    pub fn c_j_imm(&self) -> i64 {
        let b = self.bits;
        sign_extend(
            ((b >> 2) & 0xE)
                | ((b >> 7) & 0x10)
                | ((b << 3) & 0x20)
                | ((b << 1) & 0x80)
                | ((b << 2) & 0x400)
                | ((b >> 1) & 0xB40),
            12,
        )
    }

    pub fn c_b_imm(&self) -> i64 {
        let b = self.bits;
        sign_extend(
            ((b >> 2) & 0x6)
                | ((b >> 7) & 0x18)
                | ((b << 3) & 0x20)
                | ((b << 1) & 0xC0)
                | ((b >> 4) & 0x100),
            9,
        )
    }

    pub fn c_shamt(&self) -> u32 {
        ((self.bits >> 2) & 0x1F) | ((self.bits >> 7) & 0x20)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_compressed() {
            write!(f, "{:04x} {}", self.bits, self.handler)
        } else {
            write!(f, "{:08x} {}", self.bits, self.handler)
        }
    }
}

/// Side information about a decoded instruction, needed by the pipeline before execution.
///
/// The flags are a pure function of the instruction's encoding.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct InstructionFlags(u16);

impl InstructionFlags {
    /// A transcendental whose result is only accurate to one unit in the last place.
    pub const ONE_ULP: Self = Self(0x001);
    /// An atomic memory operation.
    pub const AMO: Self = Self(0x002);
    /// A CSR access that reads the old CSR value.
    pub const CSR_READ: Self = Self(0x004);
    /// Accesses the `fcc` credit counter CSR.
    pub const FCC: Self = Self(0x008);
    /// Accesses the `flb` barrier CSR.
    pub const FLB: Self = Self(0x010);
    /// Reads memory into a register.
    pub const LOAD: Self = Self(0x020);
    /// Starts a tensor reduction.
    pub const REDUCE: Self = Self(0x040);
    /// Starts a tensor multiply-accumulate.
    pub const TENSOR_FMA: Self = Self(0x080);
    /// Starts a tensor load.
    pub const TENSOR_LOAD: Self = Self(0x100);
    /// Starts a tensor quantization.
    pub const TENSOR_QUANT: Self = Self(0x200);
    /// Stalls the hart until outstanding tensor operations complete.
    pub const STALL: Self = Self(0x800);

    const NAMES: [(Self, &'static str); 11] = [
        (Self::ONE_ULP, "ONE_ULP"),
        (Self::AMO, "AMO"),
        (Self::CSR_READ, "CSR_READ"),
        (Self::FCC, "FCC"),
        (Self::FLB, "FLB"),
        (Self::LOAD, "LOAD"),
        (Self::REDUCE, "REDUCE"),
        (Self::TENSOR_FMA, "TENSOR_FMA"),
        (Self::TENSOR_LOAD, "TENSOR_LOAD"),
        (Self::TENSOR_QUANT, "TENSOR_QUANT"),
        (Self::STALL, "STALL"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for InstructionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InstructionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Debug for InstructionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstructionFlags(")?;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

/// Returns `true` if the two low bits mark a 16-bit encoding.
pub(crate) const fn is_compressed(raw_instruction: u32) -> bool {
    raw_instruction & 0b11 != 0b11
}

fn field(raw_instruction: u32, shift: u32, mask: u32) -> u8 {
    ((raw_instruction >> shift) & mask) as u8
}

/// Sign-extend the low `width` bits of `value` to 64 bits.
fn sign_extend(value: u32, width: u32) -> i64 {
    let shift = 32 - width;
    ((value << shift) as i32 >> shift) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insn(bits: u32) -> Instruction {
        Instruction::decode(bits)
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(-1, sign_extend(0xFFF, 12));
        assert_eq!(2047, sign_extend(0x7FF, 12));
        assert_eq!(-2048, sign_extend(0x800, 12));
        assert_eq!(i32::MIN as i64, sign_extend(0x8000_0000, 32));
        assert_eq!(0, sign_extend(0, 6));
    }

    #[test]
    fn test_decode_add() {
        // add a0, a0, a0
        let instruction = insn(0x00a5_0533);
        assert_eq!(Handler::Add, instruction.handler());
        assert!(instruction.flags().is_empty());
        assert_eq!(4, instruction.size());
        assert_eq!(10, u8::from(instruction.rd()));
        assert_eq!(10, u8::from(instruction.rs1()));
        assert_eq!(10, u8::from(instruction.rs2()));
        assert_eq!("00a50533 add", instruction.to_string());
    }

    #[test]
    fn test_compressed_ignores_upper_half() {
        // c.nop with garbage above it
        let instruction = insn(0xDEAD_0001);
        assert!(instruction.is_compressed());
        assert_eq!(0x0001, instruction.bits());
        assert_eq!(Handler::CNop, instruction.handler());
        assert_eq!(2, instruction.size());
    }

    #[test]
    fn test_i_imm() {
        assert_eq!(0, insn(0x0000_0013).i_imm());
        assert_eq!(-1, insn(0xFFF0_0013).i_imm());
        assert_eq!(2047, insn((2047 << 20) | 0x13).i_imm());
        assert_eq!(-2048, insn(0x8000_0013).i_imm());
        // Check other bits are ignored
        assert_eq!(0, insn(0x000F_FFFF).i_imm());
        assert_eq!(-1, insn(0xFFF1_2347).i_imm());
    }

    #[test]
    fn test_s_imm() {
        // sd a0, -8(sp)
        assert_eq!(-8, insn(0xFEA1_3C23).s_imm());
        // sw a1, 12(a0)
        assert_eq!(12, insn(0x00B5_2623).s_imm());
    }

    #[test]
    fn test_b_imm() {
        // beq a0, a1, +16
        assert_eq!(16, insn(0x00B5_0863).b_imm());
        // bne a0, zero, -4
        assert_eq!(-4, insn(0xFE05_1EE3).b_imm());
    }

    #[test]
    fn test_u_j_imm() {
        // lui a0, 0x80000
        assert_eq!(-0x8000_0000, insn(0x8000_0537).u_imm());
        // jal ra, +2048
        assert_eq!(2048, insn(0x0010_00EF).j_imm());
        // jal zero, -2
        assert_eq!(-2, insn(0xFFFF_F06F).j_imm());
    }

    #[test]
    fn test_system_fields() {
        // csrrs a0, 0x821, zero
        let instruction = insn(0x8210_2573);
        assert_eq!(0x821, instruction.csr());
        // csrrwi zero, 0x808, 5
        assert_eq!(5, insn(0x8082_D073).uimm5());
        // slli a0, a0, 63
        assert_eq!(63, insn(0x03F5_1513).shamt6());
        assert_eq!(31, insn(0x03F5_1513).shamt5());
    }

    #[test]
    fn test_vector_immediates() {
        assert_eq!(0x3F80_0000, insn(0x3F80_001F).f32imm());
        // Lowest nibble 0x9 fills the mantissa as 0x99a
        assert_eq!(0x4009_999A, insn(0x4009_901F).f32imm());
        assert_eq!(-1, insn(0xFFFF_F07F).i32imm());
        assert_eq!(0x7FFFF, insn(0x7FFF_F07F).i32imm());
        assert_eq!(-1, insn(0xFFF0_007B).v_imm());
        assert_eq!(0xF, insn(0x01EC_007B).umsk4());
        assert_eq!(0xFF, insn(0x01F0_707B).uimm8());
    }

    #[test]
    fn test_register_fields() {
        // fmadd.s f1, f2, f3, f4
        let instruction = insn(0x2031_00C3);
        assert_eq!(1, u8::from(instruction.fd()));
        assert_eq!(2, u8::from(instruction.fs1()));
        assert_eq!(3, u8::from(instruction.fs2()));
        assert_eq!(4, u8::from(instruction.fs3()));
        assert_eq!(1, u8::from(instruction.md()));
        assert_eq!(0, instruction.rm());
    }

    #[test]
    fn test_compressed_immediates() {
        // c.addi a0, -1
        assert_eq!(-1, insn(0x157D).c_imm6());
        // c.addi16sp sp, -64
        assert_eq!(-64, insn(0x7139).c_nzimm_addi16sp());
        // c.addi4spn a0, sp, 16
        assert_eq!(16, insn(0x0808).c_nzuimm_addi4spn());
        // c.lui a0, 0x1
        assert_eq!(0x1000, insn(0x6505).c_nzimm_lui());
        // c.lwsp a0, 4(sp)
        assert_eq!(4, insn(0x4512).c_imm_lwsp());
        // c.ldsp a0, 8(sp)
        assert_eq!(8, insn(0x6522).c_imm_ldsp());
        // c.swsp a0, 4(sp)
        assert_eq!(4, insn(0xC22A).c_imm_swsp());
        // c.sdsp a0, 8(sp)
        assert_eq!(8, insn(0xE42A).c_imm_sdsp());
        // c.lw a0, 4(a1)
        assert_eq!(4, insn(0x41C8).c_imm_lsw());
        // c.ld a0, 8(a1)
        assert_eq!(8, insn(0x6588).c_imm_lsd());
        // c.j -2
        assert_eq!(-2, insn(0xBFFD).c_j_imm());
        // c.beqz a0, +8
        assert_eq!(8, insn(0xC501).c_b_imm());
        // c.slli a0, 32
        assert_eq!(32, insn(0x1502).c_shamt());
        assert_eq!(10, u8::from(insn(0x1502).c_rs1()));
    }

    #[test]
    fn test_compressed_registers() {
        // c.lw a0, 4(a1)
        let instruction = insn(0x41C8);
        assert_eq!(11, u8::from(instruction.c_rs1p()));
        assert_eq!(10, u8::from(instruction.c_rs2p()));
        // c.mv a0, a1
        assert_eq!(11, u8::from(insn(0x852E).c_rs2()));
    }

    #[test]
    fn test_flags() {
        let mut flags = InstructionFlags::empty();
        assert!(flags.is_empty());
        flags |= InstructionFlags::LOAD;
        flags.insert(InstructionFlags::CSR_READ);
        assert!(flags.contains(InstructionFlags::LOAD | InstructionFlags::CSR_READ));
        assert!(!flags.contains(InstructionFlags::AMO));
        assert_eq!(0x024, flags.bits());
        assert_eq!("InstructionFlags(CSR_READ | LOAD)", format!("{flags:?}"));
        assert_eq!("InstructionFlags()", format!("{:?}", InstructionFlags::default()));
    }
}
