//! The execution handlers an instruction word can decode to.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

macro_rules! handlers {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $($variant:ident => $mnemonic:literal,)*
        }
    ) => {
        $(#[$attr])*
        pub enum $name {
            $(
                #[doc = concat!("`", $mnemonic, "`")]
                $variant,
            )*
        }

        impl $name {
            /// Every handler, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// The assembler mnemonic of the instruction this handler executes.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $($name::$variant => $mnemonic,)*
                }
            }
        }
    };
}

handlers! {
    /// Identifies the routine that executes a decoded instruction.
    ///
    /// Decoding never fails: any word that is not a recognized encoding maps to
    /// [`Handler::Unknown`], which raises an illegal-instruction exception when executed.
    /// The all-zero 16-bit word is distinguished as [`Handler::CIllegal`].
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub enum Handler {
        Unknown => "unknown",

        // Loads
        Lb => "lb",
        Lh => "lh",
        Lw => "lw",
        Ld => "ld",
        Lbu => "lbu",
        Lhu => "lhu",
        Lwu => "lwu",
        Flw => "flw",
        Flq2 => "flq2",

        // Packed loads, stores, gathers, scatters and atomics
        FbcPs => "fbc.ps",
        Fg32bPs => "fg32b.ps",
        Fg32hPs => "fg32h.ps",
        Fg32wPs => "fg32w.ps",
        FgbPs => "fgb.ps",
        FghPs => "fgh.ps",
        FgwPs => "fgw.ps",
        Fsc32bPs => "fsc32b.ps",
        Fsc32hPs => "fsc32h.ps",
        Fsc32wPs => "fsc32w.ps",
        FscbPs => "fscb.ps",
        FschPs => "fsch.ps",
        FscwPs => "fscw.ps",
        FlwPs => "flw.ps",
        FbcxPs => "fbcx.ps",
        FamoaddlPi => "famoaddl.pi",
        FamoswaplPi => "famoswapl.pi",
        FamoandlPi => "famoandl.pi",
        FamoorlPi => "famoorl.pi",
        FamoxorlPi => "famoxorl.pi",
        FamominlPs => "famominl.ps",
        FamominlPi => "famominl.pi",
        FamomaxlPs => "famomaxl.ps",
        FamomaxlPi => "famomaxl.pi",
        FamominulPi => "famominul.pi",
        FamomaxulPi => "famomaxul.pi",
        FamoaddgPi => "famoaddg.pi",
        FamoswapgPi => "famoswapg.pi",
        FamoandgPi => "famoandg.pi",
        FamoorgPi => "famoorg.pi",
        FamoxorgPi => "famoxorg.pi",
        FamomingPs => "famoming.ps",
        FamomingPi => "famoming.pi",
        FamomaxgPs => "famomaxg.ps",
        FamomaxgPi => "famomaxg.pi",
        FamominugPi => "famominug.pi",
        FamomaxugPi => "famomaxug.pi",
        FswPs => "fsw.ps",
        FlwlPs => "flwl.ps",
        FlwgPs => "flwg.ps",
        FswlPs => "fswl.ps",
        FswgPs => "fswg.ps",
        FgwlPs => "fgwl.ps",
        FgwgPs => "fgwg.ps",
        FscwlPs => "fscwl.ps",
        FscwgPs => "fscwg.ps",

        // Memory ordering
        FenceTso => "fence.tso",
        Fence => "fence",
        FenceI => "fence.i",

        // Integer register-immediate
        Addi => "addi",
        Slli => "slli",
        Slti => "slti",
        Sltiu => "sltiu",
        Xori => "xori",
        Srli => "srli",
        Srai => "srai",
        Ori => "ori",
        Andi => "andi",
        Auipc => "auipc",
        Addiw => "addiw",
        Slliw => "slliw",
        Srliw => "srliw",
        Sraiw => "sraiw",
        FbciPs => "fbci.ps",

        // Stores
        Sb => "sb",
        Sh => "sh",
        Sw => "sw",
        Sd => "sd",
        Fsw => "fsw",
        Fsq2 => "fsq2",

        // Standard atomics
        AmoaddW => "amoadd.w",
        AmoswapW => "amoswap.w",
        LrW => "lr.w",
        ScW => "sc.w",
        AmoxorW => "amoxor.w",
        AmoorW => "amoor.w",
        AmoandW => "amoand.w",
        AmominW => "amomin.w",
        AmomaxW => "amomax.w",
        AmominuW => "amominu.w",
        AmomaxuW => "amomaxu.w",
        AmoaddD => "amoadd.d",
        AmoswapD => "amoswap.d",
        LrD => "lr.d",
        ScD => "sc.d",
        AmoxorD => "amoxor.d",
        AmoorD => "amoor.d",
        AmoandD => "amoand.d",
        AmominD => "amomin.d",
        AmomaxD => "amomax.d",
        AmominuD => "amominu.d",
        AmomaxuD => "amomaxu.d",

        // Integer register-register
        Add => "add",
        Sll => "sll",
        Slt => "slt",
        Sltu => "sltu",
        Xor => "xor",
        Srl => "srl",
        Or => "or",
        And => "and",
        Mul => "mul",
        Mulh => "mulh",
        Mulhsu => "mulhsu",
        Mulhu => "mulhu",
        Div => "div",
        Divu => "divu",
        Rem => "rem",
        Remu => "remu",
        Sub => "sub",
        Sra => "sra",
        Lui => "lui",
        Addw => "addw",
        Sllw => "sllw",
        Srlw => "srlw",
        Mulw => "mulw",
        Divw => "divw",
        Divuw => "divuw",
        Remw => "remw",
        Remuw => "remuw",
        Subw => "subw",
        Sraw => "sraw",

        // Local and global scalar atomics
        AmoaddlW => "amoaddl.w",
        AmoaddgW => "amoaddg.w",
        AmoswaplW => "amoswapl.w",
        AmoswapgW => "amoswapg.w",
        AmoxorlW => "amoxorl.w",
        AmoxorgW => "amoxorg.w",
        AmoorlW => "amoorl.w",
        AmoorgW => "amoorg.w",
        AmoandlW => "amoandl.w",
        AmoandgW => "amoandg.w",
        AmominlW => "amominl.w",
        AmomingW => "amoming.w",
        AmomaxlW => "amomaxl.w",
        AmomaxgW => "amomaxg.w",
        AmominulW => "amominul.w",
        AmominugW => "amominug.w",
        AmomaxulW => "amomaxul.w",
        AmomaxugW => "amomaxug.w",
        AmoaddlD => "amoaddl.d",
        AmoaddgD => "amoaddg.d",
        AmoswaplD => "amoswapl.d",
        AmoswapgD => "amoswapg.d",
        AmoxorlD => "amoxorl.d",
        AmoxorgD => "amoxorg.d",
        AmoorlD => "amoorl.d",
        AmoorgD => "amoorg.d",
        AmoandlD => "amoandl.d",
        AmoandgD => "amoandg.d",
        AmominlD => "amominl.d",
        AmomingD => "amoming.d",
        AmomaxlD => "amomaxl.d",
        AmomaxgD => "amomaxg.d",
        AmominulD => "amominul.d",
        AmominugD => "amominug.d",
        AmomaxulD => "amomaxul.d",
        AmomaxugD => "amomaxug.d",
        Packb => "packb",
        Bitmixb => "bitmixb",

        // Packed immediates
        FaddiPi => "faddi.pi",
        FandiPi => "fandi.pi",
        FcmovPs => "fcmov.ps",

        // Scalar floating point
        FmaddS => "fmadd.s",
        FmsubS => "fmsub.s",
        FnmsubS => "fnmsub.s",
        FnmaddS => "fnmadd.s",
        FaddS => "fadd.s",
        FsubS => "fsub.s",
        FmulS => "fmul.s",
        FdivS => "fdiv.s",
        FsgnjS => "fsgnj.s",
        FsgnjnS => "fsgnjn.s",
        FsgnjxS => "fsgnjx.s",
        FminS => "fmin.s",
        FmaxS => "fmax.s",
        FsqrtS => "fsqrt.s",
        FleS => "fle.s",
        FltS => "flt.s",
        FeqS => "feq.s",
        FcvtWS => "fcvt.w.s",
        FcvtWuS => "fcvt.wu.s",
        FcvtLS => "fcvt.l.s",
        FcvtLuS => "fcvt.lu.s",
        FcvtSW => "fcvt.s.w",
        FcvtSWu => "fcvt.s.wu",
        FcvtSL => "fcvt.s.l",
        FcvtSLu => "fcvt.s.lu",
        FmvXW => "fmv.x.w",
        FclassS => "fclass.s",
        FmvWX => "fmv.w.x",
        FmaddPs => "fmadd.ps",
        FmsubPs => "fmsub.ps",
        FnmsubPs => "fnmsub.ps",
        FnmaddPs => "fnmadd.ps",
        FbciPi => "fbci.pi",

        // Control transfer
        Beq => "beq",
        Bne => "bne",
        Blt => "blt",
        Bge => "bge",
        Bltu => "bltu",
        Bgeu => "bgeu",
        Jalr => "jalr",
        Jal => "jal",

        // System
        Csrrw => "csrrw",
        Csrrs => "csrrs",
        Csrrc => "csrrc",
        Csrrwi => "csrrwi",
        Csrrsi => "csrrsi",
        Csrrci => "csrrci",
        Ecall => "ecall",
        Ebreak => "ebreak",
        Sret => "sret",
        Mret => "mret",
        Wfi => "wfi",
        SfenceVma => "sfence.vma",

        // Packed floating point and packed integer
        FcmovmPs => "fcmovm.ps",
        FaddPs => "fadd.ps",
        FaddPi => "fadd.pi",
        FsllPi => "fsll.pi",
        FnotPi => "fnot.pi",
        Fsat8Pi => "fsat8.pi",
        Fsatu8Pi => "fsatu8.pi",
        FxorPi => "fxor.pi",
        FsrlPi => "fsrl.pi",
        ForPi => "for.pi",
        FandPi => "fand.pi",
        FsubPs => "fsub.ps",
        FsubPi => "fsub.pi",
        FsraPi => "fsra.pi",
        FmulPs => "fmul.ps",
        FmulPi => "fmul.pi",
        FmulhPi => "fmulh.pi",
        FmulhuPi => "fmulhu.pi",
        FdivPs => "fdiv.ps",
        FdivPi => "fdiv.pi",
        FdivuPi => "fdivu.pi",
        FremPi => "frem.pi",
        FremuPi => "fremu.pi",
        FsgnjPs => "fsgnj.ps",
        FsgnjnPs => "fsgnjn.ps",
        FsgnjxPs => "fsgnjx.ps",
        FpackrepbPi => "fpackrepb.pi",
        FpackrephPi => "fpackreph.pi",
        FminPs => "fmin.ps",
        FmaxPs => "fmax.ps",
        FminPi => "fmin.pi",
        FmaxPi => "fmax.pi",
        FminuPi => "fminu.pi",
        FmaxuPi => "fmaxu.pi",
        FrcpFixRast => "frcp.fix.rast",
        FltmPi => "fltm.pi",
        FslliPi => "fslli.pi",
        FsrliPi => "fsrli.pi",
        FsraiPi => "fsrai.pi",
        Maskpopc => "maskpopc",
        Maskpopcz => "maskpopcz",
        MovMX => "mov.m.x",
        FsqrtPs => "fsqrt.ps",
        FroundPs => "fround.ps",
        FfrcPs => "ffrc.ps",
        FlogPs => "flog.ps",
        FexpPs => "fexp.ps",
        FsinPs => "fsin.ps",
        FrcpPs => "frcp.ps",
        FrsqPs => "frsq.ps",
        MaskpopcRast => "maskpopc.rast",
        Masknot => "masknot",
        Maskxor => "maskxor",
        Maskor => "maskor",
        Maskand => "maskand",
        CubefacePs => "cubeface.ps",
        CubefaceidxPs => "cubefaceidx.ps",
        CubesgnscPs => "cubesgnsc.ps",
        CubesgntcPs => "cubesgntc.ps",
        FlePs => "fle.ps",
        FltPs => "flt.ps",
        FeqPs => "feq.ps",
        FlemPs => "flem.ps",
        FltmPs => "fltm.ps",
        FeqmPs => "feqm.ps",
        FlePi => "fle.pi",
        FltPi => "flt.pi",
        FeqPi => "feq.pi",
        FltuPi => "fltu.pi",
        FcvtPwPs => "fcvt.pw.ps",
        FcvtPwuPs => "fcvt.pwu.ps",
        FcvtRastPs => "fcvt.rast.ps",
        FcvtPsPw => "fcvt.ps.pw",
        FcvtPsPwu => "fcvt.ps.pwu",
        FcvtPsRast => "fcvt.ps.rast",
        FcvtPsF10 => "fcvt.ps.f10",
        FcvtPsF11 => "fcvt.ps.f11",
        FcvtPsF16 => "fcvt.ps.f16",
        FcvtPsUn24 => "fcvt.ps.un24",
        FcvtPsUn16 => "fcvt.ps.un16",
        FcvtPsUn10 => "fcvt.ps.un10",
        FcvtPsUn8 => "fcvt.ps.un8",
        FcvtPsUn2 => "fcvt.ps.un2",
        FcvtPsSn16 => "fcvt.ps.sn16",
        FcvtPsSn8 => "fcvt.ps.sn8",
        MovaXM => "mova.x.m",
        MovaMX => "mova.m.x",
        FcvtF11Ps => "fcvt.f11.ps",
        FcvtF16Ps => "fcvt.f16.ps",
        FcvtF10Ps => "fcvt.f10.ps",
        FcvtUn24Ps => "fcvt.un24.ps",
        FcvtUn16Ps => "fcvt.un16.ps",
        FcvtUn10Ps => "fcvt.un10.ps",
        FcvtUn8Ps => "fcvt.un8.ps",
        FcvtUn2Ps => "fcvt.un2.ps",
        FcvtSn16Ps => "fcvt.sn16.ps",
        FcvtSn8Ps => "fcvt.sn8.ps",
        FmvzXPs => "fmvz.x.ps",
        FclassPs => "fclass.ps",
        FmvsXPs => "fmvs.x.ps",
        FswizzPs => "fswizz.ps",

        // Compressed
        CAddi4spn => "c.addi4spn",
        CIllegal => "c.illegal",
        CLw => "c.lw",
        CLd => "c.ld",
        CSw => "c.sw",
        CSd => "c.sd",
        CNop => "c.nop",
        CAddi => "c.addi",
        CAddiw => "c.addiw",
        CLi => "c.li",
        CAddi16sp => "c.addi16sp",
        CLui => "c.lui",
        CSrli => "c.srli",
        CSrai => "c.srai",
        CAndi => "c.andi",
        CSub => "c.sub",
        CXor => "c.xor",
        COr => "c.or",
        CAnd => "c.and",
        CSubw => "c.subw",
        CAddw => "c.addw",
        CJ => "c.j",
        CBeqz => "c.beqz",
        CBnez => "c.bnez",
        CSlli => "c.slli",
        CLwsp => "c.lwsp",
        CLdsp => "c.ldsp",
        CMv => "c.mv",
        CJr => "c.jr",
        CEbreak => "c.ebreak",
        CAdd => "c.add",
        CJalr => "c.jalr",
        CSwsp => "c.swsp",
        CSdsp => "c.sdsp",
    }
}

impl Handler {
    /// Returns `true` for the handlers of 16-bit instructions.
    pub fn is_compressed(self) -> bool {
        self.mnemonic().starts_with("c.")
    }

    /// Returns `true` if this is the handler for unrecognized encodings.
    pub fn is_unknown(self) -> bool {
        self == Handler::Unknown
    }
}

impl Default for Handler {
    fn default() -> Self {
        Handler::Unknown
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("unknown mnemonic: {0:?}")]
pub struct UnknownMnemonic(pub String);

impl FromStr for Handler {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Handler::ALL
            .iter()
            .copied()
            .find(|handler| handler.mnemonic() == s)
            .ok_or_else(|| UnknownMnemonic(s.to_owned()))
    }
}
