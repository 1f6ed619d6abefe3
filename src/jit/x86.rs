//! x86 instruction descriptors.
//!
//! The realizer produces these; the encoder serializes them. Every
//! descriptor knows its exact encoded byte length up front, so code
//! offsets (and with them, label positions and jump displacements) are
//! fixed before a single byte is emitted.
//!
//! The generated code works on 32-bit operands throughout, matching the
//! 32-bit MIPS registers it models.

use crate::labels::{LabelArena, LabelId};

/// x86-64 host registers usable by the generated code.
///
/// `r8d..r15d` are "extended": encoding them needs a REX prefix byte,
/// which also makes the instruction one byte longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum X86Reg {
    Eax = 0,
    Ecx = 1,
    Edx = 2,
    Ebx = 3,
    Esi = 6,
    Edi = 7,
    R8d = 8,
    R9d = 9,
    R10d = 10,
    R11d = 11,
    R12d = 12,
    R13d = 13,
    R14d = 14,
    R15d = 15,
}

/// Scratch register for left-hand values and loads.
pub const SCRATCH_A: X86Reg = X86Reg::Eax;
/// Scratch register for right-hand values.
pub const SCRATCH_B: X86Reg = X86Reg::Ecx;

/// Registers available to the register mapper, in assignment order.
/// `eax`/`ecx` are excluded: the realizer owns them as scratch.
pub const POOL: [X86Reg; 12] = [
    X86Reg::Edx,
    X86Reg::Ebx,
    X86Reg::Esi,
    X86Reg::Edi,
    X86Reg::R8d,
    X86Reg::R9d,
    X86Reg::R10d,
    X86Reg::R11d,
    X86Reg::R12d,
    X86Reg::R13d,
    X86Reg::R14d,
    X86Reg::R15d,
];

/// Highest stack slot whose byte displacement (`slot * 4`) still fits
/// the signed 8-bit displacement of the stack addressing form.
pub const MAX_STACK_SLOT: u8 = 31;

impl X86Reg {
    /// Hardware register number (4 bits).
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The low 3 bits that go into a ModRM field.
    pub fn modrm_bits(self) -> u8 {
        self.code() & 0x7
    }

    /// Whether encoding this register requires a REX prefix.
    pub fn is_extended(self) -> bool {
        self.code() >= 8
    }

    /// Position in the allocatable pool, used as the read-back index
    /// into the host-register backing array.
    pub fn pool_index(self) -> Option<usize> {
        POOL.iter().position(|&r| r == self)
    }

    pub fn name(self) -> &'static str {
        match self {
            X86Reg::Eax => "eax",
            X86Reg::Ecx => "ecx",
            X86Reg::Edx => "edx",
            X86Reg::Ebx => "ebx",
            X86Reg::Esi => "esi",
            X86Reg::Edi => "edi",
            X86Reg::R8d => "r8d",
            X86Reg::R9d => "r9d",
            X86Reg::R10d => "r10d",
            X86Reg::R11d => "r11d",
            X86Reg::R12d => "r12d",
            X86Reg::R13d => "r13d",
            X86Reg::R14d => "r14d",
            X86Reg::R15d => "r15d",
        }
    }
}

impl std::fmt::Display for X86Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn extended(reg: X86Reg) -> u8 {
    reg.is_extended() as u8
}

/// A concrete x86 instruction, one variant per encoding shape.
///
/// Stack operands are slot indexes into the stack-backing array addressed
/// through `rbp` (displacement = slot * 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum X86Instr {
    /// `xor r, r`
    ZeroReg { reg: X86Reg },
    /// `mov r, imm32`
    MovRegImm { dest: X86Reg, imm: u16 },
    /// `mov dword [rbp + slot*4], imm32`
    MovStackImm { dest_slot: u8, imm: u16 },
    /// `mov dest, src`
    MovRegReg { dest: X86Reg, src: X86Reg },
    /// `mov dest, dword [rbp + slot*4]`
    MovRegStack { dest: X86Reg, src_slot: u8 },
    /// `mov dword [rbp + slot*4], src`
    MovStackReg { dest_slot: u8, src: X86Reg },
    /// `add dest, src`
    AddRegReg { dest: X86Reg, src: X86Reg },
    /// `and dest, src`
    AndRegReg { dest: X86Reg, src: X86Reg },
    /// `shr reg, amount`
    ShrRegImm { reg: X86Reg, amount: u8 },
    /// `shl reg, amount`
    ShlRegImm { reg: X86Reg, amount: u8 },
    /// `cmp lhs, rhs`
    CmpRegReg { lhs: X86Reg, rhs: X86Reg },
    /// `je` / `jne` to a label, rel32
    Jump { eq: bool, target: LabelId },
}

impl X86Instr {
    /// Exact encoded length in bytes.
    pub fn size(&self) -> u32 {
        match *self {
            X86Instr::ZeroReg { reg } => 2 + extended(reg) as u32,
            X86Instr::MovRegImm { dest, .. } => 5 + extended(dest) as u32,
            X86Instr::MovStackImm { .. } => 7,
            X86Instr::MovRegReg { dest, src }
            | X86Instr::AddRegReg { dest, src }
            | X86Instr::AndRegReg { dest, src } => {
                2 + (extended(dest) | extended(src)) as u32
            }
            X86Instr::CmpRegReg { lhs, rhs } => 2 + (extended(lhs) | extended(rhs)) as u32,
            X86Instr::MovRegStack { dest, .. } => 3 + extended(dest) as u32,
            X86Instr::MovStackReg { src, .. } => 3 + extended(src) as u32,
            X86Instr::ShrRegImm { reg, .. } | X86Instr::ShlRegImm { reg, .. } => {
                3 + extended(reg) as u32
            }
            X86Instr::Jump { .. } => 6,
        }
    }

    /// Render in assembler syntax; jump targets print their resolved
    /// body offset once realization has run.
    pub fn describe(&self, labels: &LabelArena) -> String {
        match *self {
            X86Instr::ZeroReg { reg } => format!("xor {}, {}", reg, reg),
            X86Instr::MovRegImm { dest, imm } => format!("mov {}, {}", dest, imm),
            X86Instr::MovStackImm { dest_slot, imm } => {
                format!("mov [rbp + {}], {}", dest_slot as u32 * 4, imm)
            }
            X86Instr::MovRegReg { dest, src } => format!("mov {}, {}", dest, src),
            X86Instr::MovRegStack { dest, src_slot } => {
                format!("mov {}, [rbp + {}]", dest, src_slot as u32 * 4)
            }
            X86Instr::MovStackReg { dest_slot, src } => {
                format!("mov [rbp + {}], {}", dest_slot as u32 * 4, src)
            }
            X86Instr::AddRegReg { dest, src } => format!("add {}, {}", dest, src),
            X86Instr::AndRegReg { dest, src } => format!("and {}, {}", dest, src),
            X86Instr::ShrRegImm { reg, amount } => format!("shr {}, {}", reg, amount),
            X86Instr::ShlRegImm { reg, amount } => format!("shl {}, {}", reg, amount),
            X86Instr::CmpRegReg { lhs, rhs } => format!("cmp {}, {}", lhs, rhs),
            X86Instr::Jump { eq, target } => {
                let mnemonic = if eq { "je" } else { "jne" };
                match labels.offset(target) {
                    Some(offset) => format!("{} {}", mnemonic, offset),
                    None => format!("{} <unresolved {}>", mnemonic, labels.name(target)),
                }
            }
        }
    }
}
