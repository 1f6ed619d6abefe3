//! Typed MIPS instruction records.
//!
//! These are the parser's output: one record per source line, tagged with
//! the instruction kind and shaped by its operand class (register-register,
//! register-immediate, or branch-with-label).

use crate::labels::{LabelArena, LabelId};

/// The addressable MIPS general-purpose registers, in encoding order.
///
/// `$zero` is hard-wired to 0. The reserved registers of the real ISA
/// (`$at`, `$k0`, `$k1`, `$gp`, `$sp`, `$fp`, `$ra`) are rejected by the
/// parser and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Reg {
    Zero = 0,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
}

/// Number of source registers, including `$zero`.
pub const NUM_REGS: usize = 25;

impl Reg {
    /// Every register in enumeration order. This order is load-bearing:
    /// the register mapper breaks usage-count ties by it.
    pub const ALL: [Reg; NUM_REGS] = [
        Reg::Zero,
        Reg::V0,
        Reg::V1,
        Reg::A0,
        Reg::A1,
        Reg::A2,
        Reg::A3,
        Reg::T0,
        Reg::T1,
        Reg::T2,
        Reg::T3,
        Reg::T4,
        Reg::T5,
        Reg::T6,
        Reg::T7,
        Reg::S0,
        Reg::S1,
        Reg::S2,
        Reg::S3,
        Reg::S4,
        Reg::S5,
        Reg::S6,
        Reg::S7,
        Reg::T8,
        Reg::T9,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The register's name without the `$` sigil.
    pub fn name(self) -> &'static str {
        match self {
            Reg::Zero => "zero",
            Reg::V0 => "v0",
            Reg::V1 => "v1",
            Reg::A0 => "a0",
            Reg::A1 => "a1",
            Reg::A2 => "a2",
            Reg::A3 => "a3",
            Reg::T0 => "t0",
            Reg::T1 => "t1",
            Reg::T2 => "t2",
            Reg::T3 => "t3",
            Reg::T4 => "t4",
            Reg::T5 => "t5",
            Reg::T6 => "t6",
            Reg::T7 => "t7",
            Reg::S0 => "s0",
            Reg::S1 => "s1",
            Reg::S2 => "s2",
            Reg::S3 => "s3",
            Reg::S4 => "s4",
            Reg::S5 => "s5",
            Reg::S6 => "s6",
            Reg::S7 => "s7",
            Reg::T8 => "t8",
            Reg::T9 => "t9",
        }
    }

    /// Parse a register name (without the `$` sigil).
    pub fn from_name(name: &str) -> Option<Reg> {
        Reg::ALL.iter().copied().find(|r| r.name() == name)
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// Operand payload of a source instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    Nop,
    /// `add $d $s $t`: d <- s + t
    Add { d: Reg, s: Reg, t: Reg },
    /// `addi $t $s imm`: t <- s + imm
    Addi { t: Reg, s: Reg, imm: u16 },
    /// `andi $t $s imm`: t <- s & imm
    Andi { t: Reg, s: Reg, imm: u16 },
    /// `srl $t $s amount`: t <- s >> amount
    Srl { t: Reg, s: Reg, amount: u8 },
    /// `sll $t $s amount`: t <- s << amount
    Sll { t: Reg, s: Reg, amount: u8 },
    /// `beq $s $t label`: branch to label if s == t
    Beq { s: Reg, t: Reg, target: LabelId },
    /// `bne $s $t label`: branch to label if s != t
    Bne { s: Reg, t: Reg, target: LabelId },
}

/// One parsed source instruction, optionally carrying the label defined
/// on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub label: Option<LabelId>,
    pub kind: InstrKind,
}

impl Instr {
    /// Render the instruction back in source syntax, e.g.
    /// `loop: addi $t0 $t0 1`.
    pub fn describe(&self, labels: &LabelArena) -> String {
        let mut out = String::new();
        if let Some(label) = self.label {
            out.push_str(labels.name(label));
            out.push_str(": ");
        }

        match self.kind {
            InstrKind::Nop => out.push_str("nop"),
            InstrKind::Add { d, s, t } => {
                out.push_str(&format!("add {} {} {}", d, s, t));
            }
            InstrKind::Addi { t, s, imm } => {
                out.push_str(&format!("addi {} {} {}", t, s, imm));
            }
            InstrKind::Andi { t, s, imm } => {
                out.push_str(&format!("andi {} {} {}", t, s, imm));
            }
            InstrKind::Srl { t, s, amount } => {
                out.push_str(&format!("srl {} {} {}", t, s, amount));
            }
            InstrKind::Sll { t, s, amount } => {
                out.push_str(&format!("sll {} {} {}", t, s, amount));
            }
            InstrKind::Beq { s, t, target } => {
                out.push_str(&format!("beq {} {} {}", s, t, labels.name(target)));
            }
            InstrKind::Bne { s, t, target } => {
                out.push_str(&format!("bne {} {} {}", s, t, labels.name(target)));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg_roundtrip() {
        for reg in Reg::ALL {
            assert_eq!(Reg::from_name(reg.name()), Some(reg));
        }
        assert_eq!(Reg::from_name("sp"), None);
        assert_eq!(Reg::from_name("ra"), None);
    }

    #[test]
    fn test_enumeration_order() {
        for (i, reg) in Reg::ALL.iter().enumerate() {
            assert_eq!(reg.index(), i);
        }
    }

    #[test]
    fn test_describe() {
        let mut labels = LabelArena::new();
        let target = labels.intern("loop");

        let i = Instr {
            label: Some(target),
            kind: InstrKind::Bne {
                s: Reg::T0,
                t: Reg::S0,
                target,
            },
        };
        assert_eq!(i.describe(&labels), "loop: bne $t0 $s0 loop");
    }
}
