//! Architecture-neutral intermediate representation and the translator
//! that produces it from typed MIPS instructions.
//!
//! Translation normalizes away the hard-wired `$zero` register: any operand
//! position that may legally hold it is rewritten to the immediate 0, so no
//! later stage ever sees `$zero` as a register operand.

use crate::asm::{Instr, InstrKind, Reg};
use crate::labels::{LabelArena, LabelId};

/// An IR operand: a source register or a 16-bit immediate.
///
/// Invariant: `Storage::Reg` never holds `Reg::Zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Reg(Reg),
    Imm(u16),
}

impl std::fmt::Display for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Storage::Reg(r) => write!(f, "<reg {}>", r),
            Storage::Imm(v) => write!(f, "<imm {}>", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinopKind {
    Add,
    And,
}

impl BinopKind {
    fn symbol(self) -> &'static str {
        match self {
            BinopKind::Add => "+",
            BinopKind::And => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTest {
    Eq,
    Ne,
}

impl BranchTest {
    fn symbol(self) -> &'static str {
        match self {
            BranchTest::Eq => "==",
            BranchTest::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDir {
    Left,
    Right,
}

/// Operation payload of an abstract instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractKind {
    Binop {
        dest: Reg,
        op: BinopKind,
        lhs: Storage,
        rhs: Storage,
    },
    Branch {
        test: BranchTest,
        lhs: Storage,
        rhs: Storage,
        target: LabelId,
    },
    Mov {
        dest: Reg,
        src: Storage,
    },
    Shift {
        dir: ShiftDir,
        dest: Reg,
        src: Reg,
        amount: u8,
    },
}

/// One abstract instruction, optionally marking a label position.
///
/// Created here; the optimizer may reclassify the kind in place (keeping
/// the label); read-only from register mapping onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbstractInstr {
    pub label: Option<LabelId>,
    pub kind: AbstractKind,
}

impl AbstractInstr {
    pub fn describe(&self, labels: &LabelArena) -> String {
        let mut out = String::new();
        if let Some(label) = self.label {
            out.push_str(labels.name(label));
            out.push_str(": ");
        }

        match self.kind {
            AbstractKind::Binop { dest, op, lhs, rhs } => {
                out.push_str(&format!("{} <- {} {} {}", dest, lhs, op.symbol(), rhs));
            }
            AbstractKind::Branch {
                test,
                lhs,
                rhs,
                target,
            } => {
                out.push_str(&format!(
                    "if {} {} {} goto {}",
                    lhs,
                    test.symbol(),
                    rhs,
                    labels.name(target)
                ));
            }
            AbstractKind::Mov { dest, src } => {
                out.push_str(&format!("{} <- {}", dest, src));
            }
            AbstractKind::Shift {
                dir,
                dest,
                src,
                amount,
            } => {
                let sym = match dir {
                    ShiftDir::Left => "<<",
                    ShiftDir::Right => ">>",
                };
                out.push_str(&format!("{} <- {} {} {}", dest, src, sym, amount));
            }
        }

        out
    }
}

/// Error type for translation.
#[derive(Debug, PartialEq, Eq)]
pub enum TranslateError {
    /// A nop produces no code, so a label on it would have nothing to
    /// attach to.
    NopWithLabel,
    /// `$zero` cannot be the shifted register.
    ZeroRegInShift(&'static str),
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::NopWithLabel => {
                write!(f, "nop instruction carries a label")
            }
            TranslateError::ZeroRegInShift(instr) => {
                write!(f, "zero register not allowed in {} instruction", instr)
            }
        }
    }
}

impl std::error::Error for TranslateError {}

/// Rewrite `$zero` to the immediate 0; pass every other register through.
fn elide_zero(r: Reg) -> Storage {
    if r == Reg::Zero {
        Storage::Imm(0)
    } else {
        Storage::Reg(r)
    }
}

fn ensure_nonzero(r: Reg, instr: &'static str) -> Result<Reg, TranslateError> {
    if r == Reg::Zero {
        return Err(TranslateError::ZeroRegInShift(instr));
    }
    Ok(r)
}

/// Normalize source instructions into abstract instructions. Nops are
/// dropped; every other instruction maps to exactly one IR instruction,
/// carrying over any source label for later offset resolution.
pub fn translate(instrs: &[Instr]) -> Result<Vec<AbstractInstr>, TranslateError> {
    let mut out = Vec::with_capacity(instrs.len());

    for instr in instrs {
        let kind = match instr.kind {
            InstrKind::Nop => {
                if instr.label.is_some() {
                    return Err(TranslateError::NopWithLabel);
                }
                continue;
            }
            InstrKind::Add { d, s, t } => AbstractKind::Binop {
                dest: d,
                op: BinopKind::Add,
                lhs: elide_zero(s),
                rhs: elide_zero(t),
            },
            InstrKind::Addi { t, s, imm } => AbstractKind::Binop {
                dest: t,
                op: BinopKind::Add,
                lhs: elide_zero(s),
                rhs: Storage::Imm(imm),
            },
            InstrKind::Andi { t, s, imm } => AbstractKind::Binop {
                dest: t,
                op: BinopKind::And,
                lhs: elide_zero(s),
                rhs: Storage::Imm(imm),
            },
            InstrKind::Srl { t, s, amount } => AbstractKind::Shift {
                dir: ShiftDir::Right,
                dest: t,
                src: ensure_nonzero(s, "srl")?,
                amount,
            },
            InstrKind::Sll { t, s, amount } => AbstractKind::Shift {
                dir: ShiftDir::Left,
                dest: t,
                src: ensure_nonzero(s, "sll")?,
                amount,
            },
            InstrKind::Beq { s, t, target } => AbstractKind::Branch {
                test: BranchTest::Eq,
                lhs: elide_zero(s),
                rhs: elide_zero(t),
                target,
            },
            InstrKind::Bne { s, t, target } => AbstractKind::Branch {
                test: BranchTest::Ne,
                lhs: elide_zero(s),
                rhs: elide_zero(t),
                target,
            },
        };

        out.push(AbstractInstr {
            label: instr.label,
            kind,
        });
    }

    Ok(out)
}
