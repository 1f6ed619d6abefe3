//! Parser for the MIPS assembly dialect.
//!
//! One instruction per line, whitespace separated:
//!
//! ```text
//! add $d $s $t
//! addi $t $s imm
//! andi $t $s imm
//! srl $t $s amount
//! sll $t $s amount
//! beq $s $t label
//! bne $s $t label
//! nop
//! ```
//!
//! Any line may be prefixed with `label:`. Blank lines are skipped.

use super::instr::{Instr, InstrKind, Reg};
use crate::labels::LabelArena;

/// Error type for parsing, carrying the 1-based source line.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnknownInstruction(String),
    InvalidRegister(String),
    InvalidImmediate(String),
    MissingOperand,
    TrailingOperands(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            ParseErrorKind::UnknownInstruction(name) => {
                write!(f, "unknown instruction `{}`", name)
            }
            ParseErrorKind::InvalidRegister(token) => {
                write!(f, "invalid register `{}`", token)
            }
            ParseErrorKind::InvalidImmediate(token) => {
                write!(f, "invalid immediate `{}`", token)
            }
            ParseErrorKind::MissingOperand => write!(f, "missing operand"),
            ParseErrorKind::TrailingOperands(token) => {
                write!(f, "unexpected trailing operand `{}`", token)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a whole program. Labels (both definitions and branch targets)
/// are interned into `labels`; a branch to a label defined later in the
/// file produces an unresolved handle that realization will fill in.
pub fn parse_program(source: &str, labels: &mut LabelArena) -> Result<Vec<Instr>, ParseError> {
    let mut instrs = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        instrs.push(parse_line(line, idx + 1, labels)?);
    }

    Ok(instrs)
}

/// Parse a single instruction line.
pub fn parse_line(line: &str, line_no: usize, labels: &mut LabelArena) -> Result<Instr, ParseError> {
    let err = |kind| ParseError { line: line_no, kind };

    // Split off an optional `label:` prefix.
    let (label, rest) = match line.split_once(':') {
        Some((name, rest)) => (Some(labels.intern(name.trim())), rest),
        None => (None, line),
    };

    let mut words = rest.split_whitespace();
    let mnemonic = words
        .next()
        .ok_or_else(|| err(ParseErrorKind::MissingOperand))?;

    let kind = match mnemonic {
        "nop" => InstrKind::Nop,
        "add" => {
            let d = next_reg(&mut words, line_no)?;
            let s = next_reg(&mut words, line_no)?;
            let t = next_reg(&mut words, line_no)?;
            InstrKind::Add { d, s, t }
        }
        "addi" | "andi" => {
            let t = next_reg(&mut words, line_no)?;
            let s = next_reg(&mut words, line_no)?;
            let imm = parse_imm(&mut words, line_no)?;
            if mnemonic == "addi" {
                InstrKind::Addi { t, s, imm }
            } else {
                InstrKind::Andi { t, s, imm }
            }
        }
        "srl" | "sll" => {
            let t = next_reg(&mut words, line_no)?;
            let s = next_reg(&mut words, line_no)?;
            let amount = parse_imm(&mut words, line_no)? as u8;
            if mnemonic == "srl" {
                InstrKind::Srl { t, s, amount }
            } else {
                InstrKind::Sll { t, s, amount }
            }
        }
        "beq" | "bne" => {
            let s = next_reg(&mut words, line_no)?;
            let t = next_reg(&mut words, line_no)?;
            let name = words
                .next()
                .ok_or_else(|| err(ParseErrorKind::MissingOperand))?;
            let target = labels.intern(name);
            if mnemonic == "beq" {
                InstrKind::Beq { s, t, target }
            } else {
                InstrKind::Bne { s, t, target }
            }
        }
        other => {
            return Err(err(ParseErrorKind::UnknownInstruction(other.to_string())));
        }
    };

    if let Some(extra) = words.next() {
        return Err(err(ParseErrorKind::TrailingOperands(extra.to_string())));
    }

    Ok(Instr { label, kind })
}

fn next_reg(words: &mut std::str::SplitWhitespace, line_no: usize) -> Result<Reg, ParseError> {
    let token = words.next().ok_or(ParseError {
        line: line_no,
        kind: ParseErrorKind::MissingOperand,
    })?;
    parse_reg(token, line_no)
}

fn parse_reg(token: &str, line_no: usize) -> Result<Reg, ParseError> {
    token
        .strip_prefix('$')
        .and_then(Reg::from_name)
        .ok_or(ParseError {
            line: line_no,
            kind: ParseErrorKind::InvalidRegister(token.to_string()),
        })
}

/// Immediates are 16-bit; negative literals wrap to their two's
/// complement representation.
fn parse_imm(words: &mut std::str::SplitWhitespace, line_no: usize) -> Result<u16, ParseError> {
    let token = words.next().ok_or(ParseError {
        line: line_no,
        kind: ParseErrorKind::MissingOperand,
    })?;

    token
        .parse::<u16>()
        .or_else(|_| token.parse::<i16>().map(|v| v as u16))
        .map_err(|_| ParseError {
            line: line_no,
            kind: ParseErrorKind::InvalidImmediate(token.to_string()),
        })
}
