//! MIPS assembly front end: typed instruction records and the dialect parser.

pub mod instr;
pub mod parser;

pub use instr::{Instr, InstrKind, NUM_REGS, Reg};
pub use parser::{ParseError, parse_line, parse_program};
