//! mjit - a just-in-time compiler from a MIPS subset to x86-64.
//!
//! The pipeline parses an assembly dialect, normalizes it into an
//! architecture-neutral IR, optimizes, allocates registers by usage
//! frequency, lowers to x86 instruction descriptors, encodes them
//! byte-exactly and executes the result in mapped memory.

pub mod asm;
pub mod driver;
pub mod jit;
pub mod labels;

// Re-export commonly used types
pub use asm::{Instr, InstrKind, Reg};
pub use jit::{AbstractInstr, RegMapping, Thunk, X86Instr};
pub use labels::{LabelArena, LabelId};
