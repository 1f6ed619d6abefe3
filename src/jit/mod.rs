//! JIT compilation pipeline: MIPS IR to executed x86-64 code.
//!
//! Stages, in dependency order:
//! - `translate`: typed source instructions to architecture-neutral IR
//! - `optimize`: fixpoint peephole rewrite over the IR
//! - `regmap`: source registers to host registers / stack slots
//! - `realize`: IR to x86 instruction descriptors, resolving labels
//! - `encode`: descriptors to exact machine-code bytes
//! - `exec`: mapped-memory execution and register read-back

pub mod codebuf;
pub mod encode;
pub mod exec;
pub mod memory;
pub mod optimize;
pub mod realize;
pub mod regmap;
pub mod translate;
pub mod x86;

pub use encode::{EncodeError, Thunk, encode_program};
pub use exec::{RegisterFile, execute};
pub use memory::{ExecutableMemory, MemoryError};
pub use optimize::optimize;
pub use realize::{RealizeError, realize};
pub use regmap::{Mapping, RegMapping, map_registers};
pub use translate::{AbstractInstr, AbstractKind, Storage, TranslateError, translate};
pub use x86::{POOL, X86Instr, X86Reg};
