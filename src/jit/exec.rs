//! Thunk execution and register read-back.
//!
//! The encoded buffer is copied into a freshly mapped region, flipped to
//! read+execute and invoked once as a two-argument function. Both backing
//! arrays live here, on the Rust side; the generated code fills them in
//! and this module reads final register values back out through the
//! mapping.

use super::encode::Thunk;
use super::memory::{ExecutableMemory, MemoryError};
use super::regmap::{Mapping, RegMapping};
use super::x86::POOL;
use crate::asm::Reg;

/// Final machine state after a thunk ran: one word per stack slot and
/// one word per host pool register.
pub struct RegisterFile {
    stack: Vec<u32>,
    host: Vec<u32>,
}

impl RegisterFile {
    /// Final value of a source register, or `None` if it never appeared
    /// in the program.
    pub fn value_of(&self, reg: Reg, map: &RegMapping) -> Option<u32> {
        match map.get(reg)? {
            Mapping::Host(host) => {
                let idx = host
                    .pool_index()
                    .expect("mapped host register must come from the pool");
                Some(self.host[idx])
            }
            Mapping::Stack(slot) => Some(self.stack[slot as usize]),
        }
    }
}

/// Map the thunk executable and run it.
///
/// Single-shot: mapping or protection failure is fatal and execution is
/// never retried. The mapping itself is released when `mem` drops, on
/// success and error paths alike.
pub fn execute(thunk: &Thunk, num_stack_slots: u8) -> Result<RegisterFile, MemoryError> {
    let mut mem = ExecutableMemory::new(thunk.len())?;
    mem.write(0, thunk.bytes())?;
    mem.make_executable()?;

    let mut stack = vec![0u32; num_stack_slots as usize];
    let mut host = vec![0u32; POOL.len()];

    // SAFETY: the buffer was produced by the encoder, which emits a
    // complete prologue/body/epilogue for exactly this signature, and the
    // backing arrays are sized for every slot and pool register the code
    // touches.
    unsafe {
        let entry: unsafe extern "C" fn(*mut u32, *mut u32) = mem
            .as_fn()
            .ok_or(MemoryError::ProtectionFailed)?;
        entry(stack.as_mut_ptr(), host.as_mut_ptr());
    }

    Ok(RegisterFile { stack, host })
}
