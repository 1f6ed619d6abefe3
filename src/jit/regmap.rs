//! Register allocation by usage frequency.
//!
//! Every source register that appears in the IR gets exactly one home:
//! the most-used registers take the host-register pool, the rest spill
//! to distinct stack slots. Registers that never appear stay unmapped
//! and must never be consulted downstream.

use std::cmp::Reverse;

use super::translate::{AbstractInstr, AbstractKind, Storage};
use super::x86::{POOL, X86Reg};
use crate::asm::{NUM_REGS, Reg};

/// Where a source register lives during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    Host(X86Reg),
    Stack(u8),
}

/// The complete source-register to host-storage assignment. Computed
/// once before realization and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegMapping {
    map: [Option<Mapping>; NUM_REGS],
    pub num_stack_slots: u8,
}

impl RegMapping {
    pub fn get(&self, reg: Reg) -> Option<Mapping> {
        self.map[reg.index()]
    }

    /// Mapping of a register known to appear in the IR.
    pub fn of(&self, reg: Reg) -> Mapping {
        self.map[reg.index()]
            .expect("register appears in the IR but was never counted")
    }
}

fn count_instr_regs(instr: &AbstractInstr, counts: &mut [u32; NUM_REGS]) {
    let mut count_storage = |s: Storage, counts: &mut [u32; NUM_REGS]| {
        if let Storage::Reg(r) = s {
            counts[r.index()] += 1;
        }
    };

    match instr.kind {
        AbstractKind::Binop { dest, lhs, rhs, .. } => {
            counts[dest.index()] += 1;
            count_storage(lhs, counts);
            count_storage(rhs, counts);
        }
        AbstractKind::Branch { lhs, rhs, .. } => {
            count_storage(lhs, counts);
            count_storage(rhs, counts);
        }
        AbstractKind::Mov { dest, src } => {
            counts[dest.index()] += 1;
            count_storage(src, counts);
        }
        // The shift amount is always an immediate and never counts.
        AbstractKind::Shift { dest, src, .. } => {
            counts[dest.index()] += 1;
            counts[src.index()] += 1;
        }
    }
}

/// Assign each used source register a host register or stack slot.
///
/// Higher usage counts win host registers; ties resolve to the fixed
/// register enumeration order (the sort is stable over an
/// enumeration-ordered array).
pub fn map_registers(instrs: &[AbstractInstr]) -> RegMapping {
    let mut counts = [0u32; NUM_REGS];
    for instr in instrs {
        count_instr_regs(instr, &mut counts);
    }

    let mut ranked: Vec<(Reg, u32)> = Reg::ALL
        .iter()
        .map(|&reg| (reg, counts[reg.index()]))
        .collect();
    ranked.sort_by_key(|&(_, count)| Reverse(count));

    let mut mapping = RegMapping {
        map: [None; NUM_REGS],
        num_stack_slots: 0,
    };

    let mut used = ranked.iter().filter(|&&(_, count)| count > 0);

    for &host in POOL.iter() {
        match used.next() {
            Some(&(reg, _)) => mapping.map[reg.index()] = Some(Mapping::Host(host)),
            None => break,
        }
    }

    let mut slot = 0u8;
    for &(reg, _) in used {
        mapping.map[reg.index()] = Some(Mapping::Stack(slot));
        slot += 1;
    }
    mapping.num_stack_slots = slot;

    mapping
}
