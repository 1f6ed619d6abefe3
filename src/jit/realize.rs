//! Lowering from abstract instructions to x86 instruction descriptors.
//!
//! Realization walks the IR in strict program order with a running byte
//! offset (the prefix sum of every emitted descriptor's declared size).
//! A label attached to an instruction is resolved to the running offset
//! before that instruction's body is lowered; since actual byte emission
//! happens in a later pass, both backward and forward branches see a
//! resolved offset at encode time.

use super::regmap::{Mapping, RegMapping};
use super::translate::{AbstractInstr, AbstractKind, BinopKind, BranchTest, ShiftDir, Storage};
use super::x86::{MAX_STACK_SLOT, SCRATCH_A, SCRATCH_B, X86Instr, X86Reg};
use crate::asm::Reg;
use crate::labels::{LabelArena, LabelError};

/// Error type for lowering.
#[derive(Debug, PartialEq, Eq)]
pub enum RealizeError {
    /// `slot * 4` does not fit the signed 8-bit stack displacement.
    StackSlotOutOfRange(u8),
    Label(LabelError),
}

impl std::fmt::Display for RealizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealizeError::StackSlotOutOfRange(slot) => write!(
                f,
                "stack slot {} exceeds the addressable maximum of {}",
                slot, MAX_STACK_SLOT
            ),
            RealizeError::Label(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RealizeError {}

impl From<LabelError> for RealizeError {
    fn from(e: LabelError) -> Self {
        RealizeError::Label(e)
    }
}

/// Lower the whole IR stream, resolving label offsets along the way.
pub fn realize(
    instrs: &[AbstractInstr],
    map: &RegMapping,
    labels: &mut LabelArena,
) -> Result<Vec<X86Instr>, RealizeError> {
    let mut out = Vec::new();
    let mut offset: u32 = 0;

    for instr in instrs {
        if let Some(label) = instr.label {
            labels.resolve(label, offset)?;
        }
        realize_instr(instr, map, &mut out, &mut offset)?;
    }

    Ok(out)
}

fn push(out: &mut Vec<X86Instr>, offset: &mut u32, instr: X86Instr) {
    *offset += instr.size();
    out.push(instr);
}

fn check_slot(slot: u8) -> Result<u8, RealizeError> {
    if slot > MAX_STACK_SLOT {
        return Err(RealizeError::StackSlotOutOfRange(slot));
    }
    Ok(slot)
}

/// Make a storage operand available in a register. Immediates and
/// stack-resident values are materialized into `scratch`; host-resident
/// values are used where they are.
fn ready(
    value: Storage,
    map: &RegMapping,
    scratch: X86Reg,
    out: &mut Vec<X86Instr>,
    offset: &mut u32,
) -> Result<X86Reg, RealizeError> {
    match value {
        Storage::Imm(0) => {
            push(out, offset, X86Instr::ZeroReg { reg: scratch });
            Ok(scratch)
        }
        Storage::Imm(imm) => {
            push(out, offset, X86Instr::MovRegImm { dest: scratch, imm });
            Ok(scratch)
        }
        Storage::Reg(reg) => match map.of(reg) {
            Mapping::Stack(slot) => {
                push(
                    out,
                    offset,
                    X86Instr::MovRegStack {
                        dest: scratch,
                        src_slot: check_slot(slot)?,
                    },
                );
                Ok(scratch)
            }
            Mapping::Host(host) => Ok(host),
        },
    }
}

/// Move a computed value from `src` to the destination register's home.
/// A host-mapped destination that already holds the value emits nothing.
fn store(
    src: X86Reg,
    dest: Reg,
    map: &RegMapping,
    out: &mut Vec<X86Instr>,
    offset: &mut u32,
) -> Result<(), RealizeError> {
    match map.of(dest) {
        Mapping::Stack(slot) => {
            push(
                out,
                offset,
                X86Instr::MovStackReg {
                    dest_slot: check_slot(slot)?,
                    src,
                },
            );
        }
        Mapping::Host(host) if host != src => {
            push(out, offset, X86Instr::MovRegReg { dest: host, src });
        }
        Mapping::Host(_) => {}
    }
    Ok(())
}

fn realize_instr(
    instr: &AbstractInstr,
    map: &RegMapping,
    out: &mut Vec<X86Instr>,
    offset: &mut u32,
) -> Result<(), RealizeError> {
    match instr.kind {
        AbstractKind::Binop { dest, op, lhs, rhs } => {
            let lhs_reg = ready(lhs, map, SCRATCH_A, out, offset)?;
            let rhs_reg = ready(rhs, map, SCRATCH_B, out, offset)?;

            if lhs_reg != SCRATCH_A {
                push(
                    out,
                    offset,
                    X86Instr::MovRegReg {
                        dest: SCRATCH_A,
                        src: lhs_reg,
                    },
                );
            }

            let op_instr = match op {
                BinopKind::Add => X86Instr::AddRegReg {
                    dest: SCRATCH_A,
                    src: rhs_reg,
                },
                BinopKind::And => X86Instr::AndRegReg {
                    dest: SCRATCH_A,
                    src: rhs_reg,
                },
            };
            push(out, offset, op_instr);

            store(SCRATCH_A, dest, map, out, offset)?;
        }
        AbstractKind::Mov { dest, src } => match src {
            Storage::Reg(_) => {
                let src_reg = ready(src, map, SCRATCH_A, out, offset)?;
                store(src_reg, dest, map, out, offset)?;
            }
            Storage::Imm(imm) => match map.of(dest) {
                Mapping::Host(host) if imm == 0 => {
                    push(out, offset, X86Instr::ZeroReg { reg: host });
                }
                Mapping::Host(host) => {
                    push(out, offset, X86Instr::MovRegImm { dest: host, imm });
                }
                Mapping::Stack(slot) => {
                    push(
                        out,
                        offset,
                        X86Instr::MovStackImm {
                            dest_slot: check_slot(slot)?,
                            imm,
                        },
                    );
                }
            },
        },
        AbstractKind::Shift {
            dir,
            dest,
            src,
            amount,
        } => {
            let mut val = ready(Storage::Reg(src), map, SCRATCH_A, out, offset)?;

            // Shift in place only when the value already sits in the
            // destination's host register; otherwise shifting would
            // clobber the source's home.
            let in_place = matches!(map.of(dest), Mapping::Host(host) if host == val);
            if !in_place && val != SCRATCH_A {
                push(
                    out,
                    offset,
                    X86Instr::MovRegReg {
                        dest: SCRATCH_A,
                        src: val,
                    },
                );
                val = SCRATCH_A;
            }

            let shift = match dir {
                ShiftDir::Left => X86Instr::ShlRegImm { reg: val, amount },
                ShiftDir::Right => X86Instr::ShrRegImm { reg: val, amount },
            };
            push(out, offset, shift);

            store(val, dest, map, out, offset)?;
        }
        AbstractKind::Branch {
            test,
            lhs,
            rhs,
            target,
        } => {
            let lhs_reg = ready(lhs, map, SCRATCH_A, out, offset)?;
            let rhs_reg = ready(rhs, map, SCRATCH_B, out, offset)?;

            push(
                out,
                offset,
                X86Instr::CmpRegReg {
                    lhs: lhs_reg,
                    rhs: rhs_reg,
                },
            );
            push(
                out,
                offset,
                X86Instr::Jump {
                    eq: test == BranchTest::Eq,
                    target,
                },
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::parse_program;
    use crate::jit::optimize::optimize;
    use crate::jit::regmap::map_registers;
    use crate::jit::translate::translate;

    fn lower(source: &str) -> (Vec<X86Instr>, RegMapping, LabelArena) {
        let mut labels = LabelArena::new();
        let instrs = parse_program(source, &mut labels).unwrap();
        let mut ir = translate(&instrs).unwrap();
        optimize(&mut ir);
        let map = map_registers(&ir);
        let x86 = realize(&ir, &map, &mut labels).unwrap();
        (x86, map, labels)
    }

    #[test]
    fn test_straight_line_lowering() {
        // Scenario A: t0 <- 5; t1 <- t0 + t0. t0 is used three times so
        // it takes the first pool register (edx), t1 the second (ebx).
        let (x86, _, _) = lower("addi $t0 $zero 5\nadd $t1 $t0 $t0\nnop\n");

        assert_eq!(
            x86,
            vec![
                X86Instr::MovRegImm {
                    dest: X86Reg::Edx,
                    imm: 5
                },
                X86Instr::MovRegReg {
                    dest: SCRATCH_A,
                    src: X86Reg::Edx
                },
                X86Instr::AddRegReg {
                    dest: SCRATCH_A,
                    src: X86Reg::Edx
                },
                X86Instr::MovRegReg {
                    dest: X86Reg::Ebx,
                    src: SCRATCH_A
                },
            ]
        );
    }

    #[test]
    fn test_mov_zero_to_host_uses_zero_idiom() {
        let (x86, _, _) = lower("addi $t0 $zero 0\n");
        assert_eq!(x86, vec![X86Instr::ZeroReg { reg: X86Reg::Edx }]);
    }

    #[test]
    fn test_immediate_operand_readies_into_scratch_b() {
        let (x86, _, _) = lower("addi $t0 $t0 1\n");
        assert_eq!(
            x86,
            vec![
                X86Instr::MovRegImm {
                    dest: SCRATCH_B,
                    imm: 1
                },
                X86Instr::MovRegReg {
                    dest: SCRATCH_A,
                    src: X86Reg::Edx
                },
                X86Instr::AddRegReg {
                    dest: SCRATCH_A,
                    src: SCRATCH_B
                },
                X86Instr::MovRegReg {
                    dest: X86Reg::Edx,
                    src: SCRATCH_A
                },
            ]
        );
    }

    #[test]
    fn test_shift_in_place_when_source_is_destination() {
        // dest == src and host-mapped: no scratch move, shift edx directly.
        let (x86, _, _) = lower("srl $t0 $t0 2\n");
        assert_eq!(
            x86,
            vec![X86Instr::ShrRegImm {
                reg: X86Reg::Edx,
                amount: 2
            }]
        );
    }

    #[test]
    fn test_shift_through_scratch_when_destinations_differ() {
        // t0 (2 uses) -> edx, t1 (1 use) -> ebx. Shifting edx in place
        // would corrupt t0, so the value goes through eax.
        let (x86, _, _) = lower("srl $t1 $t0 2\nadd $t0 $t0 $t0\n");
        assert_eq!(
            &x86[..3],
            &[
                X86Instr::MovRegReg {
                    dest: SCRATCH_A,
                    src: X86Reg::Edx
                },
                X86Instr::ShrRegImm {
                    reg: SCRATCH_A,
                    amount: 2
                },
                X86Instr::MovRegReg {
                    dest: X86Reg::Ebx,
                    src: SCRATCH_A
                },
            ]
        );
    }

    #[test]
    fn test_backward_branch_resolves_label_before_jump() {
        let (x86, _, labels) = lower("loop: addi $t0 $t0 1\nbne $t0 $s0 loop\n");
        let loop_id = labels.lookup("loop").unwrap();
        assert_eq!(labels.offset(loop_id), Some(0));

        assert!(matches!(
            x86.last(),
            Some(X86Instr::Jump { eq: false, .. })
        ));
    }

    #[test]
    fn test_forward_branch_resolves_during_sizing_pass() {
        let (x86, _, labels) = lower("beq $t0 $t0 end\naddi $t0 $t0 7\nend: add $t1 $t0 $t0\n");
        let end = labels.lookup("end").unwrap();

        // cmp (2) + je (6) + [mov ecx,7 (5) + mov eax,edx (2) +
        // add (2) + mov edx,eax (2)] puts `end` at offset 19.
        assert_eq!(labels.offset(end), Some(19));
        assert!(matches!(x86[1], X86Instr::Jump { eq: true, .. }));
    }

    #[test]
    fn test_duplicate_label_definition_fails() {
        let mut labels = LabelArena::new();
        let instrs =
            parse_program("a: addi $t0 $t0 1\na: addi $t0 $t0 2\n", &mut labels).unwrap();
        let ir = translate(&instrs).unwrap();
        let map = map_registers(&ir);

        assert_eq!(
            realize(&ir, &map, &mut labels),
            Err(RealizeError::Label(LabelError::DefinedTwice(
                "a".to_string()
            )))
        );
    }

    #[test]
    fn test_spilled_registers_roundtrip_through_stack() {
        // 13 registers, one more than the pool: the least used spills.
        let mut source = String::new();
        let regs = [
            "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4", "$t5",
        ];
        for reg in regs {
            source.push_str(&format!("addi {} {} 1\n", reg, reg));
            source.push_str(&format!("addi {} {} 1\n", reg, reg));
        }
        source.push_str("addi $t6 $t6 1\n");
        let (x86, map, _) = lower(&source);

        assert_eq!(map.of(Reg::T6), Mapping::Stack(0));
        assert!(x86.contains(&X86Instr::MovRegStack {
            dest: SCRATCH_A,
            src_slot: 0
        }));
        assert!(x86.contains(&X86Instr::MovStackReg {
            dest_slot: 0,
            src: SCRATCH_A
        }));
    }

    #[test]
    fn test_immediate_to_stack_slot_uses_direct_store() {
        // Fill the pool with 12 busier registers so t6 lands on the stack,
        // then mov an immediate into it.
        let mut source = String::new();
        let regs = [
            "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4", "$t5",
        ];
        for reg in regs {
            source.push_str(&format!("addi {} {} 1\n", reg, reg));
        }
        source.push_str("addi $t6 $zero 9\n");
        let (x86, map, _) = lower(&source);

        assert_eq!(map.of(Reg::T6), Mapping::Stack(0));
        assert!(x86.contains(&X86Instr::MovStackImm {
            dest_slot: 0,
            imm: 9
        }));
    }

    #[test]
    fn test_running_offset_is_prefix_sum_of_sizes() {
        let (x86, _, labels) = lower(
            "addi $t0 $zero 5\nloop: add $t1 $t0 $t0\nbne $t1 $t0 loop\n",
        );
        let loop_id = labels.lookup("loop").unwrap();

        // `loop` sits right after the first instruction.
        assert_eq!(labels.offset(loop_id), Some(x86[0].size()));
    }
}
