//! Byte-exact x86-64 encoding.
//!
//! Serializes instruction descriptors into machine code and wraps the
//! body in a calling-convention prologue/epilogue. Encoding must walk
//! the instructions in program order: each jump displacement is computed
//! from the running body offset, which is the prefix sum of all prior
//! declared sizes.
//!
//! Generated code follows the System V AMD64 ABI. The thunk is called as
//! `fn(stack_backing: *mut u32, host_regs_out: *mut u32)`: the prologue
//! parks `rdi` (the stack backing array) in `rbp` for the body's
//! `[rbp + slot*4]` accesses, and the epilogue dumps every pool register
//! into the second array before restoring saved registers.

use super::codebuf::CodeBuffer;
use super::x86::{X86Instr, X86Reg};
use crate::labels::LabelArena;

/// Error type for encoding.
#[derive(Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// A jump references a label no instruction ever defined.
    UnresolvedLabel(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::UnresolvedLabel(name) => {
                write!(f, "jump references unresolved label `{}`", name)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// The finished machine-code buffer: prologue + body + epilogue.
/// Built only after every instruction's size and label offset are final.
#[derive(Debug)]
pub struct Thunk {
    code: Vec<u8>,
}

impl Thunk {
    pub fn bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Hex rendering of the whole buffer, two uppercase digits per byte.
    pub fn to_hex(&self) -> String {
        self.code.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

/// Saves every callee-saved register the body may clobber, saves the
/// second argument for the epilogue, and establishes the stack-backing
/// base pointer from the first argument.
const PROLOGUE: [u8; 15] = [
    0x53, // push rbx
    0x54, // push rsp
    0x55, // push rbp
    0x41, 0x54, // push r12
    0x41, 0x55, // push r13
    0x41, 0x56, // push r14
    0x41, 0x57, // push r15
    0x56, // push rsi
    0x48, 0x89, 0xfd, // mov rbp, rdi
];

/// Pops the saved second argument into `rax`, copies every pool register
/// into the output array at 4 bytes per pool index, restores saved
/// registers and returns.
const EPILOGUE: [u8; 56] = [
    0x58, // pop rax (saved rsi: the host-register output array)
    0x89, 0x10, // mov [rax], edx
    0x89, 0x58, 0x04, // mov [rax + 4], ebx
    0x89, 0x70, 0x08, // mov [rax + 8], esi
    0x89, 0x78, 0x0c, // mov [rax + 12], edi
    0x44, 0x89, 0x40, 0x10, // mov [rax + 16], r8d
    0x44, 0x89, 0x48, 0x14, // mov [rax + 20], r9d
    0x44, 0x89, 0x50, 0x18, // mov [rax + 24], r10d
    0x44, 0x89, 0x58, 0x1c, // mov [rax + 28], r11d
    0x44, 0x89, 0x60, 0x20, // mov [rax + 32], r12d
    0x44, 0x89, 0x68, 0x24, // mov [rax + 36], r13d
    0x44, 0x89, 0x70, 0x28, // mov [rax + 40], r14d
    0x44, 0x89, 0x78, 0x2c, // mov [rax + 44], r15d
    0x41, 0x5f, // pop r15
    0x41, 0x5e, // pop r14
    0x41, 0x5d, // pop r13
    0x41, 0x5c, // pop r12
    0x5d, // pop rbp
    0x5c, // pop rsp
    0x5b, // pop rbx
    0xc3, // ret
];

/// Serialize the instruction stream into a complete executable buffer.
pub fn encode_program(instrs: &[X86Instr], labels: &LabelArena) -> Result<Thunk, EncodeError> {
    let body_len: u32 = instrs.iter().map(|i| i.size()).sum();
    let mut buf =
        CodeBuffer::with_capacity(PROLOGUE.len() + body_len as usize + EPILOGUE.len());

    buf.emit_bytes(&PROLOGUE);

    let mut body_offset: u32 = 0;
    for instr in instrs {
        let before = buf.len();
        encode_instr(instr, body_offset, labels, &mut buf)?;
        debug_assert_eq!(
            buf.len() - before,
            instr.size() as usize,
            "declared size mismatch for {:?}",
            instr
        );
        body_offset += instr.size();
    }

    buf.emit_bytes(&EPILOGUE);
    Ok(Thunk {
        code: buf.into_code(),
    })
}

fn modrm_direct(reg: X86Reg, rm: X86Reg) -> u8 {
    0b11 << 6 | reg.modrm_bits() << 3 | rm.modrm_bits()
}

/// `[rbp + disp8]` addressing form with `reg` in the register field.
fn modrm_rbp_disp8(reg: X86Reg) -> u8 {
    0b01 << 6 | reg.modrm_bits() << 3 | 0b101
}

/// Register-to-register ALU form: `opcode` with `dest` in the rm field
/// and `src` in the reg field, REX-prefixed when either is extended.
fn emit_reg_reg(buf: &mut CodeBuffer, opcode: u8, dest: X86Reg, src: X86Reg) {
    let rex = 0x40 | (src.is_extended() as u8) << 2 | dest.is_extended() as u8;
    if rex != 0x40 {
        buf.emit_u8(rex);
    }
    buf.emit_u8(opcode);
    buf.emit_u8(modrm_direct(src, dest));
}

/// Shift-by-immediate form: `c1 /ext`, REX.B when the register is extended.
fn emit_shift(buf: &mut CodeBuffer, opcode_ext: u8, reg: X86Reg, amount: u8) {
    if reg.is_extended() {
        buf.emit_u8(0x41);
    }
    buf.emit_u8(0xc1);
    buf.emit_u8(0b11 << 6 | opcode_ext << 3 | reg.modrm_bits());
    buf.emit_u8(amount);
}

/// Stack load/store form: optional REX.R, opcode, `[rbp + slot*4]`.
/// The base register stays 64-bit: `rbp` holds a full heap pointer.
fn emit_reg_stack(buf: &mut CodeBuffer, opcode: u8, reg: X86Reg, slot: u8) {
    if reg.is_extended() {
        buf.emit_u8(0x44);
    }
    buf.emit_u8(opcode);
    buf.emit_u8(modrm_rbp_disp8(reg));
    buf.emit_u8(slot * 4);
}

fn encode_instr(
    instr: &X86Instr,
    body_offset: u32,
    labels: &LabelArena,
    buf: &mut CodeBuffer,
) -> Result<(), EncodeError> {
    match *instr {
        X86Instr::ZeroReg { reg } => emit_reg_reg(buf, 0x31, reg, reg),
        X86Instr::MovRegImm { dest, imm } => {
            if dest.is_extended() {
                buf.emit_u8(0x41);
            }
            buf.emit_u8(0xb8 + dest.modrm_bits());
            buf.emit_u32(imm as u32);
        }
        X86Instr::MovStackImm { dest_slot, imm } => {
            buf.emit_bytes(&[0xc7, 0x45, dest_slot * 4]);
            buf.emit_u32(imm as u32);
        }
        X86Instr::MovRegReg { dest, src } => emit_reg_reg(buf, 0x89, dest, src),
        X86Instr::MovRegStack { dest, src_slot } => {
            emit_reg_stack(buf, 0x8b, dest, src_slot);
        }
        X86Instr::MovStackReg { dest_slot, src } => {
            emit_reg_stack(buf, 0x89, src, dest_slot);
        }
        X86Instr::AddRegReg { dest, src } => emit_reg_reg(buf, 0x01, dest, src),
        X86Instr::AndRegReg { dest, src } => emit_reg_reg(buf, 0x21, dest, src),
        X86Instr::ShrRegImm { reg, amount } => emit_shift(buf, 0b101, reg, amount),
        X86Instr::ShlRegImm { reg, amount } => emit_shift(buf, 0b100, reg, amount),
        X86Instr::CmpRegReg { lhs, rhs } => emit_reg_reg(buf, 0x39, lhs, rhs),
        X86Instr::Jump { eq, target } => {
            let target_offset = labels
                .offset(target)
                .ok_or_else(|| EncodeError::UnresolvedLabel(labels.name(target).to_string()))?;

            buf.emit_u8(0x0f);
            buf.emit_u8(if eq { 0x84 } else { 0x85 });
            // Displacement is relative to the byte after the jump.
            let disp = target_offset as i64 - (body_offset as i64 + 6);
            buf.emit_u32(disp as i32 as u32);
        }
    }

    Ok(())
}
