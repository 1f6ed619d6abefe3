//! Peephole optimization over the abstract instruction stream.
//!
//! Rewrites happen in place: an instruction may be reclassified to a
//! cheaper variant, but instructions are never inserted or removed and
//! relative order is preserved, so label positions stay valid.

use super::translate::{AbstractInstr, AbstractKind, BinopKind, Storage};

/// Run the rewrite rules to fixpoint.
///
/// The current rule set never uncovers a new opportunity, so one pass
/// suffices, but the loop iterates until nothing changes so that adding
/// rules later cannot silently under-optimize.
pub fn optimize(instrs: &mut [AbstractInstr]) {
    while optimize_pass(instrs) {}
}

/// One rewrite pass. Returns whether anything changed.
fn optimize_pass(instrs: &mut [AbstractInstr]) -> bool {
    let mut did_change = false;

    for instr in instrs.iter_mut() {
        if let AbstractKind::Binop {
            dest,
            op: BinopKind::Add,
            lhs,
            rhs,
        } = instr.kind
        {
            // d <- 0 + a  or  d <- a + 0  becomes  d <- a
            let src = if lhs == Storage::Imm(0) {
                rhs
            } else if rhs == Storage::Imm(0) {
                lhs
            } else {
                continue;
            };

            instr.kind = AbstractKind::Mov { dest, src };
            did_change = true;
        }
    }

    did_change
}
