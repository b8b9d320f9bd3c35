//! Local value numbering, restricted to `movl`/`addl` per the Open
//! Question decision recorded in `DESIGN.md`. Grounded on `cfg.py`'s
//! embedded `lvn()` method; the "variable not in map" `RuntimeError` the
//! source raises for `addl` on an unseen destination is replaced with an
//! explicit `Result`, per the re-architecture note on exceptions-as-
//! control-flow in `SPEC_FULL.md` §9.

use crate::error::BackendError;
use crate::ir::{Instruction, Operand};
use std::collections::HashMap;

#[derive(Default)]
struct BlockState {
    var_to_num: HashMap<String, u32>,
    num_to_operand: HashMap<u32, Operand>,
    expr_to_num: HashMap<String, u32>,
    next_num: u32,
}

impl BlockState {
    fn fresh(&mut self) -> u32 {
        let n = self.next_num;
        self.next_num += 1;
        n
    }

    /// Lenient lookup used by `movl`'s variable-source case: assigns a
    /// fresh opaque number on first reference.
    fn get_or_assign(&mut self, op: &Operand) -> u32 {
        let key = op
            .name_key()
            .expect("get_or_assign called on an unnamed operand");
        if let Some(&n) = self.var_to_num.get(&key) {
            return n;
        }
        let n = self.fresh();
        self.var_to_num.insert(key, n);
        self.num_to_operand.insert(n, op.clone());
        n
    }

    /// Strict lookup used by `addl`'s operands: both the source (if a
    /// variable) and the destination must already carry a value number,
    /// established by an earlier instruction in this block.
    fn get_existing(&self, function_name: &str, op: &Operand) -> Result<u32, BackendError> {
        let key = op
            .name_key()
            .expect("get_existing called on an unnamed operand");
        self.var_to_num
            .get(&key)
            .copied()
            .ok_or_else(|| BackendError::LvnInvariantViolation {
                function: function_name.to_string(),
                var: key,
            })
    }

    fn record(&mut self, dst: &Operand, num: u32) {
        let key = dst.name_key().expect("record called on an unnamed operand");
        self.var_to_num.insert(key, num);
        self.num_to_operand.insert(num, dst.clone());
    }

    fn invalidate(&mut self, dst: &Operand) {
        let num = self.fresh();
        self.record(dst, num);
    }
}

/// Canonicalizes redundant copies and recurrent additions within one basic
/// block's instruction list (labels excluded — callers keep those outside).
pub fn canonicalize_block(
    function_name: &str,
    instructions: &[Instruction],
) -> Result<Vec<Instruction>, BackendError> {
    let mut state = BlockState::default();
    let mut out = Vec::with_capacity(instructions.len());

    for inst in instructions {
        match inst {
            Instruction::Movl(src, dst) => {
                match src {
                    Operand::Imm(_) | Operand::FrameSlot(_) => state.invalidate(dst),
                    Operand::Var(_) | Operand::Reg(_) => {
                        let num = state.get_or_assign(src);
                        state.record(dst, num);
                    }
                }
                out.push(inst.clone());
            }

            Instruction::Addl(src, dst) => {
                let old_dst_num = state.get_existing(function_name, dst)?;
                let src_token = match src {
                    Operand::Imm(n) => format!("imm:{}", n),
                    Operand::FrameSlot(off) => format!("frame:{}", off),
                    Operand::Var(_) | Operand::Reg(_) => {
                        format!("num:{}", state.get_existing(function_name, src)?)
                    }
                };
                let expr = format!("{}+num:{}", src_token, old_dst_num);

                if let Some(&num) = state.expr_to_num.get(&expr) {
                    let representative = state.num_to_operand.get(&num).cloned();
                    if let Some(representative) = representative {
                        state.record(dst, num);
                        out.push(Instruction::Movl(representative, dst.clone()));
                        continue;
                    }
                }

                let fresh = state.fresh();
                state.expr_to_num.insert(expr, fresh);
                state.record(dst, fresh);
                out.push(inst.clone());
            }

            _ => {
                if let Some(dst) = inst.writes() {
                    state.invalidate(dst);
                }
                out.push(inst.clone());
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Operand {
        Operand::Var(name.to_string())
    }

    #[test]
    fn shared_subexpression_collapses_to_a_move() {
        // a, b established; c is a copy of b's pre-add value. The second
        // addl computes the identical expression the first one did, so it
        // collapses into a copy of the first add's result.
        let instrs = vec![
            Instruction::Movl(Operand::Imm(1), var("a")),
            Instruction::Movl(Operand::Imm(2), var("b")),
            Instruction::Movl(var("b"), var("c")),
            Instruction::Addl(var("a"), var("b")),
            Instruction::Addl(var("a"), var("c")),
        ];
        let out = canonicalize_block("main", &instrs).unwrap();
        assert_eq!(out[4], Instruction::Movl(var("b"), var("c")));
    }

    #[test]
    fn non_add_write_invalidates_destination() {
        let instrs = vec![
            Instruction::Movl(Operand::Imm(1), var("a")),
            Instruction::Movl(Operand::Imm(2), var("b")),
            Instruction::Addl(var("a"), var("b")),
            Instruction::Shl(Operand::Imm(1), var("b")),
            Instruction::Movl(Operand::Imm(1), var("x")),
            Instruction::Movl(Operand::Imm(2), var("y")),
            Instruction::Movl(var("y"), var("b")),
            Instruction::Addl(var("x"), var("b")),
        ];
        // b was clobbered by the shl, so this later addl is not a repeat
        // of the first one even though the operand shapes look similar.
        let out = canonicalize_block("main", &instrs).unwrap();
        assert_eq!(out[7], instrs[7]);
    }

    #[test]
    fn addl_on_unseen_destination_is_an_invariant_violation() {
        let instrs = vec![Instruction::Addl(var("a"), var("b"))];
        assert!(matches!(
            canonicalize_block("main", &instrs),
            Err(BackendError::LvnInvariantViolation { .. })
        ));
    }
}
