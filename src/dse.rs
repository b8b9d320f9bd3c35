//! Dead-store elimination. Grounded on `cfg.py`'s `dead_store_elimination`,
//! reworked to a mark-then-filter two-pass per the Open Question decision in
//! `SPEC_FULL.md` (the source pops from a list while iterating it, which is
//! a correctness trap this crate avoids).

use crate::cfg::Cfg;
use crate::ir::Instruction;
use crate::liveness;

/// Runs DSE to a fixed point: recompute liveness, drop dead stores, repeat
/// until a full round removes nothing. Returns the cleaned-up instruction
/// list for the whole function (blocks flattened back into one sequence).
pub fn eliminate(function_name: &str, instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut current = instructions;

    loop {
        let before = current.len();
        let mut cfg = Cfg::build(function_name, &current)
            .expect("instruction list already passed CFG construction once");
        liveness::analyze(&mut cfg);

        let mut next = Vec::with_capacity(current.len());
        for block in &cfg.blocks {
            if let Some(label) = &block.label {
                next.push(Instruction::Label(label.clone()));
            }
            for (idx, inst) in block.instructions.iter().enumerate() {
                if is_dead(inst, &block.live[idx + 1]) {
                    continue;
                }
                next.push(inst.clone());
            }
        }

        current = next;
        if current.len() == before {
            return current;
        }
    }
}

fn is_dead(inst: &Instruction, live_after: &std::collections::HashSet<String>) -> bool {
    if inst.has_side_effect() {
        return false;
    }

    match inst.writes() {
        Some(crate::ir::Operand::Reg(_)) => false,
        Some(dst) => match dst.name_key() {
            Some(key) => !live_after.contains(&key),
            None => false,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Operand;

    fn var(name: &str) -> Operand {
        Operand::Var(name.to_string())
    }

    #[test]
    fn unused_assignment_is_removed() {
        let instrs = vec![
            Instruction::Label("main".into()),
            Instruction::Movl(Operand::Imm(5), var("dead")),
            Instruction::Movl(Operand::Imm(1), var("x")),
            Instruction::Movl(var("x"), Operand::Reg(crate::ir::Register::Eax)),
        ];
        let result = eliminate("main", instrs);
        assert!(!result.contains(&Instruction::Movl(Operand::Imm(5), var("dead"))));
    }

    #[test]
    fn register_writes_are_never_removed() {
        let instrs = vec![
            Instruction::Label("main".into()),
            Instruction::Movl(Operand::Imm(0), Operand::Reg(crate::ir::Register::Eax)),
        ];
        let result = eliminate("main", instrs.clone());
        assert_eq!(result.len(), instrs.len());
    }

    #[test]
    fn calls_and_pushes_survive_even_without_destinations() {
        let instrs = vec![
            Instruction::Label("main".into()),
            Instruction::Pushl(Operand::Imm(3)),
            Instruction::Call(crate::ir::CallTarget::Symbol("print_any".into())),
        ];
        let result = eliminate("main", instrs.clone());
        assert_eq!(result.len(), instrs.len());
    }

    #[test]
    fn popl_into_a_dead_destination_is_never_removed() {
        // The popped value is never read afterward, but the instruction
        // still has to move %esp, so it must survive like a pushl would.
        let instrs = vec![
            Instruction::Label("main".into()),
            Instruction::Pushl(Operand::Imm(3)),
            Instruction::Popl(var("dead")),
            Instruction::Movl(Operand::Imm(0), Operand::Reg(crate::ir::Register::Eax)),
        ];
        let result = eliminate("main", instrs.clone());
        assert!(result.contains(&Instruction::Popl(var("dead"))));
    }
}
