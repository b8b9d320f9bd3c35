//! Spill code emission. Grounded on `color_and_spill.py`'s
//! `generate_spillcode`, reworked against structured `Instruction` values
//! instead of re-parsed assembly lines; the mem/mem and frame-base/spill
//! trigger conditions follow `spec.md` §4.6's clean statement rather than
//! the traced original's convoluted (and partly dead) branch structure.

use crate::context::CompileContext;
use crate::interference::Graph;
use crate::ir::{Instruction, Operand, K};

pub struct SpillResult {
    pub instructions: Vec<Instruction>,
    pub spilled: bool,
    /// Names minted this round. The next coloring round must mark these
    /// vertices unspillable so they land in registers rather than being
    /// spilled again, which is what bounds the spill loop (invariant 7).
    pub new_temps: Vec<String>,
}

fn color_of(graph: &Graph, op: &Operand) -> Option<usize> {
    let key = op.name_key()?;
    graph.lookup(&key).and_then(|id| graph.vertex(id).color)
}

fn is_stack_slot(graph: &Graph, op: &Operand) -> bool {
    color_of(graph, op).map(|c| c >= K).unwrap_or(false)
}

/// Rewrites `instructions` so that no opcode is left holding two memory
/// operands, given the vertex colors in `graph`. Returns the rewritten
/// instructions and whether any spill temporary was introduced. `ctx` is
/// shared across every spill round in the owning function's compile so
/// temporary names never collide across rounds.
pub fn generate_spill_code(
    instructions: &[Instruction],
    graph: &Graph,
    ctx: &mut CompileContext,
) -> SpillResult {
    let mut out = Vec::with_capacity(instructions.len());
    let mut spilled = false;
    let mut new_temps = Vec::new();

    for inst in instructions {
        match inst {
            Instruction::Movl(src, dst) => {
                let needs_staging = (is_stack_slot(graph, src) && is_stack_slot(graph, dst))
                    || (src.is_frame_slot() && is_stack_slot(graph, dst));
                if needs_staging {
                    let name = ctx.fresh_temp();
                    new_temps.push(name.clone());
                    let t = Operand::Var(name);
                    out.push(Instruction::Movl(src.clone(), t.clone()));
                    out.push(Instruction::Movl(t, dst.clone()));
                    spilled = true;
                } else {
                    out.push(inst.clone());
                }
            }

            Instruction::Addl(src, dst) if is_stack_slot(graph, dst) => {
                let name = ctx.fresh_temp();
                new_temps.push(name.clone());
                let t = Operand::Var(name);
                out.push(Instruction::Movl(dst.clone(), t.clone()));
                out.push(Instruction::Addl(src.clone(), t.clone()));
                out.push(Instruction::Movl(t, dst.clone()));
                spilled = true;
            }

            Instruction::Shl(src, dst) if is_stack_slot(graph, dst) => {
                let name = ctx.fresh_temp();
                new_temps.push(name.clone());
                let t = Operand::Var(name);
                out.push(Instruction::Movl(dst.clone(), t.clone()));
                out.push(Instruction::Shl(src.clone(), t.clone()));
                out.push(Instruction::Movl(t, dst.clone()));
                spilled = true;
            }

            Instruction::Shr(src, dst) if is_stack_slot(graph, dst) => {
                let name = ctx.fresh_temp();
                new_temps.push(name.clone());
                let t = Operand::Var(name);
                out.push(Instruction::Movl(dst.clone(), t.clone()));
                out.push(Instruction::Shr(src.clone(), t.clone()));
                out.push(Instruction::Movl(t, dst.clone()));
                spilled = true;
            }

            other => out.push(other.clone()),
        }
    }

    SpillResult {
        instructions: out,
        spilled,
        new_temps,
    }
}
