//! Final x86 text materialization. Grounded on `x86gen.py`'s
//! `x86CodeGen.x86gen` (frame-offset formula, prologue/epilogue order,
//! operand substitution, `movl a, a` elision, indirect-call rewrite).

use crate::interference::Graph;
use crate::ir::{CallTarget, CondCode, Instruction, Operand, K, PALETTE};
use util::Mnemonic;

/// Emits one function's assembly text: prologue, substituted body, epilogue.
pub fn emit(function_name: &str, instructions: &[Instruction], graph: &Graph) -> String {
    let frame_size = frame_size(graph);
    let mut lines = Vec::new();

    lines.push(format!(".globl {}", function_name));
    lines.push(format!("{}:", function_name));
    lines.push("pushl %ebp".to_string());
    lines.push("movl %esp, %ebp".to_string());
    lines.push(format!("subl ${}, %esp", frame_size));
    lines.push("pushl %edi".to_string());
    lines.push("pushl %esi".to_string());
    lines.push("pushl %ebx".to_string());

    for inst in instructions {
        if let Some(line) = render(inst, graph) {
            lines.push(line);
        }
    }

    lines.push("popl %ebx".to_string());
    lines.push("popl %esi".to_string());
    lines.push("popl %edi".to_string());
    lines.push(format!("addl ${}, %esp", frame_size));
    lines.push("leave".to_string());
    lines.push("ret".to_string());

    lines.join("\n")
}

fn frame_size(graph: &Graph) -> i32 {
    let max_color = graph
        .vertex_ids()
        .filter_map(|id| graph.vertex(id).color)
        .max()
        .unwrap_or(0);
    std::cmp::max(0, 4 * (max_color as i32 - K as i32 + 1))
}

fn render_operand(op: &Operand, graph: &Graph) -> String {
    match op {
        Operand::Imm(n) => format!("${}", n),
        Operand::FrameSlot(off) => format!("{}(%ebp)", off),
        Operand::Reg(reg) => format!("%{}", reg.mnemonic()),
        Operand::Var(name) => {
            let id = graph
                .lookup(name)
                .unwrap_or_else(|| panic!("variable `{}` has no interference vertex", name));
            let color = graph
                .vertex(id)
                .color
                .unwrap_or_else(|| panic!("variable `{}` was never colored", name));
            render_color(color)
        }
    }
}

fn render_color(color: usize) -> String {
    if color < K {
        format!("%{}", PALETTE[color].mnemonic())
    } else {
        let offset = -4 * (color as i32 - K as i32 + 1);
        format!("{}(%ebp)", offset)
    }
}

fn render_jcc(cc: CondCode) -> String {
    format!("j{}", cc.mnemonic())
}

/// Renders one instruction, or `None` if it elides to nothing (a `movl a, a`
/// surviving only because of register-allocation coincidence).
fn render(inst: &Instruction, graph: &Graph) -> Option<String> {
    match inst {
        Instruction::Movl(s, d) => {
            let (s, d) = (render_operand(s, graph), render_operand(d, graph));
            if s == d {
                None
            } else {
                Some(format!("movl {}, {}", s, d))
            }
        }
        Instruction::Addl(s, d) => Some(format!(
            "addl {}, {}",
            render_operand(s, graph),
            render_operand(d, graph)
        )),
        Instruction::Negl(d) => Some(format!("negl {}", render_operand(d, graph))),
        Instruction::Notl(d) => Some(format!("notl {}", render_operand(d, graph))),
        Instruction::Andl(s, d) => Some(format!(
            "andl {}, {}",
            render_operand(s, graph),
            render_operand(d, graph)
        )),
        Instruction::Orl(s, d) => Some(format!(
            "orl {}, {}",
            render_operand(s, graph),
            render_operand(d, graph)
        )),
        Instruction::Shl(s, d) => Some(format!(
            "shl {}, {}",
            render_operand(s, graph),
            render_operand(d, graph)
        )),
        Instruction::Shr(s, d) => Some(format!(
            "shr {}, {}",
            render_operand(s, graph),
            render_operand(d, graph)
        )),
        Instruction::Pushl(s) => Some(format!("pushl {}", render_operand(s, graph))),
        Instruction::Popl(d) => Some(format!("popl {}", render_operand(d, graph))),
        Instruction::Cmpl(a, b) => Some(format!(
            "cmpl {}, {}",
            render_operand(a, graph),
            render_operand(b, graph)
        )),
        Instruction::Call(CallTarget::Symbol(name)) => Some(format!("call {}", name)),
        Instruction::Call(CallTarget::Operand(op)) => {
            let rendered = render_operand(op, graph);
            Some(format!("call *{}", rendered))
        }
        Instruction::Jmp(label) => Some(format!("jmp {}", label)),
        Instruction::JmpCc(cc, label) => Some(format!("{} {}", render_jcc(*cc), label)),
        Instruction::Label(name) => Some(format!("{}:", name)),
    }
}
