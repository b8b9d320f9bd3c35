//! Interference-graph construction. Grounded on `interferencegraph.py`'s
//! `add_all_vertices`/`create_interference_graph` and its `save_set`/
//! `interference_set` edge tables. Vertices are arena-indexed (`VertexId`)
//! rather than Python-object-identity-linked, per the REDESIGN FLAGS note
//! on mutable graph-vertex objects shared by identity.

use crate::cfg::Cfg;
use crate::ir::{CallTarget, Instruction, Operand, Register, CALLER_SAVED, PALETTE};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VertexId(pub usize);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexKind {
    Register(Register),
    StackSlot,
    Constant,
    Variable,
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub name: String,
    pub kind: VertexKind,
    pub neighbors: HashSet<VertexId>,
    pub color: Option<usize>,
    pub candidates: HashSet<usize>,
    pub unspillable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    index: HashMap<String, VertexId>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.0]
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId)
    }

    pub fn lookup(&self, name: &str) -> Option<VertexId> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Adds a vertex if one with this name doesn't already exist; returns
    /// its id either way.
    pub fn add_vertex(&mut self, name: &str, kind: VertexKind) -> VertexId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            name: name.to_string(),
            kind,
            neighbors: HashSet::new(),
            color: None,
            candidates: HashSet::new(),
            unspillable: false,
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Adds an undirected edge, rejecting self-loops and tolerating
    /// duplicates.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) {
        if a == b {
            return;
        }
        self.vertices[a.0].neighbors.insert(b);
        self.vertices[b.0].neighbors.insert(a);
    }
}

fn operand_vertex(graph: &mut Graph, op: &Operand) -> Option<VertexId> {
    match op {
        Operand::Var(name) => Some(graph.add_vertex(name, VertexKind::Variable)),
        Operand::Reg(reg) => Some(graph.add_vertex(reg_name(*reg), VertexKind::Register(*reg))),
        Operand::Imm(_) | Operand::FrameSlot(_) => None,
    }
}

fn reg_name(reg: Register) -> &'static str {
    use util::Mnemonic;
    // Leak-free: Mnemonic returns the enum's own 'static str.
    reg.mnemonic()
}

/// Builds the interference graph for one function, given its IR (with
/// fixed-point liveness already computed on the CFG).
pub fn build(cfg: &Cfg) -> Graph {
    let mut graph = Graph::new();

    // Every machine register appears as a pre-colored vertex up front,
    // regardless of whether the IR happens to reference it, so coloring
    // never has to special-case an absent palette member.
    for (idx, reg) in PALETTE.iter().enumerate() {
        let id = graph.add_vertex(reg_name(*reg), VertexKind::Register(*reg));
        graph.vertex_mut(id).color = Some(idx);
    }

    for block in &cfg.blocks {
        for (i, inst) in block.instructions.iter().enumerate() {
            let live_after = &block.live[i + 1];
            add_vertices_for(&mut graph, inst);
            add_edges_for(&mut graph, inst, live_after);
        }
    }

    graph
}

fn add_vertices_for(graph: &mut Graph, inst: &Instruction) {
    for op in inst.reads() {
        operand_vertex(graph, op);
    }
    if let Some(op) = inst.writes() {
        operand_vertex(graph, op);
    }
}

fn add_edges_for(graph: &mut Graph, inst: &Instruction, live_after: &HashSet<String>) {
    match inst {
        Instruction::Movl(src, dst) => {
            let Some(d) = operand_vertex(graph, dst) else { return };
            let src_key = src.name_key();
            for name in live_after {
                if Some(name.as_str()) == dst.name_key().as_deref() {
                    continue;
                }
                if src_key.as_deref() == Some(name.as_str()) {
                    continue;
                }
                let v = graph.add_vertex(name, VertexKind::Variable);
                graph.add_edge(d, v);
            }
        }

        Instruction::Negl(d) | Instruction::Notl(d) => {
            let Some(dst_id) = operand_vertex(graph, d) else { return };
            edge_to_live_except_dst(graph, dst_id, d, live_after);
        }

        Instruction::Addl(_, d)
        | Instruction::Andl(_, d)
        | Instruction::Orl(_, d)
        | Instruction::Shl(_, d)
        | Instruction::Shr(_, d)
        | Instruction::Popl(d) => {
            let Some(dst_id) = operand_vertex(graph, d) else { return };
            edge_to_live_except_dst(graph, dst_id, d, live_after);
        }

        Instruction::Call(target) => {
            if let CallTarget::Operand(op) = target {
                operand_vertex(graph, op);
            }
            for &reg in &CALLER_SAVED {
                let reg_id = graph.add_vertex(reg_name(reg), VertexKind::Register(reg));
                for name in live_after {
                    let v = graph.add_vertex(name, VertexKind::Variable);
                    graph.add_edge(reg_id, v);
                }
            }
        }

        Instruction::Pushl(_)
        | Instruction::Cmpl(_, _)
        | Instruction::Jmp(_)
        | Instruction::JmpCc(_, _)
        | Instruction::Label(_) => {}
    }
}

fn edge_to_live_except_dst(
    graph: &mut Graph,
    dst_id: VertexId,
    dst: &Operand,
    live_after: &HashSet<String>,
) {
    let dst_key = dst.name_key();
    for name in live_after {
        if Some(name.as_str()) == dst_key.as_deref() {
            continue;
        }
        let v = graph.add_vertex(name, VertexKind::Variable);
        graph.add_edge(dst_id, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness;

    fn var(name: &str) -> Operand {
        Operand::Var(name.to_string())
    }

    #[test]
    fn simultaneously_live_variables_form_a_clique() {
        // a, b, c all live across the same instruction (e.g. at a call
        // site) must be pairwise connected.
        let instrs = vec![
            Instruction::Label("main".into()),
            Instruction::Movl(Operand::Imm(1), var("a")),
            Instruction::Movl(Operand::Imm(2), var("b")),
            Instruction::Movl(Operand::Imm(3), var("c")),
            Instruction::Pushl(var("a")),
            Instruction::Pushl(var("b")),
            Instruction::Pushl(var("c")),
            Instruction::Call(CallTarget::Symbol("print_any".into())),
        ];
        let mut cfg = Cfg::build("main", &instrs).unwrap();
        liveness::analyze(&mut cfg);
        let graph = build(&cfg);

        let a = graph.lookup("a").unwrap();
        let b = graph.lookup("b").unwrap();
        let c = graph.lookup("c").unwrap();
        assert!(graph.vertex(a).neighbors.contains(&b));
        assert!(graph.vertex(a).neighbors.contains(&c));
        assert!(graph.vertex(b).neighbors.contains(&c));
    }

    #[test]
    fn call_interferes_caller_saved_with_live_variables() {
        let instrs = vec![
            Instruction::Label("main".into()),
            Instruction::Movl(Operand::Imm(1), var("keepme")),
            Instruction::Call(CallTarget::Symbol("print_any".into())),
            Instruction::Movl(var("keepme"), Operand::Reg(Register::Eax)),
        ];
        let mut cfg = Cfg::build("main", &instrs).unwrap();
        liveness::analyze(&mut cfg);
        let graph = build(&cfg);

        let keepme = graph.lookup("keepme").unwrap();
        let eax = graph.lookup("eax").unwrap();
        let ecx = graph.lookup("ecx").unwrap();
        assert!(graph.vertex(keepme).neighbors.contains(&eax));
        assert!(graph.vertex(keepme).neighbors.contains(&ecx));
    }

    #[test]
    fn registers_are_precolored_to_their_palette_index() {
        let instrs = vec![Instruction::Label("main".into())];
        let mut cfg = Cfg::build("main", &instrs).unwrap();
        liveness::analyze(&mut cfg);
        let graph = build(&cfg);
        let eax = graph.lookup("eax").unwrap();
        assert_eq!(graph.vertex(eax).color, Some(0));
    }
}
