//! Most-constrained-vertex graph coloring and the outer spill loop.
//! Grounded on `color_and_spill.py`'s `color()`/`color_and_spill()` and
//! `utils.py`'s `Graph.get_most_constrained_vertex`, with the selection
//! rule taken from the clean (not the traced original's quirky) tie-break
//! table.

mod spill;

pub use spill::{generate_spill_code, SpillResult};

use crate::cfg::Cfg;
use crate::interference::{Graph, VertexId};
use crate::ir::K;

/// Colors every vertex in `graph` in place. Pre-colored vertices (machine
/// registers) are left untouched; their colors just constrain neighbors.
pub fn color(graph: &mut Graph) {
    let all_ids: Vec<VertexId> = graph.vertex_ids().collect();
    let precolored = all_ids
        .iter()
        .filter(|&&id| graph.vertex(id).color.is_some())
        .count();
    let mut num_colors = K + precolored;

    for &id in &all_ids {
        graph.vertex_mut(id).candidates = (0..num_colors).collect();
    }

    loop {
        propagate_colored(graph, &all_ids);

        let Some(chosen) = most_constrained_vertex(graph, &all_ids) else {
            break;
        };

        let assigned = {
            let candidates = &graph.vertex(chosen).candidates;
            if candidates.is_empty() {
                let new_color = num_colors;
                num_colors += 1;
                for &id in &all_ids {
                    if graph.vertex(id).color.is_none() {
                        graph.vertex_mut(id).candidates.insert(new_color);
                    }
                }
                new_color
            } else {
                *candidates.iter().min().unwrap()
            }
        };
        graph.vertex_mut(chosen).color = Some(assigned);
    }
}

/// Every colored vertex pins its own candidate set to its assigned color
/// and removes that color from each neighbor's candidates, per the
/// iteration invariant.
fn propagate_colored(graph: &mut Graph, all_ids: &[VertexId]) {
    for &id in all_ids {
        let Some(c) = graph.vertex(id).color else {
            continue;
        };
        graph.vertex_mut(id).candidates = std::iter::once(c).collect();
        let neighbors: Vec<VertexId> = graph.vertex(id).neighbors.iter().copied().collect();
        for n in neighbors {
            graph.vertex_mut(n).candidates.remove(&c);
        }
    }
}

fn most_constrained_vertex(graph: &Graph, all_ids: &[VertexId]) -> Option<VertexId> {
    let mut best: Option<VertexId> = None;
    let mut best_len = usize::MAX;

    for &id in all_ids {
        let v = graph.vertex(id);
        if v.color.is_some() {
            continue;
        }
        let len = v.candidates.len();
        let better = match best {
            None => true,
            Some(b) => {
                let bv = graph.vertex(b);
                len < best_len
                    || (len == best_len
                        && tie_break_wins(v.unspillable, v.neighbors.len(), bv.unspillable, bv.neighbors.len()))
            }
        };
        if better {
            best = Some(id);
            best_len = len;
        }
    }

    best
}

/// True if the candidate (`cand_unspillable`/`cand_neighbors`) should
/// replace the current best under the tie-break order: unspillable first,
/// then highest neighbor count.
fn tie_break_wins(
    cand_unspillable: bool,
    cand_neighbors: usize,
    best_unspillable: bool,
    best_neighbors: usize,
) -> bool {
    match (cand_unspillable, best_unspillable) {
        (true, false) => true,
        (false, true) => false,
        _ => cand_neighbors > best_neighbors,
    }
}

/// Runs coloring to a fixed point across spill rounds: color, emit spill
/// code, and if any spills were introduced, rebuild the interference graph
/// from the respilled IR (carrying forward stack-slot colors and
/// unspillable flags) and recolor. Returns the final instruction list
/// together with the graph that colored it, since the two are only
/// mutually consistent as a pair — a graph rebuilt from the final IR
/// independently would need recoloring, and a fresh coloring could assign
/// stack slots the spill loop never accounted for.
pub fn color_and_spill(
    function_name: &str,
    instructions: Vec<crate::ir::Instruction>,
) -> Result<(Vec<crate::ir::Instruction>, Graph), crate::error::BackendError> {
    let mut cfg = Cfg::build(function_name, &instructions)?;
    crate::liveness::analyze(&mut cfg);
    let mut graph = crate::interference::build(&cfg);
    color(&mut graph);

    let mut ctx = crate::context::CompileContext::new();
    let SpillResult {
        mut instructions,
        mut spilled,
        mut new_temps,
    } = generate_spill_code(&instructions, &graph, &mut ctx);

    while spilled {
        let mut next_cfg = Cfg::build(function_name, &instructions)?;
        crate::liveness::analyze(&mut next_cfg);
        let mut next_graph = crate::interference::build(&next_cfg);

        for id in graph.vertex_ids() {
            let v = graph.vertex(id);
            if let Some(next_id) = next_graph.lookup(&v.name) {
                if let Some(color) = v.color {
                    if color >= K {
                        next_graph.vertex_mut(next_id).color = Some(color);
                    }
                }
                if v.unspillable {
                    next_graph.vertex_mut(next_id).unspillable = true;
                }
            }
        }
        // Temporaries minted by the round that produced `instructions` must
        // win a register this time, or the loop could respill them forever.
        for name in &new_temps {
            if let Some(id) = next_graph.lookup(name) {
                next_graph.vertex_mut(id).unspillable = true;
            }
        }

        color(&mut next_graph);
        let result = generate_spill_code(&instructions, &next_graph, &mut ctx);
        instructions = result.instructions;
        spilled = result.spilled;
        new_temps = result.new_temps;
        graph = next_graph;
    }

    Ok((instructions, graph))
}
