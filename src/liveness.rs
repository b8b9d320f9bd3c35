//! Fixed-point backward liveness analysis. Grounded on `cfg.py`'s
//! `run_fixed_point_liveness_analyis`/`liveness_analysis` and
//! `liveness.py`'s read/write tables and `is_indirect_call` rule.

use crate::cfg::Cfg;
use std::collections::HashSet;

/// Recomputes every block's `live` array in place until a full pass over
/// all blocks (in reverse textual order) leaves every set unchanged.
/// Termination is guaranteed: the lattice (subsets of a finite name set) is
/// finite and the transfer function is monotone.
pub fn analyze(cfg: &mut Cfg) {
    for block in cfg.blocks.iter_mut() {
        let n = block.instructions.len();
        block.live = vec![HashSet::new(); n + 1];
    }

    loop {
        let mut changed = false;

        for i in (0..cfg.blocks.len()).rev() {
            let successors = cfg.blocks[i].successors.clone();
            let live_out: HashSet<String> = successors
                .iter()
                .flat_map(|&s| cfg.blocks[s].live[0].iter().cloned())
                .collect();

            let block = &mut cfg.blocks[i];
            let n = block.instructions.len();
            if block.live[n] != live_out {
                block.live[n] = live_out;
                changed = true;
            }

            for idx in (0..n).rev() {
                let inst = &block.instructions[idx];
                let mut lv = block.live[idx + 1].clone();

                if let Some(w) = inst.writes() {
                    if let Some(key) = w.name_key() {
                        lv.remove(&key);
                    }
                }

                for op in inst.reads() {
                    if let Some(key) = op.name_key() {
                        lv.insert(key);
                    }
                }

                if block.live[idx] != lv {
                    block.live[idx] = lv;
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }
}
