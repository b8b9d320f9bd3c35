//! Basic-block splitting and successor linking. Grounded on `cfg.py`'s
//! `build_basic_blocks`/`connect_basic_blocks`.

use crate::error::BackendError;
use crate::ir::Instruction;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BranchKind {
    Unconditional,
    Conditional,
    None,
}

/// A maximal run of instructions with a single entry and single exit.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    /// The label this block starts with, if it has one.
    pub label: Option<String>,
    /// The jump target named by this block's terminator, if any.
    pub target: Option<String>,
    pub branch_kind: BranchKind,
    pub instructions: Vec<Instruction>,
    /// Populated by the connect phase: indices into the owning `Cfg`'s
    /// block list, in the order (branch-target, fall-through).
    pub successors: Vec<usize>,
    /// `live[i]` = variables live immediately before `instructions[i]`;
    /// `live[instructions.len()]` = live-out of the block. Populated by
    /// [`crate::liveness`].
    pub live: Vec<std::collections::HashSet<String>>,
}

impl BasicBlock {
    fn new() -> Self {
        BasicBlock {
            label: None,
            target: None,
            branch_kind: BranchKind::None,
            instructions: Vec::new(),
            successors: Vec::new(),
            live: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.label.is_none() && self.instructions.is_empty()
    }
}

/// Ordered list of basic blocks in original linear (textual) order.
#[derive(Clone, Debug)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
}

impl Cfg {
    /// Builds the CFG for one function's flat instruction list: splits into
    /// basic blocks, then resolves jump targets into successor edges.
    pub fn build(function_name: &str, instructions: &[Instruction]) -> Result<Cfg, BackendError> {
        let blocks = split_blocks(instructions);
        let mut cfg = Cfg { blocks };
        cfg.connect(function_name)?;
        Ok(cfg)
    }

    fn connect(&mut self, function_name: &str) -> Result<(), BackendError> {
        let label_index: HashMap<&str, usize> = self
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.label.as_deref().map(|l| (l, i)))
            .collect();

        for i in 0..self.blocks.len() {
            let (branch_kind, target) = {
                let block = &self.blocks[i];
                (block.branch_kind, block.target.clone())
            };

            let mut successors = Vec::new();
            match branch_kind {
                BranchKind::Unconditional => {
                    let target = target.unwrap();
                    let idx = *label_index.get(target.as_str()).ok_or_else(|| {
                        BackendError::UnresolvedJumpTarget {
                            function: function_name.to_string(),
                            label: target.clone(),
                        }
                    })?;
                    successors.push(idx);
                }
                BranchKind::Conditional => {
                    let target = target.unwrap();
                    let idx = *label_index.get(target.as_str()).ok_or_else(|| {
                        BackendError::UnresolvedJumpTarget {
                            function: function_name.to_string(),
                            label: target.clone(),
                        }
                    })?;
                    successors.push(idx);
                    if i + 1 < self.blocks.len() {
                        successors.push(i + 1);
                    }
                }
                BranchKind::None => {
                    if i + 1 < self.blocks.len() {
                        successors.push(i + 1);
                    }
                }
            }

            self.blocks[i].successors = successors;
        }

        Ok(())
    }
}

fn split_blocks(instructions: &[Instruction]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current = BasicBlock::new();
    let mut ended = false;

    for inst in instructions {
        if inst.is_label() {
            if !ended && !current.is_empty() {
                // A label while the current block hasn't been explicitly
                // ended implicitly falls through to it.
                blocks.push(std::mem::replace(&mut current, BasicBlock::new()));
            } else if ended {
                blocks.push(std::mem::replace(&mut current, BasicBlock::new()));
            }
            ended = false;
            if let Instruction::Label(name) = inst {
                current.label = Some(name.clone());
            }
            continue;
        }

        if ended {
            blocks.push(std::mem::replace(&mut current, BasicBlock::new()));
            ended = false;
        }

        current.instructions.push(inst.clone());

        if inst.is_jump() {
            current.target = inst.jump_target().map(|s| s.to_string());
            current.branch_kind = if inst.is_unconditional_jump() {
                BranchKind::Unconditional
            } else {
                BranchKind::Conditional
            };
            ended = true;
        }
    }

    if !current.is_empty() || blocks.is_empty() {
        blocks.push(current);
    }

    blocks
}
