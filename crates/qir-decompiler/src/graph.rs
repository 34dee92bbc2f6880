//! Control-flow graph construction.
//!
//! A single linear pass partitions the instruction stream into typed
//! blocks held in an index-addressed arena. Loop bodies are swallowed
//! verbatim into composite blocks (`ignore_until`); everything else
//! splits at jumps, branches and jump targets. Jump destinations are
//! resolved to block indices at close time through `block_mapping`,
//! which records a block for every instruction offset, including
//! instructions suppressed after a return, so targets still resolve.

use std::collections::HashMap;

use qir_bytecode::{Instruction, Opcode};
use qir_core::Expression;

use crate::error::DecompileError;

/// Edge label: fallthrough or taken jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    Normal,
    Jump,
}

pub type BlockId = usize;

/// Decompilation mode, keyed off the code object's declared name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Function,
    Comprehension,
}

/// State a composite loop block carries: the loop header, the body
/// instructions to hand to an inner decompiler, and (once executed)
/// the inner graph and the iterator taken from the surrounding stack.
#[derive(Debug, Default)]
pub struct LoopData {
    pub header: Option<Instruction>,
    /// First offset after the loop (the builder's `ignore_until`).
    pub end: u32,
    pub body: Vec<Instruction>,
    pub inner: Option<Box<InnerCfg>>,
    pub iterator: Option<Expression>,
}

/// A fully-processed inner graph of a composite loop block.
#[derive(Debug)]
pub struct InnerCfg {
    pub graph: Graph,
    pub entry: BlockId,
}

#[derive(Debug, Default)]
pub enum BlockKind {
    #[default]
    Linear,
    Jump {
        instruction: Instruction,
    },
    Branch {
        instruction: Instruction,
    },
    ForIter {
        instruction: Instruction,
    },
    WhileLoop(LoopData),
    ForLoop(LoopData),
    ComprehensionLoop(LoopData),
    /// Terminal carrier of a fixed expression, standing in for loop
    /// re-entry and loop exit inside composite bodies.
    Placeholder,
}

#[derive(Debug, Default)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub instructions: Vec<Instruction>,
    pub next: Option<BlockId>,
    pub next_jumped: Option<BlockId>,
    pub reached_return: bool,
    pub predecessors: Vec<(BlockId, FlowKind)>,

    // Filled by the symbolic executor.
    pub stack: Vec<Expression>,
    pub bindings: Vec<(String, Expression)>,
    pub returns: Option<Expression>,
    /// Element recorded by `LIST_APPEND`/`SET_ADD`/`MAP_ADD` (or a
    /// yield), consumed by the comprehension rewriter.
    pub appended: Option<Expression>,
    /// Whether the element came from a `YIELD_VALUE`.
    pub yielded: bool,

    // Filled by the lowerer.
    pub expression: Option<Expression>,
}

impl Block {
    pub fn successors(&self) -> Vec<(BlockId, FlowKind)> {
        let mut successors = Vec::new();
        if let Some(next) = self.next {
            successors.push((next, FlowKind::Normal));
        }
        if let Some(jumped) = self.next_jumped {
            successors.push((jumped, FlowKind::Jump));
        }
        successors
    }

}

#[derive(Debug, Default)]
pub struct Graph {
    pub blocks: Vec<Block>,
    pub block_mapping: HashMap<u32, BlockId>,
    pub mode: Mode,
    /// Topological order over the reachable blocks.
    pub ordering: Vec<BlockId>,
    /// Blocks unreachable from the entry, stripped of their edges.
    pub detached: Vec<BlockId>,
}

impl Graph {
    /// Partition `instructions` into blocks and wire the edges.
    ///
    /// `header` is the offset of a leading `FOR_ITER` that must stay a
    /// plain iteration block instead of opening a new composite loop;
    /// set when building the body of a for loop.
    pub fn build(
        instructions: &[Instruction],
        mode: Mode,
        header: Option<u32>,
    ) -> Result<Graph, DecompileError> {
        let mut graph = Graph {
            mode,
            ..Graph::default()
        };

        let mut ignore_until: Option<u32> = None;
        let mut force_new = true;

        for (index, instruction) in instructions.iter().enumerate() {
            if let Some(until) = ignore_until {
                if instruction.offset < until {
                    let id = graph.current();
                    graph.record(id, instruction);
                    if let Some(data) = graph.blocks[id].loop_data_mut() {
                        data.body.push(instruction.clone());
                    }
                    continue;
                }
                ignore_until = None;
            }

            match instruction.opcode {
                Opcode::ForIter if Some(instruction.offset) != header => {
                    let end = instruction
                        .target()
                        .ok_or(DecompileError::UnmappedOffset(instruction.offset))?;
                    let data = LoopData {
                        header: Some(instruction.clone()),
                        end,
                        body: vec![instruction.clone()],
                        inner: None,
                        iterator: None,
                    };
                    let kind = match mode {
                        Mode::Comprehension => BlockKind::ComprehensionLoop(data),
                        Mode::Function => BlockKind::ForLoop(data),
                    };
                    let id = graph.open(kind);
                    graph.record(id, instruction);
                    ignore_until = Some(end);
                    force_new = true;
                }

                Opcode::SetupLoop
                    if instructions
                        .get(index + 1)
                        .is_some_and(|next| next.is_jump_target && next.opcode != Opcode::ForIter) =>
                {
                    let end = instruction
                        .target()
                        .ok_or(DecompileError::UnmappedOffset(instruction.offset))?;
                    let data = LoopData {
                        header: Some(instruction.clone()),
                        end,
                        body: Vec::new(),
                        inner: None,
                        iterator: None,
                    };
                    let id = graph.open(BlockKind::WhileLoop(data));
                    graph.record(id, instruction);
                    ignore_until = Some(end);
                    force_new = true;
                }

                opcode if opcode.is_jump() => {
                    let id = graph.open(BlockKind::Jump {
                        instruction: instruction.clone(),
                    });
                    graph.record(id, instruction);
                    force_new = true;
                }

                opcode if opcode.is_branch() => {
                    let id = graph.open(BlockKind::Branch {
                        instruction: instruction.clone(),
                    });
                    graph.record(id, instruction);
                    force_new = true;
                }

                Opcode::ForIter => {
                    let id = graph.open(BlockKind::ForIter {
                        instruction: instruction.clone(),
                    });
                    graph.record(id, instruction);
                    force_new = true;
                }

                _ => {
                    if instruction.is_jump_target || force_new || graph.blocks.is_empty() {
                        force_new = false;
                        graph.open(BlockKind::Linear);
                    }
                    let id = graph.current();
                    graph.record(id, instruction);
                }
            }
        }

        graph.close()?;
        graph.rebuild_predecessors();
        Ok(graph)
    }

    fn current(&self) -> BlockId {
        self.blocks.len() - 1
    }

    /// Register an instruction with a block. The mapping always gets
    /// the entry (jump targets must resolve even into suppressed
    /// code), but instructions after a return are not kept.
    fn record(&mut self, id: BlockId, instruction: &Instruction) {
        self.block_mapping.insert(instruction.offset, id);
        let block = &mut self.blocks[id];
        if !block.reached_return {
            block.instructions.push(instruction.clone());
            if instruction.opcode == Opcode::ReturnValue {
                block.reached_return = true;
            }
        }
    }

    /// Append a block, wiring the previous block's fallthrough edge to
    /// it. Close-time resolution may overwrite that edge.
    fn open(&mut self, kind: BlockKind) -> BlockId {
        let id = self.blocks.len();
        if id > 0 {
            self.blocks[id - 1].next = Some(id);
        }
        self.blocks.push(Block {
            id,
            kind,
            ..Block::default()
        });
        id
    }

    /// Append a detached block (used for loop-body placeholders).
    pub fn append_placeholder(&mut self, expression: Expression) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(Block {
            id,
            kind: BlockKind::Placeholder,
            expression: Some(expression),
            ..Block::default()
        });
        id
    }

    /// Resolve jump destinations and cut edges after returns.
    fn close(&mut self) -> Result<(), DecompileError> {
        for id in 0..self.blocks.len() {
            if self.blocks[id].reached_return {
                self.blocks[id].next = None;
            }
            let resolved = match &self.blocks[id].kind {
                // An unconditional jump is always taken, so the
                // fallthrough edge is replaced outright.
                BlockKind::Jump { instruction } => Some((instruction.clone(), true)),
                BlockKind::Branch { instruction } | BlockKind::ForIter { instruction } => {
                    Some((instruction.clone(), false))
                }
                _ => None,
            };
            if let Some((instruction, replaces_next)) = resolved {
                let target = self.resolve(&instruction)?;
                if replaces_next {
                    self.blocks[id].next = Some(target);
                } else {
                    self.blocks[id].next_jumped = Some(target);
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, instruction: &Instruction) -> Result<BlockId, DecompileError> {
        let offset = instruction
            .target()
            .ok_or(DecompileError::UnmappedOffset(instruction.offset))?;
        self.block_mapping
            .get(&offset)
            .copied()
            .ok_or(DecompileError::UnmappedOffset(offset))
    }

    /// Recompute the reverse edge lists from the forward edges.
    pub fn rebuild_predecessors(&mut self) {
        for block in &mut self.blocks {
            block.predecessors.clear();
        }
        let edges: Vec<(BlockId, BlockId, FlowKind)> = self
            .blocks
            .iter()
            .flat_map(|block| {
                block
                    .successors()
                    .into_iter()
                    .map(move |(succ, flow)| (block.id, succ, flow))
            })
            .collect();
        for (from, to, flow) in edges {
            self.blocks[to].predecessors.push((from, flow));
        }
    }

    pub fn entry(&self) -> BlockId {
        0
    }
}

impl Block {
    pub fn loop_data(&self) -> Option<&LoopData> {
        match &self.kind {
            BlockKind::WhileLoop(data)
            | BlockKind::ForLoop(data)
            | BlockKind::ComprehensionLoop(data) => Some(data),
            _ => None,
        }
    }

    pub fn loop_data_mut(&mut self) -> Option<&mut LoopData> {
        match &mut self.kind {
            BlockKind::WhileLoop(data)
            | BlockKind::ForLoop(data)
            | BlockKind::ComprehensionLoop(data) => Some(data),
            _ => None,
        }
    }
}
