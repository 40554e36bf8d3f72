// SPDX-License-Identifier: GPL-2.0

//! Control flow graph construction
//!
//! Partitions the decoded instruction sequence into maximal straight-line
//! basic blocks and computes the edges between them. Block boundaries
//! follow the leader rule: instruction 0, every branch target, and the
//! instruction after every jump or exit start a new block. Helper calls do
//! not end a block; they are straight-line instructions here.

use crate::core::error::{Result, VerifierError};
use crate::core::insn::{Insn, Program};
use crate::core::types::*;
use crate::stdlib::{BTreeMap, BTreeSet, Vec};

/// How control leaves a basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExit {
    /// The block ends in an exit instruction; no outgoing edge
    Return,
    /// Unconditional jump to another block
    Jump(usize),
    /// Straight-line continuation into the next block
    Fallthrough(usize),
    /// Conditional branch with a taken edge and a fallthrough edge
    Branch {
        /// Block entered when the condition holds
        taken: usize,
        /// Block entered when it does not
        fallthrough: usize,
    },
}

/// A maximal straight-line run of instructions with a single entry
///
/// Created once by [`ControlFlowGraph::build`]; never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicBlock {
    /// Index of the first instruction
    pub start: usize,
    /// Index of the last instruction (inclusive)
    pub end: usize,
    /// Outgoing edges
    pub exit: BlockExit,
}

impl BasicBlock {
    /// Successor block ids, in (taken, fallthrough) order
    pub fn successors(&self) -> [Option<usize>; 2] {
        match self.exit {
            BlockExit::Return => [None, None],
            BlockExit::Jump(b) | BlockExit::Fallthrough(b) => [Some(b), None],
            BlockExit::Branch { taken, fallthrough } => {
                [Some(taken), Some(fallthrough)]
            }
        }
    }
}

/// The set of basic blocks and the edges between them
///
/// Invariants established by [`build`](Self::build): block 0 starts at
/// instruction 0, every edge target is a block start, and blocks are stored
/// in ascending start order. Acyclicity is proven separately by
/// [`topo_order`](crate::analysis::order::topo_order).
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// Partition `prog` into basic blocks and connect the edges
    pub fn build(prog: &Program) -> Result<Self> {
        if prog.is_empty() {
            return Err(VerifierError::EmptyProgram);
        }

        let insns = prog.insns();
        let mut leaders = BTreeSet::new();
        leaders.insert(0usize);

        for (i, insn) in insns.iter().enumerate() {
            if !ends_block(insn) {
                continue;
            }
            if !insn.is_exit() {
                leaders.insert(branch_target(prog, insn, i)?);
            }
            if i + 1 < insns.len() {
                leaders.insert(i + 1);
            }
        }

        // Leader set -> block spans, then an index for edge resolution
        let starts: Vec<usize> = leaders.into_iter().collect();
        let block_of: BTreeMap<usize, usize> =
            starts.iter().enumerate().map(|(b, &s)| (s, b)).collect();

        let mut blocks = Vec::with_capacity(starts.len());
        for (b, &start) in starts.iter().enumerate() {
            let end = if b + 1 < starts.len() {
                starts[b + 1] - 1
            } else {
                insns.len() - 1
            };
            let exit = block_exit(prog, &block_of, end)?;
            blocks.push(BasicBlock { start, end, exit });
        }

        Ok(Self { blocks })
    }

    /// All blocks, in ascending start order; the entry block is index 0
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Block by id
    pub fn block(&self, id: usize) -> &BasicBlock {
        &self.blocks[id]
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the graph has no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Whether this instruction terminates straight-line flow
fn ends_block(insn: &Insn) -> bool {
    match insn.class() {
        BPF_JMP => insn.op() != BPF_CALL,
        BPF_JMP32 => true,
        _ => false,
    }
}

/// Resolve the branch target of a non-exit jump, in instruction indices
///
/// Branch offsets are relative to the slot after the jump and counted in
/// slot units, so resolution goes through the program's slot table; a
/// target outside the program or on the continuation slot of a wide load
/// is rejected.
fn branch_target(prog: &Program, insn: &Insn, idx: usize) -> Result<usize> {
    // The 32-bit goto keeps its (long-range) offset in the immediate
    let rel = if insn.class() == BPF_JMP32 && insn.op() == BPF_JA {
        insn.imm as i64
    } else {
        insn.off as i64
    };

    let slot = insn.slot as i64 + 1 + rel;
    prog.index_at_slot(slot)
        .ok_or(VerifierError::InvalidJumpTarget {
            insn_idx: idx,
            offset: slot,
        })
}

/// Classify the outgoing edges of the block ending at instruction `end`
fn block_exit(
    prog: &Program,
    block_of: &BTreeMap<usize, usize>,
    end: usize,
) -> Result<BlockExit> {
    let insns = prog.insns();
    let insn = &insns[end];

    let fallthrough = |end: usize| -> Result<usize> {
        if end + 1 < insns.len() {
            Ok(block_of[&(end + 1)])
        } else {
            Err(VerifierError::FallThroughExit { insn_idx: end })
        }
    };

    if !ends_block(insn) {
        return Ok(BlockExit::Fallthrough(fallthrough(end)?));
    }

    match insn.op() {
        BPF_EXIT => Ok(BlockExit::Return),
        BPF_JA => {
            let target = branch_target(prog, insn, end)?;
            Ok(BlockExit::Jump(block_of[&target]))
        }
        _ => {
            let target = branch_target(prog, insn, end)?;
            Ok(BlockExit::Branch {
                taken: block_of[&target],
                fallthrough: fallthrough(end)?,
            })
        }
    }
}
