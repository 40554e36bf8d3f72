// SPDX-License-Identifier: GPL-2.0

//! The path interpreter
//!
//! Walks the basic blocks in topological order, so every block is
//! interpreted exactly once, after all of its predecessors. A block's
//! entry state is the join of the states its incoming edges delivered;
//! its instructions are then checked in order against a private copy of
//! that state, and the resulting per-edge exit states are pushed to the
//! successors. No fixed point, no re-iteration: the acyclicity proof
//! guarantees this single pass covers every path.

use crate::analysis::cfg::{BlockExit, ControlFlowGraph};
use crate::check::alu::check_alu_op;
use crate::check::branch::apply_branch;
use crate::check::call::check_helper_call;
use crate::check::mem::check_mem_access;
use crate::core::error::{Result, VerifierError};
use crate::core::insn::{Insn, Program, WideImm};
use crate::core::log::{fmt_insn, log_insn, VerifierLog};
use crate::core::types::*;
use crate::platform::map::MapSet;
use crate::state::reg_file::RegisterFile;
use crate::state::value::{AbstractValue, ScalarRange};
use crate::stdlib::{format, vec, Vec};
use crate::verifier::env::VerifierConfig;
use crate::verifier::stats::VerifierStats;

/// One-shot interpreter over an acyclic control-flow graph
pub struct PathInterpreter<'a> {
    prog: &'a Program,
    cfg: &'a ControlFlowGraph,
    order: &'a [usize],
    maps: &'a MapSet,
    config: &'a VerifierConfig,
    log: &'a mut VerifierLog,
    stats: &'a mut VerifierStats,
    /// Accumulated entry state per block; `None` until an edge arrives
    entry: Vec<Option<RegisterFile>>,
}

impl<'a> PathInterpreter<'a> {
    /// Set up an interpreter for one verification run
    pub fn new(
        prog: &'a Program,
        cfg: &'a ControlFlowGraph,
        order: &'a [usize],
        maps: &'a MapSet,
        config: &'a VerifierConfig,
        log: &'a mut VerifierLog,
        stats: &'a mut VerifierStats,
    ) -> Self {
        let entry = vec![None; cfg.len()];
        Self {
            prog,
            cfg,
            order,
            maps,
            config,
            log,
            stats,
            entry,
        }
    }

    /// Interpret every reachable block once; `Ok` means the program is safe
    pub fn run(mut self) -> Result<()> {
        self.entry[self.order[0]] = Some(RegisterFile::entry());

        for &bid in self.order {
            // Blocks whose every incoming edge was pruned are dead
            let Some(state) = self.entry[bid].take() else {
                continue;
            };
            self.interpret_block(bid, state)?;
        }

        Ok(())
    }

    fn interpret_block(&mut self, bid: usize, mut state: RegisterFile) -> Result<()> {
        let block = *self.cfg.block(bid);
        self.stats.blocks_visited += 1;
        self.log
            .info(&format!("block {} (insn {}..={})", bid, block.start, block.end));

        for idx in block.start..=block.end {
            let insn = self.prog.insns()[idx];
            if is_control_transfer(&insn) {
                // Only ever the terminator; handled through the block exit
                break;
            }
            self.step(&insn, idx, &mut state)?;
            self.stats.insns_visited += 1;
            log_insn(self.log, &insn, idx, &state);
        }

        match block.exit {
            BlockExit::Return => {}
            BlockExit::Jump(next) | BlockExit::Fallthrough(next) => {
                self.push_edge(next, state);
            }
            BlockExit::Branch { taken, fallthrough } => {
                let term = self.prog.insns()[block.end];
                self.stats.insns_visited += 1;
                let edges = apply_branch(&state, &term);

                match edges.taken {
                    Some(st) => self.push_edge(taken, st),
                    None => self.prune(block.end, &term),
                }
                match edges.fallthrough {
                    Some(st) => self.push_edge(fallthrough, st),
                    None => self.prune(block.end, &term),
                }
            }
        }

        Ok(())
    }

    /// Deliver an exit state over one edge, merging with whatever other
    /// edges already delivered
    fn push_edge(&mut self, to: usize, state: RegisterFile) {
        match &mut self.entry[to] {
            Some(existing) => {
                *existing = existing.join(&state);
                self.stats.states_merged += 1;
                self.log.debug(&format!("merged entry state of block {}", to));
            }
            slot @ None => *slot = Some(state),
        }
    }

    fn prune(&mut self, idx: usize, insn: &Insn) {
        self.stats.edges_pruned += 1;
        self.log
            .debug(&format!("infeasible edge at {}", fmt_insn(insn, idx)));
    }

    /// Check one straight-line instruction and apply its transfer rule
    fn step(&mut self, insn: &Insn, idx: usize, state: &mut RegisterFile) -> Result<()> {
        match insn.class() {
            BPF_ALU | BPF_ALU64 => check_alu_op(state, insn, idx),
            BPF_LD => self.load_wide_imm(insn, idx, state),
            BPF_LDX => {
                let base = *state.reg(insn.src_reg);
                check_mem_access(
                    state,
                    idx,
                    base,
                    insn.off,
                    insn.access_size(),
                    self.config,
                    false,
                )?;
                // Memory contents are not tracked; all that is known about
                // the loaded value is the width it was zero-extended from
                state.set_reg(
                    insn.dst_reg,
                    AbstractValue::Scalar(ScalarRange::of_width(insn.access_size())),
                );
                Ok(())
            }
            BPF_ST | BPF_STX => {
                let base = *state.reg(insn.dst_reg);
                check_mem_access(
                    state,
                    idx,
                    base,
                    insn.off,
                    insn.access_size(),
                    self.config,
                    true,
                )
            }
            BPF_JMP if insn.is_call() => {
                check_helper_call(state, idx, insn.imm as u32, self.maps, self.config)
            }
            // Jumps and exits are block terminators, never stepped
            _ => Ok(()),
        }
    }

    /// Materialize the value of a wide immediate load
    fn load_wide_imm(
        &mut self,
        insn: &Insn,
        idx: usize,
        state: &mut RegisterFile,
    ) -> Result<()> {
        let value = match insn.wide {
            Some(WideImm::Constant(v)) => AbstractValue::constant(v as i64),
            Some(WideImm::MapHandle(handle)) => {
                let (map, _) = self.maps.resolve(handle).ok_or(
                    VerifierError::UnknownMapHandle {
                        insn_idx: idx,
                        handle,
                    },
                )?;
                AbstractValue::MapRef { map }
            }
            // The decoder only produces BPF_LD as the wide form
            None => return Err(VerifierError::InvalidMemoryAccess { insn_idx: idx }),
        };

        state.set_reg(insn.dst_reg, value);
        Ok(())
    }
}

/// Whether this instruction transfers control (and so terminates a block)
fn is_control_transfer(insn: &Insn) -> bool {
    match insn.class() {
        BPF_JMP => insn.op() != BPF_CALL,
        BPF_JMP32 => true,
        _ => false,
    }
}
