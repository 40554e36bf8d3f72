// SPDX-License-Identifier: GPL-2.0

//! The verifier facade
//!
//! Wires the pipeline together: decode the byte stream, partition it into
//! basic blocks, prove the graph acyclic, interpret it once in topological
//! order, and wrap the outcome into a verdict. Data flows strictly
//! downward; no stage re-enters an earlier one.

pub mod env;
pub mod interp;
pub mod stats;
pub mod verdict;

use crate::analysis::cfg::ControlFlowGraph;
use crate::analysis::order::topo_order;
use crate::core::error::{Result, VerifierError};
use crate::core::insn::Program;
use crate::core::log::VerifierLog;
use crate::platform::map::MapSet;
use crate::stdlib::format;
use crate::verifier::env::VerifierConfig;
use crate::verifier::interp::PathInterpreter;
use crate::verifier::stats::VerifierStats;
use crate::verifier::verdict::{VerificationReport, Verdict};

/// One configured verifier
///
/// Holds no state between runs; safe to call from several threads on
/// independent programs as long as the map set is not mutated mid-flight.
pub struct Verifier<'a> {
    maps: &'a MapSet,
    config: VerifierConfig,
}

impl<'a> Verifier<'a> {
    /// A verifier with the default configuration
    pub fn new(maps: &'a MapSet) -> Self {
        Self {
            maps,
            config: VerifierConfig::default(),
        }
    }

    /// A verifier with explicit limits and sizes
    pub fn with_config(maps: &'a MapSet, config: VerifierConfig) -> Self {
        Self { maps, config }
    }

    /// Verify one raw instruction stream
    pub fn verify(&self, bytes: &[u8]) -> VerificationReport {
        let mut log = VerifierLog::new(self.config.log_level);
        let mut stats = VerifierStats::default();

        let verdict = match self.run(bytes, &mut log, &mut stats) {
            Ok(()) => Verdict::Accept,
            Err(reason) => {
                log.error(&format!("rejected: {}", reason));
                Verdict::reject(reason)
            }
        };

        VerificationReport {
            verdict,
            stats,
            log: log.take(),
        }
    }

    fn run(
        &self,
        bytes: &[u8],
        log: &mut VerifierLog,
        stats: &mut VerifierStats,
    ) -> Result<()> {
        let prog = Program::decode(bytes)?;
        if prog.is_empty() {
            return Err(VerifierError::EmptyProgram);
        }
        if prog.len() > self.config.max_insns {
            return Err(VerifierError::ProgramTooLarge(prog.len()));
        }
        self.resolve_handles(&prog)?;

        let cfg = ControlFlowGraph::build(&prog)?;
        let order = topo_order(&cfg)?;

        PathInterpreter::new(&prog, &cfg, &order, self.maps, &self.config, log, stats).run()
    }

    /// Every handle embedded in a wide load must name a supplied map
    /// before interpretation begins
    fn resolve_handles(&self, prog: &Program) -> Result<()> {
        for (idx, insn) in prog.insns().iter().enumerate() {
            if let Some(crate::core::insn::WideImm::MapHandle(handle)) = insn.wide {
                if self.maps.resolve(handle).is_none() {
                    return Err(VerifierError::UnknownMapHandle {
                        insn_idx: idx,
                        handle,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Verify a raw instruction stream with the default configuration
pub fn verify(bytes: &[u8], maps: &MapSet) -> Verdict {
    Verifier::new(maps).verify(bytes).verdict
}
