// SPDX-License-Identifier: GPL-2.0

//! Verifier configuration

use crate::core::log::LogLevel;
use crate::core::types::MAX_STACK;

/// Tunable limits and sizes for one verification run
#[derive(Debug, Clone, Copy)]
pub struct VerifierConfig {
    /// Stack frame capacity in bytes below the frame pointer
    pub stack_size: u32,
    /// Size in bytes of the external context object passed in r1
    pub context_size: u32,
    /// Upper bound on accepted program length, in instructions
    pub max_insns: usize,
    /// Verbosity of the log returned in the report
    pub log_level: LogLevel,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            stack_size: MAX_STACK,
            context_size: 256,
            max_insns: 65536,
            log_level: LogLevel::Off,
        }
    }
}
