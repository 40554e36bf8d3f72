// SPDX-License-Identifier: GPL-2.0

//! Error types for the verifier
//!
//! Every error is terminal for the current verification run: the verifier
//! fails fast on the first violation found in traversal order and never
//! attempts partial recovery.

#[cfg(not(feature = "std"))]
use core::fmt;

#[cfg(feature = "std")]
use thiserror::Error;

use crate::core::types::INSN_SIZE;

/// Result type alias for verifier operations
pub type Result<T> = core::result::Result<T, VerifierError>;

/// Reasons a program fails verification
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum VerifierError {
    #[cfg_attr(feature = "std", error("malformed instruction at byte offset {offset}"))]
    MalformedInstruction { offset: usize },

    #[cfg_attr(
        feature = "std",
        error("jump at instruction {insn_idx} targets slot {offset}, not an instruction boundary")
    )]
    InvalidJumpTarget { insn_idx: usize, offset: i64 },

    #[cfg_attr(feature = "std", error("instruction {insn_idx} falls through past the end of the program"))]
    FallThroughExit { insn_idx: usize },

    #[cfg_attr(feature = "std", error("control flow cycles from instruction {from} back to {to}"))]
    CyclicControlFlow { from: usize, to: usize },

    #[cfg_attr(feature = "std", error("invalid pointer arithmetic at instruction {insn_idx}"))]
    InvalidPointerArithmetic { insn_idx: usize },

    #[cfg_attr(feature = "std", error("out of bounds memory access at instruction {insn_idx}"))]
    OutOfBoundsAccess { insn_idx: usize },

    #[cfg_attr(feature = "std", error("possibly-null pointer dereferenced at instruction {insn_idx}"))]
    NullPointerDereference { insn_idx: usize },

    #[cfg_attr(feature = "std", error("memory access through a non-pointer at instruction {insn_idx}"))]
    InvalidMemoryAccess { insn_idx: usize },

    #[cfg_attr(
        feature = "std",
        error("argument {arg} of the call at instruction {insn_idx} has the wrong shape")
    )]
    InvalidCallArgument { insn_idx: usize, arg: usize },

    #[cfg_attr(
        feature = "std",
        error("unknown external call id {helper_id} at instruction {insn_idx}")
    )]
    UnknownExternalCall { insn_idx: usize, helper_id: u32 },

    #[cfg_attr(
        feature = "std",
        error("wide load at instruction {insn_idx} names unknown map handle {handle}")
    )]
    UnknownMapHandle { insn_idx: usize, handle: u32 },

    #[cfg_attr(feature = "std", error("empty program"))]
    EmptyProgram,

    #[cfg_attr(feature = "std", error("program too large: {0} instructions"))]
    ProgramTooLarge(usize),
}

// Manual Display implementation for no_std
#[cfg(not(feature = "std"))]
impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierError::MalformedInstruction { offset } => {
                write!(f, "malformed instruction at byte offset {}", offset)
            }
            VerifierError::InvalidJumpTarget { insn_idx, offset } => {
                write!(
                    f,
                    "jump at instruction {} targets slot {}, not an instruction boundary",
                    insn_idx, offset
                )
            }
            VerifierError::FallThroughExit { insn_idx } => {
                write!(f, "instruction {} falls through past the end of the program", insn_idx)
            }
            VerifierError::CyclicControlFlow { from, to } => {
                write!(f, "control flow cycles from instruction {} back to {}", from, to)
            }
            VerifierError::InvalidPointerArithmetic { insn_idx } => {
                write!(f, "invalid pointer arithmetic at instruction {}", insn_idx)
            }
            VerifierError::OutOfBoundsAccess { insn_idx } => {
                write!(f, "out of bounds memory access at instruction {}", insn_idx)
            }
            VerifierError::NullPointerDereference { insn_idx } => {
                write!(f, "possibly-null pointer dereferenced at instruction {}", insn_idx)
            }
            VerifierError::InvalidMemoryAccess { insn_idx } => {
                write!(f, "memory access through a non-pointer at instruction {}", insn_idx)
            }
            VerifierError::InvalidCallArgument { insn_idx, arg } => {
                write!(f, "argument {} of the call at instruction {} has the wrong shape", arg, insn_idx)
            }
            VerifierError::UnknownExternalCall { insn_idx, helper_id } => {
                write!(f, "unknown external call id {} at instruction {}", helper_id, insn_idx)
            }
            VerifierError::UnknownMapHandle { insn_idx, handle } => {
                write!(f, "wide load at instruction {} names unknown map handle {}", insn_idx, handle)
            }
            VerifierError::EmptyProgram => write!(f, "empty program"),
            VerifierError::ProgramTooLarge(n) => {
                write!(f, "program too large: {} instructions", n)
            }
        }
    }
}

impl VerifierError {
    /// The instruction index this error points at, for verdict reporting
    ///
    /// Decode errors carry a byte offset; it is converted to the index of
    /// the slot it falls in. Errors without a location report index 0.
    pub fn location(&self) -> usize {
        match *self {
            VerifierError::MalformedInstruction { offset } => offset / INSN_SIZE,
            VerifierError::InvalidJumpTarget { insn_idx, .. } => insn_idx,
            VerifierError::FallThroughExit { insn_idx } => insn_idx,
            VerifierError::CyclicControlFlow { from, .. } => from,
            VerifierError::InvalidPointerArithmetic { insn_idx } => insn_idx,
            VerifierError::OutOfBoundsAccess { insn_idx } => insn_idx,
            VerifierError::NullPointerDereference { insn_idx } => insn_idx,
            VerifierError::InvalidMemoryAccess { insn_idx } => insn_idx,
            VerifierError::InvalidCallArgument { insn_idx, .. } => insn_idx,
            VerifierError::UnknownExternalCall { insn_idx, .. } => insn_idx,
            VerifierError::UnknownMapHandle { insn_idx, .. } => insn_idx,
            VerifierError::EmptyProgram => 0,
            VerifierError::ProgramTooLarge(_) => 0,
        }
    }
}
