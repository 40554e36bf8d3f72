// SPDX-License-Identifier: GPL-2.0

//! # Sandbox verifier for loop-free BPF-style bytecode
//!
//! Static analysis that decides whether a program written in a restricted
//! eBPF-style instruction set is safe to run under a sandboxed runtime.
//! The verifier never executes the program: it decodes the instruction
//! stream, builds a control-flow graph, proves the graph acyclic, and then
//! walks the blocks once in topological order with an abstract interpreter
//! that tracks typed, range-bounded register state.
//!
//! A program is accepted only if
//!
//! - every control-flow path terminates (no cycles, so no loops),
//! - every memory access is provably inside its target object,
//! - every pointer is used consistently with its provenance and proven
//!   non-null before being dereferenced,
//! - every external call matches the declared shape of a known helper.
//!
//! ## Module Structure
//!
//! - [`core`]: instruction decoding, error definitions, logging
//! - [`analysis`]: basic blocks, edges, acyclicity and topological ordering
//! - [`state`]: the abstract value domain and the per-block register file
//! - [`check`]: per-instruction precondition checks (ALU, branch, memory, call)
//! - [`platform`]: map descriptors and the external helper table
//! - [`verifier`]: configuration, the path interpreter, and the verdict

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// Re-export alloc types for internal use
#[allow(unused_imports)]
pub(crate) mod stdlib {
    pub use alloc::boxed::Box;
    pub use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
    pub use alloc::format;
    pub use alloc::string::{String, ToString};
    pub use alloc::vec;
    pub use alloc::vec::Vec;
}

/// Core types, the instruction decoder, errors, and logging
pub mod core;

/// Control-flow analysis (blocks, edges, acyclicity, topological order)
pub mod analysis;

/// Abstract value domain and register state
pub mod state;

/// Per-instruction checking
pub mod check;

/// External collaborators: map descriptors and the helper table
pub mod platform;

/// The path interpreter and verdict reporting
pub mod verifier;

// ============================================================================
// Prelude - commonly used re-exports
// ============================================================================

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::error::{Result, VerifierError};
    pub use crate::core::insn::{Insn, Program, WideImm};
    pub use crate::core::log::{LogLevel, VerifierLog};

    pub use crate::analysis::cfg::{BasicBlock, BlockExit, ControlFlowGraph};

    pub use crate::state::reg_file::RegisterFile;
    pub use crate::state::value::{
        AbstractValue, Provenance, PtrFlags, PtrValue, ScalarRange,
    };

    pub use crate::platform::map::{MapDescriptor, MapSet};

    pub use crate::verifier::env::VerifierConfig;
    pub use crate::verifier::verdict::{VerificationReport, Verdict};
    pub use crate::verifier::{verify, Verifier};
}

// Re-export error types at crate root for convenience
pub use crate::core::error::{Result, VerifierError};
pub use crate::verifier::verdict::Verdict;
