// SPDX-License-Identifier: GPL-2.0

//! Per-block register state
//!
//! One [`RegisterFile`] flows along every control-flow edge. Propagation
//! always copies; two blocks never observe the same instance, so a branch
//! can refine its own copy without disturbing sibling paths.

use crate::core::types::{MAX_REG, REG_1, REG_FP};
use crate::state::value::{AbstractValue, Provenance, PtrValue};

/// The abstract contents of the 11 registers plus the stack high-water mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [AbstractValue; MAX_REG],
    /// Deepest stack byte written so far, as a positive depth below the
    /// frame pointer
    pub stack_depth: u32,
}

impl RegisterFile {
    /// The fixed state every program starts from: all registers unknown,
    /// r10 the frame pointer, r1 the external context
    pub fn entry() -> Self {
        let mut file = Self {
            regs: [AbstractValue::Unknown; MAX_REG],
            stack_depth: 0,
        };
        file.regs[REG_FP as usize] = AbstractValue::Ptr(PtrValue::at(Provenance::Stack, 0));
        file.regs[REG_1 as usize] = AbstractValue::Ptr(PtrValue::at(Provenance::Context, 0));
        file
    }

    /// Value of a register
    pub fn reg(&self, r: u8) -> &AbstractValue {
        &self.regs[r as usize]
    }

    /// Overwrite a register
    pub fn set_reg(&mut self, r: u8, v: AbstractValue) {
        self.regs[r as usize] = v;
    }

    /// Scrub the caller-saved registers r1..=r5 after an external call
    pub fn clobber_caller_saved(&mut self) {
        for r in 1..=5 {
            self.regs[r] = AbstractValue::Unknown;
        }
    }

    /// Record a store reaching `depth` bytes below the frame pointer
    pub fn note_stack_write(&mut self, depth: u32) {
        self.stack_depth = self.stack_depth.max(depth);
    }

    /// Merge with the state arriving over another incoming edge
    pub fn join(&self, other: &Self) -> Self {
        let mut regs = [AbstractValue::Unknown; MAX_REG];
        for (i, slot) in regs.iter_mut().enumerate() {
            *slot = self.regs[i].join(&other.regs[i]);
        }
        Self {
            regs,
            stack_depth: self.stack_depth.max(other.stack_depth),
        }
    }
}
