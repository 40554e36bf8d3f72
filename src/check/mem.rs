// SPDX-License-Identifier: GPL-2.0

//! Memory access checking
//!
//! Loads and stores must go through a pointer whose provenance is known
//! and whose nullability has been resolved. The effective offset range
//! (the pointer's offset range plus the instruction's static offset) must
//! fit entirely inside the target object:
//!
//! - map values and the context are `[0, size)` objects;
//! - the stack is the frame-pointer-relative window `[-stack_size, 0)`.
//!
//! Stores into the stack additionally raise the register file's high-water
//! mark, which later bounds what helper calls may read as key or value
//! memory.

use crate::core::error::{Result, VerifierError};
use crate::state::reg_file::RegisterFile;
use crate::state::value::{AbstractValue, Provenance, ScalarRange};
use crate::verifier::env::VerifierConfig;

/// Check one load or store through `base` at `base + off`, `size` bytes
pub fn check_mem_access(
    file: &mut RegisterFile,
    insn_idx: usize,
    base: AbstractValue,
    off: i16,
    size: u32,
    config: &VerifierConfig,
    is_store: bool,
) -> Result<()> {
    let ptr = match base {
        AbstractValue::Ptr(p) => {
            if p.maybe_null() {
                return Err(VerifierError::NullPointerDereference { insn_idx });
            }
            p
        }
        AbstractValue::Null => {
            return Err(VerifierError::NullPointerDereference { insn_idx });
        }
        // Scalars, unknowns, and map references are not dereferenceable
        _ => return Err(VerifierError::InvalidMemoryAccess { insn_idx }),
    };

    let eff = ptr.off.add(ScalarRange::constant(off as i64));
    let size = size as i64;

    match ptr.prov {
        Provenance::MapValue { value_size, .. } => {
            check_sized_object(insn_idx, eff, size, value_size as i64)?;
        }
        Provenance::Context => {
            check_sized_object(insn_idx, eff, size, config.context_size as i64)?;
        }
        Provenance::Stack => {
            if eff.min < -(config.stack_size as i64) || eff.max.saturating_add(size) > 0 {
                return Err(VerifierError::OutOfBoundsAccess { insn_idx });
            }
            if is_store {
                file.note_stack_write((-eff.min) as u32);
            }
        }
    }

    Ok(())
}

/// Bounds check against a `[0, object_size)` object
fn check_sized_object(
    insn_idx: usize,
    eff: ScalarRange,
    size: i64,
    object_size: i64,
) -> Result<()> {
    if eff.min < 0 || eff.max.saturating_add(size) > object_size {
        return Err(VerifierError::OutOfBoundsAccess { insn_idx });
    }
    Ok(())
}
