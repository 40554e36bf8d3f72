// SPDX-License-Identifier: GPL-2.0

//! Arithmetic and logic transfer rules
//!
//! MOV copies, ADD and SUB do real interval arithmetic (on scalars and on
//! pointer offsets), AND with a non-negative constant mask bounds the
//! result, and every other operation widens its destination to unknown.
//! Arithmetic that mixes two pointer values, touches the frame pointer, or
//! operates on a pointer that has not been proven non-null is rejected.

use crate::core::error::{Result, VerifierError};
use crate::core::insn::Insn;
use crate::core::types::*;
use crate::state::reg_file::RegisterFile;
use crate::state::value::{AbstractValue, PtrValue, ScalarRange};

/// Apply one ALU/ALU64 instruction to the register file
pub fn check_alu_op(file: &mut RegisterFile, insn: &Insn, insn_idx: usize) -> Result<()> {
    let dst = insn.dst_reg;
    let is64 = insn.class() == BPF_ALU64;

    // The frame pointer is read-only
    if dst == REG_FP {
        return Err(VerifierError::InvalidPointerArithmetic { insn_idx });
    }

    let src_val = if insn.uses_src_reg() {
        *file.reg(insn.src_reg)
    } else if is64 {
        AbstractValue::constant(insn.imm as i64)
    } else {
        AbstractValue::constant(insn.imm as u32 as i64)
    };

    let dst_val = *file.reg(dst);

    let result = match insn.op() {
        BPF_MOV => check_mov(dst_val, src_val, is64, insn_idx)?,
        BPF_ADD => check_add_sub(dst_val, src_val, true, is64, insn_idx)?,
        BPF_SUB => check_add_sub(dst_val, src_val, false, is64, insn_idx)?,
        BPF_NEG => check_neg(dst_val, is64, insn_idx)?,
        BPF_AND => check_and(dst_val, src_val, insn, is64, insn_idx)?,
        _ => {
            // MUL/DIV/MOD/OR/XOR/shifts/END: no wrapping model, widen
            if dst_val.is_pointer_kind() || src_val.is_pointer_kind() {
                return Err(VerifierError::InvalidPointerArithmetic { insn_idx });
            }
            AbstractValue::Unknown
        }
    };

    file.set_reg(dst, result);
    Ok(())
}

fn check_mov(
    _dst: AbstractValue,
    src: AbstractValue,
    is64: bool,
    insn_idx: usize,
) -> Result<AbstractValue> {
    if is64 {
        return Ok(src);
    }

    // 32-bit mov truncates: a pointer would lose its provenance
    match src {
        AbstractValue::Ptr(_) | AbstractValue::MapRef { .. } => {
            Err(VerifierError::InvalidPointerArithmetic { insn_idx })
        }
        AbstractValue::Scalar(r) if r.min >= 0 && r.max <= u32::MAX as i64 => {
            Ok(AbstractValue::Scalar(r))
        }
        _ => Ok(AbstractValue::scalar(0, u32::MAX as i64)),
    }
}

fn check_add_sub(
    dst: AbstractValue,
    src: AbstractValue,
    is_add: bool,
    is64: bool,
    insn_idx: usize,
) -> Result<AbstractValue> {
    use AbstractValue::*;

    if dst.is_pointer_kind() && src.is_pointer_kind() {
        return Err(VerifierError::InvalidPointerArithmetic { insn_idx });
    }

    if !is64 {
        // 32-bit arithmetic wraps; pointer operands additionally truncate
        if dst.is_pointer_kind() || src.is_pointer_kind() {
            return Err(VerifierError::InvalidPointerArithmetic { insn_idx });
        }
        return Ok(Unknown);
    }

    match (dst, src) {
        (Ptr(p), Scalar(s)) => offset_ptr(p, s, is_add, insn_idx),
        // Commutative form: scalar += pointer
        (Scalar(s), Ptr(p)) if is_add => offset_ptr(p, s, true, insn_idx),
        (Scalar(a), Scalar(b)) => Ok(Scalar(if is_add { a.add(b) } else { a.sub(b) })),
        // A pointer with an unknown addend no longer has a usable bound
        _ => Ok(Unknown),
    }
}

/// Shift a pointer's offset range by a scalar range
fn offset_ptr(
    p: PtrValue,
    s: ScalarRange,
    is_add: bool,
    insn_idx: usize,
) -> Result<AbstractValue> {
    // Offsetting a pointer that may be null would let a later null check
    // prove the wrong thing
    if p.maybe_null() {
        return Err(VerifierError::InvalidPointerArithmetic { insn_idx });
    }
    let off = if is_add { p.off.add(s) } else { p.off.sub(s) };
    Ok(AbstractValue::Ptr(PtrValue { off, ..p }))
}

fn check_neg(dst: AbstractValue, is64: bool, insn_idx: usize) -> Result<AbstractValue> {
    match dst {
        AbstractValue::Scalar(r) if is64 => Ok(AbstractValue::Scalar(r.neg())),
        AbstractValue::Scalar(_) | AbstractValue::Unknown => Ok(AbstractValue::Unknown),
        _ => Err(VerifierError::InvalidPointerArithmetic { insn_idx }),
    }
}

fn check_and(
    dst: AbstractValue,
    src: AbstractValue,
    insn: &Insn,
    is64: bool,
    insn_idx: usize,
) -> Result<AbstractValue> {
    if dst.is_pointer_kind() || src.is_pointer_kind() {
        return Err(VerifierError::InvalidPointerArithmetic { insn_idx });
    }

    // Masking with a non-negative constant bounds the result whatever the
    // input was; the usual way unrolled code keeps an index in range
    if is64 && !insn.uses_src_reg() && insn.imm >= 0 {
        return Ok(AbstractValue::scalar(0, insn.imm as i64));
    }

    Ok(AbstractValue::Unknown)
}
