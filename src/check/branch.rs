// SPDX-License-Identifier: GPL-2.0

//! Conditional branch evaluation
//!
//! A conditional branch produces up to two outgoing states: one for the
//! taken edge and one for the fallthrough. Along each edge the compared
//! register is narrowed by what the comparison proved there:
//!
//! - a possibly-null pointer tested against zero becomes definitely null
//!   on one edge and definitely non-null on the other (without this, every
//!   lookup result would stay possibly-null forever and no dereference
//!   would verify);
//! - a scalar compared against a constant has its range refined per edge;
//! - an edge whose refinement empties the range is infeasible and simply
//!   not propagated.

use crate::core::insn::Insn;
use crate::core::types::*;
use crate::state::reg_file::RegisterFile;
use crate::state::value::{AbstractValue, ScalarRange};

/// The per-edge results of a conditional branch
///
/// `None` marks an edge proven infeasible in the current state.
#[derive(Debug, Clone)]
pub struct BranchEdges {
    /// State flowing to the branch target
    pub taken: Option<RegisterFile>,
    /// State flowing to the next instruction
    pub fallthrough: Option<RegisterFile>,
}

/// Evaluate a conditional branch against the current state
pub fn apply_branch(file: &RegisterFile, insn: &Insn) -> BranchEdges {
    let op = insn.op();
    let is32 = insn.class() == BPF_JMP32;
    let dst = insn.dst_reg;
    let dst_val = *file.reg(dst);

    // Null checks: a 64-bit eq/ne against immediate zero splits the
    // nullability of a pointer operand
    if !is32 && !insn.uses_src_reg() && insn.imm == 0 {
        if let Some(edges) = null_check(file, dst, dst_val, op) {
            return edges;
        }
    }

    // Constant on the right-hand side, either as the immediate or as a
    // register whose range collapsed to one value
    let rhs_const = if insn.uses_src_reg() {
        match file.reg(insn.src_reg) {
            AbstractValue::Scalar(r) => r.const_value(),
            _ => None,
        }
    } else {
        Some(insn.imm as i64)
    };

    if let (AbstractValue::Scalar(range), Some(k), false) = (dst_val, rhs_const, is32) {
        return scalar_vs_const(file, dst, range, op, k);
    }

    // Register against register: prune an edge only when the ranges
    // decide the comparison statically
    if insn.uses_src_reg() && !is32 {
        if let (AbstractValue::Scalar(a), AbstractValue::Scalar(b)) =
            (dst_val, *file.reg(insn.src_reg))
        {
            if let Some(taken) = decide(op, a, b) {
                return if taken {
                    BranchEdges {
                        taken: Some(*file),
                        fallthrough: None,
                    }
                } else {
                    BranchEdges {
                        taken: None,
                        fallthrough: Some(*file),
                    }
                };
            }
        }
    }

    // Nothing provable: both edges, unrefined
    BranchEdges {
        taken: Some(*file),
        fallthrough: Some(*file),
    }
}

/// Narrow pointer nullability across an eq/ne-zero comparison
fn null_check(
    file: &RegisterFile,
    dst: u8,
    dst_val: AbstractValue,
    op: u8,
) -> Option<BranchEdges> {
    let with_reg = |v: AbstractValue| {
        let mut f = *file;
        f.set_reg(dst, v);
        f
    };

    match (dst_val, op) {
        (AbstractValue::Ptr(p), BPF_JEQ) if p.maybe_null() => Some(BranchEdges {
            taken: Some(with_reg(AbstractValue::Null)),
            fallthrough: Some(with_reg(AbstractValue::Ptr(p.as_non_null()))),
        }),
        (AbstractValue::Ptr(p), BPF_JNE) if p.maybe_null() => Some(BranchEdges {
            taken: Some(with_reg(AbstractValue::Ptr(p.as_non_null()))),
            fallthrough: Some(with_reg(AbstractValue::Null)),
        }),
        // A pointer proven non-null is never equal to zero
        (AbstractValue::Ptr(_) | AbstractValue::MapRef { .. }, BPF_JEQ) => Some(BranchEdges {
            taken: None,
            fallthrough: Some(*file),
        }),
        (AbstractValue::Ptr(_) | AbstractValue::MapRef { .. }, BPF_JNE) => Some(BranchEdges {
            taken: Some(*file),
            fallthrough: None,
        }),
        (AbstractValue::Null, BPF_JEQ) => Some(BranchEdges {
            taken: Some(*file),
            fallthrough: None,
        }),
        (AbstractValue::Null, BPF_JNE) => Some(BranchEdges {
            taken: None,
            fallthrough: Some(*file),
        }),
        _ => None,
    }
}

/// Refine a scalar's range along both edges of a compare-to-constant
fn scalar_vs_const(
    file: &RegisterFile,
    dst: u8,
    range: ScalarRange,
    op: u8,
    k: i64,
) -> BranchEdges {
    let edge = |r: Option<ScalarRange>| {
        r.map(|r| {
            let mut f = *file;
            f.set_reg(dst, AbstractValue::Scalar(r));
            f
        })
    };

    let (taken, fallthrough) = refine(range, op, k);
    BranchEdges {
        taken: edge(taken),
        fallthrough: edge(fallthrough),
    }
}

/// Ranges surviving on the (taken, fallthrough) edges of `dst <op> k`
///
/// Unsigned comparisons refine only when both sides are known
/// non-negative, where they agree with the signed ordering.
fn refine(r: ScalarRange, op: u8, k: i64) -> (Option<ScalarRange>, Option<ScalarRange>) {
    let unsigned_ok = r.min >= 0 && k >= 0;

    match op {
        BPF_JEQ => (r.intersect(ScalarRange::constant(k)), trim_point(r, k)),
        BPF_JNE => (trim_point(r, k), r.intersect(ScalarRange::constant(k))),

        BPF_JSGT => split_gt(r, k),
        BPF_JSGE => split_ge(r, k),
        BPF_JSLT => swap(split_ge(r, k)),
        BPF_JSLE => swap(split_gt(r, k)),

        BPF_JGT if unsigned_ok => split_gt(r, k),
        BPF_JGE if unsigned_ok => split_ge(r, k),
        BPF_JLT if unsigned_ok => swap(split_ge(r, k)),
        BPF_JLE if unsigned_ok => swap(split_gt(r, k)),

        // JSET and everything unprovable: no refinement on either edge
        _ => (Some(r), Some(r)),
    }
}

/// (`> k`, `<= k`) split
fn split_gt(r: ScalarRange, k: i64) -> (Option<ScalarRange>, Option<ScalarRange>) {
    let above = k
        .checked_add(1)
        .and_then(|lo| r.intersect(ScalarRange::new(lo, i64::MAX)));
    let below = r.intersect(ScalarRange::new(i64::MIN, k));
    (above, below)
}

/// (`>= k`, `< k`) split
fn split_ge(r: ScalarRange, k: i64) -> (Option<ScalarRange>, Option<ScalarRange>) {
    let above = r.intersect(ScalarRange::new(k, i64::MAX));
    let below = k
        .checked_sub(1)
        .and_then(|hi| r.intersect(ScalarRange::new(i64::MIN, hi)));
    (above, below)
}

fn swap<T>(pair: (T, T)) -> (T, T) {
    (pair.1, pair.0)
}

/// Remove `k` from the range where an interval can express it (at the
/// endpoints); a range equal to `[k, k]` becomes infeasible
fn trim_point(r: ScalarRange, k: i64) -> Option<ScalarRange> {
    if r.const_value() == Some(k) {
        None
    } else if r.min == k {
        Some(ScalarRange::new(k + 1, r.max))
    } else if r.max == k {
        Some(ScalarRange::new(r.min, k - 1))
    } else {
        Some(r)
    }
}

/// Statically decide `a <op> b` from two ranges, if possible
fn decide(op: u8, a: ScalarRange, b: ScalarRange) -> Option<bool> {
    let unsigned_ok = a.min >= 0 && b.min >= 0;

    match op {
        BPF_JEQ => {
            if a.const_value().is_some() && a == b {
                Some(true)
            } else if a.intersect(b).is_none() {
                Some(false)
            } else {
                None
            }
        }
        BPF_JNE => decide(BPF_JEQ, a, b).map(|t| !t),
        BPF_JSGT => decide_gt(a, b),
        BPF_JSGE => decide_gt(b, a).map(|t| !t),
        BPF_JSLT => decide_gt(b, a),
        BPF_JSLE => decide_gt(a, b).map(|t| !t),
        BPF_JGT if unsigned_ok => decide_gt(a, b),
        BPF_JGE if unsigned_ok => decide_gt(b, a).map(|t| !t),
        BPF_JLT if unsigned_ok => decide_gt(b, a),
        BPF_JLE if unsigned_ok => decide_gt(a, b).map(|t| !t),
        _ => None,
    }
}

/// `a > b` over whole ranges, if decidable
fn decide_gt(a: ScalarRange, b: ScalarRange) -> Option<bool> {
    if a.min > b.max {
        Some(true)
    } else if a.max <= b.min {
        Some(false)
    } else {
        None
    }
}
