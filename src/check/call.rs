// SPDX-License-Identifier: GPL-2.0

//! External helper call checking
//!
//! Every call is matched against the closed helper table. Argument
//! registers r1.. are checked one by one against the declared shapes; the
//! first mismatch is reported with its 1-based argument index. On success
//! the caller-saved registers are scrubbed and r0 receives the helper's
//! declared return value.

use crate::core::error::{Result, VerifierError};
use crate::platform::helper::{helper_spec, ArgKind, RetKind};
use crate::platform::map::MapSet;
use crate::state::reg_file::RegisterFile;
use crate::state::value::{AbstractValue, Provenance, PtrValue, ScalarRange};
use crate::verifier::env::VerifierConfig;

/// Check a call instruction and apply its effects to the register file
pub fn check_helper_call(
    file: &mut RegisterFile,
    insn_idx: usize,
    helper_id: u32,
    maps: &MapSet,
    config: &VerifierConfig,
) -> Result<()> {
    let spec = helper_spec(helper_id).ok_or(VerifierError::UnknownExternalCall {
        insn_idx,
        helper_id,
    })?;

    // The map argument fixes the key/value sizes the later stack
    // arguments must cover
    let mut map_arg: Option<usize> = None;

    for (i, kind) in spec.args.iter().enumerate() {
        let arg = i + 1;
        let regno = arg as u8;
        let value = *file.reg(regno);
        let mismatch = VerifierError::InvalidCallArgument { insn_idx, arg };

        match kind {
            ArgKind::MapRef => match value {
                AbstractValue::MapRef { map } => map_arg = Some(map),
                _ => return Err(mismatch),
            },
            ArgKind::StackKey | ArgKind::StackValue => {
                let map = map_arg.ok_or(mismatch.clone())?;
                let desc = maps.get(map).ok_or(mismatch.clone())?;
                let needed = if matches!(kind, ArgKind::StackKey) {
                    desc.key_size
                } else {
                    desc.value_size
                };
                if !stack_window_ok(&value, needed, file.stack_depth, config) {
                    return Err(mismatch);
                }
            }
            ArgKind::Scalar => {
                if !matches!(value, AbstractValue::Scalar(_)) {
                    return Err(mismatch);
                }
            }
        }
    }

    file.clobber_caller_saved();
    file.set_reg(0, return_value(spec.ret, map_arg, maps));
    Ok(())
}

/// A stack argument must be a non-null stack pointer whose whole
/// `[lo, hi + needed)` window lies inside the frame and inside the
/// written depth
fn stack_window_ok(
    value: &AbstractValue,
    needed: u32,
    stack_depth: u32,
    config: &VerifierConfig,
) -> bool {
    let AbstractValue::Ptr(ptr) = value else {
        return false;
    };
    if ptr.prov != Provenance::Stack || ptr.maybe_null() {
        return false;
    }

    let lo = ptr.off.min;
    let hi = ptr.off.max.saturating_add(needed as i64);
    let frame = -(config.stack_size as i64);

    // Inside the frame, below the frame pointer, and fully initialized
    lo >= frame && hi <= 0 && lo >= -(stack_depth as i64)
}

/// Build the abstract value a helper leaves in r0
fn return_value(ret: RetKind, map_arg: Option<usize>, maps: &MapSet) -> AbstractValue {
    match ret {
        RetKind::StatusCode => AbstractValue::scalar(-4095, 0),
        RetKind::MapValueOrNull => {
            let Some(map) = map_arg else {
                // Table invariant: MapValueOrNull helpers take a MapRef
                return AbstractValue::Unknown;
            };
            let value_size = maps.get(map).map(|d| d.value_size).unwrap_or(0);
            AbstractValue::Ptr(
                PtrValue {
                    prov: Provenance::MapValue { map, value_size },
                    off: ScalarRange::constant(0),
                    flags: Default::default(),
                }
                .as_maybe_null(),
            )
        }
    }
}
