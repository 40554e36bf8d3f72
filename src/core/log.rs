// SPDX-License-Identifier: GPL-2.0

//! Verbose logging for the verifier
//!
//! A bounded in-memory log that travels with the verifier instance and is
//! returned in the verification report. Useful for understanding why a
//! program was accepted or rejected without attaching a debugger.

use core::fmt::Write;

use crate::core::insn::Insn;
use crate::core::types::*;
use crate::state::reg_file::RegisterFile;
use crate::state::value::{AbstractValue, Provenance};
use crate::stdlib::{format, String};

/// Log level for verifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// No logging
    #[default]
    Off = 0,
    /// Only rejections
    Error = 1,
    /// Block traversal and branch decisions
    Info = 2,
    /// State merges and per-edge refinements
    Debug = 3,
    /// Every instruction with the register file after it
    Trace = 4,
}

/// Bounded verifier log buffer
#[derive(Debug, Clone, Default)]
pub struct VerifierLog {
    /// Log level threshold
    pub level: LogLevel,
    buffer: String,
    max_size: usize,
    truncated: bool,
}

impl VerifierLog {
    /// Create a log with the given threshold and a 256 KiB buffer cap
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            buffer: String::new(),
            max_size: 256 * 1024,
            truncated: false,
        }
    }

    /// Whether messages at `level` will be recorded
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.level
    }

    /// Append a message at the given level
    pub fn log(&mut self, level: LogLevel, msg: &str) {
        if !self.enabled(level) || self.truncated {
            return;
        }
        if self.buffer.len() + msg.len() + 1 > self.max_size {
            self.truncated = true;
            self.buffer.push_str("... log truncated ...\n");
            return;
        }
        self.buffer.push_str(msg);
        self.buffer.push('\n');
    }

    /// Log a rejection
    pub fn error(&mut self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    /// Log traversal progress
    pub fn info(&mut self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    /// Log merge and refinement detail
    pub fn debug(&mut self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    /// Log per-instruction detail
    pub fn trace(&mut self, msg: &str) {
        self.log(LogLevel::Trace, msg);
    }

    /// The accumulated log text
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Move the accumulated text out of the log
    pub fn take(&mut self) -> String {
        self.truncated = false;
        core::mem::take(&mut self.buffer)
    }
}

/// Format one register value for the log
pub fn fmt_reg(value: &AbstractValue, regno: usize) -> String {
    let mut s = String::new();
    write!(s, "R{}", regno).unwrap();

    match value {
        AbstractValue::Unknown => write!(s, "=?").unwrap(),
        AbstractValue::Scalar(r) => {
            if let Some(v) = r.const_value() {
                write!(s, "={}", v).unwrap();
            } else {
                write!(s, "=scalar({}..={})", r.min, r.max).unwrap();
            }
        }
        AbstractValue::MapRef { map } => write!(s, "=map#{}", map).unwrap(),
        AbstractValue::Ptr(p) => {
            match p.prov {
                Provenance::Stack => write!(s, "=fp").unwrap(),
                Provenance::Context => write!(s, "=ctx").unwrap(),
                Provenance::MapValue { map, .. } => {
                    write!(s, "=map_value#{}", map).unwrap()
                }
            }
            if let Some(v) = p.off.const_value() {
                if v != 0 {
                    write!(s, "{:+}", v).unwrap();
                }
            } else {
                write!(s, "+[{}..={}]", p.off.min, p.off.max).unwrap();
            }
            if p.maybe_null() {
                write!(s, "_or_null").unwrap();
            }
        }
        AbstractValue::Null => write!(s, "=null").unwrap(),
    }

    s
}

/// Format the non-trivial registers of a register file
pub fn fmt_regs(file: &RegisterFile) -> String {
    let mut s = String::new();
    for i in 0..MAX_REG {
        let reg = file.reg(i as u8);
        if *reg == AbstractValue::Unknown {
            continue;
        }
        if !s.is_empty() {
            s.push(' ');
        }
        s.push_str(&fmt_reg(reg, i));
    }
    s
}

/// Format one instruction for the log
pub fn fmt_insn(insn: &Insn, idx: usize) -> String {
    let mut s = String::new();
    write!(s, "{}: ", idx).unwrap();

    match insn.class() {
        BPF_ALU | BPF_ALU64 => {
            let width = if insn.class() == BPF_ALU64 { "" } else { "32" };
            let op_name = match insn.op() {
                BPF_ADD => "add",
                BPF_SUB => "sub",
                BPF_MUL => "mul",
                BPF_DIV => "div",
                BPF_MOD => "mod",
                BPF_OR => "or",
                BPF_AND => "and",
                BPF_XOR => "xor",
                BPF_LSH => "lsh",
                BPF_RSH => "rsh",
                BPF_ARSH => "arsh",
                BPF_MOV => "mov",
                BPF_NEG => "neg",
                BPF_END => "end",
                _ => "alu?",
            };
            if insn.uses_src_reg() {
                write!(s, "{}{} r{}, r{}", op_name, width, insn.dst_reg, insn.src_reg).unwrap();
            } else {
                write!(s, "{}{} r{}, {}", op_name, width, insn.dst_reg, insn.imm).unwrap();
            }
        }
        BPF_LDX => {
            write!(
                s,
                "ldx{} r{}, [r{}{:+}]",
                insn.access_size() * 8,
                insn.dst_reg,
                insn.src_reg,
                insn.off
            )
            .unwrap();
        }
        BPF_ST | BPF_STX => {
            if insn.class() == BPF_STX {
                write!(
                    s,
                    "stx{} [r{}{:+}], r{}",
                    insn.access_size() * 8,
                    insn.dst_reg,
                    insn.off,
                    insn.src_reg
                )
                .unwrap();
            } else {
                write!(
                    s,
                    "st{} [r{}{:+}], {}",
                    insn.access_size() * 8,
                    insn.dst_reg,
                    insn.off,
                    insn.imm
                )
                .unwrap();
            }
        }
        BPF_JMP | BPF_JMP32 => {
            let width = if insn.class() == BPF_JMP32 { "32" } else { "" };
            match insn.op() {
                BPF_JA => write!(s, "goto {:+}", insn.off).unwrap(),
                BPF_CALL => write!(s, "call #{}", insn.imm).unwrap(),
                BPF_EXIT => write!(s, "exit").unwrap(),
                op => {
                    let op_name = match op {
                        BPF_JEQ => "jeq",
                        BPF_JNE => "jne",
                        BPF_JGT => "jgt",
                        BPF_JGE => "jge",
                        BPF_JLT => "jlt",
                        BPF_JLE => "jle",
                        BPF_JSGT => "jsgt",
                        BPF_JSGE => "jsge",
                        BPF_JSLT => "jslt",
                        BPF_JSLE => "jsle",
                        BPF_JSET => "jset",
                        _ => "jmp?",
                    };
                    if insn.uses_src_reg() {
                        write!(
                            s,
                            "{}{} r{}, r{}, {:+}",
                            op_name, width, insn.dst_reg, insn.src_reg, insn.off
                        )
                        .unwrap();
                    } else {
                        write!(
                            s,
                            "{}{} r{}, {}, {:+}",
                            op_name, width, insn.dst_reg, insn.imm, insn.off
                        )
                        .unwrap();
                    }
                }
            }
        }
        BPF_LD => match insn.wide {
            Some(crate::core::insn::WideImm::Constant(v)) => {
                write!(s, "lddw r{}, {:#x}", insn.dst_reg, v).unwrap()
            }
            Some(crate::core::insn::WideImm::MapHandle(h)) => {
                write!(s, "lddw r{}, map_handle({})", insn.dst_reg, h).unwrap()
            }
            None => write!(s, "ld r{}, ...", insn.dst_reg).unwrap(),
        },
        _ => write!(s, "??? {:#04x}", insn.code).unwrap(),
    }

    s
}

/// Log the state after one instruction
pub fn log_insn(log: &mut VerifierLog, insn: &Insn, idx: usize, file: &RegisterFile) {
    if !log.enabled(LogLevel::Trace) {
        return;
    }
    let msg = format!("{} ; {}", fmt_insn(insn, idx), fmt_regs(file));
    log.trace(&msg);
}
