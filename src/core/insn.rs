// SPDX-License-Identifier: GPL-2.0

//! Instruction representation and the byte-stream decoder.
//!
//! The decoder is a pure function from a flat byte buffer to a [`Program`].
//! Each instruction occupies one 8-byte slot, except the wide immediate
//! load which occupies two consecutive slots and is decoded into a single
//! [`Insn`] carrying a [`WideImm`]. Branch offsets are expressed in slot
//! units, so the program keeps a slot-to-instruction table for resolving
//! targets; a branch landing on the continuation slot of a wide load is not
//! a valid instruction boundary.

use crate::core::error::{Result, VerifierError};
use crate::core::types::*;
use crate::stdlib::Vec;

/// The decoded payload of a wide (two-slot) immediate load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideImm {
    /// A 64-bit literal constant
    Constant(u64),
    /// An unresolved handle naming an external map; the caller's map set
    /// resolves it before interpretation begins
    MapHandle(u32),
}

/// One decoded instruction
///
/// Immutable once decoded; owned by the [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insn {
    /// Raw opcode byte
    pub code: u8,
    /// Destination register (0..=10)
    pub dst_reg: u8,
    /// Source register (0..=10); the pseudo-tag field for wide loads
    pub src_reg: u8,
    /// Signed branch/field offset
    pub off: i16,
    /// Signed 32-bit immediate (low half for wide loads)
    pub imm: i32,
    /// Index of this instruction's first slot in the raw stream
    pub slot: usize,
    /// Present for wide immediate loads
    pub wide: Option<WideImm>,
}

impl Insn {
    /// Construct a single-slot instruction (slot index 0, no wide payload)
    pub fn new(code: u8, dst_reg: u8, src_reg: u8, off: i16, imm: i32) -> Self {
        Self {
            code,
            dst_reg,
            src_reg,
            off,
            imm,
            slot: 0,
            wide: None,
        }
    }

    /// Instruction class (low 3 opcode bits)
    pub fn class(&self) -> u8 {
        self.code & BPF_CLASS_MASK
    }

    /// ALU/JMP operation (high 4 opcode bits)
    pub fn op(&self) -> u8 {
        self.code & BPF_OP_MASK
    }

    /// Whether the second operand is a register (`BPF_X`) rather than the
    /// immediate
    pub fn uses_src_reg(&self) -> bool {
        self.code & BPF_SRC_MASK == BPF_X
    }

    /// Memory access width in bytes for LD/ST class instructions
    pub fn access_size(&self) -> u32 {
        match self.code & BPF_SIZE_MASK {
            BPF_B => 1,
            BPF_H => 2,
            BPF_W => 4,
            _ => 8,
        }
    }

    /// Whether this is the two-slot wide immediate load
    pub fn is_wide(&self) -> bool {
        self.wide.is_some()
    }

    /// Number of slots this instruction occupies
    pub fn width(&self) -> usize {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// Whether this instruction is an external helper call
    pub fn is_call(&self) -> bool {
        matches!(self.class(), BPF_JMP) && self.op() == BPF_CALL
    }

    /// Whether this instruction returns from the program
    pub fn is_exit(&self) -> bool {
        matches!(self.class(), BPF_JMP) && self.op() == BPF_EXIT
    }

    /// Encode this instruction's first slot into raw bytes
    ///
    /// The continuation slot of a wide load is a separate slot with a zero
    /// opcode and the high immediate half; encode it as
    /// `Insn::new(0, 0, 0, 0, imm_hi)`.
    pub fn encode(&self) -> [u8; INSN_SIZE] {
        let mut out = [0u8; INSN_SIZE];
        out[0] = self.code;
        out[1] = (self.dst_reg & 0x0f) | (self.src_reg << 4);
        out[2..4].copy_from_slice(&self.off.to_le_bytes());
        out[4..8].copy_from_slice(&self.imm.to_le_bytes());
        out
    }
}

/// Raw fields of one 8-byte slot
struct RawSlot {
    code: u8,
    dst_reg: u8,
    src_reg: u8,
    off: i16,
    imm: i32,
}

impl RawSlot {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            code: bytes[0],
            dst_reg: bytes[1] & 0x0f,
            src_reg: bytes[1] >> 4,
            off: i16::from_le_bytes([bytes[2], bytes[3]]),
            imm: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// A decoded instruction sequence
///
/// Read-only after decoding. Keeps the slot-to-instruction mapping needed to
/// resolve branch targets expressed in slot units.
#[derive(Debug, Clone)]
pub struct Program {
    insns: Vec<Insn>,
    slot_index: Vec<Option<usize>>,
}

impl Program {
    /// Decode a raw instruction stream
    ///
    /// Fails with [`VerifierError::MalformedInstruction`] if the buffer
    /// length is not a multiple of the slot size, an opcode is
    /// unrecognized, or a wide load's continuation slot is missing or
    /// malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % INSN_SIZE != 0 {
            return Err(VerifierError::MalformedInstruction {
                offset: bytes.len() - bytes.len() % INSN_SIZE,
            });
        }

        let slot_count = bytes.len() / INSN_SIZE;
        let mut insns = Vec::new();
        let mut slot_index = crate::stdlib::vec![None; slot_count];

        let mut slot = 0;
        while slot < slot_count {
            let raw = RawSlot::parse(&bytes[slot * INSN_SIZE..(slot + 1) * INSN_SIZE]);
            let offset = slot * INSN_SIZE;

            if raw.dst_reg as usize >= MAX_REG {
                return Err(VerifierError::MalformedInstruction { offset });
            }

            let insn = if raw.code == BPF_LD_IMM64 {
                Self::decode_wide(&raw, bytes, slot, slot_count)?
            } else {
                if raw.src_reg as usize >= MAX_REG {
                    return Err(VerifierError::MalformedInstruction { offset });
                }
                validate_opcode(&raw, offset)?;
                Insn {
                    code: raw.code,
                    dst_reg: raw.dst_reg,
                    src_reg: raw.src_reg,
                    off: raw.off,
                    imm: raw.imm,
                    slot,
                    wide: None,
                }
            };

            slot_index[slot] = Some(insns.len());
            slot += insn.width();
            insns.push(insn);
        }

        Ok(Self { insns, slot_index })
    }

    /// Decode the two-slot wide immediate load starting at `slot`
    fn decode_wide(
        raw: &RawSlot,
        bytes: &[u8],
        slot: usize,
        slot_count: usize,
    ) -> Result<Insn> {
        let offset = slot * INSN_SIZE;
        let cont_offset = (slot + 1) * INSN_SIZE;

        if slot + 1 >= slot_count {
            return Err(VerifierError::MalformedInstruction { offset: cont_offset });
        }

        let cont = RawSlot::parse(&bytes[cont_offset..cont_offset + INSN_SIZE]);
        if cont.code != 0 || cont.dst_reg != 0 || cont.src_reg != 0 || cont.off != 0 {
            return Err(VerifierError::MalformedInstruction { offset: cont_offset });
        }

        let wide = match raw.src_reg {
            0 => WideImm::Constant(
                (raw.imm as u32 as u64) | ((cont.imm as u32 as u64) << 32),
            ),
            BPF_PSEUDO_MAP_HANDLE => {
                // Handle references carry no high half
                if cont.imm != 0 {
                    return Err(VerifierError::MalformedInstruction { offset: cont_offset });
                }
                WideImm::MapHandle(raw.imm as u32)
            }
            _ => return Err(VerifierError::MalformedInstruction { offset }),
        };

        Ok(Insn {
            code: raw.code,
            dst_reg: raw.dst_reg,
            src_reg: raw.src_reg,
            off: raw.off,
            imm: raw.imm,
            slot,
            wide: Some(wide),
        })
    }

    /// Number of decoded instructions
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    /// Whether the program contains no instructions
    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Number of raw slots in the stream
    pub fn slot_count(&self) -> usize {
        self.slot_index.len()
    }

    /// The decoded instruction sequence
    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    /// Instruction at the given index
    pub fn get(&self, idx: usize) -> Option<&Insn> {
        self.insns.get(idx)
    }

    /// Resolve a slot number to the instruction starting there
    ///
    /// Returns `None` for slots outside the program and for the
    /// continuation slot of a wide load.
    pub fn index_at_slot(&self, slot: i64) -> Option<usize> {
        if slot < 0 {
            return None;
        }
        self.slot_index.get(slot as usize).copied().flatten()
    }
}

/// Reject opcodes outside the recognized instruction set
fn validate_opcode(raw: &RawSlot, offset: usize) -> Result<()> {
    let class = raw.code & BPF_CLASS_MASK;
    let malformed = Err(VerifierError::MalformedInstruction { offset });

    match class {
        BPF_ALU | BPF_ALU64 => match raw.code & BPF_OP_MASK {
            BPF_ADD | BPF_SUB | BPF_MUL | BPF_DIV | BPF_OR | BPF_AND | BPF_LSH
            | BPF_RSH | BPF_MOD | BPF_XOR | BPF_MOV | BPF_ARSH => Ok(()),
            // NEG and END take no register source
            BPF_NEG | BPF_END => {
                if raw.code & BPF_SRC_MASK == BPF_K {
                    Ok(())
                } else {
                    malformed
                }
            }
            _ => malformed,
        },
        BPF_JMP => match raw.code & BPF_OP_MASK {
            BPF_JA | BPF_EXIT => {
                if raw.code & BPF_SRC_MASK == BPF_K {
                    Ok(())
                } else {
                    malformed
                }
            }
            // Only plain helper calls are supported; pseudo-call forms
            // (src_reg != 0) name facilities outside this machine
            BPF_CALL => {
                if raw.code & BPF_SRC_MASK == BPF_K && raw.src_reg == 0 {
                    Ok(())
                } else {
                    malformed
                }
            }
            BPF_JEQ | BPF_JGT | BPF_JGE | BPF_JSET | BPF_JNE | BPF_JSGT
            | BPF_JSGE | BPF_JLT | BPF_JLE | BPF_JSLT | BPF_JSLE => Ok(()),
            _ => malformed,
        },
        BPF_JMP32 => match raw.code & BPF_OP_MASK {
            // The 32-bit class has a long-range goto that keeps its
            // offset in the immediate
            BPF_JA => {
                if raw.code & BPF_SRC_MASK == BPF_K {
                    Ok(())
                } else {
                    malformed
                }
            }
            BPF_JEQ | BPF_JGT | BPF_JGE | BPF_JSET | BPF_JNE | BPF_JSGT
            | BPF_JSGE | BPF_JLT | BPF_JLE | BPF_JSLT | BPF_JSLE => Ok(()),
            _ => malformed,
        },
        BPF_LDX | BPF_ST | BPF_STX => {
            if raw.code & BPF_MODE_MASK == BPF_MEM {
                Ok(())
            } else {
                malformed
            }
        }
        // Plain BPF_LD is only meaningful as the wide load, which is
        // handled before opcode validation
        _ => malformed,
    }
}
