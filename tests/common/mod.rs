// SPDX-License-Identifier: GPL-2.0
//! Shared byte-level program builders for the integration tests

#![allow(dead_code)]

use bpf_sandbox_verifier::core::types::*;
use bpf_sandbox_verifier::prelude::*;

/// Flatten encoded instructions into one raw stream
pub fn prog(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

fn one(code: u8, dst: u8, src: u8, off: i16, imm: i32) -> Vec<u8> {
    Insn::new(code, dst, src, off, imm).encode().to_vec()
}

pub fn mov64_imm(dst: u8, imm: i32) -> Vec<u8> {
    one(BPF_ALU64 | BPF_MOV | BPF_K, dst, 0, 0, imm)
}

pub fn mov64_reg(dst: u8, src: u8) -> Vec<u8> {
    one(BPF_ALU64 | BPF_MOV | BPF_X, dst, src, 0, 0)
}

pub fn mov32_imm(dst: u8, imm: i32) -> Vec<u8> {
    one(BPF_ALU | BPF_MOV | BPF_K, dst, 0, 0, imm)
}

pub fn alu64_imm(op: u8, dst: u8, imm: i32) -> Vec<u8> {
    one(BPF_ALU64 | op | BPF_K, dst, 0, 0, imm)
}

pub fn alu64_reg(op: u8, dst: u8, src: u8) -> Vec<u8> {
    one(BPF_ALU64 | op | BPF_X, dst, src, 0, 0)
}

pub fn alu32_imm(op: u8, dst: u8, imm: i32) -> Vec<u8> {
    one(BPF_ALU | op | BPF_K, dst, 0, 0, imm)
}

pub fn jmp_imm(op: u8, dst: u8, imm: i32, off: i16) -> Vec<u8> {
    one(BPF_JMP | op | BPF_K, dst, 0, off, imm)
}

pub fn jmp_reg(op: u8, dst: u8, src: u8, off: i16) -> Vec<u8> {
    one(BPF_JMP | op | BPF_X, dst, src, off, 0)
}

pub fn ja(off: i16) -> Vec<u8> {
    one(BPF_JMP | BPF_JA | BPF_K, 0, 0, off, 0)
}

pub fn ja32(imm: i32) -> Vec<u8> {
    one(BPF_JMP32 | BPF_JA | BPF_K, 0, 0, 0, imm)
}

pub fn call(helper_id: u32) -> Vec<u8> {
    one(BPF_JMP | BPF_CALL | BPF_K, 0, 0, 0, helper_id as i32)
}

pub fn exit() -> Vec<u8> {
    one(BPF_JMP | BPF_EXIT | BPF_K, 0, 0, 0, 0)
}

pub fn ldx(size: u8, dst: u8, src: u8, off: i16) -> Vec<u8> {
    one(BPF_LDX | BPF_MEM | size, dst, src, off, 0)
}

pub fn stx(size: u8, dst: u8, src: u8, off: i16) -> Vec<u8> {
    one(BPF_STX | BPF_MEM | size, dst, src, off, 0)
}

pub fn st_imm(size: u8, dst: u8, off: i16, imm: i32) -> Vec<u8> {
    one(BPF_ST | BPF_MEM | size, dst, 0, off, imm)
}

pub fn lddw(dst: u8, imm: u64) -> Vec<u8> {
    let mut out = one(BPF_LD_IMM64, dst, 0, 0, imm as u32 as i32);
    out.extend(one(0, 0, 0, 0, (imm >> 32) as u32 as i32));
    out
}

pub fn lddw_map(dst: u8, handle: u32) -> Vec<u8> {
    let mut out = one(BPF_LD_IMM64, dst, BPF_PSEUDO_MAP_HANDLE, 0, handle as i32);
    out.extend(one(0, 0, 0, 0, 0));
    out
}

/// A map set with a single map under the given handle
pub fn one_map(handle: u32, key_size: u32, value_size: u32) -> MapSet {
    let mut maps = MapSet::new();
    maps.push(MapDescriptor {
        handle,
        key_size,
        value_size,
        max_entries: 128,
    });
    maps
}

/// Store a constant key at `fp - 8` and point `r2` at it
pub fn stage_key() -> Vec<Vec<u8>> {
    vec![
        st_imm(BPF_DW, 10, -8, 0),
        mov64_reg(2, 10),
        alu64_imm(BPF_ADD, 2, -8),
    ]
}
