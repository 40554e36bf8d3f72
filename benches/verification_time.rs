// SPDX-License-Identifier: GPL-2.0
//! Benchmarks for verification time

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bpf_sandbox_verifier::core::types::*;
use bpf_sandbox_verifier::prelude::*;

fn insn(code: u8, dst: u8, src: u8, off: i16, imm: i32) -> [u8; 8] {
    Insn::new(code, dst, src, off, imm).encode()
}

/// A program that just returns 0
fn trivial_program() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(insn(BPF_ALU64 | BPF_MOV | BPF_K, 0, 0, 0, 0));
    out.extend(insn(BPF_JMP | BPF_EXIT | BPF_K, 0, 0, 0, 0));
    out
}

/// A long straight-line ALU program
fn straight_line_program(len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(insn(BPF_ALU64 | BPF_MOV | BPF_K, 0, 0, 0, 1));
    for i in 0..len {
        out.extend(insn(BPF_ALU64 | BPF_ADD | BPF_K, 0, 0, 0, i as i32));
    }
    out.extend(insn(BPF_JMP | BPF_EXIT | BPF_K, 0, 0, 0, 0));
    out
}

/// A fully unrolled chain of diamonds, heavy on joins
fn branchy_program(diamonds: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(insn(BPF_ALU64 | BPF_MOV | BPF_K, 0, 0, 0, 0));
    for _ in 0..diamonds {
        // if r0 == 0 skip the next instruction
        out.extend(insn(BPF_JMP | BPF_JEQ | BPF_K, 0, 0, 1, 0));
        out.extend(insn(BPF_ALU64 | BPF_ADD | BPF_K, 0, 0, 0, 1));
        out.extend(insn(BPF_ALU64 | BPF_ADD | BPF_K, 0, 0, 0, 2));
    }
    out.extend(insn(BPF_JMP | BPF_EXIT | BPF_K, 0, 0, 0, 0));
    out
}

fn bench_verification(c: &mut Criterion) {
    let maps = MapSet::new();

    let trivial = trivial_program();
    c.bench_function("verify_trivial", |b| {
        b.iter(|| verify(black_box(&trivial), &maps))
    });

    let straight = straight_line_program(1024);
    c.bench_function("verify_straight_line_1k", |b| {
        b.iter(|| verify(black_box(&straight), &maps))
    });

    let branchy = branchy_program(256);
    c.bench_function("verify_branchy_256", |b| {
        b.iter(|| verify(black_box(&branchy), &maps))
    });
}

criterion_group!(benches, bench_verification);
criterion_main!(benches);
