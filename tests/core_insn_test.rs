// SPDX-License-Identifier: GPL-2.0
//! Tests for bpf_sandbox_verifier::core::insn

mod common;

use bpf_sandbox_verifier::core::types::*;
use bpf_sandbox_verifier::prelude::*;
use common::*;

#[test]
fn buffer_not_slot_aligned_is_malformed() {
    for len in [1, 7, 9, 12, 23] {
        let bytes = vec![0u8; len];
        let err = Program::decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            VerifierError::MalformedInstruction {
                offset: len - len % 8
            },
            "len {}",
            len
        );
    }
}

#[test]
fn unknown_opcode_is_malformed() {
    let bytes = prog(&[mov64_imm(0, 0), Insn::new(0xff, 0, 0, 0, 0).encode().to_vec()]);
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 8 }
    );
}

#[test]
fn simple_program_decodes() {
    let bytes = prog(&[mov64_imm(0, 7), exit()]);
    let p = Program::decode(&bytes).unwrap();

    assert_eq!(p.len(), 2);
    let mov = p.get(0).unwrap();
    assert_eq!(mov.class(), BPF_ALU64);
    assert_eq!(mov.op(), BPF_MOV);
    assert_eq!(mov.dst_reg, 0);
    assert_eq!(mov.imm, 7);
    assert!(p.get(1).unwrap().is_exit());
}

#[test]
fn negative_fields_decode_signed() {
    let bytes = prog(&[stx(BPF_W, 10, 1, -16), exit()]);
    let p = Program::decode(&bytes).unwrap();
    assert_eq!(p.get(0).unwrap().off, -16);

    let bytes = prog(&[mov64_imm(0, -1), exit()]);
    let p = Program::decode(&bytes).unwrap();
    assert_eq!(p.get(0).unwrap().imm, -1);
}

#[test]
fn wide_load_spans_two_slots() {
    let bytes = prog(&[lddw(3, 0x1122_3344_5566_7788), exit()]);
    let p = Program::decode(&bytes).unwrap();

    assert_eq!(p.len(), 2);
    assert_eq!(p.slot_count(), 3);

    let wide = p.get(0).unwrap();
    assert!(wide.is_wide());
    assert_eq!(wide.width(), 2);
    assert_eq!(wide.wide, Some(WideImm::Constant(0x1122_3344_5566_7788)));

    // The continuation slot is not an instruction boundary
    assert_eq!(p.index_at_slot(0), Some(0));
    assert_eq!(p.index_at_slot(1), None);
    assert_eq!(p.index_at_slot(2), Some(1));
    assert_eq!(p.index_at_slot(3), None);
}

#[test]
fn wide_load_map_handle_tag() {
    let bytes = prog(&[lddw_map(1, 42), exit()]);
    let p = Program::decode(&bytes).unwrap();
    assert_eq!(p.get(0).unwrap().wide, Some(WideImm::MapHandle(42)));
}

#[test]
fn truncated_wide_load_is_malformed() {
    let bytes = lddw(0, 1)[..8].to_vec();
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 8 }
    );
}

#[test]
fn garbage_continuation_slot_is_malformed() {
    let mut bytes = lddw(0, 1);
    bytes[8] = BPF_ALU64 | BPF_MOV | BPF_K; // continuation must be opcode 0
    bytes.extend(exit());
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 8 }
    );
}

#[test]
fn unknown_pseudo_tag_is_malformed() {
    // src_reg 2 is neither a literal nor a map handle tag
    let mut bytes = Insn::new(BPF_LD_IMM64, 0, 2, 0, 5).encode().to_vec();
    bytes.extend(Insn::new(0, 0, 0, 0, 0).encode());
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 0 }
    );
}

#[test]
fn pseudo_call_forms_are_malformed() {
    // src_reg 1 would be a call into a subprogram, which this machine
    // does not have
    let bytes = prog(&[
        Insn::new(BPF_JMP | BPF_CALL | BPF_K, 0, 1, 0, 1)
            .encode()
            .to_vec(),
        exit(),
    ]);
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 0 }
    );
}

#[test]
fn register_out_of_range_is_malformed() {
    let bytes = prog(&[mov64_imm(11, 0), exit()]);
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 0 }
    );

    let bytes = prog(&[mov64_reg(0, 12), exit()]);
    assert_eq!(
        Program::decode(&bytes).unwrap_err(),
        VerifierError::MalformedInstruction { offset: 0 }
    );
}

#[test]
fn encode_decode_round_trip() {
    let cases = [
        mov64_imm(3, -100),
        alu64_reg(BPF_ADD, 4, 5),
        jmp_imm(BPF_JSGT, 2, 17, -3),
        ldx(BPF_H, 0, 9, 32),
        st_imm(BPF_B, 10, -1, 0x7f),
        ja(5),
        call(2),
        exit(),
    ];
    let bytes = prog(&cases);
    let p = Program::decode(&bytes).unwrap();
    assert_eq!(p.len(), cases.len());

    for (insn, original) in p.insns().iter().zip(&cases) {
        assert_eq!(&insn.encode().to_vec(), original);
    }
}
