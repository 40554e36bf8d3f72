// SPDX-License-Identifier: GPL-2.0
//! Tests for bpf_sandbox_verifier::state

use bpf_sandbox_verifier::prelude::*;
use bpf_sandbox_verifier::state::value::PtrFlags;

fn map_ptr(map: usize, lo: i64, hi: i64) -> AbstractValue {
    AbstractValue::Ptr(PtrValue {
        prov: Provenance::MapValue {
            map,
            value_size: 64,
        },
        off: ScalarRange::new(lo, hi),
        flags: PtrFlags::empty(),
    })
}

#[test]
fn scalar_join_is_union_of_bounds() {
    let a = AbstractValue::scalar(10, 20);
    let b = AbstractValue::scalar(15, 30);

    assert_eq!(a.join(&b), AbstractValue::scalar(10, 30));
}

#[test]
fn scalar_join_commutative_associative_idempotent() {
    let a = AbstractValue::scalar(-5, 3);
    let b = AbstractValue::scalar(0, 100);
    let c = AbstractValue::scalar(-40, -39);

    assert_eq!(a.join(&b), b.join(&a));
    assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
    assert_eq!(a.join(&a), a);
}

#[test]
fn disjoint_scalars_join_to_the_hull() {
    let a = AbstractValue::scalar(0, 10);
    let b = AbstractValue::scalar(20, 30);
    assert_eq!(a.join(&b), AbstractValue::scalar(0, 30));
}

#[test]
fn same_provenance_pointers_union_offsets() {
    let a = map_ptr(0, 0, 4);
    let b = map_ptr(0, 8, 16);

    assert_eq!(a.join(&b), map_ptr(0, 0, 16));
}

#[test]
fn nullability_widens_on_join() {
    let AbstractValue::Ptr(p) = map_ptr(0, 0, 0) else {
        unreachable!()
    };
    let non_null = AbstractValue::Ptr(p);
    let maybe_null = AbstractValue::Ptr(p.as_maybe_null());

    let joined = non_null.join(&maybe_null);
    let AbstractValue::Ptr(j) = joined else {
        panic!("expected pointer, got {:?}", joined)
    };
    assert!(j.maybe_null());

    // Never narrows: joining the other way round is identical
    assert_eq!(joined, maybe_null.join(&non_null));
}

#[test]
fn different_provenance_pointers_collapse() {
    let a = map_ptr(0, 0, 0);
    let b = map_ptr(1, 0, 0);
    assert_eq!(a.join(&b), AbstractValue::Unknown);

    let stack = AbstractValue::Ptr(PtrValue::at(Provenance::Stack, -8));
    assert_eq!(a.join(&stack), AbstractValue::Unknown);
}

#[test]
fn pointer_against_scalar_collapses() {
    let a = map_ptr(0, 0, 0);
    let b = AbstractValue::constant(0);
    assert_eq!(a.join(&b), AbstractValue::Unknown);
}

#[test]
fn null_joins() {
    assert_eq!(AbstractValue::Null.join(&AbstractValue::Null), AbstractValue::Null);

    // Pointer against null keeps the pointer but loses the null proof
    let p = map_ptr(0, 0, 8);
    let AbstractValue::Ptr(j) = p.join(&AbstractValue::Null) else {
        panic!("expected pointer")
    };
    assert!(j.maybe_null());
}

#[test]
fn map_ref_joins() {
    let a = AbstractValue::MapRef { map: 2 };
    assert_eq!(a.join(&a), a);
    assert_eq!(
        a.join(&AbstractValue::MapRef { map: 3 }),
        AbstractValue::Unknown
    );
}

#[test]
fn unknown_absorbs() {
    for v in [
        AbstractValue::scalar(1, 2),
        map_ptr(0, 0, 0),
        AbstractValue::Null,
        AbstractValue::Unknown,
    ] {
        assert_eq!(v.join(&AbstractValue::Unknown), AbstractValue::Unknown);
        assert_eq!(AbstractValue::Unknown.join(&v), AbstractValue::Unknown);
    }
}

#[test]
fn range_arithmetic_saturates() {
    let near_max = ScalarRange::new(i64::MAX - 1, i64::MAX);
    assert_eq!(
        near_max.add(ScalarRange::constant(5)),
        ScalarRange::new(i64::MAX, i64::MAX)
    );

    let near_min = ScalarRange::new(i64::MIN, i64::MIN + 1);
    assert_eq!(
        near_min.sub(ScalarRange::constant(5)),
        ScalarRange::new(i64::MIN, i64::MIN)
    );

    assert_eq!(
        ScalarRange::new(i64::MIN, 3).neg(),
        ScalarRange::new(-3, i64::MAX)
    );
}

#[test]
fn range_intersection() {
    let a = ScalarRange::new(0, 10);
    assert_eq!(a.intersect(ScalarRange::new(5, 20)), Some(ScalarRange::new(5, 10)));
    assert_eq!(a.intersect(ScalarRange::new(11, 20)), None);
}

#[test]
fn load_width_ranges_are_zero_extended() {
    assert_eq!(ScalarRange::of_width(1), ScalarRange::new(0, 0xff));
    assert_eq!(ScalarRange::of_width(2), ScalarRange::new(0, 0xffff));
    assert_eq!(ScalarRange::of_width(4), ScalarRange::new(0, 0xffff_ffff));
    assert_eq!(ScalarRange::of_width(8), ScalarRange::unbounded());
}

#[test]
fn entry_state_shape() {
    let file = RegisterFile::entry();

    assert_eq!(
        *file.reg(10),
        AbstractValue::Ptr(PtrValue::at(Provenance::Stack, 0))
    );
    assert_eq!(
        *file.reg(1),
        AbstractValue::Ptr(PtrValue::at(Provenance::Context, 0))
    );
    for r in [0u8, 2, 3, 4, 5, 6, 7, 8, 9] {
        assert_eq!(*file.reg(r), AbstractValue::Unknown);
    }
    assert_eq!(file.stack_depth, 0);
}

#[test]
fn register_file_join_is_pointwise() {
    let mut a = RegisterFile::entry();
    let mut b = RegisterFile::entry();
    a.set_reg(3, AbstractValue::scalar(0, 5));
    b.set_reg(3, AbstractValue::scalar(3, 9));
    a.note_stack_write(16);
    b.note_stack_write(32);

    let j = a.join(&b);
    assert_eq!(*j.reg(3), AbstractValue::scalar(0, 9));
    assert_eq!(j.stack_depth, 32);
    // Registers equal on both sides survive unchanged
    assert_eq!(*j.reg(10), *a.reg(10));
}
