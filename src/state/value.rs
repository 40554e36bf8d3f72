// SPDX-License-Identifier: GPL-2.0

//! The abstract value domain
//!
//! Every register and every propagated intermediate is one of a closed set
//! of abstract values: completely unknown, a signed 64-bit range, a pointer
//! with provenance and a bounded offset, a resolved map reference, or the
//! definitely-null result of a failed lookup. The [`join`] operation merges
//! values at control-flow join points and only ever widens.
//!
//! [`join`]: AbstractValue::join

use bitflags::bitflags;

bitflags! {
    /// Attribute flags carried by pointer values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PtrFlags: u8 {
        /// The pointer may be null; it must be compared against zero
        /// before it can be dereferenced
        const MAYBE_NULL = 1 << 0;
    }
}

/// An inclusive signed 64-bit range
///
/// Arithmetic saturates at the representable extremes; `min > max` never
/// occurs in a stored value (an empty intersection is reported as `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarRange {
    /// Inclusive lower bound
    pub min: i64,
    /// Inclusive upper bound
    pub max: i64,
}

impl ScalarRange {
    /// Range covering every representable value
    pub const fn unbounded() -> Self {
        Self {
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    /// Range holding a single value
    pub const fn constant(v: i64) -> Self {
        Self { min: v, max: v }
    }

    /// Range with the given bounds
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// The single value this range holds, if it holds exactly one
    pub fn const_value(&self) -> Option<i64> {
        if self.min == self.max {
            Some(self.min)
        } else {
            None
        }
    }

    /// Whether `v` lies inside the range
    pub fn contains(&self, v: i64) -> bool {
        self.min <= v && v <= self.max
    }

    /// Smallest range covering both inputs
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Intersection, or `None` if the ranges are disjoint
    pub fn intersect(self, other: Self) -> Option<Self> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min <= max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Range of `a + b` over both inputs, saturating
    pub fn add(self, other: Self) -> Self {
        Self {
            min: self.min.saturating_add(other.min),
            max: self.max.saturating_add(other.max),
        }
    }

    /// Range of `a - b` over both inputs, saturating
    pub fn sub(self, other: Self) -> Self {
        Self {
            min: self.min.saturating_sub(other.max),
            max: self.max.saturating_sub(other.min),
        }
    }

    /// Range of `-a`, saturating
    pub fn neg(self) -> Self {
        Self {
            min: self.max.saturating_neg(),
            max: self.min.saturating_neg(),
        }
    }

    /// Range of a zero-extended load of the given width in bytes
    pub fn of_width(bytes: u32) -> Self {
        match bytes {
            1 => Self::new(0, 0xff),
            2 => Self::new(0, 0xffff),
            4 => Self::new(0, 0xffff_ffff),
            _ => Self::unbounded(),
        }
    }
}

/// The origin of a pointer value, determining which accesses are valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The program's own stack frame; valid offsets are frame-pointer
    /// relative and negative
    Stack,
    /// The external context object handed to the program on entry
    Context,
    /// The value of a map element, sized by the map's declared value size
    MapValue {
        /// Index of the map in the caller-supplied map set
        map: usize,
        /// The map's declared value size in bytes
        value_size: u32,
    },
}

/// A pointer with provenance, a bounded offset, and nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtrValue {
    /// Where the pointer came from
    pub prov: Provenance,
    /// Offset from the base of the object, as a range
    pub off: ScalarRange,
    /// Attribute flags
    pub flags: PtrFlags,
}

impl PtrValue {
    /// A definitely-non-null pointer at a fixed offset
    pub fn at(prov: Provenance, off: i64) -> Self {
        Self {
            prov,
            off: ScalarRange::constant(off),
            flags: PtrFlags::empty(),
        }
    }

    /// Whether the pointer has not been proven non-null
    pub fn maybe_null(&self) -> bool {
        self.flags.contains(PtrFlags::MAYBE_NULL)
    }

    /// Copy with the maybe-null flag cleared
    pub fn as_non_null(mut self) -> Self {
        self.flags.remove(PtrFlags::MAYBE_NULL);
        self
    }

    /// Copy with the maybe-null flag set
    pub fn as_maybe_null(mut self) -> Self {
        self.flags.insert(PtrFlags::MAYBE_NULL);
        self
    }
}

/// One abstract value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbstractValue {
    /// Nothing is known
    #[default]
    Unknown,
    /// A scalar within an inclusive signed range
    Scalar(ScalarRange),
    /// A resolved reference to a map object itself; only meaningful as a
    /// helper-call argument, never dereferenced directly
    MapRef {
        /// Index of the map in the caller-supplied map set
        map: usize,
    },
    /// A pointer into stack, context, or map-value memory
    Ptr(PtrValue),
    /// Definitely null (the narrowed arm of a null check)
    Null,
}

impl AbstractValue {
    /// A scalar holding a single known value
    pub fn constant(v: i64) -> Self {
        AbstractValue::Scalar(ScalarRange::constant(v))
    }

    /// A scalar about which only the bounds are known
    pub fn scalar(min: i64, max: i64) -> Self {
        AbstractValue::Scalar(ScalarRange::new(min, max))
    }

    /// Whether the value is a pointer kind (pointer, map reference, or
    /// null); arithmetic between two of these is rejected
    pub fn is_pointer_kind(&self) -> bool {
        matches!(
            self,
            AbstractValue::Ptr(_) | AbstractValue::MapRef { .. } | AbstractValue::Null
        )
    }

    /// Merge two values at a control-flow join point
    ///
    /// Conservative widening: the result describes every concrete value
    /// either input could describe, and never narrows. Scalars take the
    /// union of their bounds; same-provenance pointers take the union of
    /// their offsets and stay maybe-null if either side was; pointers of
    /// different provenance, or a pointer against a scalar, collapse to
    /// `Unknown`.
    pub fn join(&self, other: &Self) -> Self {
        use AbstractValue::*;

        match (self, other) {
            (Scalar(a), Scalar(b)) => Scalar(a.union(*b)),

            (Ptr(a), Ptr(b)) if a.prov == b.prov => Ptr(PtrValue {
                prov: a.prov,
                off: a.off.union(b.off),
                flags: a.flags | b.flags,
            }),

            (Null, Null) => Null,

            // A path where the lookup failed meets a path where it
            // succeeded: the pointer survives but loses its null proof
            (Ptr(p), Null) | (Null, Ptr(p)) => Ptr(p.as_maybe_null()),

            (MapRef { map: a }, MapRef { map: b }) if a == b => MapRef { map: *a },

            _ => Unknown,
        }
    }
}
