// SPDX-License-Identifier: GPL-2.0

//! The closed table of recognized external helpers
//!
//! Call targets are not dispatched dynamically: every callable operation is
//! declared here with the expected shape of each argument register and the
//! abstract value it leaves in r0. An identifier missing from this table is
//! a typed rejection, not a fallback.

use crate::core::types::{FUNC_MAP_DELETE_ELEM, FUNC_MAP_LOOKUP_ELEM, FUNC_MAP_UPDATE_ELEM};

/// Expected shape of one helper argument register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A resolved map reference (from a wide load with a map-handle tag)
    MapRef,
    /// A non-null stack pointer whose range covers the map's key size
    StackKey,
    /// A non-null stack pointer whose range covers the map's value size
    StackValue,
    /// Any scalar (flags and the like)
    Scalar,
}

/// Abstract value a helper leaves in r0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetKind {
    /// A possibly-null pointer to the value of the map passed in r1,
    /// sized to the map's declared value size
    MapValueOrNull,
    /// A status code in `[-4095, 0]`
    StatusCode,
}

/// Declared contract of one external helper
#[derive(Debug, Clone, Copy)]
pub struct HelperSpec {
    /// Numeric call identifier
    pub id: u32,
    /// Name, for logs
    pub name: &'static str,
    /// Argument shapes for r1.., in order
    pub args: &'static [ArgKind],
    /// Return shape
    pub ret: RetKind,
}

static HELPERS: &[HelperSpec] = &[
    HelperSpec {
        id: FUNC_MAP_LOOKUP_ELEM,
        name: "map_lookup_elem",
        args: &[ArgKind::MapRef, ArgKind::StackKey],
        ret: RetKind::MapValueOrNull,
    },
    HelperSpec {
        id: FUNC_MAP_UPDATE_ELEM,
        name: "map_update_elem",
        args: &[
            ArgKind::MapRef,
            ArgKind::StackKey,
            ArgKind::StackValue,
            ArgKind::Scalar,
        ],
        ret: RetKind::StatusCode,
    },
    HelperSpec {
        id: FUNC_MAP_DELETE_ELEM,
        name: "map_delete_elem",
        args: &[ArgKind::MapRef, ArgKind::StackKey],
        ret: RetKind::StatusCode,
    },
];

/// Look up a helper by its call identifier
pub fn helper_spec(id: u32) -> Option<&'static HelperSpec> {
    HELPERS.iter().find(|h| h.id == id)
}
