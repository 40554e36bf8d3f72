// SPDX-License-Identifier: GPL-2.0

//! Map descriptors
//!
//! Maps are created and registered outside the verifier; programs refer to
//! them through numeric handles embedded in wide immediate loads. The
//! verifier only reads the declared sizes to validate access shapes.

use crate::stdlib::Vec;

/// Metadata for one external lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDescriptor {
    /// The numeric handle wide loads refer to
    pub handle: u32,
    /// Size of a key in bytes
    pub key_size: u32,
    /// Size of a value in bytes
    pub value_size: u32,
    /// Declared capacity; not consulted by the verifier but carried for
    /// the runtime
    pub max_entries: u32,
}

/// The ordered collection of maps supplied by the caller
///
/// Never mutated during verification; map indices handed out by
/// [`resolve`](Self::resolve) stay valid for the whole run.
#[derive(Debug, Clone, Default)]
pub struct MapSet {
    maps: Vec<MapDescriptor>,
}

impl MapSet {
    /// An empty map set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor; returns its index
    pub fn push(&mut self, desc: MapDescriptor) -> usize {
        self.maps.push(desc);
        self.maps.len() - 1
    }

    /// Look a handle up, returning the map's index and descriptor
    pub fn resolve(&self, handle: u32) -> Option<(usize, &MapDescriptor)> {
        self.maps
            .iter()
            .enumerate()
            .find(|(_, m)| m.handle == handle)
    }

    /// Descriptor by index
    pub fn get(&self, map: usize) -> Option<&MapDescriptor> {
        self.maps.get(map)
    }

    /// Number of registered maps
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Whether no maps are registered
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
