// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node and binder identity.
//!
//! A [`NodeId`] is a 32-bit non-zero process identity, unique across a
//! topology. A [`BinderId`] is a 64-bit handle to an RPC endpoint,
//! composed of the owning node's id and a per-node monotonic local id:
//! `(node_id << 32) | local_id`.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// A 32-bit non-zero node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Builds a `NodeId`, returning `None` for the reserved value zero.
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for NodeId {
    type Error = InvalidNodeId;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        NodeId::new(id).ok_or(InvalidNodeId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("node id must be nonzero")]
pub struct InvalidNodeId;

/// A 64-bit binder handle: `(node_id << 32) | local_id`. Stored as its
/// two constituent parts so the nonzero-node invariant is enforced once,
/// at construction, rather than re-derived on every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinderId {
    node: NodeId,
    local_id: u32,
}

impl BinderId {
    pub fn new(node: NodeId, local_id: u32) -> Self {
        Self { node, local_id }
    }

    /// Reinterprets a raw 64-bit value as a `BinderId`, as received over
    /// the wire. Returns `None` if the high 32 bits name the reserved
    /// node id zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NodeId::new((raw >> 32) as u32).map(|node| Self { node, local_id: raw as u32 })
    }

    pub fn raw(self) -> u64 {
        ((self.node.get() as u64) << 32) | self.local_id as u64
    }

    pub fn node_id(self) -> NodeId {
        self.node
    }

    pub fn local_id(self) -> u32 {
        self.local_id
    }
}

impl fmt::Display for BinderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.local_id)
    }
}

impl Serialize for BinderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.raw())
    }
}

impl<'de> Deserialize<'de> for BinderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        BinderId::from_raw(raw)
            .ok_or_else(|| serde::de::Error::custom("binder id has a zero node half"))
    }
}

/// Monotonic per-node allocator for binder ids, proxy ids, or any other
/// counter that must never repeat within a node's lifetime.
pub struct LocalIdAllocator {
    next: AtomicU32,
}

impl LocalIdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU32::new(1) }
    }

    /// Allocates the next local id. Wraps past `u32::MAX` back to 1 only
    /// in the practically unreachable case of 4 billion allocations.
    pub fn alloc(&self) -> u32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

impl Default for LocalIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
