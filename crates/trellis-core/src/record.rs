// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph record types: vertices, local edges, and global-edge slots.

use crate::ident::{GlobalEdge, GlobalVertex};
use crate::props::{ObjMap, PropMap};

/// Materialised record for a single local vertex.
///
/// Invariants
/// - `global` is assigned and valid (`> 9`) for every vertex in a cluster.
/// - `global` is unique over the whole cluster tree.
#[derive(Clone, Debug)]
pub struct VertexRecord {
    /// Stable tree-wide identity of this vertex.
    pub global: GlobalVertex,
    /// Typed attribute bag.
    pub props: PropMap,
    /// Shared payload table.
    pub objects: ObjMap,
}

impl VertexRecord {
    /// Creates a record with empty stores.
    #[must_use]
    pub fn new(global: GlobalVertex) -> Self {
        Self {
            global,
            props: PropMap::new(),
            objects: ObjMap::new(),
        }
    }
}

/// One logical edge aggregated inside a local edge.
///
/// Objects live per global edge; properties live per local edge (see
/// [`EdgeRecord`]).
#[derive(Clone, Debug)]
pub struct GlobalEdgeSlot {
    /// The logical edge this slot represents.
    pub edge: GlobalEdge,
    /// Shared payload table for this logical edge.
    pub objects: ObjMap,
}

impl GlobalEdgeSlot {
    /// Creates a slot with an empty payload table.
    #[must_use]
    pub fn new(edge: GlobalEdge) -> Self {
        Self {
            edge,
            objects: ObjMap::new(),
        }
    }
}

/// Materialised record for a single local edge.
///
/// A local edge records the *existence* of connectivity between its two
/// endpoints; `slots` carries every logical edge currently routed through
/// that pair, in insertion order.
///
/// Invariants
/// - `slots` is never empty; removing the last slot removes the local edge.
/// - For every slot, the containing vertices of its global endpoints are
///   exactly the local edge's endpoints, and they are distinct.
#[derive(Clone, Debug, Default)]
pub struct EdgeRecord {
    /// Typed attribute bag for the local edge.
    pub props: PropMap,
    /// Aggregated logical edges, oldest first.
    pub slots: Vec<GlobalEdgeSlot>,
}

impl EdgeRecord {
    /// Creates a record seeded with a single slot.
    #[must_use]
    pub fn seeded(slot: GlobalEdgeSlot) -> Self {
        Self {
            props: PropMap::new(),
            slots: vec![slot],
        }
    }
}
