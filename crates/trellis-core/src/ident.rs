// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stable identifier types and the shared allocator.
use std::cell::Cell;
use std::rc::Rc;

/// Values `0..=LAST_RESERVED_ID` are reserved as invalid sentinels; the
/// allocator never issues them.
pub const LAST_RESERVED_ID: u64 = 9;

/// Tree-wide stable identifier for a vertex.
///
/// Local handles change when an entity migrates between clusters; a
/// `GlobalVertex` does not. It is unique over every cluster sharing one
/// [`IdGen`] and survives moves, deep copies, and save/load round trips
/// performed by external code.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalVertex(pub u64);

impl GlobalVertex {
    /// Returns `true` when the id lies outside the reserved sentinel range.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > LAST_RESERVED_ID
    }
}

/// Tree-wide stable identifier for a logical (global) edge.
///
/// Drawn from the same allocator space as [`GlobalVertex`]; using a dedicated
/// wrapper prevents accidental mixing of vertex and edge identifiers.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalEdgeId(pub u64);

impl GlobalEdgeId {
    /// Returns `true` when the id lies outside the reserved sentinel range.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > LAST_RESERVED_ID
    }
}

/// Stable descriptor for a logical edge.
///
/// `source`/`target` record which global vertices the edge connects; the
/// direction is informational only (the graph is undirected). Two global
/// edges are the same edge iff their `id` matches, so equality, ordering, and
/// hashing all go through `id` alone.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalEdge {
    /// Global id of one endpoint.
    pub source: GlobalVertex,
    /// Global id of the other endpoint.
    pub target: GlobalVertex,
    /// Unique identity of this logical edge.
    pub id: GlobalEdgeId,
}

impl GlobalEdge {
    /// Returns `true` when the edge id lies outside the reserved range.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.id.is_valid()
    }

    /// Returns `true` when `v` is one of the two endpoints.
    #[must_use]
    pub fn touches(&self, v: GlobalVertex) -> bool {
        self.source == v || self.target == v
    }

    /// Returns the endpoint opposite to `v`, or `None` when `v` is not an
    /// endpoint.
    #[must_use]
    pub fn opposite(&self, v: GlobalVertex) -> Option<GlobalVertex> {
        if self.source == v {
            Some(self.target)
        } else if self.target == v {
            Some(self.source)
        } else {
            None
        }
    }
}

impl PartialEq for GlobalEdge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GlobalEdge {}

impl PartialOrd for GlobalEdge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GlobalEdge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for GlobalEdge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Monotone allocator for global identifiers.
///
/// Every cluster of one tree holds a clone of the same `IdGen`; clones share
/// the underlying counter, so ids are unique across the whole tree. The
/// counter starts at [`LAST_RESERVED_ID`] + 1 ... 10, making 11 the first
/// issued id.
///
/// Invariants
/// - `generate` is strictly increasing.
/// - `set_count` never lowers the counter, so an id can never be reissued.
#[derive(Clone, Debug)]
pub struct IdGen {
    counter: Rc<Cell<u64>>,
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGen {
    /// Creates a fresh allocator with its own counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: Rc::new(Cell::new(LAST_RESERVED_ID + 1)),
        }
    }

    /// Issues the next id.
    pub fn generate(&self) -> u64 {
        let next = self.counter.get() + 1;
        self.counter.set(next);
        next
    }

    /// Returns the last issued id (also the total issued count offset by the
    /// reserved range).
    #[must_use]
    pub fn count(&self) -> u64 {
        self.counter.get()
    }

    /// Fast-forwards the counter so no id `<= n` is ever issued.
    ///
    /// Lowering the counter would allow reissuing live ids, so a value below
    /// the current count is ignored.
    pub fn set_count(&self, n: u64) {
        if n > self.counter.get() {
            self.counter.set(n);
        }
    }

    /// Returns `true` when `other` shares this allocator's counter.
    #[must_use]
    pub fn shares_counter(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.counter, &other.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_generated_id_is_eleven() {
        let ids = IdGen::new();
        assert_eq!(ids.count(), 10);
        assert_eq!(ids.generate(), 11);
        assert_eq!(ids.generate(), 12);
        assert_eq!(ids.count(), 12);
    }

    #[test]
    fn clones_share_the_counter() {
        let ids = IdGen::new();
        let other = ids.clone();
        assert!(ids.shares_counter(&other));
        other.generate();
        assert_eq!(ids.count(), 11);
    }

    #[test]
    fn set_count_is_monotone() {
        let ids = IdGen::new();
        ids.set_count(500);
        assert_eq!(ids.generate(), 501);
        ids.set_count(100);
        assert_eq!(ids.generate(), 502, "set_count must never lower the counter");
    }

    #[test]
    fn global_edge_equality_is_by_id_only() {
        let a = GlobalEdge {
            source: GlobalVertex(11),
            target: GlobalVertex(12),
            id: GlobalEdgeId(13),
        };
        let b = GlobalEdge {
            source: GlobalVertex(14),
            target: GlobalVertex(15),
            id: GlobalEdgeId(13),
        };
        assert_eq!(a, b);
        assert!(a.touches(GlobalVertex(11)));
        assert_eq!(a.opposite(GlobalVertex(11)), Some(GlobalVertex(12)));
        assert_eq!(a.opposite(GlobalVertex(42)), None);
    }

    #[test]
    fn reserved_range_is_invalid() {
        assert!(!GlobalVertex(9).is_valid());
        assert!(GlobalVertex(10).is_valid());
        assert!(!GlobalEdgeId(0).is_valid());
    }
}
