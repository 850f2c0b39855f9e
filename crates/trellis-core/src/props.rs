// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed attribute and payload storage for graph entities.
//!
//! Every vertex, local edge, global-edge slot, and cluster carries two
//! heterogeneous stores:
//!
//! - a **property store** ([`PropMap`]) of plain values, one slot per declared
//!   [`PropertyKind`], default-constructed on first access;
//! - an **object store** ([`ObjMap`]) of optional shared payloads, one slot
//!   per declared [`ObjectKind`]. Payload contents are opaque to the graph;
//!   the solver interprets them.
//!
//! Kinds are declared as zero-sized marker types and resolved by their
//! `std::any::TypeId`, so "exactly one storage slot per (entity, kind)" holds
//! by construction and the graph-internal kinds ([`VertexIndex`],
//! [`EdgeIndex`], [`Changed`]) can never collide with caller-declared ones.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A declared property kind: a marker type naming one typed attribute slot.
///
/// The value type must be `Default` (first access constructs it) and `Clone`
/// (deep copies reproduce it).
pub trait PropertyKind: 'static {
    /// Value stored under this kind.
    type Value: Clone + Default + fmt::Debug + 'static;
}

/// A declared payload kind: a marker type naming one shared-payload slot.
pub trait ObjectKind: 'static {
    /// Payload type stored under this kind, held behind an `Rc`.
    type Object: 'static;
}

/// Type-erased shared payload handle, as seen by copy functors.
pub type DynObject = Rc<dyn Any>;

// ============================================================================
// Built-in kinds
// ============================================================================

/// Dense vertex index assigned by `init_index_maps`.
///
/// List-backed storage gives no free contiguous numbering, so algorithms that
/// need one read this property after a rebuild.
pub struct VertexIndex;

impl PropertyKind for VertexIndex {
    type Value = usize;
}

/// Dense edge index assigned by `init_index_maps`.
pub struct EdgeIndex;

impl PropertyKind for EdgeIndex {
    type Value = usize;
}

/// Per-cluster change marker, set by mutating operations outside copy mode.
pub struct Changed;

impl PropertyKind for Changed {
    type Value = bool;
}

// ============================================================================
// Property store
// ============================================================================

struct PropSlot {
    value: Box<dyn Any>,
    clone_fn: fn(&dyn Any) -> Box<dyn Any>,
    debug_fn: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

impl PropSlot {
    fn new<T: Any + Clone + fmt::Debug>(value: T) -> Self {
        Self {
            value: Box::new(value),
            clone_fn: |any| {
                let value = any
                    .downcast_ref::<T>()
                    .expect("property slot holds a foreign value type");
                Box::new(value.clone())
            },
            debug_fn: |any, f| {
                let value = any
                    .downcast_ref::<T>()
                    .expect("property slot holds a foreign value type");
                fmt::Debug::fmt(value, f)
            },
        }
    }

    fn clone_slot(&self) -> Self {
        Self {
            value: (self.clone_fn)(&*self.value),
            clone_fn: self.clone_fn,
            debug_fn: self.debug_fn,
        }
    }
}

impl fmt::Debug for PropSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.debug_fn)(&*self.value, f)
    }
}

/// Heterogeneous property bag keyed by [`PropertyKind`] marker type.
#[derive(Default, Debug)]
pub struct PropMap {
    slots: HashMap<TypeId, PropSlot>,
}

impl Clone for PropMap {
    fn clone(&self) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|(k, v)| (*k, v.clone_slot()))
                .collect(),
        }
    }
}

impl PropMap {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `K`, if one was ever written.
    #[must_use]
    pub fn get<K: PropertyKind>(&self) -> Option<&K::Value> {
        self.slots
            .get(&TypeId::of::<K>())
            .and_then(|slot| slot.value.downcast_ref::<K::Value>())
    }

    /// Returns the value stored under `K`, default-constructing the slot on
    /// first access.
    pub fn get_or_default<K: PropertyKind>(&mut self) -> &mut K::Value {
        let slot = self
            .slots
            .entry(TypeId::of::<K>())
            .or_insert_with(|| PropSlot::new(K::Value::default()));
        match slot.value.downcast_mut::<K::Value>() {
            Some(value) => value,
            // Unreachable: the map is keyed by the kind's TypeId and only
            // this method inserts under it.
            None => unreachable!("property slot holds a foreign value type"),
        }
    }

    /// Returns a copy of the value under `K`, or the default when unset.
    #[must_use]
    pub fn value<K: PropertyKind>(&self) -> K::Value {
        self.get::<K>().cloned().unwrap_or_default()
    }

    /// Overwrites the value stored under `K`.
    pub fn set<K: PropertyKind>(&mut self, value: K::Value) {
        self.slots.insert(TypeId::of::<K>(), PropSlot::new(value));
    }
}

// ============================================================================
// Object store
// ============================================================================

/// Heterogeneous payload table keyed by [`ObjectKind`] marker type.
///
/// Each slot holds at most one reference-counted payload. Cloning the map
/// clones the handles, not the payloads; use [`ObjMap::map_with`] to rebuild
/// the table through a functor when clone-vs-share must be decided per
/// payload.
#[derive(Default, Clone)]
pub struct ObjMap {
    slots: HashMap<TypeId, DynObject>,
}

impl fmt::Debug for ObjMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjMap")
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl ObjMap {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload stored under `K`, if any.
    #[must_use]
    pub fn get<K: ObjectKind>(&self) -> Option<Rc<K::Object>> {
        self.slots
            .get(&TypeId::of::<K>())
            .and_then(|obj| Rc::clone(obj).downcast::<K::Object>().ok())
    }

    /// Installs `payload` under `K`, replacing any previous one.
    pub fn set<K: ObjectKind>(&mut self, payload: Rc<K::Object>) {
        self.slots.insert(TypeId::of::<K>(), payload);
    }

    /// Removes and returns the payload stored under `K`.
    pub fn take<K: ObjectKind>(&mut self) -> Option<Rc<K::Object>> {
        self.slots
            .remove(&TypeId::of::<K>())
            .and_then(|obj| obj.downcast::<K::Object>().ok())
    }

    /// Returns `true` when no payload is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Rebuilds the table, passing every stored handle through `map`.
    ///
    /// The functor decides whether the new table shares the payload (return a
    /// clone of the handle) or owns a fresh one.
    #[must_use]
    pub fn map_with(&self, map: &mut dyn FnMut(&DynObject) -> DynObject) -> Self {
        Self {
            slots: self.slots.iter().map(|(k, v)| (*k, map(v))).collect(),
        }
    }

    /// Iterates over the type-erased handles in the table.
    pub(crate) fn iter_raw(&self) -> impl Iterator<Item = &DynObject> {
        self.slots.values()
    }
}
