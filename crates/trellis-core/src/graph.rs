// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The hierarchical cluster graph.
//!
//! A [`ClusterGraph`] is an undirected graph whose vertices may themselves be
//! nested cluster graphs. Nesting forms a tree: the parent owns its children
//! (via [`ClusterRef`] handles in its cluster map) and every child keeps a
//! non-owning back-reference to its parent. All clusters of one tree share a
//! single [`IdGen`], so global identifiers are unique tree-wide.
//!
//! Local handles ([`LocalVertex`], [`LocalEdge`]) are positions in one
//! cluster's storage: stable across unrelated insertions and removals (the
//! backing store is petgraph's `StableGraph`), but meaningless in any other
//! cluster and re-assigned when an entity migrates.
//!
//! The tree is single-threaded by design. Operations that cross cluster
//! boundaries borrow several `RefCell`s; callers must not hold a borrow of
//! one cluster while invoking an operation that reaches the same cluster
//! through the hierarchy.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::ident::{GlobalEdge, GlobalEdgeId, GlobalVertex, IdGen};
use crate::props::{Changed, EdgeIndex as EdgeIndexProp, ObjectKind, PropertyKind, VertexIndex};
use crate::props::PropMap;
use crate::record::{EdgeRecord, VertexRecord};

/// Positional handle to a vertex of one particular cluster.
///
/// Stable across unrelated mutations of the same cluster; not stable across
/// moves and not comparable between clusters.
pub type LocalVertex = NodeIndex;

/// Positional handle to a local edge of one particular cluster.
pub type LocalEdge = EdgeIndex;

/// Shared owning handle to a cluster.
pub type ClusterRef = Rc<RefCell<ClusterGraph>>;

pub(crate) type LocalGraph = StableUnGraph<VertexRecord, EdgeRecord>;

/// A graph that can be stacked in a tree-like manner without losing its
/// connections.
///
/// See the [module docs](self) for the ownership and identity model. Mutating
/// operations mark the cluster as changed (the [`Changed`] cluster property)
/// unless copy mode is active.
#[derive(Debug)]
pub struct ClusterGraph {
    pub(crate) graph: LocalGraph,
    /// Which local vertices are nested clusters. Ordered for deterministic
    /// iteration.
    pub(crate) clusters: BTreeMap<LocalVertex, ClusterRef>,
    pub(crate) parent: Weak<RefCell<ClusterGraph>>,
    pub(crate) self_ref: Weak<RefCell<ClusterGraph>>,
    pub(crate) ids: IdGen,
    pub(crate) props: PropMap,
    pub(crate) copy_mode: bool,
}

impl ClusterGraph {
    pub(crate) fn with_parts(
        parent: Weak<RefCell<ClusterGraph>>,
        self_ref: Weak<RefCell<ClusterGraph>>,
        ids: IdGen,
    ) -> Self {
        Self {
            graph: LocalGraph::default(),
            clusters: BTreeMap::new(),
            parent,
            self_ref,
            ids,
            props: PropMap::new(),
            copy_mode: false,
        }
    }

    /// Creates an empty toplevel cluster with a fresh identifier allocator.
    #[must_use]
    pub fn new_root() -> ClusterRef {
        Rc::new_cyclic(|weak| {
            RefCell::new(Self::with_parts(Weak::new(), weak.clone(), IdGen::new()))
        })
    }

    /// Creates a cluster below `parent`, sharing the parent's allocator.
    ///
    /// The new cluster is *not* entered into the parent's cluster map; that
    /// is the caller's responsibility. [`ClusterGraph::create_cluster`]
    /// automates both steps and is the usual entry point.
    #[must_use]
    pub fn new_child(parent: &ClusterRef) -> ClusterRef {
        let ids = parent.borrow().ids.clone();
        Rc::new_cyclic(|weak| {
            RefCell::new(Self::with_parts(Rc::downgrade(parent), weak.clone(), ids))
        })
    }

    /// Returns the allocator shared by this cluster's tree.
    #[must_use]
    pub fn ids(&self) -> &IdGen {
        &self.ids
    }

    /// Compares two cluster handles by identity, not by structural content.
    #[must_use]
    pub fn same_cluster(a: &ClusterRef, b: &ClusterRef) -> bool {
        Rc::ptr_eq(a, b)
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Returns the parent cluster, or `None` for the toplevel cluster.
    #[must_use]
    pub fn parent(&self) -> Option<ClusterRef> {
        self.parent.upgrade()
    }

    /// Returns `true` when this is the toplevel cluster.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Returns the toplevel cluster of this tree.
    ///
    /// # Errors
    /// Returns [`GraphError::Internal`] when the cluster is detached from its
    /// owning handle (cannot happen for clusters built through this API).
    pub fn root(&self) -> GraphResult<ClusterRef> {
        let mut current = match self.parent.upgrade() {
            None => {
                return self
                    .self_ref
                    .upgrade()
                    .ok_or(GraphError::Internal("cluster detached from owning handle"))
            }
            Some(parent) => parent,
        };
        loop {
            let next = current.borrow().parent.upgrade();
            match next {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
    }

    /// Creates a new subcluster and the local vertex representing it.
    ///
    /// The subcluster shares this cluster's allocator, is entered into the
    /// cluster map, and points back at this cluster as its parent.
    pub fn create_cluster(&mut self) -> (ClusterRef, LocalVertex) {
        let global = GlobalVertex(self.ids.generate());
        let vertex = self.graph.add_node(VertexRecord::new(global));
        let child = Rc::new_cyclic(|weak| {
            RefCell::new(Self::with_parts(
                self.self_ref.clone(),
                weak.clone(),
                self.ids.clone(),
            ))
        });
        self.clusters.insert(vertex, Rc::clone(&child));
        self.set_changed();
        debug!(global = global.0, "created subcluster");
        (child, vertex)
    }

    /// Returns `true` when the local vertex represents a subcluster.
    #[must_use]
    pub fn is_cluster(&self, v: LocalVertex) -> bool {
        self.clusters.contains_key(&v)
    }

    /// Returns the subcluster represented by `v`, or `None` when `v` is a
    /// plain vertex.
    #[must_use]
    pub fn vertex_cluster(&self, v: LocalVertex) -> Option<ClusterRef> {
        self.clusters.get(&v).map(Rc::clone)
    }

    /// Returns the local vertex representing `child` in this cluster.
    ///
    /// Inverse of [`ClusterGraph::vertex_cluster`].
    #[must_use]
    pub fn cluster_vertex(&self, child: &ClusterRef) -> Option<LocalVertex> {
        self.clusters
            .iter()
            .find(|(_, c)| Rc::ptr_eq(c, child))
            .map(|(v, _)| *v)
    }

    /// Iterates over the direct subclusters in deterministic order.
    pub fn clusters(&self) -> impl Iterator<Item = (LocalVertex, ClusterRef)> + '_ {
        self.clusters.iter().map(|(v, c)| (*v, Rc::clone(c)))
    }

    /// Number of direct subclusters.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    // ========================================================================
    // Change tracking
    // ========================================================================

    /// Marks the cluster as changed, unless copy mode is active.
    pub fn set_changed(&mut self) {
        if !self.copy_mode {
            self.props.set::<Changed>(true);
        }
    }

    /// Returns the current value of the change marker.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.props.value::<Changed>()
    }

    /// Turns copy mode on or off.
    ///
    /// While copy mode is on, mutations do not set the change marker (used
    /// during structural reconstruction such as [`ClusterGraph::copy_into`]).
    /// Turning copy mode off resets the marker: the rebuilt cluster starts
    /// out unchanged.
    pub fn set_copy_mode(&mut self, on: bool) {
        self.copy_mode = on;
        if !on {
            self.props.set::<Changed>(false);
        }
    }

    // ========================================================================
    // Cluster properties
    // ========================================================================

    /// Returns a copy of this cluster's `K` property (default when unset).
    #[must_use]
    pub fn cluster_property<K: PropertyKind>(&self) -> K::Value {
        self.props.value::<K>()
    }

    /// Mutable access to this cluster's `K` property, default-constructing
    /// on first access.
    pub fn cluster_property_mut<K: PropertyKind>(&mut self) -> &mut K::Value {
        self.props.get_or_default::<K>()
    }

    /// Overwrites this cluster's `K` property and marks the cluster changed.
    pub fn set_cluster_property<K: PropertyKind>(&mut self, value: K::Value) {
        self.props.set::<K>(value);
        self.set_changed();
    }

    /// Returns a copy of a direct subcluster's `K` property without
    /// retrieving the subcluster first.
    ///
    /// # Errors
    /// Returns [`GraphError::NotACluster`] when `v` is a plain vertex.
    pub fn subcluster_property<K: PropertyKind>(&self, v: LocalVertex) -> GraphResult<K::Value> {
        let child = self.clusters.get(&v).ok_or(GraphError::NotACluster)?;
        let value = child.borrow().cluster_property::<K>();
        Ok(value)
    }

    /// Sets a direct subcluster's `K` property.
    ///
    /// # Errors
    /// Returns [`GraphError::NotACluster`] when `v` is a plain vertex.
    pub fn set_subcluster_property<K: PropertyKind>(
        &self,
        v: LocalVertex,
        value: K::Value,
    ) -> GraphResult<()> {
        let child = self.clusters.get(&v).ok_or(GraphError::NotACluster)?;
        child.borrow_mut().set_cluster_property::<K>(value);
        Ok(())
    }

    // ========================================================================
    // Vertices and edges: queries
    // ========================================================================

    /// Number of local vertices (plain and cluster vertices alike).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of local edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` when `v` names a vertex of this cluster.
    #[must_use]
    pub fn contains_vertex(&self, v: LocalVertex) -> bool {
        self.graph.contains_node(v)
    }

    /// Returns the global id assigned to a local vertex.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn global_vertex(&self, v: LocalVertex) -> GraphResult<GlobalVertex> {
        self.graph
            .node_weight(v)
            .map(|record| record.global)
            .ok_or(GraphError::LocalVertexNotFound)
    }

    /// Iterates over the local vertices of this cluster.
    pub fn local_vertices(&self) -> impl Iterator<Item = LocalVertex> + '_ {
        self.graph.node_indices()
    }

    /// Iterates over the global ids of all local vertices.
    pub fn global_vertices(&self) -> impl Iterator<Item = GlobalVertex> + '_ {
        self.graph
            .node_indices()
            .filter_map(|v| self.graph.node_weight(v).map(|record| record.global))
    }

    /// Iterates over the local edges of this cluster.
    pub fn local_edges(&self) -> impl Iterator<Item = LocalEdge> + '_ {
        self.graph.edge_indices()
    }

    /// Returns the local edge between `u` and `v`, if one exists.
    #[must_use]
    pub fn edge_between(&self, u: LocalVertex, v: LocalVertex) -> Option<LocalEdge> {
        self.graph.find_edge(u, v)
    }

    /// Returns the two endpoints of a local edge.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn endpoints(&self, e: LocalEdge) -> GraphResult<(LocalVertex, LocalVertex)> {
        self.graph
            .edge_endpoints(e)
            .ok_or(GraphError::LocalEdgeNotFound)
    }

    /// Iterates, in insertion order, over the global edges aggregated in a
    /// local edge.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn global_edges(&self, e: LocalEdge) -> GraphResult<impl Iterator<Item = GlobalEdge> + '_> {
        let record = self
            .graph
            .edge_weight(e)
            .ok_or(GraphError::LocalEdgeNotFound)?;
        Ok(record.slots.iter().map(|slot| slot.edge))
    }

    /// Number of global edges aggregated in a local edge.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn global_edge_count(&self, e: LocalEdge) -> GraphResult<usize> {
        self.graph
            .edge_weight(e)
            .map(|record| record.slots.len())
            .ok_or(GraphError::LocalEdgeNotFound)
    }

    /// Collects the local edges incident to `v`.
    pub(crate) fn incident_edges(&self, v: LocalVertex) -> Vec<LocalEdge> {
        self.graph.edges(v).map(|edge| edge.id()).collect()
    }

    pub(crate) fn vertex_record(&self, v: LocalVertex) -> GraphResult<&VertexRecord> {
        self.graph
            .node_weight(v)
            .ok_or(GraphError::LocalVertexNotFound)
    }

    pub(crate) fn vertex_record_mut(&mut self, v: LocalVertex) -> GraphResult<&mut VertexRecord> {
        self.graph
            .node_weight_mut(v)
            .ok_or(GraphError::LocalVertexNotFound)
    }

    pub(crate) fn edge_record(&self, e: LocalEdge) -> GraphResult<&EdgeRecord> {
        self.graph
            .edge_weight(e)
            .ok_or(GraphError::LocalEdgeNotFound)
    }

    pub(crate) fn edge_record_mut(&mut self, e: LocalEdge) -> GraphResult<&mut EdgeRecord> {
        self.graph
            .edge_weight_mut(e)
            .ok_or(GraphError::LocalEdgeNotFound)
    }

    // ========================================================================
    // Vertex and edge properties
    // ========================================================================

    /// Returns a copy of the `K` property of a local vertex (default when
    /// unset).
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn vertex_property<K: PropertyKind>(&self, v: LocalVertex) -> GraphResult<K::Value> {
        Ok(self.vertex_record(v)?.props.value::<K>())
    }

    /// Mutable access to the `K` property of a local vertex,
    /// default-constructing on first access.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn vertex_property_mut<K: PropertyKind>(
        &mut self,
        v: LocalVertex,
    ) -> GraphResult<&mut K::Value> {
        Ok(self.vertex_record_mut(v)?.props.get_or_default::<K>())
    }

    /// Overwrites the `K` property of a local vertex.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn set_vertex_property<K: PropertyKind>(
        &mut self,
        v: LocalVertex,
        value: K::Value,
    ) -> GraphResult<()> {
        self.vertex_record_mut(v)?.props.set::<K>(value);
        self.set_changed();
        Ok(())
    }

    /// Returns a copy of the `K` property of a local edge.
    ///
    /// Properties live per *local* edge; all global edges aggregated in it
    /// share this value.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn edge_property<K: PropertyKind>(&self, e: LocalEdge) -> GraphResult<K::Value> {
        Ok(self.edge_record(e)?.props.value::<K>())
    }

    /// Mutable access to the `K` property of a local edge.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn edge_property_mut<K: PropertyKind>(
        &mut self,
        e: LocalEdge,
    ) -> GraphResult<&mut K::Value> {
        Ok(self.edge_record_mut(e)?.props.get_or_default::<K>())
    }

    /// Overwrites the `K` property of a local edge.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn set_edge_property<K: PropertyKind>(
        &mut self,
        e: LocalEdge,
        value: K::Value,
    ) -> GraphResult<()> {
        self.edge_record_mut(e)?.props.set::<K>(value);
        self.set_changed();
        Ok(())
    }

    /// Returns a copy of the `K` property of the vertex with global id `g`,
    /// resolving through subclusters to the hosting cluster.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexNotFound`] when `g` is not in this
    /// cluster's subtree.
    pub fn vertex_property_global<K: PropertyKind>(
        &self,
        g: GlobalVertex,
    ) -> GraphResult<K::Value> {
        if let Some(v) = self.containing_vertex_shallow(g) {
            return self.vertex_property::<K>(v);
        }
        match self.child_containing(g) {
            Some((_, child)) => child.borrow().vertex_property_global::<K>(g),
            None => Err(GraphError::VertexNotFound(g)),
        }
    }

    /// Sets the `K` property of the vertex with global id `g`, resolving
    /// through subclusters to the hosting cluster.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexNotFound`] when `g` is not in this
    /// cluster's subtree.
    pub fn set_vertex_property_global<K: PropertyKind>(
        &mut self,
        g: GlobalVertex,
        value: K::Value,
    ) -> GraphResult<()> {
        if let Some(v) = self.containing_vertex_shallow(g) {
            return self.set_vertex_property::<K>(v, value);
        }
        match self.child_containing(g) {
            Some((_, child)) => child.borrow_mut().set_vertex_property_global::<K>(g, value),
            None => Err(GraphError::VertexNotFound(g)),
        }
    }

    /// Returns a copy of the `K` property of the local edge carrying `ge`.
    ///
    /// Global edges have no property bags of their own; this resolves to the
    /// holding local edge within this cluster.
    ///
    /// # Errors
    /// Returns [`GraphError::EdgeNotFound`] when no local edge of this
    /// cluster carries `ge`.
    pub fn global_edge_property<K: PropertyKind>(&self, ge: GlobalEdgeId) -> GraphResult<K::Value> {
        let e = self.containing_edge(ge).ok_or(GraphError::EdgeNotFound(ge))?;
        self.edge_property::<K>(e)
    }

    /// Sets the `K` property of the local edge carrying `ge` (see
    /// [`ClusterGraph::global_edge_property`]).
    ///
    /// # Errors
    /// Returns [`GraphError::EdgeNotFound`] when no local edge of this
    /// cluster carries `ge`.
    pub fn set_global_edge_property<K: PropertyKind>(
        &mut self,
        ge: GlobalEdgeId,
        value: K::Value,
    ) -> GraphResult<()> {
        let e = self.containing_edge(ge).ok_or(GraphError::EdgeNotFound(ge))?;
        self.set_edge_property::<K>(e, value)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Returns the `K` payload stored at a local vertex, if any.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn vertex_object<K: ObjectKind>(&self, v: LocalVertex) -> GraphResult<Option<Rc<K::Object>>> {
        Ok(self.vertex_record(v)?.objects.get::<K>())
    }

    /// Installs the `K` payload at a local vertex.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn set_vertex_object<K: ObjectKind>(
        &mut self,
        v: LocalVertex,
        payload: Rc<K::Object>,
    ) -> GraphResult<()> {
        self.vertex_record_mut(v)?.objects.set::<K>(payload);
        self.set_changed();
        Ok(())
    }

    /// Returns the `K` payload of the vertex with global id `g`, resolving
    /// through subclusters.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexNotFound`] when `g` is not in this
    /// cluster's subtree.
    pub fn vertex_object_global<K: ObjectKind>(
        &self,
        g: GlobalVertex,
    ) -> GraphResult<Option<Rc<K::Object>>> {
        if let Some(v) = self.containing_vertex_shallow(g) {
            return self.vertex_object::<K>(v);
        }
        match self.child_containing(g) {
            Some((_, child)) => child.borrow().vertex_object_global::<K>(g),
            None => Err(GraphError::VertexNotFound(g)),
        }
    }

    /// Installs the `K` payload at the vertex with global id `g`, resolving
    /// through subclusters.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexNotFound`] when `g` is not in this
    /// cluster's subtree.
    pub fn set_vertex_object_global<K: ObjectKind>(
        &mut self,
        g: GlobalVertex,
        payload: Rc<K::Object>,
    ) -> GraphResult<()> {
        if let Some(v) = self.containing_vertex_shallow(g) {
            return self.set_vertex_object::<K>(v, payload);
        }
        match self.child_containing(g) {
            Some((_, child)) => child.borrow_mut().set_vertex_object_global::<K>(g, payload),
            None => Err(GraphError::VertexNotFound(g)),
        }
    }

    /// Returns the `K` payload of the **first** global edge aggregated in
    /// `e`.
    ///
    /// This shortcut exists for the common single-edge case. A local edge can
    /// aggregate many global edges, each with its own payloads; use
    /// [`ClusterGraph::edge_objects`] to reach the others, or
    /// [`ClusterGraph::global_edge_object`] to address one by descriptor.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn edge_object<K: ObjectKind>(&self, e: LocalEdge) -> GraphResult<Option<Rc<K::Object>>> {
        let record = self.edge_record(e)?;
        Ok(record.slots.first().and_then(|slot| slot.objects.get::<K>()))
    }

    /// Installs the `K` payload on the **first** global edge aggregated in
    /// `e` (see [`ClusterGraph::edge_object`] for the caveat).
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle, or
    /// [`GraphError::Internal`] when the slot list is empty (a broken
    /// invariant).
    pub fn set_edge_object<K: ObjectKind>(
        &mut self,
        e: LocalEdge,
        payload: Rc<K::Object>,
    ) -> GraphResult<()> {
        let record = self.edge_record_mut(e)?;
        let slot = record
            .slots
            .first_mut()
            .ok_or(GraphError::Internal("local edge with empty slot list"))?;
        slot.objects.set::<K>(payload);
        self.set_changed();
        Ok(())
    }

    /// Returns the `K` payload of a specific global edge, searched in this
    /// cluster's local edges.
    ///
    /// # Errors
    /// Returns [`GraphError::EdgeNotFound`] when no local edge of this
    /// cluster carries `ge`.
    pub fn global_edge_object<K: ObjectKind>(
        &self,
        ge: GlobalEdgeId,
    ) -> GraphResult<Option<Rc<K::Object>>> {
        let e = self.containing_edge(ge).ok_or(GraphError::EdgeNotFound(ge))?;
        let record = self.edge_record(e)?;
        let slot = record
            .slots
            .iter()
            .find(|slot| slot.edge.id == ge)
            .ok_or(GraphError::EdgeNotFound(ge))?;
        Ok(slot.objects.get::<K>())
    }

    /// Installs the `K` payload on a specific global edge, searched in this
    /// cluster's local edges.
    ///
    /// # Errors
    /// Returns [`GraphError::EdgeNotFound`] when no local edge of this
    /// cluster carries `ge`.
    pub fn set_global_edge_object<K: ObjectKind>(
        &mut self,
        ge: GlobalEdgeId,
        payload: Rc<K::Object>,
    ) -> GraphResult<()> {
        let e = self.containing_edge(ge).ok_or(GraphError::EdgeNotFound(ge))?;
        let record = self.edge_record_mut(e)?;
        let slot = record
            .slots
            .iter_mut()
            .find(|slot| slot.edge.id == ge)
            .ok_or(GraphError::EdgeNotFound(ge))?;
        slot.objects.set::<K>(payload);
        self.set_changed();
        Ok(())
    }

    /// Iterates over the `K` payload of every global edge aggregated in `e`,
    /// in slot order. Slots without a `K` payload yield `None`.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn edge_objects<K: ObjectKind>(
        &self,
        e: LocalEdge,
    ) -> GraphResult<impl Iterator<Item = Option<Rc<K::Object>>> + '_> {
        let record = self.edge_record(e)?;
        Ok(record.slots.iter().map(|slot| slot.objects.get::<K>()))
    }

    // ========================================================================
    // Index rebuild
    // ========================================================================

    /// Assigns a dense `0..n` index to every vertex and every edge of this
    /// cluster, written to the [`VertexIndex`] and [`EdgeIndexProp`]
    /// properties.
    ///
    /// List-backed storage keeps handles stable but leaves holes, so
    /// algorithms that need contiguous numbering call this first.
    pub fn init_index_maps(&mut self) {
        let vertices: Vec<LocalVertex> = self.graph.node_indices().collect();
        for (index, v) in vertices.into_iter().enumerate() {
            if let Some(record) = self.graph.node_weight_mut(v) {
                record.props.set::<VertexIndex>(index);
            }
        }
        let edges: Vec<LocalEdge> = self.graph.edge_indices().collect();
        for (index, e) in edges.into_iter().enumerate() {
            if let Some(record) = self.graph.edge_weight_mut(e) {
                record.props.set::<EdgeIndexProp>(index);
            }
        }
        self.set_changed();
    }

    // ========================================================================
    // Payload sweep
    // ========================================================================

    /// Applies `visit` to every `K` payload stored in this cluster: vertex
    /// payloads first, then the payloads of every global-edge slot, both in
    /// storage order.
    ///
    /// With `recursive`, subclusters are visited afterwards in cluster-map
    /// order; each cluster is announced through
    /// [`ObjectVisitor::enter_cluster`] before its contents.
    pub fn for_each_object<K, V>(&self, visit: &mut V, recursive: bool)
    where
        K: ObjectKind,
        V: ObjectVisitor<K>,
    {
        for v in self.graph.node_indices() {
            if let Some(record) = self.graph.node_weight(v) {
                if let Some(payload) = record.objects.get::<K>() {
                    visit.object(payload);
                }
            }
        }
        for e in self.graph.edge_indices() {
            if let Some(record) = self.graph.edge_weight(e) {
                for slot in &record.slots {
                    if let Some(payload) = slot.objects.get::<K>() {
                        visit.object(payload);
                    }
                }
            }
        }
        if recursive {
            for child in self.clusters.values() {
                visit.enter_cluster(child);
                child.borrow().for_each_object::<K, V>(visit, true);
            }
        }
    }
}

/// Receiver for [`ClusterGraph::for_each_object`] sweeps.
pub trait ObjectVisitor<K: ObjectKind> {
    /// Called for every stored `K` payload.
    fn object(&mut self, payload: Rc<K::Object>);

    /// Called before a subcluster's contents are visited (recursive sweeps
    /// only).
    fn enter_cluster(&mut self, _cluster: &ClusterRef) {}
}

impl<K: ObjectKind, F: FnMut(Rc<K::Object>)> ObjectVisitor<K> for F {
    fn object(&mut self, payload: Rc<K::Object>) {
        self(payload);
    }
}
