// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural mutation: vertex/edge creation and removal, cluster removal,
//! and vertex migration across cluster boundaries.
//!
//! Every operation validates its preconditions before touching the tree;
//! a returned error means nothing changed. Removal operations accept a
//! functor that observes every global entity about to be dropped, so callers
//! can release external payload state deterministically.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{GraphError, GraphResult};
use crate::graph::{ClusterGraph, ClusterRef, LocalEdge, LocalVertex};
use crate::ident::{GlobalEdge, GlobalEdgeId, GlobalVertex};
use crate::record::{EdgeRecord, GlobalEdgeSlot, VertexRecord};

/// Result of adding an edge by global descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAddition {
    /// The local edge now carrying the new global edge.
    ///
    /// Only valid in the cluster the call was made on when `in_scope` is
    /// `true`; otherwise it belongs to the descendant that hosts both
    /// endpoints.
    pub local: LocalEdge,
    /// The newly created global edge.
    pub edge: GlobalEdge,
    /// Whether `local` is a handle of the called cluster.
    pub in_scope: bool,
}

/// Receiver for entities dropped by [`ClusterGraph::remove_cluster_with`]
/// and friends.
///
/// A cluster is announced before its contents; cluster-representative
/// vertices are announced through [`ClusterVisitor::cluster`] only, plain
/// vertices through [`ClusterVisitor::vertex`].
pub trait ClusterVisitor {
    /// Called for a cluster about to be destroyed, before its contents.
    fn cluster(&mut self, _cluster: &ClusterRef) {}

    /// Called for every plain global vertex about to be destroyed.
    fn vertex(&mut self, _vertex: GlobalVertex) {}

    /// Called for every global edge about to be destroyed.
    fn edge(&mut self, _edge: GlobalEdge) {}
}

impl ClusterVisitor for () {}

impl ClusterGraph {
    // ========================================================================
    // Creation
    // ========================================================================

    /// Adds a vertex with a freshly allocated global id.
    pub fn add_vertex(&mut self) -> (LocalVertex, GlobalVertex) {
        let global = GlobalVertex(self.ids.generate());
        let vertex = self.graph.add_node(VertexRecord::new(global));
        self.set_changed();
        trace!(global = global.0, "added vertex");
        (vertex, global)
    }

    /// Adds a vertex under a caller-chosen global id (e.g. during load).
    ///
    /// When a vertex with that id already exists in this cluster, it is
    /// returned unchanged. The allocator is fast-forwarded past `global` so
    /// the id can never be issued again.
    pub fn add_vertex_with_global(&mut self, global: GlobalVertex) -> (LocalVertex, GlobalVertex) {
        if let Some(existing) = self.containing_vertex_shallow(global) {
            return (existing, global);
        }
        let vertex = self.graph.add_node(VertexRecord::new(global));
        self.ids.set_count(global.0);
        self.set_changed();
        trace!(global = global.0, "adopted vertex");
        (vertex, global)
    }

    /// Adds an edge between two plain local vertices of this cluster.
    ///
    /// When a local edge between `u` and `v` already exists, a fresh global
    /// edge is appended to its aggregation list and the existing handle is
    /// returned.
    ///
    /// # Errors
    /// - [`GraphError::IdenticalEndpoints`] when `u == v`.
    /// - [`GraphError::ClusterEndpoint`] when either endpoint is a cluster
    ///   vertex; connect into or across subclusters with
    ///   [`ClusterGraph::add_edge_global`] instead.
    /// - [`GraphError::LocalVertexNotFound`] for stale handles.
    pub fn add_edge(
        &mut self,
        u: LocalVertex,
        v: LocalVertex,
    ) -> GraphResult<(LocalEdge, GlobalEdge)> {
        if u == v {
            return Err(GraphError::IdenticalEndpoints);
        }
        if self.is_cluster(u) || self.is_cluster(v) {
            return Err(GraphError::ClusterEndpoint);
        }
        let source = self.global_vertex(u)?;
        let target = self.global_vertex(v)?;
        let edge = GlobalEdge {
            source,
            target,
            id: GlobalEdgeId(self.ids.generate()),
        };
        let local = self.attach_global_edge(u, v, GlobalEdgeSlot::new(edge));
        self.set_changed();
        trace!(id = edge.id.0, "added edge");
        Ok((local, edge))
    }

    /// Adds an edge between two vertices anywhere in this cluster's subtree,
    /// identified by global id.
    ///
    /// Each endpoint is resolved to its containing local vertex here. When
    /// both resolve to the same subcluster vertex the logical edge is
    /// internal to that subcluster: creation recurses into it, and the
    /// returned handle is flagged out of scope (`in_scope == false`).
    /// Endpoints may resolve to cluster vertices; the aggregated local edge
    /// then connects the subcluster representatives.
    ///
    /// # Errors
    /// - [`GraphError::IdenticalEndpoints`] when `source == target`.
    /// - [`GraphError::VertexNotFound`] when either id is not in this
    ///   subtree.
    pub fn add_edge_global(
        &mut self,
        source: GlobalVertex,
        target: GlobalVertex,
    ) -> GraphResult<EdgeAddition> {
        if source == target {
            return Err(GraphError::IdenticalEndpoints);
        }
        let u = self
            .containing_vertex(source)
            .ok_or(GraphError::VertexNotFound(source))?;
        let v = self
            .containing_vertex(target)
            .ok_or(GraphError::VertexNotFound(target))?;
        if u == v {
            // Both endpoints route through the same subcluster; the edge is
            // internal to it.
            let child = self
                .vertex_cluster(u)
                .ok_or(GraphError::Internal("distinct globals on one plain vertex"))?;
            let addition = child.borrow_mut().add_edge_global(source, target)?;
            return Ok(EdgeAddition {
                in_scope: false,
                ..addition
            });
        }
        let edge = GlobalEdge {
            source,
            target,
            id: GlobalEdgeId(self.ids.generate()),
        };
        let local = self.attach_global_edge(u, v, GlobalEdgeSlot::new(edge));
        self.set_changed();
        trace!(id = edge.id.0, "added global edge");
        Ok(EdgeAddition {
            local,
            edge,
            in_scope: true,
        })
    }

    /// Appends `slot` to the local edge `(u, v)`, creating it when absent.
    pub(crate) fn attach_global_edge(
        &mut self,
        u: LocalVertex,
        v: LocalVertex,
        slot: GlobalEdgeSlot,
    ) -> LocalEdge {
        match self.graph.find_edge(u, v) {
            Some(existing) => {
                if let Some(record) = self.graph.edge_weight_mut(existing) {
                    record.slots.push(slot);
                }
                existing
            }
            None => self.graph.add_edge(u, v, EdgeRecord::seeded(slot)),
        }
    }

    /// Merges a detached edge record into the local edge `(u, v)`,
    /// concatenating aggregation lists. A freshly created local edge keeps
    /// the record's property bag; an existing one keeps its own.
    fn merge_edge_record(&mut self, u: LocalVertex, v: LocalVertex, record: EdgeRecord) {
        match self.graph.find_edge(u, v) {
            Some(existing) => {
                if let Some(target) = self.graph.edge_weight_mut(existing) {
                    target.slots.extend(record.slots);
                }
            }
            None => {
                self.graph.add_edge(u, v, record);
            }
        }
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Removes a local vertex and every incident local edge.
    ///
    /// Cluster vertices are not special-cased: removing one detaches the
    /// nested cluster without visiting its contents. Use
    /// [`ClusterGraph::remove_cluster_at`] for cluster vertices.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn remove_vertex(&mut self, v: LocalVertex) -> GraphResult<()> {
        self.remove_vertex_with(v, &mut |_| {})
    }

    /// Like [`ClusterGraph::remove_vertex`], invoking `f` on every incident
    /// global edge before anything is removed.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalVertexNotFound`] for a stale handle.
    pub fn remove_vertex_with(
        &mut self,
        v: LocalVertex,
        f: &mut dyn FnMut(GlobalEdge),
    ) -> GraphResult<()> {
        if !self.graph.contains_node(v) {
            return Err(GraphError::LocalVertexNotFound);
        }
        for e in self.incident_edges(v) {
            if let Some(record) = self.graph.edge_weight(e) {
                for slot in &record.slots {
                    f(slot.edge);
                }
            }
        }
        self.graph.remove_node(v);
        self.clusters.remove(&v);
        self.set_changed();
        Ok(())
    }

    /// Removes the vertex with global id `g` from wherever it lives in this
    /// cluster's subtree.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexNotFound`] when `g` is not in this
    /// subtree.
    pub fn remove_vertex_global(&mut self, g: GlobalVertex) -> GraphResult<()> {
        self.remove_vertex_global_with(g, &mut |_| {})
    }

    /// Like [`ClusterGraph::remove_vertex_global`], invoking `f` exactly once
    /// on every removed global edge.
    ///
    /// Edges touching `g` that are aggregated on local edges upstream of the
    /// hosting cluster are stripped level by level on the way down, so no
    /// stale aggregation survives anywhere in the tree.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexNotFound`] when `g` is not in this
    /// subtree.
    pub fn remove_vertex_global_with(
        &mut self,
        g: GlobalVertex,
        f: &mut dyn FnMut(GlobalEdge),
    ) -> GraphResult<()> {
        let v = self
            .containing_vertex(g)
            .ok_or(GraphError::VertexNotFound(g))?;
        match self.vertex_cluster(v) {
            None => self.remove_vertex_with(v, f),
            Some(child) => {
                // `g` lives deeper; strip the aggregated edges that touch it
                // at this level, then descend.
                let mut touched = false;
                for e in self.incident_edges(v) {
                    let mut emptied = false;
                    if let Some(record) = self.graph.edge_weight_mut(e) {
                        let before = record.slots.len();
                        record.slots.retain(|slot| {
                            if slot.edge.touches(g) {
                                f(slot.edge);
                                false
                            } else {
                                true
                            }
                        });
                        touched |= record.slots.len() != before;
                        emptied = record.slots.is_empty();
                    }
                    if emptied {
                        self.graph.remove_edge(e);
                    }
                }
                if touched {
                    self.set_changed();
                }
                child.borrow_mut().remove_vertex_global_with(g, f)
            }
        }
    }

    /// Removes the global edge `ge` from this cluster's subtree. The
    /// carrying local edge is removed too when `ge` was its last entry.
    ///
    /// # Errors
    /// Returns [`GraphError::EdgeNotFound`] when no local edge in this
    /// subtree carries `ge`.
    pub fn remove_edge(&mut self, ge: GlobalEdgeId) -> GraphResult<()> {
        if let Some(e) = self.containing_edge(ge) {
            let mut emptied = false;
            if let Some(record) = self.graph.edge_weight_mut(e) {
                record.slots.retain(|slot| slot.edge.id != ge);
                emptied = record.slots.is_empty();
            }
            if emptied {
                self.graph.remove_edge(e);
            }
            self.set_changed();
            return Ok(());
        }
        for child in self.clusters.values() {
            if child.borrow_mut().remove_edge(ge).is_ok() {
                return Ok(());
            }
        }
        Err(GraphError::EdgeNotFound(ge))
    }

    /// Removes a local edge of this cluster.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn remove_local_edge(&mut self, e: LocalEdge) -> GraphResult<()> {
        self.remove_local_edge_with(e, &mut |_| {})
    }

    /// Like [`ClusterGraph::remove_local_edge`], invoking `f` on every
    /// global edge aggregated in `e` before removal.
    ///
    /// # Errors
    /// Returns [`GraphError::LocalEdgeNotFound`] for a stale handle.
    pub fn remove_local_edge_with(
        &mut self,
        e: LocalEdge,
        f: &mut dyn FnMut(GlobalEdge),
    ) -> GraphResult<()> {
        let record = self.edge_record(e)?;
        for slot in &record.slots {
            f(slot.edge);
        }
        self.graph.remove_edge(e);
        self.set_changed();
        Ok(())
    }

    // ========================================================================
    // Cluster removal
    // ========================================================================

    /// Removes the subcluster represented by local vertex `v`, destroying
    /// its entire subtree, then removes `v` itself (and with it the upstream
    /// local edges that aggregated the subtree's external connections).
    ///
    /// # Errors
    /// Returns [`GraphError::NotACluster`] when `v` is a plain vertex.
    pub fn remove_cluster_at(&mut self, v: LocalVertex) -> GraphResult<()> {
        self.remove_cluster_at_with(v, &mut ())
    }

    /// Like [`ClusterGraph::remove_cluster_at`], announcing every destroyed
    /// cluster, plain global vertex, and global edge to `visit`. A cluster
    /// is announced before its contents.
    ///
    /// # Errors
    /// Returns [`GraphError::NotACluster`] when `v` is a plain vertex.
    pub fn remove_cluster_at_with(
        &mut self,
        v: LocalVertex,
        visit: &mut dyn ClusterVisitor,
    ) -> GraphResult<()> {
        let child = self.clusters.remove(&v).ok_or(GraphError::NotACluster)?;
        Self::visit_subtree(&child, visit);
        self.remove_vertex_with(v, &mut |edge| visit.edge(edge))?;
        debug!("removed subcluster");
        Ok(())
    }

    /// Removes a direct subcluster identified by reference.
    ///
    /// # Errors
    /// Returns [`GraphError::NotSubcluster`] when `child` is not a direct
    /// child of this cluster.
    pub fn remove_cluster(&mut self, child: &ClusterRef) -> GraphResult<()> {
        self.remove_cluster_with(child, &mut ())
    }

    /// Like [`ClusterGraph::remove_cluster`], with a visitor.
    ///
    /// # Errors
    /// Returns [`GraphError::NotSubcluster`] when `child` is not a direct
    /// child of this cluster.
    pub fn remove_cluster_with(
        &mut self,
        child: &ClusterRef,
        visit: &mut dyn ClusterVisitor,
    ) -> GraphResult<()> {
        let v = self
            .cluster_vertex(child)
            .ok_or(GraphError::NotSubcluster)?;
        self.remove_cluster_at_with(v, visit)
    }

    /// Removes every direct subcluster.
    pub fn clear_clusters(&mut self) {
        let vertices: Vec<LocalVertex> = self.clusters.keys().copied().collect();
        for v in vertices {
            // Entries came straight from the cluster map, so removal cannot
            // fail with NotACluster.
            let _ = self.remove_cluster_at_with(v, &mut ());
        }
    }

    fn visit_subtree(cluster: &ClusterRef, visit: &mut dyn ClusterVisitor) {
        visit.cluster(cluster);
        let guard = cluster.borrow();
        for e in guard.local_edges() {
            if let Ok(record) = guard.edge_record(e) {
                for slot in &record.slots {
                    visit.edge(slot.edge);
                }
            }
        }
        for v in guard.local_vertices() {
            match guard.vertex_cluster(v) {
                Some(sub) => Self::visit_subtree(&sub, visit),
                None => {
                    if let Ok(global) = guard.global_vertex(v) {
                        visit.vertex(global);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Vertex migration
    // ========================================================================

    /// Moves vertex `v` into the subcluster represented by
    /// `cluster_vertex`, preserving its global id, properties, objects, and
    /// all logical connectivity.
    ///
    /// Edges between `v` and the absorbing subcluster become internal edges
    /// of that subcluster, distributed to the local vertices that host their
    /// far endpoints. Edges between `v` and anything else are redirected to
    /// run from the subcluster vertex, merging with existing aggregations.
    /// Moving a cluster vertex is allowed and takes its subtree along.
    ///
    /// Returns the local handle of the moved vertex in the subcluster.
    ///
    /// # Errors
    /// - [`GraphError::IdenticalEndpoints`] when `v == cluster_vertex`.
    /// - [`GraphError::NotACluster`] when `cluster_vertex` is a plain vertex.
    /// - [`GraphError::LocalVertexNotFound`] for stale handles.
    pub fn move_to_subcluster(
        &mut self,
        v: LocalVertex,
        cluster_vertex: LocalVertex,
    ) -> GraphResult<LocalVertex> {
        if v == cluster_vertex {
            return Err(GraphError::IdenticalEndpoints);
        }
        if !self.graph.contains_node(v) {
            return Err(GraphError::LocalVertexNotFound);
        }
        let child = self
            .vertex_cluster(cluster_vertex)
            .ok_or(GraphError::NotACluster)?;

        // Detach incident edges, splitting them into the part absorbed by
        // the subcluster and the part that stays here, redirected.
        let mut absorbed: Vec<GlobalEdgeSlot> = Vec::new();
        let mut redirected: Vec<(LocalVertex, EdgeRecord)> = Vec::new();
        for e in self.incident_edges(v) {
            let (a, b) = self
                .graph
                .edge_endpoints(e)
                .ok_or(GraphError::Internal("incident edge without endpoints"))?;
            let other = if a == v { b } else { a };
            let record = self
                .graph
                .remove_edge(e)
                .ok_or(GraphError::Internal("incident edge vanished during move"))?;
            if other == cluster_vertex {
                absorbed.extend(record.slots);
            } else {
                redirected.push((other, record));
            }
        }

        let record = self
            .graph
            .remove_node(v)
            .ok_or(GraphError::Internal("moved vertex vanished"))?;
        let global = record.global;
        let moved_child = self.clusters.remove(&v);

        let mut target = child.borrow_mut();
        let new_v = target.graph.add_node(record);
        if let Some(sub) = moved_child {
            sub.borrow_mut().parent = Rc::downgrade(&child);
            target.clusters.insert(new_v, sub);
        }
        for slot in absorbed {
            let s = target
                .containing_vertex(slot.edge.source)
                .ok_or(GraphError::Internal("absorbed edge endpoint not in subcluster"))?;
            let t = target
                .containing_vertex(slot.edge.target)
                .ok_or(GraphError::Internal("absorbed edge endpoint not in subcluster"))?;
            let other = if s == new_v { t } else { s };
            target.attach_global_edge(new_v, other, slot);
        }
        target.set_changed();
        drop(target);

        for (other, record) in redirected {
            self.merge_edge_record(cluster_vertex, other, record);
        }
        self.set_changed();
        debug!(global = global.0, "moved vertex to subcluster");
        Ok(new_v)
    }

    /// Moves vertex `v` out of cluster `this` into its parent, preserving
    /// its global id, properties, objects, and all logical connectivity.
    ///
    /// The exact inverse of [`ClusterGraph::move_to_subcluster`]: aggregated
    /// local edges on the parent side are split as the vertex peels away
    /// from the cluster vertex that used to represent it, and `v`'s edges to
    /// the rest of `this` aggregate onto a parent edge between the moved
    /// vertex and the cluster vertex.
    ///
    /// Returns the local handle of the moved vertex, valid in the parent.
    ///
    /// # Errors
    /// - [`GraphError::LocalVertexNotFound`] for a stale handle.
    /// - [`GraphError::ParentGone`] when `this` is the root or the parent
    ///   was dropped.
    /// - [`GraphError::NotSubcluster`] when the parent no longer lists
    ///   `this` (a detached cluster).
    pub fn move_to_parent(this: &ClusterRef, v: LocalVertex) -> GraphResult<LocalVertex> {
        if !this.borrow().graph.contains_node(v) {
            return Err(GraphError::LocalVertexNotFound);
        }
        let parent_rc = this.borrow().parent.upgrade().ok_or(GraphError::ParentGone)?;
        let d = parent_rc
            .borrow()
            .cluster_vertex(this)
            .ok_or(GraphError::NotSubcluster)?;

        // Detach from the child: every incident edge aggregates onto the
        // parent edge (moved vertex, cluster vertex).
        let (record, moved_child, internal) = {
            let mut me = this.borrow_mut();
            let mut internal: Vec<GlobalEdgeSlot> = Vec::new();
            for e in me.incident_edges(v) {
                let edge_record = me
                    .graph
                    .remove_edge(e)
                    .ok_or(GraphError::Internal("incident edge vanished during move"))?;
                internal.extend(edge_record.slots);
            }
            let record = me
                .graph
                .remove_node(v)
                .ok_or(GraphError::Internal("moved vertex vanished"))?;
            let moved_child = me.clusters.remove(&v);
            me.set_changed();
            (record, moved_child, internal)
        };
        let global = record.global;

        let mut parent = parent_rc.borrow_mut();
        let new_v = parent.graph.add_node(record);
        if let Some(sub) = moved_child {
            sub.borrow_mut().parent = Rc::downgrade(&parent_rc);
            parent.clusters.insert(new_v, sub);
        }

        // Split the aggregations on the parent side: slots whose inner
        // endpoint moved out now route through the moved vertex.
        for e in parent.incident_edges(d) {
            let (a, b) = parent
                .graph
                .edge_endpoints(e)
                .ok_or(GraphError::Internal("incident edge without endpoints"))?;
            let far = if a == d { b } else { a };
            let mut moved: Vec<GlobalEdgeSlot> = Vec::new();
            let emptied;
            {
                let slots = {
                    let edge_record = parent
                        .graph
                        .edge_weight_mut(e)
                        .ok_or(GraphError::Internal("incident edge vanished during move"))?;
                    std::mem::take(&mut edge_record.slots)
                };
                let mut kept: Vec<GlobalEdgeSlot> = Vec::with_capacity(slots.len());
                for slot in slots {
                    let s = parent
                        .containing_vertex(slot.edge.source)
                        .ok_or(GraphError::Internal("edge endpoint left the tree"))?;
                    let t = parent
                        .containing_vertex(slot.edge.target)
                        .ok_or(GraphError::Internal("edge endpoint left the tree"))?;
                    let inner = if s == far { t } else { s };
                    if inner == new_v {
                        moved.push(slot);
                    } else {
                        kept.push(slot);
                    }
                }
                let edge_record = parent
                    .graph
                    .edge_weight_mut(e)
                    .ok_or(GraphError::Internal("incident edge vanished during move"))?;
                emptied = kept.is_empty();
                edge_record.slots = kept;
            }
            if emptied {
                parent.graph.remove_edge(e);
            }
            for slot in moved {
                parent.attach_global_edge(new_v, far, slot);
            }
        }

        for slot in internal {
            parent.attach_global_edge(new_v, d, slot);
        }
        parent.set_changed();
        debug!(global = global.0, "moved vertex to parent");
        Ok(new_v)
    }
}
