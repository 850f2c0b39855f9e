// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resolution of stable global descriptors to local positions.
//!
//! External callers identify entities by global id; these searches translate
//! an id to the local handle in the cluster that currently routes it. When a
//! global vertex sits in a descendant cluster, the plain lookup answers with
//! the local vertex of the *highest* subcluster on the path (the one directly
//! contained here); the `_graph` variants descend instead and return the
//! cluster that actually hosts the entity.

use std::rc::Rc;

use crate::graph::{ClusterGraph, ClusterRef, LocalEdge, LocalVertex};
use crate::ident::{GlobalEdgeId, GlobalVertex};

impl ClusterGraph {
    /// Finds the direct local vertex whose global id is `g`, without
    /// descending into subclusters.
    #[must_use]
    pub fn containing_vertex_shallow(&self, g: GlobalVertex) -> Option<LocalVertex> {
        self.graph.node_indices().find(|v| {
            self.graph
                .node_weight(*v)
                .is_some_and(|record| record.global == g)
        })
    }

    /// Finds the local vertex in this cluster that either *is* the vertex
    /// with global id `g` or represents the subcluster whose subtree hosts
    /// it.
    #[must_use]
    pub fn containing_vertex(&self, g: GlobalVertex) -> Option<LocalVertex> {
        if let Some(v) = self.containing_vertex_shallow(g) {
            return Some(v);
        }
        for (v, child) in &self.clusters {
            if child.borrow().containing_vertex(g).is_some() {
                return Some(*v);
            }
        }
        None
    }

    /// Finds the deepest cluster that hosts `g` as a direct vertex, together
    /// with the local handle valid there.
    #[must_use]
    pub fn containing_vertex_graph(&self, g: GlobalVertex) -> Option<(LocalVertex, ClusterRef)> {
        if let Some(v) = self.containing_vertex_shallow(g) {
            return self.self_ref.upgrade().map(|this| (v, this));
        }
        for child in self.clusters.values() {
            let found = child.borrow().containing_vertex_graph(g);
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Returns `true` when `g` exists anywhere in this cluster's subtree.
    #[must_use]
    pub fn has_global_vertex(&self, g: GlobalVertex) -> bool {
        self.containing_vertex(g).is_some()
    }

    /// Finds the local edge of *this* cluster whose slot list carries `ge`.
    #[must_use]
    pub fn containing_edge(&self, ge: GlobalEdgeId) -> Option<LocalEdge> {
        self.graph.edge_indices().find(|e| {
            self.graph
                .edge_weight(*e)
                .is_some_and(|record| record.slots.iter().any(|slot| slot.edge.id == ge))
        })
    }

    /// Finds the cluster in this subtree whose local edge carries `ge`,
    /// together with the local handle valid there.
    #[must_use]
    pub fn containing_edge_graph(&self, ge: GlobalEdgeId) -> Option<(LocalEdge, ClusterRef)> {
        if let Some(e) = self.containing_edge(ge) {
            return self.self_ref.upgrade().map(|this| (e, this));
        }
        for child in self.clusters.values() {
            let found = child.borrow().containing_edge_graph(ge);
            if found.is_some() {
                return found;
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Public lookup surface
    // ------------------------------------------------------------------

    /// Returns the local vertex of this cluster that contains `g`: the
    /// vertex itself, or the subcluster vertex whose subtree hosts it.
    #[must_use]
    pub fn local_vertex(&self, g: GlobalVertex) -> Option<LocalVertex> {
        self.containing_vertex(g)
    }

    /// Returns the hosting cluster of `g` and the local handle valid there.
    #[must_use]
    pub fn local_vertex_graph(&self, g: GlobalVertex) -> Option<(LocalVertex, ClusterRef)> {
        self.containing_vertex_graph(g)
    }

    /// Returns the local edge of this cluster that carries `ge`.
    ///
    /// Fails (returns `None`) when `ge` is carried by a local edge of a
    /// descendant; use [`ClusterGraph::local_edge_graph`] to descend.
    #[must_use]
    pub fn local_edge(&self, ge: GlobalEdgeId) -> Option<LocalEdge> {
        self.containing_edge(ge)
    }

    /// Returns the cluster whose local edge carries `ge`, descending into
    /// subclusters, and the local handle valid there.
    #[must_use]
    pub fn local_edge_graph(&self, ge: GlobalEdgeId) -> Option<(LocalEdge, ClusterRef)> {
        self.containing_edge_graph(ge)
    }

    /// Resolves the child cluster that hosts `g` somewhere in its subtree.
    pub(crate) fn child_containing(&self, g: GlobalVertex) -> Option<(LocalVertex, ClusterRef)> {
        for (v, child) in &self.clusters {
            if child.borrow().containing_vertex(g).is_some() {
                return Some((*v, Rc::clone(child)));
            }
        }
        None
    }
}
