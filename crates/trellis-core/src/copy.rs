// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deep-structural copying of cluster trees.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::graph::{ClusterGraph, ClusterRef, LocalGraph, LocalVertex};
use crate::props::DynObject;
use crate::record::{EdgeRecord, GlobalEdgeSlot, VertexRecord};

impl ClusterGraph {
    /// Reproduces this cluster and its whole subtree inside `dest`, which is
    /// cleared first.
    ///
    /// Global ids, the cluster hierarchy, properties, and iteration order
    /// are preserved; local handles are not. Every stored payload handle is
    /// passed through `map`, which decides between sharing (return a clone
    /// of the handle) and cloning (return a fresh one). The destination tree
    /// runs in copy mode for the duration, so its change markers end up
    /// clear, and its allocator is fast-forwarded past every copied id.
    ///
    /// `dest` must not be part of this cluster's subtree.
    pub fn copy_into(&self, dest: &ClusterRef, map: &mut dyn FnMut(&DynObject) -> DynObject) {
        let mut d = dest.borrow_mut();
        d.set_copy_mode(true);
        d.graph = LocalGraph::default();
        d.clusters.clear();
        d.props = self.props.clone();

        let mut vertex_map: HashMap<LocalVertex, LocalVertex> = HashMap::new();
        for v in self.graph.node_indices() {
            if let Some(record) = self.graph.node_weight(v) {
                let copied = VertexRecord {
                    global: record.global,
                    props: record.props.clone(),
                    objects: record.objects.map_with(map),
                };
                vertex_map.insert(v, d.graph.add_node(copied));
            }
        }

        for e in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(e) else {
                continue;
            };
            let Some(record) = self.graph.edge_weight(e) else {
                continue;
            };
            let (Some(&na), Some(&nb)) = (vertex_map.get(&a), vertex_map.get(&b)) else {
                continue;
            };
            let copied = EdgeRecord {
                props: record.props.clone(),
                slots: record
                    .slots
                    .iter()
                    .map(|slot| GlobalEdgeSlot {
                        edge: slot.edge,
                        objects: slot.objects.map_with(map),
                    })
                    .collect(),
            };
            d.graph.add_edge(na, nb, copied);
        }

        for (v, child) in &self.clusters {
            let Some(&nv) = vertex_map.get(v) else {
                continue;
            };
            let ids = d.ids.clone();
            let copied_child = Rc::new_cyclic(|weak| {
                RefCell::new(Self::with_parts(Rc::downgrade(dest), weak.clone(), ids))
            });
            child.borrow().copy_into(&copied_child, map);
            d.clusters.insert(nv, copied_child);
        }

        d.ids.set_count(self.ids.count());
        d.set_copy_mode(false);
    }
}
