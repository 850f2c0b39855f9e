// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

mod common;

use common::Recorder;
use trellis_core::{ClusterGraph, GraphError};

#[test]
fn removing_a_cluster_cascades_through_its_subtree_and_upstream_edges() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    // b stays in the root; a and c live in the subcluster, each connected
    // to b through the aggregated boundary edge.
    let (a, ga) = r.add_vertex();
    let (_b, gb) = r.add_vertex();
    let (child, cluster_vertex) = r.create_cluster();
    r.move_to_subcluster(a, cluster_vertex).unwrap();
    let (_, gc) = child.borrow_mut().add_vertex();

    let ab = r.add_edge_global(ga, gb).unwrap();
    let cb = r.add_edge_global(gc, gb).unwrap();
    assert_eq!(r.edge_count(), 1, "both boundary edges aggregate on one local edge");

    let mut seen = Recorder::default();
    r.remove_cluster_with(&child, &mut seen).unwrap();

    assert_eq!(seen.clusters.len(), 1);
    assert!(ClusterGraph::same_cluster(&seen.clusters[0], &child));
    let mut vertices: Vec<_> = seen.vertices.iter().map(|v| v.0).collect();
    vertices.sort_unstable();
    assert_eq!(vertices, vec![ga.0, gc.0]);
    let mut edges: Vec<_> = seen.edges.iter().map(|e| e.id.0).collect();
    edges.sort_unstable();
    assert_eq!(edges, vec![ab.edge.id.0, cb.edge.id.0]);

    assert_eq!(r.vertex_count(), 1, "only b remains");
    assert_eq!(r.edge_count(), 0);
    assert_eq!(r.cluster_count(), 0);
    assert_eq!(r.containing_vertex(gb).map(|v| r.global_vertex(v).unwrap()), Some(gb));
    assert!(r.containing_vertex(ga).is_none());
}

#[test]
fn cluster_functor_sees_nested_clusters_before_their_contents() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (outer, outer_vertex) = r.create_cluster();
    let (inner, _) = outer.borrow_mut().create_cluster();
    let (_, g_deep) = inner.borrow_mut().add_vertex();

    let mut seen = Recorder::default();
    r.remove_cluster_at_with(outer_vertex, &mut seen).unwrap();

    assert_eq!(seen.clusters.len(), 2);
    assert!(ClusterGraph::same_cluster(&seen.clusters[0], &outer));
    assert!(ClusterGraph::same_cluster(&seen.clusters[1], &inner));
    assert_eq!(seen.vertices, vec![g_deep]);
}

#[test]
fn clear_clusters_removes_every_subcluster() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    r.create_cluster();
    r.create_cluster();
    let (_, g) = r.add_vertex();
    assert_eq!(r.cluster_count(), 2);

    r.clear_clusters();
    assert_eq!(r.cluster_count(), 0);
    assert_eq!(r.vertex_count(), 1, "plain vertices survive");
    assert!(r.containing_vertex(g).is_some());
}

#[test]
fn removing_a_global_vertex_cleans_every_level() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, ga) = r.add_vertex();
    let (b, gb) = r.add_vertex();
    let (child, cluster_vertex) = r.create_cluster();
    r.move_to_subcluster(a, cluster_vertex).unwrap();
    let (_, gc) = child.borrow_mut().add_vertex();

    // Two boundary edges touching a, one internal to the subcluster, and
    // one edge that must survive.
    let ab1 = r.add_edge_global(ga, gb).unwrap();
    let ab2 = r.add_edge_global(ga, gb).unwrap();
    let ac = r.add_edge_global(ga, gc).unwrap();
    let cb = r.add_edge_global(gc, gb).unwrap();

    let mut dropped = Vec::new();
    r.remove_vertex_global_with(ga, &mut |e| dropped.push(e.id.0)).unwrap();

    dropped.sort_unstable();
    let mut expected = vec![ab1.edge.id.0, ab2.edge.id.0, ac.edge.id.0];
    expected.sort_unstable();
    assert_eq!(dropped, expected, "functor ran exactly once per edge touching a");

    assert!(r.containing_vertex(ga).is_none());
    assert!(!child.borrow().has_global_vertex(ga));

    // No surviving local edge references a's global id anywhere.
    for e in r.local_edges().collect::<Vec<_>>() {
        for ge in r.global_edges(e).unwrap() {
            assert!(!ge.touches(ga));
        }
    }
    let cg = child.borrow();
    for e in cg.local_edges().collect::<Vec<_>>() {
        for ge in cg.global_edges(e).unwrap() {
            assert!(!ge.touches(ga));
        }
    }
    drop(cg);

    // The c-b boundary edge survived on the aggregated local edge.
    let surviving = r.local_edge(cb.edge.id).expect("c-b still routed here");
    let (u, v) = r.endpoints(surviving).unwrap();
    assert!(u == cluster_vertex || v == cluster_vertex);
    assert!(u == b || v == b);
}

#[test]
fn removing_a_global_edge_drops_empty_local_edges() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, _) = r.add_vertex();
    let (b, _) = r.add_vertex();
    let (e, first) = r.add_edge(a, b).unwrap();
    let (_, second) = r.add_edge(a, b).unwrap();

    r.remove_edge(first.id).unwrap();
    assert_eq!(r.global_edge_count(e).unwrap(), 1);

    r.remove_edge(second.id).unwrap();
    assert_eq!(r.edge_count(), 0, "last slot removes the local edge");

    match r.remove_edge(second.id) {
        Err(GraphError::EdgeNotFound(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn removing_a_global_edge_descends_into_subclusters() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (child, _) = r.create_cluster();
    let (ga, gb) = {
        let mut c = child.borrow_mut();
        (c.add_vertex().1, c.add_vertex().1)
    };
    let addition = r.add_edge_global(ga, gb).unwrap();
    assert!(!addition.in_scope);

    r.remove_edge(addition.edge.id).unwrap();
    assert_eq!(child.borrow().edge_count(), 0);
}

#[test]
fn removing_a_local_edge_invokes_the_functor_per_slot() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, _) = r.add_vertex();
    let (b, _) = r.add_vertex();
    let (e, first) = r.add_edge(a, b).unwrap();
    let (_, second) = r.add_edge(a, b).unwrap();

    let mut seen = Vec::new();
    r.remove_local_edge_with(e, &mut |ge| seen.push(ge.id)).unwrap();
    assert_eq!(seen, vec![first.id, second.id]);
    assert_eq!(r.edge_count(), 0);
}
