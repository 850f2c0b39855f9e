// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

mod common;

use common::{Equation, Weight};
use std::rc::Rc;
use trellis_core::{ClusterGraph, GlobalEdgeId, GraphError};

#[test]
fn edges_across_a_cluster_boundary_aggregate_on_one_local_edge() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, ga) = r.add_vertex();
    let (_b, gb) = r.add_vertex();
    let (child, cluster_vertex) = r.create_cluster();
    let a_in_child = r.move_to_subcluster(a, cluster_vertex).unwrap();
    assert_eq!(child.borrow().global_vertex(a_in_child).unwrap(), ga);

    let first = r.add_edge_global(ga, gb).unwrap();
    assert!(first.in_scope);
    assert_eq!(r.edge_count(), 1);
    assert_eq!(r.global_edge_count(first.local).unwrap(), 1);

    let second = r.add_edge_global(ga, gb).unwrap();
    assert!(second.in_scope);
    assert_eq!(second.local, first.local, "same routed pair, same local edge");
    assert_ne!(second.edge, first.edge);
    assert_eq!(r.edge_count(), 1);
    assert_eq!(r.global_edge_count(first.local).unwrap(), 2);

    // The aggregated edge runs between the subcluster vertex and b.
    let (u, v) = r.endpoints(first.local).unwrap();
    assert_eq!(r.containing_vertex(ga), Some(cluster_vertex));
    assert!(u == cluster_vertex || v == cluster_vertex);

    // Aggregation lists iterate in insertion order.
    let ids: Vec<_> = r.global_edges(first.local).unwrap().map(|e| e.id).collect();
    assert_eq!(ids, vec![first.edge.id, second.edge.id]);
}

#[test]
fn edge_internal_to_a_subcluster_is_created_there_and_flagged_out_of_scope() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, ga) = r.add_vertex();
    let (_b, _gb) = r.add_vertex();
    let (child, cluster_vertex) = r.create_cluster();
    r.move_to_subcluster(a, cluster_vertex).unwrap();
    let (_, gc) = child.borrow_mut().add_vertex();

    let edges_in_root = r.edge_count();
    let addition = r.add_edge_global(ga, gc).unwrap();
    assert!(!addition.in_scope, "handle belongs to the subcluster");
    assert_eq!(r.edge_count(), edges_in_root, "nothing was added here");

    let c = child.borrow();
    assert_eq!(c.edge_count(), 1);
    assert_eq!(c.global_edge_count(addition.local).unwrap(), 1);
    assert_eq!(c.local_edge(addition.edge.id), Some(addition.local));
}

#[test]
fn endpoint_consistency_holds_for_every_aggregated_edge() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, ga) = r.add_vertex();
    let (_b, gb) = r.add_vertex();
    let (_c, gc) = r.add_vertex();
    let (_child, cluster_vertex) = r.create_cluster();
    r.move_to_subcluster(a, cluster_vertex).unwrap();

    r.add_edge_global(ga, gb).unwrap();
    r.add_edge_global(ga, gc).unwrap();
    r.add_edge_global(gb, gc).unwrap();

    for e in r.local_edges().collect::<Vec<_>>() {
        let (u, v) = r.endpoints(e).unwrap();
        for ge in r.global_edges(e).unwrap() {
            let cu = r.containing_vertex(ge.source).unwrap();
            let cv = r.containing_vertex(ge.target).unwrap();
            assert_ne!(cu, cv);
            assert!((cu == u && cv == v) || (cu == v && cv == u));
        }
    }
}

#[test]
fn local_edge_creation_rejects_bad_endpoints() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, _) = r.add_vertex();
    let (_child, cluster_vertex) = r.create_cluster();

    match r.add_edge(a, a) {
        Err(GraphError::IdenticalEndpoints) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    match r.add_edge(a, cluster_vertex) {
        Err(GraphError::ClusterEndpoint) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(r.edge_count(), 0, "failed creation must not mutate");
}

#[test]
fn global_edge_creation_rejects_unknown_and_identical_endpoints() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (_a, ga) = r.add_vertex();
    match r.add_edge_global(ga, ga) {
        Err(GraphError::IdenticalEndpoints) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    match r.add_edge_global(ga, trellis_core::GlobalVertex(9999)) {
        Err(GraphError::VertexNotFound(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn global_edge_objects_address_individual_slots() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, ga) = r.add_vertex();
    let (_b, gb) = r.add_vertex();
    let (_child, cluster_vertex) = r.create_cluster();
    r.move_to_subcluster(a, cluster_vertex).unwrap();
    let first = r.add_edge_global(ga, gb).unwrap();
    let second = r.add_edge_global(ga, gb).unwrap();
    assert_eq!(second.local, first.local);

    r.set_copy_mode(false);
    assert!(!r.is_changed());

    r.set_global_edge_object::<Equation>(first.edge.id, Rc::new("distance".to_owned()))
        .unwrap();
    r.set_global_edge_object::<Equation>(second.edge.id, Rc::new("angle".to_owned()))
        .unwrap();
    assert!(r.is_changed(), "installing a payload is a mutation");

    // Each slot keeps its own payload.
    let on_first = r.global_edge_object::<Equation>(first.edge.id).unwrap().unwrap();
    let on_second = r.global_edge_object::<Equation>(second.edge.id).unwrap().unwrap();
    assert_eq!(*on_first, "distance");
    assert_eq!(*on_second, "angle");

    // The local-edge shortcut reads slot 0 only; the iterator sees all slots.
    let via_shortcut = r.edge_object::<Equation>(first.local).unwrap().unwrap();
    assert_eq!(*via_shortcut, "distance");
    let all: Vec<Option<String>> = r
        .edge_objects::<Equation>(first.local)
        .unwrap()
        .map(|slot| slot.map(|payload| (*payload).clone()))
        .collect();
    assert_eq!(all, vec![Some("distance".to_owned()), Some("angle".to_owned())]);

    match r.set_global_edge_object::<Equation>(GlobalEdgeId(9999), Rc::new(String::new())) {
        Err(GraphError::EdgeNotFound(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn global_edge_properties_alias_the_holding_local_edge() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, ga) = r.add_vertex();
    let (_b, gb) = r.add_vertex();
    let (_child, cluster_vertex) = r.create_cluster();
    r.move_to_subcluster(a, cluster_vertex).unwrap();
    let first = r.add_edge_global(ga, gb).unwrap();
    let second = r.add_edge_global(ga, gb).unwrap();

    r.set_copy_mode(false);
    r.set_global_edge_property::<Weight>(first.edge.id, 4.0).unwrap();
    assert!(r.is_changed(), "writing a property is a mutation");

    // Properties live per local edge, so every aggregated global edge
    // answers with the shared value.
    assert_eq!(r.global_edge_property::<Weight>(first.edge.id).unwrap(), 4.0);
    assert_eq!(r.global_edge_property::<Weight>(second.edge.id).unwrap(), 4.0);
    assert_eq!(r.edge_property::<Weight>(first.local).unwrap(), 4.0);

    match r.set_global_edge_property::<Weight>(GlobalEdgeId(9999), 1.0) {
        Err(GraphError::EdgeNotFound(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn parallel_local_edges_are_never_created() {
    let root = ClusterGraph::new_root();
    let mut r = root.borrow_mut();

    let (a, _) = r.add_vertex();
    let (b, _) = r.add_vertex();
    let (e1, _) = r.add_edge(a, b).unwrap();
    let (e2, _) = r.add_edge(a, b).unwrap();
    let (e3, _) = r.add_edge(b, a).unwrap();

    assert_eq!(e1, e2);
    assert_eq!(e1, e3, "direction is informational only");
    assert_eq!(r.edge_count(), 1);
    assert_eq!(r.global_edge_count(e1).unwrap(), 3);
}
