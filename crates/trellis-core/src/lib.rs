// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! trellis-core: hierarchical cluster graph for geometric constraint
//! decomposition.
//!
//! The cluster graph is the data-structural core a dimensional constraint
//! solver operates on: geometric entities are vertices, constraints are
//! edges, and a subgraph can be *clustered* into a single vertex of its
//! enclosing graph, recursively. Rigid subsystems are isolated that way,
//! solved independently, and re-composed.
//!
//! What the crate provides:
//!
//! - a dual identity scheme: stable tree-wide **global** ids next to cheap
//!   positional **local** handles ([`GlobalVertex`], [`GlobalEdge`],
//!   [`LocalVertex`], [`LocalEdge`]);
//! - **edge aggregation** across cluster boundaries: one local edge carries
//!   every logical edge routed through the same pair of endpoints;
//! - **vertex migration** between clusters ([`ClusterGraph::move_to_subcluster`],
//!   [`ClusterGraph::move_to_parent`]) that rewires all incident edges while
//!   payloads travel with the entity;
//! - typed, kind-keyed **property and object storage** on every vertex,
//!   edge, and cluster ([`PropMap`], [`ObjMap`]);
//! - recursive subtree removal and deep copies with payload mapping.
//!
//! Payload semantics are the solver's concern; the graph stores opaque
//! shared handles and never interprets them. The tree is single-threaded:
//! concurrent readers are fine on a quiescent tree, mutation needs exclusive
//! access to the whole tree.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod copy;
mod error;
mod graph;
mod ident;
mod mutate;
mod props;
mod record;
mod resolve;

// Re-exports for stable public API
pub use error::{GraphError, GraphResult};
pub use graph::{ClusterGraph, ClusterRef, LocalEdge, LocalVertex, ObjectVisitor};
pub use ident::{GlobalEdge, GlobalEdgeId, GlobalVertex, IdGen, LAST_RESERVED_ID};
pub use mutate::{ClusterVisitor, EdgeAddition};
pub use props::{
    Changed, DynObject, EdgeIndex, ObjMap, ObjectKind, PropMap, PropertyKind, VertexIndex,
};
pub use record::{EdgeRecord, GlobalEdgeSlot, VertexRecord};
