// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types shared across the cluster graph.
use thiserror::Error;

use crate::ident::{GlobalEdgeId, GlobalVertex};

/// Errors emitted by cluster graph operations.
///
/// Detectable precondition failures are reported before any mutation takes
/// place; an operation that returns an error leaves the tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The global vertex was not found in this cluster's subtree.
    #[error("global vertex {0:?} not found in this cluster's subtree")]
    VertexNotFound(GlobalVertex),
    /// The global edge was not found in this cluster's subtree.
    #[error("global edge {0:?} not found in this cluster's subtree")]
    EdgeNotFound(GlobalEdgeId),
    /// The local vertex handle does not name a vertex of this cluster.
    #[error("local vertex is not present in this cluster")]
    LocalVertexNotFound,
    /// The local edge handle does not name an edge of this cluster.
    #[error("local edge is not present in this cluster")]
    LocalEdgeNotFound,
    /// An edge was requested between a vertex and itself.
    #[error("edge endpoints must be distinct")]
    IdenticalEndpoints,
    /// The operation requires a plain vertex but was given a cluster vertex.
    #[error("operation requires a non-cluster vertex")]
    ClusterEndpoint,
    /// The local vertex does not represent a subcluster.
    #[error("local vertex does not represent a subcluster")]
    NotACluster,
    /// The given cluster is not a direct child of this cluster.
    #[error("cluster is not a direct subcluster")]
    NotSubcluster,
    /// The parent cluster has been dropped.
    #[error("parent cluster no longer exists")]
    ParentGone,
    /// Internal invariant violated (graph state corruption).
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

/// Convenience alias for results carrying a [`GraphError`].
pub type GraphResult<T> = Result<T, GraphError>;
