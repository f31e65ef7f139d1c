//! Directed adjacency lists keyed by node id.

use crate::{Error, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph stored as `node -> ordered neighbor list`.
///
/// Only nodes with at least one outgoing edge appear as keys. Neighbor lists
/// keep insertion order and may contain duplicates; aggregation over them is
/// a mean, so order never changes results. Keys iterate in ascending id
/// order, which keeps training deterministic for a fixed seed.
///
/// A reciprocal edge is never added implicitly; see
/// [`crate::dataset::symmetrize`] for the undirected case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
    edge_count: usize,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from directed `(source, target)` pairs.
    pub fn from_edges(edges: &[(NodeId, NodeId)]) -> Self {
        let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for &(u, v) in edges {
            adjacency.entry(u).or_default().push(v);
        }
        Self {
            adjacency,
            edge_count: edges.len(),
        }
    }

    /// Neighbors of `node`. Isolated or unknown nodes yield an empty slice.
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes that have an adjacency entry, in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// `(node, neighbors)` pairs in ascending node order.
    pub fn adjacency(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> + '_ {
        self.adjacency.iter().map(|(&n, ns)| (n, ns.as_slice()))
    }

    /// Every directed edge, grouped by source.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(&u, ns)| ns.iter().map(move |&v| (u, v)))
    }

    /// Number of directed edges (duplicates counted).
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of nodes with an adjacency entry.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Largest id referenced as a source or a target.
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.edges().map(|(u, v)| u.max(v)).max()
    }

    /// Check every referenced id is below `num_nodes`.
    pub fn validate(&self, num_nodes: usize) -> Result<()> {
        match self.max_node_id() {
            Some(max) if max >= num_nodes => Err(Error::InvalidNode {
                node: max,
                num_nodes,
            }),
            _ => Ok(()),
        }
    }

    /// Replace this graph with a deep copy of `other`.
    pub fn replace_with(&mut self, other: &Graph) {
        self.clone_from(other);
    }

    /// Summary statistics. Memory use is bounded by the edge count, not by
    /// the largest id.
    pub fn stats(&self) -> GraphStats {
        let max_node_id = self.max_node_id();
        let touched: BTreeSet<NodeId> = self.edges().flat_map(|(u, v)| [u, v]).collect();
        // `max` is touched, so this cannot underflow.
        let isolated_nodes = max_node_id.map_or(0, |max| max - (touched.len() - 1));
        GraphStats {
            source_nodes: self.node_count(),
            edge_count: self.edge_count,
            max_node_id,
            isolated_nodes,
            avg_out_degree: if self.adjacency.is_empty() {
                0.0
            } else {
                self.edge_count as f64 / self.adjacency.len() as f64
            },
        }
    }
}

/// Summary statistics for a [`Graph`].
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    /// Nodes with at least one outgoing edge.
    pub source_nodes: usize,
    pub edge_count: usize,
    pub max_node_id: Option<NodeId>,
    /// Ids in `[0, max_node_id]` touched by no edge.
    pub isolated_nodes: usize,
    pub avg_out_degree: f64,
}
