//! Dense per-node feature storage.
//!
//! Features are held feature-major: one row per feature dimension, one
//! column per node id. This is a `[dim][1][node]` tensor with the singleton
//! middle axis dropped.

use crate::{Error, NodeId, Result};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

/// Feature matrix of shape `(dim, num_nodes)`.
///
/// Layer outputs (embeddings mid-training) use the same type and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    data: Array2<f32>,
}

impl Features {
    /// All-zero features for `num_nodes` nodes of width `dim`.
    pub fn zeros(dim: usize, num_nodes: usize) -> Self {
        Self {
            data: Array2::zeros((dim, num_nodes)),
        }
    }

    /// Wrap an existing `(dim, num_nodes)` matrix.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Build from node-major rows (`rows[node][feature]`).
    pub fn from_node_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dim = rows.first().map_or(0, Vec::len);
        let mut features = Self::zeros(dim, rows.len());
        for (node, row) in rows.iter().enumerate() {
            features.set_node(node, row)?;
        }
        Ok(features)
    }

    /// Feature dimensionality D.
    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    /// Length of the node axis.
    pub fn num_nodes(&self) -> usize {
        self.data.ncols()
    }

    /// Column view for one node.
    ///
    /// # Panics
    /// If `node >= num_nodes()`. Graphs are validated against the node axis
    /// before any layer touches features.
    pub fn node(&self, node: NodeId) -> ArrayView1<'_, f32> {
        self.data.column(node)
    }

    /// Overwrite one node's feature vector.
    pub fn set_node(&mut self, node: NodeId, values: &[f32]) -> Result<()> {
        if node >= self.num_nodes() {
            return Err(Error::InvalidNode {
                node,
                num_nodes: self.num_nodes(),
            });
        }
        if values.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                got: values.len(),
            });
        }
        self.data
            .column_mut(node)
            .assign(&ArrayView1::from(values));
        Ok(())
    }

    /// Write an owned vector into a node's column.
    pub fn assign_node(&mut self, node: NodeId, values: &Array1<f32>) {
        self.data.column_mut(node).assign(values);
    }

    /// Elementwise mean of the given nodes' features.
    ///
    /// An empty neighborhood yields the zero vector.
    pub fn mean_of(&self, nodes: &[NodeId]) -> Array1<f32> {
        let mut acc = Array1::zeros(self.dim());
        if nodes.is_empty() {
            return acc;
        }
        for &n in nodes {
            acc += &self.data.column(n);
        }
        acc / nodes.len() as f32
    }

    /// `self = weight * self + (1 - weight) * other`, elementwise.
    pub fn blend_with(&mut self, other: &Features, weight: f32) -> Result<()> {
        if self.dim() != other.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        if self.num_nodes() != other.num_nodes() {
            return Err(Error::DimensionMismatch {
                expected: self.num_nodes(),
                got: other.num_nodes(),
            });
        }
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|a, &b| *a = weight * *a + (1.0 - weight) * b);
        Ok(())
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&mut self, factor: f32) {
        self.data.mapv_inplace(|x| x * factor);
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn as_array_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}
