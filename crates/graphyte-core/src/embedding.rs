//! Trained node embeddings and cosine-similarity queries.

use crate::{Error, Features, NodeId, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A scored candidate node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub node: NodeId,
    pub score: f32,
}

/// Anything that can score node pairs by embedding similarity.
///
/// Implemented by [`Embeddings`] directly and by the trained model, which
/// reports [`Error::EmbeddingsNotReady`] until training has finished.
pub trait LinkScorer {
    /// Number of scorable nodes.
    fn num_nodes(&self) -> Result<usize>;

    /// Similarity between `a` and `b`.
    fn similarity(&self, a: NodeId, b: NodeId) -> Result<f32>;

    /// Similarity from `node` to every other node, in ascending node order.
    /// `node` itself is never included.
    fn all_similarities(&self, node: NodeId) -> Result<Vec<Recommendation>>;

    /// The `k` most similar nodes, best first.
    ///
    /// Ties keep ascending node order.
    fn recommendations(&self, node: NodeId, k: usize) -> Result<Vec<Recommendation>> {
        let mut scores = self.all_similarities(node)?;
        rank_descending(&mut scores);
        scores.truncate(k);
        Ok(scores)
    }
}

/// Stable sort by descending score. NaN scores sink to the end.
pub fn rank_descending(scores: &mut [Recommendation]) {
    scores.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
}

/// Cosine similarity of two vectors.
///
/// Returns 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Node-major embedding matrix: row `n` is node `n`'s embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    data: Array2<f32>,
}

impl Embeddings {
    /// Transpose a feature-major matrix into per-node rows.
    pub fn from_features(features: &Features) -> Self {
        Self {
            data: features.as_array().t().as_standard_layout().into_owned(),
        }
    }

    /// Wrap a `(num_nodes, dim)` matrix.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn num_nodes(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// One node's embedding.
    pub fn get(&self, node: NodeId) -> Result<ArrayView1<'_, f32>> {
        self.check(node)?;
        Ok(self.data.row(node))
    }

    /// Inverse of [`to_rows`](Self::to_rows). Rows must share one width.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        Ok(Self::from_features(&Features::from_node_rows(rows)?))
    }

    /// Per-node vectors, for serialization.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.data.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    fn check(&self, node: NodeId) -> Result<()> {
        if node >= self.num_nodes() {
            return Err(Error::InvalidNode {
                node,
                num_nodes: self.num_nodes(),
            });
        }
        Ok(())
    }
}

impl LinkScorer for Embeddings {
    fn num_nodes(&self) -> Result<usize> {
        Ok(self.data.nrows())
    }

    fn similarity(&self, a: NodeId, b: NodeId) -> Result<f32> {
        Ok(cosine_similarity(self.get(a)?, self.get(b)?))
    }

    fn all_similarities(&self, node: NodeId) -> Result<Vec<Recommendation>> {
        let query = self.get(node)?;
        Ok(self
            .data
            .rows()
            .into_iter()
            .enumerate()
            .filter(|&(other, _)| other != node)
            .map(|(other, row)| Recommendation {
                node: other,
                score: cosine_similarity(query, row),
            })
            .collect())
    }
}
