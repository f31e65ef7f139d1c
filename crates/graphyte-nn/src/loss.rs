//! Negative-sampling link-prediction loss and its embedding gradients.
//!
//! Skip-gram with negative sampling applied to explicit edge sets:
//!
//! ```text
//! L = ( Σ_{(u,v) ∈ E+} -log(σ(clip(z_u·z_v)) + ε)
//!     + Σ_{(u,v) ∈ E-} -Q log(σ(-clip(z_u·z_v)) + ε) ) / (|E+| + |E-|)
//! ```
//!
//! The loss value only drives early stopping and the learning-rate schedule.
//! Gradients come from [`embedding_gradients`], which uses the unclipped
//! dot product and the `(1 - σ)` form for both edge kinds.

use crate::layer::sigmoid;
use graphyte_core::{Features, Graph, NodeId};

/// Dot product of two nodes' embeddings.
pub fn edge_dot(embeddings: &Features, u: NodeId, v: NodeId) -> f32 {
    embeddings.node(u).dot(&embeddings.node(v))
}

/// Loss weights and numerical guards.
#[derive(Debug, Clone, Copy)]
pub struct LossParams {
    /// Weight Q of negative edges.
    pub negative_weight: f32,
    /// Floor inside the logarithm.
    pub epsilon: f32,
    /// Symmetric clip applied to dot products.
    pub logit_clip: f32,
}

impl Default for LossParams {
    fn default() -> Self {
        Self {
            negative_weight: 5.0,
            epsilon: 1e-7,
            logit_clip: 10.0,
        }
    }
}

/// Mean negative-sampling loss over every directed positive and negative
/// edge. Returns 0 when both graphs are empty.
pub fn negative_sampling_loss(
    pos_graph: &Graph,
    neg_graph: &Graph,
    pos_embeddings: &Features,
    neg_embeddings: &Features,
    params: LossParams,
) -> f32 {
    let total = pos_graph.edge_count() + neg_graph.edge_count();
    if total == 0 {
        return 0.0;
    }
    let clip = |x: f32| x.clamp(-params.logit_clip, params.logit_clip);

    let mut loss = 0.0f64;
    for (u, v) in pos_graph.edges() {
        let dot = clip(edge_dot(pos_embeddings, u, v));
        loss -= f64::from((sigmoid(dot) + params.epsilon).ln());
    }
    for (u, v) in neg_graph.edges() {
        let dot = clip(edge_dot(neg_embeddings, u, v));
        loss -= f64::from(params.negative_weight * (sigmoid(-dot) + params.epsilon).ln());
    }

    (loss / total as f64) as f32
}

/// Per-node embedding gradients for one graph.
///
/// For each edge `(u, v)` with `s = σ(scale · z_u·z_v)`, adds
/// `scale (1 - s) z_v` to node `u` and `scale (1 - s) z_u` to node `v`.
/// Use `scale = 1` for positive edges and `scale = -1` for negative edges.
pub fn embedding_gradients(graph: &Graph, embeddings: &Features, scale: f32) -> Features {
    let mut grads = Features::zeros(embeddings.dim(), embeddings.num_nodes());
    let g = grads.as_array_mut();
    for (u, v) in graph.edges() {
        let z_u = embeddings.node(u);
        let z_v = embeddings.node(v);
        let s = sigmoid(scale * z_u.dot(&z_v));
        let coeff = scale * (1.0 - s);
        g.column_mut(u).scaled_add(coeff, &z_v);
        g.column_mut(v).scaled_add(coeff, &z_u);
    }
    grads
}
