//! GraphSAGE-style mean-aggregation layer with a hand-written backward pass.
//!
//! For every node `v` with an adjacency entry:
//!
//! ```text
//! x_v = [ h_v || mean(h_n : n in N(v)) ]          (length 2D)
//! z_v = normalize(sigmoid(W x_v))                  (W is D x 2D)
//! ```
//!
//! Nodes without an adjacency entry get a zero output column.
//!
//! # Backward
//!
//! The weight gradient is accumulated as
//!
//! ```text
//! dW[i][j] += s * dz[i][v] * x_v[j] * sigmoid'(z[i][v])
//! ```
//!
//! with `s = +1` for the positive graph and `s = -1` for the negative graph.
//! `sigmoid'` is evaluated at the produced embedding value, and the
//! Jacobian of the L2 normalization is not modeled. Both are deliberate
//! approximations of the exact derivative.
//!
//! The gradient is clipped to a maximum Frobenius norm and applied with
//! SGD + momentum ([`Momentum`]).
//!
//! # Reference
//!
//! Hamilton et al., "Inductive Representation Learning on Large Graphs",
//! NeurIPS 2017.

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::optim::{clip_by_norm, Momentum};
use graphyte_core::{Features, Graph, NodeId};
use ndarray::{s, Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;
use tracing::debug;

/// Logistic sigmoid.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `sigmoid(x) * (1 - sigmoid(x))`.
pub fn sigmoid_derivative(x: f32) -> f32 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

/// Divide by the Euclidean norm. A zero vector is returned unchanged.
pub fn l2_normalize(v: &mut Array1<f32>) {
    let norm = v.dot(v).sqrt();
    if norm != 0.0 {
        v.mapv_inplace(|x| x / norm);
    }
}

/// Inputs of the most recent forward pass over one graph.
#[derive(Debug, Clone)]
struct GraphActivations {
    /// Nodes processed, in graph order.
    nodes: Vec<NodeId>,
    /// Concatenated `[self || aggregate]` vectors, one row per node.
    inputs: Array2<f32>,
}

#[derive(Debug, Clone)]
struct ActivationCache {
    num_nodes: usize,
    pos: GraphActivations,
    neg: GraphActivations,
}

/// Embeddings produced by one forward pass.
#[derive(Debug, Clone)]
pub struct LayerOutput {
    /// Output over the positive-edge graph.
    pub pos: Features,
    /// Output over the negative-edge graph.
    pub neg: Features,
}

/// Summary of one backward step.
#[derive(Debug, Clone, Copy)]
pub struct BackwardStats {
    /// Gradient norm before clipping.
    pub grad_norm: f32,
    /// Whether clipping rescaled the gradient.
    pub clipped: bool,
}

/// One trainable aggregation layer operating on a positive and a negative
/// edge graph.
///
/// Output width equals input width `D`; the weight matrix is `D x 2D`.
#[derive(Debug, Clone)]
pub struct SageLayer {
    pos_graph: Graph,
    neg_graph: Graph,
    weights: Array2<f32>,
    gradients: Array2<f32>,
    optimizer: Momentum,
    learning_rate: f32,
    decay_rate: f32,
    clip_norm: f32,
    cache: Option<ActivationCache>,
}

impl SageLayer {
    /// Create a layer with uniform `±1/sqrt(2D)` weights.
    pub fn new<R: Rng + ?Sized>(
        pos_graph: &Graph,
        neg_graph: &Graph,
        dim: usize,
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("feature dimension must be non-zero".into()));
        }
        let bound = 1.0 / ((2 * dim) as f32).sqrt();
        let dist = Uniform::new(-bound, bound);
        let weights = Array2::from_shape_fn((dim, 2 * dim), |_| dist.sample(rng));
        Self::with_weights(pos_graph, neg_graph, weights, config)
    }

    /// Create a layer from explicit weights of shape `(D, 2D)`.
    pub fn with_weights(
        pos_graph: &Graph,
        neg_graph: &Graph,
        weights: Array2<f32>,
        config: &TrainingConfig,
    ) -> Result<Self> {
        let (rows, cols) = weights.dim();
        if cols != 2 * rows {
            return Err(Error::DimensionMismatch {
                expected: 2 * rows,
                got: cols,
            });
        }
        Ok(Self {
            pos_graph: pos_graph.clone(),
            neg_graph: neg_graph.clone(),
            gradients: Array2::zeros(weights.dim()),
            weights,
            optimizer: Momentum::new(config.momentum),
            learning_rate: config.learning_rate,
            decay_rate: config.decay_rate,
            clip_norm: config.clip_norm,
            cache: None,
        })
    }

    /// Feature width D.
    pub fn dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Weight matrix of shape `(D, 2D)`.
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Gradient buffer from the last backward step (after clipping).
    pub fn gradients(&self) -> &Array2<f32> {
        &self.gradients
    }

    /// Momentum buffer; `None` until the first backward step.
    pub fn velocity(&self) -> Option<&Array2<f32>> {
        self.optimizer.velocity()
    }

    /// Step size used by the next backward call.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Override the step size, e.g. after a schedule decay.
    pub fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }

    /// Configured decay rate. Not applied by the layer itself.
    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    /// Positive edge graph this layer aggregates over.
    pub fn pos_graph(&self) -> &Graph {
        &self.pos_graph
    }

    /// Negative edge graph this layer aggregates over.
    pub fn neg_graph(&self) -> &Graph {
        &self.neg_graph
    }

    /// Run the layer over both graphs.
    ///
    /// Does not touch the weights. The concatenated inputs are cached for the
    /// next [`backward`](Self::backward) call, replacing any earlier cache.
    pub fn forward(&mut self, features: &Features) -> Result<LayerOutput> {
        if features.dim() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                got: features.dim(),
            });
        }
        let num_nodes = features.num_nodes();
        self.pos_graph.validate(num_nodes)?;
        self.neg_graph.validate(num_nodes)?;

        self.cache = None;
        let (pos, pos_acts) = self.propagate(&self.pos_graph, features);
        let (neg, neg_acts) = self.propagate(&self.neg_graph, features);
        self.cache = Some(ActivationCache {
            num_nodes,
            pos: pos_acts,
            neg: neg_acts,
        });

        Ok(LayerOutput { pos, neg })
    }

    fn propagate(&self, graph: &Graph, features: &Features) -> (Features, GraphActivations) {
        let dim = self.dim();
        let nodes: Vec<NodeId> = graph.nodes().collect();

        // Reads come from `features` only; outputs go to a fresh buffer.
        let results: Vec<(Array1<f32>, Array1<f32>)> = nodes
            .par_iter()
            .map(|&v| {
                let neighbors = graph.neighbors(v);
                let mut input = Array1::<f32>::zeros(2 * dim);
                input.slice_mut(s![..dim]).assign(&features.node(v));
                input.slice_mut(s![dim..]).assign(&features.mean_of(neighbors));
                let mut z = self.weights.dot(&input);
                z.mapv_inplace(sigmoid);
                l2_normalize(&mut z);
                (input, z)
            })
            .collect();

        let mut output = Features::zeros(dim, features.num_nodes());
        let mut inputs = Array2::zeros((nodes.len(), 2 * dim));
        for (row, (&v, (input, z))) in nodes.iter().zip(&results).enumerate() {
            inputs.row_mut(row).assign(input);
            output.assign_node(v, z);
        }

        (output, GraphActivations { nodes, inputs })
    }

    /// Accumulate weight gradients from upstream embedding gradients, clip
    /// them, and apply a momentum update.
    ///
    /// `pos_embeddings`/`neg_embeddings` are this layer's own outputs from the
    /// preceding [`forward`](Self::forward).
    pub fn backward(
        &mut self,
        pos_embeddings: &Features,
        neg_embeddings: &Features,
        d_pos: &Features,
        d_neg: &Features,
    ) -> Result<BackwardStats> {
        let cache = self.cache.as_ref().ok_or(Error::MissingActivations)?;
        for f in [pos_embeddings, neg_embeddings, d_pos, d_neg] {
            if f.dim() != self.weights.nrows() {
                return Err(Error::DimensionMismatch {
                    expected: self.weights.nrows(),
                    got: f.dim(),
                });
            }
            if f.num_nodes() != cache.num_nodes {
                return Err(Error::DimensionMismatch {
                    expected: cache.num_nodes,
                    got: f.num_nodes(),
                });
            }
        }

        self.gradients.fill(0.0);
        for (acts, emb, grad, scale) in [
            (&cache.pos, pos_embeddings, d_pos, 1.0f32),
            (&cache.neg, neg_embeddings, d_neg, -1.0f32),
        ] {
            if acts.nodes.is_empty() {
                continue;
            }
            // delta[r][i] = scale * dz[i][v] * sigmoid'(z[i][v]) for the r-th node v
            let emb = emb.as_array();
            let grad = grad.as_array();
            let delta = Array2::from_shape_fn((acts.nodes.len(), self.weights.nrows()), |(r, i)| {
                let v = acts.nodes[r];
                scale * grad[[i, v]] * sigmoid_derivative(emb[[i, v]])
            });
            // Sum of outer products delta_r (x) input_r.
            self.gradients += &delta.t().dot(&acts.inputs);
        }

        let grad_norm = clip_by_norm(&mut self.gradients, self.clip_norm);
        let clipped = grad_norm > self.clip_norm;
        if clipped {
            debug!(grad_norm, clip_norm = self.clip_norm, "clipped layer gradient");
        }

        self.optimizer
            .step(&mut self.weights, &self.gradients, self.learning_rate);

        Ok(BackwardStats { grad_norm, clipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::frobenius_norm;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn four_node_graphs() -> (Graph, Graph) {
        let pos = Graph::from_edges(&[(0, 1), (1, 2), (2, 3)]);
        let neg = Graph::from_edges(&[(0, 3), (3, 0)]);
        (pos, neg)
    }

    fn four_node_features() -> Features {
        Features::from_node_rows(&[
            vec![0.1, 0.9],
            vec![0.4, 0.2],
            vec![0.7, 0.3],
            vec![0.5, 0.8],
        ])
        .unwrap()
    }

    fn layer(pos: &Graph, neg: &Graph, dim: usize) -> SageLayer {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        SageLayer::new(pos, neg, dim, &TrainingConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
        assert!((sigmoid_derivative(0.0) - 0.25).abs() < 1e-7);
        assert!(sigmoid(50.0) <= 1.0);
        assert!(sigmoid(-50.0) >= 0.0);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let mut v = Array1::<f32>::zeros(3);
        l2_normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));

        let mut v = array![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_weight_init_shape_and_bounds() {
        let (pos, neg) = four_node_graphs();
        let l = layer(&pos, &neg, 8);
        assert_eq!(l.weights().dim(), (8, 16));
        assert_eq!(l.gradients().dim(), (8, 16));
        let bound = 1.0 / 16f32.sqrt();
        assert!(l.weights().iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_with_weights_rejects_bad_shape() {
        let (pos, neg) = four_node_graphs();
        let w = Array2::zeros((2, 3));
        assert!(matches!(
            SageLayer::with_weights(&pos, &neg, w, &TrainingConfig::default()),
            Err(Error::DimensionMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_forward_shape_and_unit_norm() {
        let (pos, neg) = four_node_graphs();
        let features = four_node_features();
        let mut l = layer(&pos, &neg, 2);
        let out = l.forward(&features).unwrap();

        assert_eq!(out.pos.dim(), features.dim());
        assert_eq!(out.pos.num_nodes(), features.num_nodes());
        assert_eq!(out.neg.num_nodes(), features.num_nodes());

        for v in pos.nodes() {
            let z = out.pos.node(v);
            assert!((z.dot(&z).sqrt() - 1.0).abs() < 1e-5);
        }
        for v in neg.nodes() {
            let z = out.neg.node(v);
            assert!((z.dot(&z).sqrt() - 1.0).abs() < 1e-5);
        }
        // Node 3 has no outgoing positive edge: zero column.
        assert!(out.pos.node(3).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_aggregate_is_neighbor_mean() {
        // Weights select only the aggregate half of the input.
        let pos = Graph::from_edges(&[(0, 1), (0, 2)]);
        let neg = Graph::new();
        let weights = array![[0.0f32, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]];
        let mut l = SageLayer::with_weights(&pos, &neg, weights, &TrainingConfig::default()).unwrap();
        let features =
            Features::from_node_rows(&[vec![9.0, -9.0], vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let out = l.forward(&features).unwrap();

        // mean = [0.5, 0.5] -> sigmoid equal in both dims -> 1/sqrt(2) each
        let z0 = out.pos.node(0);
        assert!((z0[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((z0[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let (pos, neg) = four_node_graphs();
        let mut l = layer(&pos, &neg, 3);
        assert!(matches!(
            l.forward(&four_node_features()),
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_forward_rejects_short_node_axis() {
        let (pos, neg) = four_node_graphs();
        let mut l = layer(&pos, &neg, 2);
        let features = Features::zeros(2, 3);
        assert!(matches!(
            l.forward(&features),
            Err(Error::Core(graphyte_core::Error::InvalidNode { node: 3, .. }))
        ));
    }

    #[test]
    fn test_forward_does_not_mutate_weights() {
        let (pos, neg) = four_node_graphs();
        let mut l = layer(&pos, &neg, 2);
        let before = l.weights().clone();
        l.forward(&four_node_features()).unwrap();
        assert_eq!(&before, l.weights());
    }

    #[test]
    fn test_backward_requires_forward() {
        let (pos, neg) = four_node_graphs();
        let mut l = layer(&pos, &neg, 2);
        let z = Features::zeros(2, 4);
        assert!(matches!(
            l.backward(&z, &z, &z, &z),
            Err(Error::MissingActivations)
        ));
    }

    #[test]
    fn test_backward_matches_manual_gradient() {
        let pos = Graph::from_edges(&[(0, 1)]);
        let neg = Graph::new();
        let weights = Array2::zeros((1, 2));
        let config = TrainingConfig::default().with_momentum(0.0).with_learning_rate(1.0);
        let mut l = SageLayer::with_weights(&pos, &neg, weights, &config).unwrap();

        let features = Features::from_node_rows(&[vec![2.0], vec![3.0]]).unwrap();
        let out = l.forward(&features).unwrap();
        // sigmoid(0) = 0.5, normalized -> 1.0
        assert!((out.pos.node(0)[0] - 1.0).abs() < 1e-6);

        let mut d_pos = Features::zeros(1, 2);
        d_pos.set_node(0, &[0.5]).unwrap();
        let d_neg = Features::zeros(1, 2);
        l.backward(&out.pos, &out.neg, &d_pos, &d_neg).unwrap();

        // dW = 0.5 * [2, 3] * sigmoid'(1.0)
        let sd = sigmoid_derivative(1.0);
        assert!((l.gradients()[[0, 0]] - 1.0 * sd).abs() < 1e-6);
        assert!((l.gradients()[[0, 1]] - 1.5 * sd).abs() < 1e-6);
        // No momentum, lr = 1: w = -grad
        assert!((l.weights()[[0, 0]] + 1.0 * sd).abs() < 1e-6);
    }

    #[test]
    fn test_negative_graph_flips_sign() {
        let pos = Graph::new();
        let neg = Graph::from_edges(&[(0, 1)]);
        let config = TrainingConfig::default().with_momentum(0.0);
        let mut l = SageLayer::with_weights(&pos, &neg, Array2::zeros((1, 2)), &config).unwrap();
        let features = Features::from_node_rows(&[vec![2.0], vec![3.0]]).unwrap();
        let out = l.forward(&features).unwrap();

        let mut d_neg = Features::zeros(1, 2);
        d_neg.set_node(0, &[0.5]).unwrap();
        l.backward(&out.pos, &out.neg, &Features::zeros(1, 2), &d_neg)
            .unwrap();
        assert!(l.gradients()[[0, 0]] < 0.0);
    }

    #[test]
    fn test_backward_clips_gradient() {
        let (pos, neg) = four_node_graphs();
        let features = four_node_features();
        let mut l = layer(&pos, &neg, 2);
        let out = l.forward(&features).unwrap();

        let mut huge = Features::zeros(2, 4);
        huge.as_array_mut().fill(1e4);
        let stats = l.backward(&out.pos, &out.neg, &huge, &Features::zeros(2, 4)).unwrap();

        assert!(stats.clipped);
        assert!(stats.grad_norm > 5.0);
        assert!(frobenius_norm(l.gradients()) <= 5.0 + 1e-4);
    }

    #[test]
    fn test_velocity_persists_across_calls() {
        let (pos, neg) = four_node_graphs();
        let features = four_node_features();
        let mut l = layer(&pos, &neg, 2);
        assert!(l.velocity().is_none());

        let mut d = Features::zeros(2, 4);
        d.as_array_mut().fill(0.1);
        let z = Features::zeros(2, 4);

        let out = l.forward(&features).unwrap();
        l.backward(&out.pos, &out.neg, &d, &z).unwrap();
        let v1 = l.velocity().unwrap().clone();

        let out = l.forward(&features).unwrap();
        l.backward(&out.pos, &out.neg, &d, &z).unwrap();
        let v2 = l.velocity().unwrap().clone();

        // Same-direction gradients accumulate velocity.
        assert!(frobenius_norm(&v2) > frobenius_norm(&v1));
    }
}
