//! Two-layer GraphSAGE-style embedding model and its training loop.
//!
//! Each epoch runs both layers over the positive and negative graphs, scores
//! the second layer's output with the negative-sampling loss, pushes the
//! normalized embedding gradients back through both layers, and blends the
//! new positive embeddings into the feature tensor through a skip
//! connection to the initial features.
//!
//! # Example
//!
//! ```rust
//! use graphyte_core::{Features, Graph};
//! use graphyte_nn::{EmbeddingModel, TrainingConfig};
//!
//! let pos = Graph::from_edges(&[(0, 1), (1, 0), (1, 2), (2, 1)]);
//! let neg = Graph::from_edges(&[(0, 2), (2, 0)]);
//! let features = Features::from_node_rows(&[
//!     vec![0.2, 0.8],
//!     vec![0.5, 0.5],
//!     vec![0.9, 0.1],
//! ])
//! .unwrap();
//!
//! let mut model = EmbeddingModel::new(pos, neg, features, TrainingConfig::default()).unwrap();
//! let report = model.train(3).unwrap();
//! assert_eq!(report.loss_history.len(), report.epochs_run);
//!
//! let top = model.get_recommendations(0, 1).unwrap();
//! assert_eq!(top.len(), 1);
//! ```

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::evaluation::{LinkMetrics, LinkPredictionEvaluator};
use crate::layer::SageLayer;
use crate::loss::{embedding_gradients, negative_sampling_loss, LossParams};
use graphyte_core::{Edge, Embeddings, Features, Graph, LinkScorer, NodeId, Recommendation};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

/// Outcome of a [`EmbeddingModel::train`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Loss of every epoch that ran, in order.
    pub loss_history: Vec<f32>,
    pub epochs_run: usize,
    /// True when training ended through the patience check.
    pub early_stopped: bool,
    pub best_loss: f32,
    /// Learning rate after the last epoch's adjustment.
    pub final_learning_rate: f32,
}

impl TrainingReport {
    /// Loss of the last epoch, if any ran.
    pub fn final_loss(&self) -> Option<f32> {
        self.loss_history.last().copied()
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Node embedding model with two stacked aggregation layers.
///
/// Layers are created once and keep their weights and momentum across
/// epochs and across repeated `train` calls.
#[derive(Debug, Clone)]
pub struct EmbeddingModel {
    pos_graph: Graph,
    neg_graph: Graph,
    features: Features,
    layer1: SageLayer,
    layer2: SageLayer,
    config: TrainingConfig,
    learning_rate: f32,
    embeddings: Option<Embeddings>,
}

impl EmbeddingModel {
    /// Build a model over a positive and a negative edge graph.
    ///
    /// Every node referenced by either graph must have a column in
    /// `features`. Weights are drawn from a generator seeded with
    /// `config.seed`.
    pub fn new(
        pos_graph: Graph,
        neg_graph: Graph,
        features: Features,
        config: TrainingConfig,
    ) -> Result<Self> {
        config.validate()?;
        pos_graph.validate(features.num_nodes())?;
        neg_graph.validate(features.num_nodes())?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let dim = features.dim();
        let layer1 = SageLayer::new(&pos_graph, &neg_graph, dim, &config, &mut rng)?;
        let layer2 = SageLayer::new(&pos_graph, &neg_graph, dim, &config, &mut rng)?;

        debug!(
            dim,
            nodes = features.num_nodes(),
            pos_edges = pos_graph.edge_count(),
            neg_edges = neg_graph.edge_count(),
            "created embedding model"
        );

        Ok(Self {
            pos_graph,
            neg_graph,
            features,
            layer1,
            layer2,
            learning_rate: config.learning_rate,
            config,
            embeddings: None,
        })
    }

    /// Train for up to `epochs` epochs, then generate embeddings.
    ///
    /// Stops early once the loss has failed to beat the best seen loss by
    /// more than `min_delta` for `patience` consecutive epochs. The epoch
    /// that triggers the stop still updates weights and features.
    pub fn train(&mut self, epochs: usize) -> Result<TrainingReport> {
        self.train_with(epochs, |_, _| {})
    }

    /// [`train`](Self::train) with a callback invoked after every epoch with
    /// the 1-based epoch number and its loss.
    pub fn train_with<F>(&mut self, epochs: usize, mut on_epoch: F) -> Result<TrainingReport>
    where
        F: FnMut(usize, f32),
    {
        let _span = info_span!("train", epochs).entered();
        let initial = self.features.clone();
        let params = LossParams {
            negative_weight: self.config.negative_weight,
            epsilon: self.config.epsilon,
            logit_clip: self.config.logit_clip,
        };
        let total_edges = self.pos_graph.edge_count() + self.neg_graph.edge_count();
        let batch_scale = if total_edges == 0 {
            0.0
        } else {
            1.0 / total_edges as f32
        };

        self.embeddings = None;
        let mut loss_history = Vec::with_capacity(epochs);
        let mut best_loss = f32::INFINITY;
        let mut prev_loss = f32::INFINITY;
        let mut stale_epochs = 0usize;
        let mut early_stopped = false;

        for epoch in 1..=epochs {
            self.layer1.set_learning_rate(self.learning_rate);
            self.layer2.set_learning_rate(self.learning_rate);

            let out1 = self.layer1.forward(&self.features)?;
            let out2 = self.layer2.forward(&out1.pos)?;

            let loss = negative_sampling_loss(
                &self.pos_graph,
                &self.neg_graph,
                &out2.pos,
                &out2.neg,
                params,
            );
            loss_history.push(loss);

            if loss < best_loss - self.config.min_delta {
                best_loss = loss;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
            }

            let mut d_pos = embedding_gradients(&self.pos_graph, &out2.pos, 1.0);
            let mut d_neg = embedding_gradients(&self.neg_graph, &out2.neg, -1.0);
            d_pos.scale(batch_scale);
            d_neg.scale(batch_scale);

            let stats2 = self.layer2.backward(&out2.pos, &out2.neg, &d_pos, &d_neg)?;
            let stats1 = self.layer1.backward(&out1.pos, &out1.neg, &d_pos, &d_neg)?;

            let mut next = out2.pos;
            next.blend_with(&initial, self.config.skip_weight)?;
            self.features = next;

            if loss > prev_loss {
                self.learning_rate *= self.config.lr_decay;
            }
            prev_loss = loss;

            info!(
                epoch,
                loss,
                learning_rate = self.learning_rate,
                grad_norm_1 = stats1.grad_norm,
                grad_norm_2 = stats2.grad_norm,
                "epoch complete"
            );
            on_epoch(epoch, loss);

            if stale_epochs >= self.config.patience {
                info!(epoch, best_loss, "early stopping");
                early_stopped = true;
                break;
            }
        }

        self.generate_embeddings();

        Ok(TrainingReport {
            epochs_run: loss_history.len(),
            loss_history,
            early_stopped,
            best_loss,
            final_learning_rate: self.learning_rate,
        })
    }

    /// Rebuild the node-major embedding table from the current features.
    pub fn generate_embeddings(&mut self) -> &Embeddings {
        self.embeddings.insert(Embeddings::from_features(&self.features))
    }

    /// Trained embeddings, or [`graphyte_core::Error::EmbeddingsNotReady`].
    pub fn embeddings(&self) -> graphyte_core::Result<&Embeddings> {
        self.embeddings
            .as_ref()
            .ok_or(graphyte_core::Error::EmbeddingsNotReady)
    }

    /// The `k` most similar nodes to `node`, best first.
    pub fn get_recommendations(&self, node: NodeId, k: usize) -> Result<Vec<Recommendation>> {
        Ok(self.recommendations(node, k)?)
    }

    /// Similarity from `node` to every other node, in node order.
    pub fn get_all_similarities(&self, node: NodeId) -> Result<Vec<Recommendation>> {
        Ok(self.all_similarities(node)?)
    }

    /// Rank-based link prediction metrics on held-out edges.
    pub fn evaluate(&self, pos_edges: &[Edge], neg_edges: &[Edge], k: usize) -> Result<LinkMetrics> {
        Ok(LinkPredictionEvaluator::new(k).evaluate(self, pos_edges, neg_edges)?)
    }

    /// Current feature tensor.
    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn layers(&self) -> (&SageLayer, &SageLayer) {
        (&self.layer1, &self.layer2)
    }

    pub fn pos_graph(&self) -> &Graph {
        &self.pos_graph
    }

    pub fn neg_graph(&self) -> &Graph {
        &self.neg_graph
    }

    /// Swap in a new positive graph, e.g. after adding edges.
    ///
    /// Both layers pick up the new graph and keep their weights; momentum
    /// restarts from zero. Existing embeddings are dropped.
    pub fn replace_pos_graph(&mut self, graph: &Graph) -> Result<()> {
        graph.validate(self.features.num_nodes())?;
        self.pos_graph.replace_with(graph);
        self.layer1 = self.rebuild_layer(&self.layer1)?;
        self.layer2 = self.rebuild_layer(&self.layer2)?;
        self.embeddings = None;
        Ok(())
    }

    fn rebuild_layer(&self, layer: &SageLayer) -> Result<SageLayer> {
        SageLayer::with_weights(
            &self.pos_graph,
            &self.neg_graph,
            layer.weights().clone(),
            &self.config,
        )
    }
}

impl LinkScorer for EmbeddingModel {
    fn num_nodes(&self) -> graphyte_core::Result<usize> {
        Ok(self.embeddings()?.num_nodes())
    }

    fn similarity(&self, a: NodeId, b: NodeId) -> graphyte_core::Result<f32> {
        self.embeddings()?.similarity(a, b)
    }

    fn all_similarities(&self, node: NodeId) -> graphyte_core::Result<Vec<Recommendation>> {
        self.embeddings()?.all_similarities(node)
    }
}
