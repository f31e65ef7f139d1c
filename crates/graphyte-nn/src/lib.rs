#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]

//! GraphSAGE-style node embeddings trained for link prediction.
//!
//! ## The Core Intuition
//!
//! A node is described by its own features and by the average of its
//! neighbors' features. Each layer concatenates the two, applies a learned
//! linear map, squashes with a sigmoid and normalizes to unit length:
//!
//! ```text
//! z_v = normalize(σ(W [x_v ; mean_{u ∈ N(v)} x_u]))
//! ```
//!
//! Two such layers are stacked. Training pulls together the endpoints of
//! observed edges and pushes apart the endpoints of non-edges
//! ([Mikolov et al. 2013](https://arxiv.org/abs/1310.4546) negative
//! sampling, applied to graph edges as in
//! [Hamilton et al. 2017](https://arxiv.org/abs/1706.02216)).
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`layer`] | [`SageLayer`] forward and backward |
//! | [`loss`] | negative-sampling loss and embedding gradients |
//! | [`optim`] | gradient clipping and momentum |
//! | [`evaluation`] | AUC, MRR, Hits@K |
//!
//! ## Usage
//!
//! ```rust
//! use graphyte_core::{Features, Graph};
//! use graphyte_nn::{EmbeddingModel, TrainingConfig};
//!
//! let pos = Graph::from_edges(&[(0, 1), (1, 0), (2, 3), (3, 2)]);
//! let neg = Graph::from_edges(&[(0, 3), (1, 2)]);
//! let features = Features::from_node_rows(&[
//!     vec![0.9, 0.1],
//!     vec![0.8, 0.3],
//!     vec![0.2, 0.7],
//!     vec![0.1, 0.9],
//! ])
//! .unwrap();
//!
//! let config = TrainingConfig::default().with_seed(1);
//! let mut model = EmbeddingModel::new(pos, neg, features, config).unwrap();
//! model.train(5).unwrap();
//!
//! let metrics = model.evaluate(&[(0, 1)], &[(0, 3)], 2).unwrap();
//! println!("{}", metrics.summary());
//! ```

mod config;
mod error;
pub mod evaluation;
pub mod layer;
pub mod loss;
mod model;
pub mod optim;

pub use config::{EvalConfig, TrainingConfig};
pub use error::{Error, Result};
pub use evaluation::{LinkMetrics, LinkPredictionEvaluator};
pub use layer::{BackwardStats, LayerOutput, SageLayer};
pub use model::{EmbeddingModel, TrainingReport};
