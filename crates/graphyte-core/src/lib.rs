#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

//! Core types for graphyte.
//!
//! - [`Graph`] - directed adjacency lists (positive or negative edge graph)
//! - [`Features`] - dense feature-major node feature matrix
//! - [`Embeddings`] - node-major trained embeddings with cosine similarity
//! - [`LinkScorer`] - similarity queries shared by embeddings and models
//! - [`dataset`] - edge/feature loading, splitting, negative edges
//!
//! # Example
//!
//! ```rust
//! use graphyte_core::{Embeddings, Features, Graph, LinkScorer};
//!
//! let graph = Graph::from_edges(&[(0, 1), (1, 2)]);
//! assert_eq!(graph.neighbors(0), &[1]);
//! assert!(graph.neighbors(2).is_empty());
//!
//! let features = Features::from_node_rows(&[
//!     vec![1.0, 0.0],
//!     vec![0.9, 0.1],
//!     vec![0.0, 1.0],
//! ]).unwrap();
//! let embeddings = Embeddings::from_features(&features);
//! let top = embeddings.recommendations(0, 1).unwrap();
//! assert_eq!(top[0].node, 1);
//! ```

pub mod dataset;
mod embedding;
mod error;
mod features;
mod graph;

pub use dataset::Edge;
pub use embedding::{cosine_similarity, rank_descending, Embeddings, LinkScorer, Recommendation};
pub use error::{Error, Result};
pub use features::Features;
pub use graph::{Graph, GraphStats};

/// Node identifier. Valid ids are `[0, num_nodes)`.
pub type NodeId = usize;
