//! Ranking evaluation for link prediction on learned embeddings.
//!
//! # Protocol
//!
//! For each held-out positive edge `(u, v)`, every node other than `u` is a
//! candidate; `v` is ranked by cosine similarity to `u` and contributes to
//! MRR and Hits@K. Negative edges only contribute their `u -> v` score to
//! the AUC pool.
//!
//! | Metric | Range | Description |
//! |--------|-------|-------------|
//! | AUC | [0, 1] | P(score(pos) > score(neg)), rank-sum form |
//! | MRR | (0, 1] | Mean of 1/rank over positive edges |
//! | Hits@K | [0, 1] | Fraction of positive edges with rank <= K |
//!
//! Ranks are pessimistic: a candidate only outranks the target when its
//! score is strictly higher.

use crate::config::EvalConfig;
use graphyte_core::{Edge, LinkScorer, Result};
use serde::{Deserialize, Serialize};

/// Link prediction metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    /// Area under the ROC curve over pooled positive and negative scores.
    pub auc: f64,
    /// Mean Reciprocal Rank: E\[1/rank\]
    pub mrr: f64,
    /// Mean Rank: E\[rank\]
    pub mean_rank: f64,
    /// P(rank <= k)
    pub hits_at_k: f64,
    /// Cut-off used for `hits_at_k`.
    pub k: usize,
    /// Positive test edges evaluated.
    pub num_positive: usize,
    /// Negative test edges evaluated.
    pub num_negative: usize,
}

impl LinkMetrics {
    /// Format as summary string.
    pub fn summary(&self) -> String {
        format!(
            "AUC: {:.4} | MRR: {:.4} | MR: {:.1} | H@{}: {:.3} (pos={}, neg={})",
            self.auc,
            self.mrr,
            self.mean_rank,
            self.k,
            self.hits_at_k,
            self.num_positive,
            self.num_negative
        )
    }
}

/// Rank of `target` among `scores`: one plus the number strictly above it.
pub fn compute_rank(target: f32, scores: impl IntoIterator<Item = f32>) -> usize {
    1 + scores.into_iter().filter(|&s| s > target).count()
}

/// ROC AUC via the Mann-Whitney rank-sum identity.
///
/// `scored` holds `(score, is_positive)` pairs. Scores are ranked in
/// ascending order, tied scores share their average rank, and
///
/// ```text
/// AUC = (Σ rank(pos) - n_pos (n_pos + 1) / 2) / (n_pos n_neg)
/// ```
///
/// Returns 0.5 when either class is empty.
pub fn roc_auc(scored: &[(f32, bool)]) -> f64 {
    let n_pos = scored.iter().filter(|(_, p)| *p).count();
    let n_neg = scored.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scored.len()).collect();
    order.sort_by(|&a, &b| scored[a].0.total_cmp(&scored[b].0));

    let mut rank_sum = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && scored[order[j]].0 == scored[order[i]].0 {
            j += 1;
        }
        // Positions i..j (0-based) share ranks i+1..=j.
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let positives = order[i..j].iter().filter(|&&idx| scored[idx].1).count();
        rank_sum += avg_rank * positives as f64;
        i = j;
    }

    let n_pos_f = n_pos as f64;
    (rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64)
}

/// Link prediction evaluator.
///
/// # Example
///
/// ```rust
/// use graphyte_core::Embeddings;
/// use graphyte_nn::evaluation::LinkPredictionEvaluator;
/// use ndarray::array;
///
/// let emb = Embeddings::from_array(array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0]]);
/// let metrics = LinkPredictionEvaluator::new(1)
///     .evaluate(&emb, &[(0, 1)], &[(0, 2)])
///     .unwrap();
/// assert_eq!(metrics.auc, 1.0);
/// assert_eq!(metrics.mrr, 1.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkPredictionEvaluator {
    config: EvalConfig,
}

impl LinkPredictionEvaluator {
    /// Evaluator with Hits@`k`.
    pub fn new(k: usize) -> Self {
        Self {
            config: EvalConfig { k },
        }
    }

    pub fn from_config(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Rank of `v` among all candidates for source `u`.
    pub fn rank_target<S: LinkScorer + ?Sized>(
        &self,
        scorer: &S,
        u: usize,
        v: usize,
    ) -> Result<(usize, f32)> {
        let target = scorer.similarity(u, v)?;
        let candidates = scorer.all_similarities(u)?;
        let rank = compute_rank(
            target,
            candidates.iter().filter(|r| r.node != v).map(|r| r.score),
        );
        Ok((rank, target))
    }

    /// Evaluate held-out positive and negative edges.
    ///
    /// Fails on the first edge whose endpoint is not a valid node, or when
    /// the scorer has no embeddings yet.
    pub fn evaluate<S: LinkScorer + ?Sized>(
        &self,
        scorer: &S,
        pos_edges: &[Edge],
        neg_edges: &[Edge],
    ) -> Result<LinkMetrics> {
        let mut scored = Vec::with_capacity(pos_edges.len() + neg_edges.len());
        let mut reciprocal_sum = 0.0f64;
        let mut rank_sum = 0.0f64;
        let mut hits = 0usize;

        for &(u, v) in pos_edges {
            let (rank, score) = self.rank_target(scorer, u, v)?;
            reciprocal_sum += 1.0 / rank as f64;
            rank_sum += rank as f64;
            if rank <= self.config.k {
                hits += 1;
            }
            scored.push((score, true));
        }

        for &(u, v) in neg_edges {
            scored.push((scorer.similarity(u, v)?, false));
        }

        let n = pos_edges.len() as f64;
        let per_positive = |x: f64| if pos_edges.is_empty() { 0.0 } else { x / n };

        Ok(LinkMetrics {
            auc: roc_auc(&scored),
            mrr: per_positive(reciprocal_sum),
            mean_rank: per_positive(rank_sum),
            hits_at_k: per_positive(hits as f64),
            k: self.config.k,
            num_positive: pos_edges.len(),
            num_negative: neg_edges.len(),
        })
    }
}
