//! Edge and feature loading, train/test splitting and negative edges.
//!
//! These are the thin I/O helpers the training pipeline needs to run end to
//! end. File formats are whitespace separated text:
//!
//! ```text
//! # edges: one directed pair per line
//! 0 1
//! 1 2
//!
//! # features: node id followed by D values
//! 0 1 0 0 1
//! 1 0 1 0 0
//! ```

use crate::{Error, Features, NodeId, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// A directed edge.
pub type Edge = (NodeId, NodeId);

/// Read an edge list from a file.
pub fn load_edges(path: impl AsRef<Path>) -> Result<Vec<Edge>> {
    read_edges(File::open(path)?)
}

/// Parse an edge list from any reader.
pub fn read_edges(reader: impl Read) -> Result<Vec<Edge>> {
    let mut edges = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let (Some(u), Some(v)) = (parts.next(), parts.next()) else {
            return Err(Error::Parse {
                line: line_no,
                message: format!("expected two node ids, got {trimmed:?}"),
            });
        };
        edges.push((parse_id(u, line_no)?, parse_id(v, line_no)?));
    }
    debug!(edges = edges.len(), "loaded edge list");
    Ok(edges)
}

/// Read node features from a file, sized for `num_nodes` nodes.
pub fn load_features(path: impl AsRef<Path>, num_nodes: usize) -> Result<Features> {
    read_features(File::open(path)?, num_nodes)
}

/// Parse node features from any reader.
///
/// The dimensionality is taken from the first data row. Rows for node ids
/// outside `[0, num_nodes)` are skipped; nodes without a row stay all-zero.
pub fn read_features(reader: impl Read, num_nodes: usize) -> Result<Features> {
    let mut rows: Vec<(NodeId, Vec<f32>)> = Vec::new();
    let mut dim: Option<usize> = None;
    let mut skipped = 0usize;

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let node = match parts.next() {
            Some(tok) => parse_id(tok, line_no)?,
            None => continue,
        };
        let values = parts
            .map(|tok| {
                tok.parse::<f32>().map_err(|e| Error::Parse {
                    line: line_no,
                    message: format!("bad feature value {tok:?}: {e}"),
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        let expected = *dim.get_or_insert(values.len());
        if values.len() != expected {
            return Err(Error::Parse {
                line: line_no,
                message: format!("expected {expected} features, got {}", values.len()),
            });
        }
        if node >= num_nodes {
            skipped += 1;
            continue;
        }
        rows.push((node, values));
    }

    if skipped > 0 {
        warn!(skipped, num_nodes, "skipped feature rows for out-of-range node ids");
    }

    let dim = dim.unwrap_or(0);
    if dim == 0 {
        return Err(Error::InvalidConfig(
            "feature file contains no feature values".to_string(),
        ));
    }

    let mut features = Features::zeros(dim, num_nodes);
    for (node, values) in &rows {
        features.set_node(*node, values)?;
    }
    debug!(rows = rows.len(), dim, num_nodes, "loaded features");
    Ok(features)
}

/// Largest node id referenced by any edge.
pub fn max_node_id(edges: &[Edge]) -> Option<NodeId> {
    edges.iter().map(|&(u, v)| u.max(v)).max()
}

/// Append the reciprocal of every edge.
pub fn symmetrize(edges: &[Edge]) -> Vec<Edge> {
    let mut out = Vec::with_capacity(edges.len() * 2);
    for &(u, v) in edges {
        out.push((u, v));
        out.push((v, u));
    }
    out
}

/// Shuffle with `seed`, then put the first `ceil(len * test_ratio)` edges in
/// the test set. Returns `(train, test)`.
pub fn split_edges(edges: &[Edge], test_ratio: f64, seed: u64) -> Result<(Vec<Edge>, Vec<Edge>)> {
    if !(0.0..=1.0).contains(&test_ratio) {
        return Err(Error::InvalidConfig(format!(
            "test ratio must be in [0, 1], got {test_ratio}"
        )));
    }
    let mut shuffled = edges.to_vec();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let test_len = ((edges.len() as f64) * test_ratio).ceil() as usize;
    let train = shuffled.split_off(test_len.min(shuffled.len()));
    Ok((train, shuffled))
}

/// Every ordered pair `(i, j)` with `i != j` in `[0, num_nodes)` that is not
/// a positive edge.
///
/// Quadratic in `num_nodes`; see [`sample_negative_edges`] for large graphs.
pub fn negative_edges(pos_edges: &[Edge], num_nodes: usize) -> Vec<Edge> {
    let positives: HashSet<Edge> = pos_edges.iter().copied().collect();
    let mut out = Vec::new();
    for i in 0..num_nodes {
        for j in 0..num_nodes {
            if i != j && !positives.contains(&(i, j)) {
                out.push((i, j));
            }
        }
    }
    out
}

/// Sample up to `count` distinct non-edges uniformly at random.
///
/// Returns fewer than `count` pairs only when the graph has fewer non-edges.
pub fn sample_negative_edges(
    pos_edges: &[Edge],
    num_nodes: usize,
    count: usize,
    seed: u64,
) -> Vec<Edge> {
    if num_nodes < 2 {
        return Vec::new();
    }
    let positives: HashSet<Edge> = pos_edges.iter().copied().collect();
    let in_range = positives
        .iter()
        .filter(|&&(u, v)| u != v && u < num_nodes && v < num_nodes)
        .count();
    let available = (num_nodes * (num_nodes - 1)).saturating_sub(in_range);
    let target = count.min(available);

    // Dense graphs make rejection sampling slow; enumerate instead.
    if target * 2 > available {
        let mut all = negative_edges(pos_edges, num_nodes);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        all.shuffle(&mut rng);
        all.truncate(target);
        return all;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(target);
    let mut out = Vec::with_capacity(target);
    while out.len() < target {
        let u = rng.gen_range(0..num_nodes);
        let v = rng.gen_range(0..num_nodes);
        if u == v || positives.contains(&(u, v)) || !seen.insert((u, v)) {
            continue;
        }
        out.push((u, v));
    }
    out
}

fn parse_id(tok: &str, line: usize) -> Result<NodeId> {
    tok.parse::<NodeId>().map_err(|e| Error::Parse {
        line,
        message: format!("bad node id {tok:?}: {e}"),
    })
}
