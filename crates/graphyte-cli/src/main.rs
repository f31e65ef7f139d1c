//! Graphyte CLI - train and query node embeddings from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Edge list statistics
//! graphyte stats --edges edges.txt
//!
//! # Train, evaluate on a held-out split, save embeddings
//! graphyte train --edges edges.txt --features features.txt \
//!     --epochs 20 --symmetric --output embeddings.json
//!
//! # Override training defaults from a TOML file
//! graphyte train --edges edges.txt --features features.txt --config train.toml
//!
//! # Query saved embeddings
//! graphyte recommend --embeddings embeddings.json --node 3 --top 5
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use graphyte_core::{dataset, Embeddings, Graph, LinkScorer, NodeId, Recommendation};
use graphyte_nn::{EmbeddingModel, LinkMetrics, TrainingConfig, TrainingReport};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graphyte")]
#[command(about = "GraphSAGE-style node embedding CLI", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about an edge list
    Stats {
        /// Edge list (one `u v` pair per line)
        #[arg(long)]
        edges: PathBuf,

        /// Treat every edge as undirected
        #[arg(long)]
        symmetric: bool,
    },

    /// Train embeddings and evaluate link prediction
    Train {
        /// Edge list (one `u v` pair per line)
        #[arg(long)]
        edges: PathBuf,

        /// Feature file (`id f1 .. fD` per line)
        #[arg(long)]
        features: PathBuf,

        /// TOML file with training settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of epochs (overrides config)
        #[arg(long)]
        epochs: Option<usize>,

        /// Random seed for splitting, negatives and weights (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Share of edges held out for evaluation
        #[arg(long, default_value = "0.3")]
        test_ratio: f64,

        /// Hits@K cut-off
        #[arg(short, long, default_value = "10")]
        k: usize,

        /// Add the reverse of every edge
        #[arg(long)]
        symmetric: bool,

        /// Sample at most this many negative edges instead of all non-edges
        #[arg(long)]
        max_negatives: Option<usize>,

        /// Write embeddings and metrics as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print top-5 recommendations for the first N nodes
        #[arg(long, default_value = "0")]
        samples: usize,
    },

    /// Recommend similar nodes from saved embeddings
    Recommend {
        /// JSON file written by `train --output`
        #[arg(long)]
        embeddings: PathBuf,

        /// Query node
        #[arg(long)]
        node: NodeId,

        /// Number of recommendations
        #[arg(short, long, default_value = "10")]
        top: usize,
    },
}

/// On-disk form of a trained run.
#[derive(Serialize, Deserialize)]
struct EmbeddingFile {
    num_nodes: usize,
    dim: usize,
    embeddings: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics: Option<LinkMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report: Option<TrainingReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stats { edges, symmetric } => cmd_stats(&edges, symmetric),
        Commands::Train {
            edges,
            features,
            config,
            epochs,
            seed,
            test_ratio,
            k,
            symmetric,
            max_negatives,
            output,
            samples,
        } => cmd_train(TrainArgs {
            edges,
            features,
            config,
            epochs,
            seed,
            test_ratio,
            k,
            symmetric,
            max_negatives,
            output,
            samples,
        }),
        Commands::Recommend {
            embeddings,
            node,
            top,
        } => cmd_recommend(&embeddings, node, top),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_edges(path: &Path, symmetric: bool) -> Result<Vec<(NodeId, NodeId)>> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let edges = dataset::load_edges(path)
        .with_context(|| format!("Failed to load edges from {}", path.display()))?;
    let edges = if symmetric {
        dataset::symmetrize(&edges)
    } else {
        edges
    };

    pb.finish_with_message(format!("Loaded {} edges in {:.2?}", edges.len(), start.elapsed()));
    Ok(edges)
}

fn cmd_stats(path: &Path, symmetric: bool) -> Result<()> {
    let edges = load_edges(path, symmetric)?;
    let stats = Graph::from_edges(&edges).stats();
    let nodes = match stats.max_node_id {
        Some(max_id) => node_axis_len(max_id)?,
        None => 0,
    };

    println!("Graph Statistics");
    println!("================");
    println!("Nodes:          {}", nodes);
    println!("Edges:          {}", stats.edge_count);
    println!("Source nodes:   {}", stats.source_nodes);
    println!("Isolated nodes: {}", stats.isolated_nodes);
    println!("Avg out-degree: {:.2}", stats.avg_out_degree);

    Ok(())
}

/// Size of the node axis for ids `[0, max_id]`.
fn node_axis_len(max_id: NodeId) -> Result<usize> {
    let Some(len) = max_id.checked_add(1) else {
        bail!("Node id {max_id} is too large");
    };
    Ok(len)
}

struct TrainArgs {
    edges: PathBuf,
    features: PathBuf,
    config: Option<PathBuf>,
    epochs: Option<usize>,
    seed: Option<u64>,
    test_ratio: f64,
    k: usize,
    symmetric: bool,
    max_negatives: Option<usize>,
    output: Option<PathBuf>,
    samples: usize,
}

fn load_config(path: Option<&Path>) -> Result<TrainingConfig> {
    let Some(path) = path else {
        return Ok(TrainingConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: TrainingConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    debug!(?config, "loaded training config");
    Ok(config)
}

fn cmd_train(args: TrainArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("Invalid training config")?;

    let edges = load_edges(&args.edges, args.symmetric)?;
    let Some(max_id) = dataset::max_node_id(&edges) else {
        bail!("Edge list {} is empty", args.edges.display());
    };
    let num_nodes = node_axis_len(max_id)?;

    let features = dataset::load_features(&args.features, num_nodes)
        .with_context(|| format!("Failed to load features from {}", args.features.display()))?;

    let negatives = match args.max_negatives {
        Some(count) => dataset::sample_negative_edges(&edges, num_nodes, count, config.seed),
        None => dataset::negative_edges(&edges, num_nodes),
    };

    let (train_pos, test_pos) = dataset::split_edges(&edges, args.test_ratio, config.seed)?;
    let (train_neg, test_neg) =
        dataset::split_edges(&negatives, args.test_ratio, config.seed.wrapping_add(1))?;
    info!(
        nodes = num_nodes,
        dim = features.dim(),
        train_pos = train_pos.len(),
        test_pos = test_pos.len(),
        train_neg = train_neg.len(),
        test_neg = test_neg.len(),
        "prepared dataset"
    );

    let epochs = config.epochs;
    let mut model = EmbeddingModel::new(
        Graph::from_edges(&train_pos),
        Graph::from_edges(&train_neg),
        features,
        config,
    )?;

    let start = Instant::now();
    let pb = ProgressBar::new(epochs as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} epochs {msg}") {
        pb.set_style(style);
    }
    let report = model.train_with(epochs, |_, loss| {
        pb.inc(1);
        pb.set_message(format!("loss {loss:.5}"));
    })?;
    pb.finish_with_message(format!("Trained in {:.2?}", start.elapsed()));

    if report.early_stopped {
        println!("Early stopped after {} epochs", report.epochs_run);
    }
    if let Some(loss) = report.final_loss() {
        println!("Final loss:     {loss:.6}");
    }

    let metrics = model.evaluate(&test_pos, &test_neg, args.k)?;
    println!("{}", metrics.summary());

    for node in 0..args.samples.min(num_nodes) {
        let recs = model.get_recommendations(node, 5)?;
        println!("Node {node}: {}", format_recommendations(&recs));
    }

    if let Some(output) = &args.output {
        let emb = model.embeddings()?;
        let file = EmbeddingFile {
            num_nodes: emb.num_nodes(),
            dim: emb.dim(),
            embeddings: emb.to_rows(),
            metrics: Some(metrics),
            report: Some(report),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Saved embeddings to {}", output.display());
    }

    Ok(())
}

fn cmd_recommend(path: &Path, node: NodeId, top: usize) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read embeddings {}", path.display()))?;
    let file: EmbeddingFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse embeddings {}", path.display()))?;
    if file.embeddings.len() != file.num_nodes {
        bail!(
            "Embedding file declares {} nodes but holds {}",
            file.num_nodes,
            file.embeddings.len()
        );
    }
    let embeddings = Embeddings::from_rows(&file.embeddings)?;

    let recs = embeddings
        .recommendations(node, top)
        .with_context(|| format!("Cannot recommend for node {node}"))?;

    println!("Top {} for node {}:", recs.len(), node);
    for (i, rec) in recs.iter().enumerate() {
        println!("{:>4}. node {:<8} {:.4}", i + 1, rec.node, rec.score);
    }
    Ok(())
}

fn format_recommendations(recs: &[Recommendation]) -> String {
    recs.iter()
        .map(|r| format!("{} ({:.3})", r.node, r.score))
        .collect::<Vec<_>>()
        .join(", ")
}
