use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn get_test_dir() -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Two triangles joined by one edge, with 3-dim features.
fn write_dataset(dir: &Path, prefix: &str) -> std::io::Result<(PathBuf, PathBuf)> {
    let edges = dir.join(format!("{prefix}_edges.txt"));
    let features = dir.join(format!("{prefix}_features.txt"));
    fs::write(
        &edges,
        "# two communities\n0 1\n1 2\n2 0\n3 4\n4 5\n5 3\n2 3\n",
    )?;
    fs::write(
        &features,
        "0 0.9 0.1 0.2\n1 0.8 0.2 0.1\n2 0.7 0.3 0.3\n3 0.2 0.8 0.6\n4 0.1 0.9 0.5\n5 0.3 0.7 0.9\n",
    )?;
    Ok((edges, features))
}

fn cleanup(paths: &[&Path]) {
    for p in paths {
        if p.exists() {
            let _ = fs::remove_file(p);
        }
    }
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("stats_edges.txt");
    fs::write(&file, "0 1\n1 2\n")?;

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("stats").arg("--edges").arg(&file);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:          3"))
        .stdout(predicate::str::contains("Edges:          2"));

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("stats").arg("--edges").arg(&file).arg("--symmetric");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Edges:          4"));

    cleanup(&[&file]);
    Ok(())
}

#[test]
fn test_cli_stats_huge_ids() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let sparse = dir.join("sparse_edges.txt");
    fs::write(&sparse, "0 10000000000\n")?;

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("stats").arg("--edges").arg(&sparse);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:          10000000001"))
        .stdout(predicate::str::contains("Isolated nodes: 9999999999"));

    let overflow = dir.join("overflow_edges.txt");
    fs::write(&overflow, format!("0 {}\n", u64::MAX))?;

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("stats").arg("--edges").arg(&overflow);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("is too large"));

    cleanup(&[&sparse, &overflow]);
    Ok(())
}

#[test]
fn test_cli_stats_bad_edges() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("bad_edges.txt");
    fs::write(&file, "0 1\n1 banana\n")?;

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("stats").arg("--edges").arg(&file);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));

    cleanup(&[&file]);
    Ok(())
}

#[test]
fn test_cli_train_and_recommend() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let (edges, features) = write_dataset(&dir, "pipeline")?;
    let output = dir.join("pipeline_embeddings.json");

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("train")
        .arg("--edges")
        .arg(&edges)
        .arg("--features")
        .arg(&features)
        .arg("--epochs")
        .arg("3")
        .arg("--symmetric")
        .arg("--samples")
        .arg("2")
        .arg("-k")
        .arg("3")
        .arg("--output")
        .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("AUC:"))
        .stdout(predicate::str::contains("H@3"))
        .stdout(predicate::str::contains("Node 0:"))
        .stdout(predicate::str::contains("Node 1:"));

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(saved["num_nodes"], 6);
    assert_eq!(saved["dim"], 3);
    assert_eq!(saved["embeddings"].as_array().map(Vec::len), Some(6));
    assert!(saved["metrics"]["auc"].is_number());

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("recommend")
        .arg("--embeddings")
        .arg(&output)
        .arg("--node")
        .arg("0")
        .arg("--top")
        .arg("2");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Top 2 for node 0"));

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("recommend")
        .arg("--embeddings")
        .arg(&output)
        .arg("--node")
        .arg("99");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Cannot recommend for node 99"));

    cleanup(&[&edges, &features, &output]);
    Ok(())
}

#[test]
fn test_cli_train_with_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let (edges, features) = write_dataset(&dir, "config")?;
    let config = dir.join("config_train.toml");
    fs::write(&config, "epochs = 2\npatience = 10\nlearning_rate = 0.01\n")?;

    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("train")
        .arg("--edges")
        .arg(&edges)
        .arg("--features")
        .arg(&features)
        .arg("--config")
        .arg(&config)
        .arg("--max-negatives")
        .arg("10");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("MRR:"));

    fs::write(&config, "learning_rate = -1.0\n")?;
    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("train")
        .arg("--edges")
        .arg(&edges)
        .arg("--features")
        .arg(&features)
        .arg("--config")
        .arg(&config);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid training config"));

    cleanup(&[&edges, &features, &config]);
    Ok(())
}

#[test]
fn test_cli_recommend_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("graphyte")?;
    cmd.arg("recommend")
        .arg("--embeddings")
        .arg("target/tmp/tests/does_not_exist.json")
        .arg("--node")
        .arg("0");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read embeddings"));
    Ok(())
}
