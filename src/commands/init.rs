use crate::config::CONFIG_FILE_NAME;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = r#"# servicecut configuration
#
# Sweep values accept a single value, a list, or { start, end, step }.
# Command-line flags override any value set here.

# density | fuzzy | overlapping-gnn
algorithm = "fuzzy"

# Weight of structural similarity against semantic similarity.
alpha = { start = 0.0, end = 1.0, step = 0.25 }

# Group counts; "auto" sweeps 2, 4, ... up to N/2 + 1.
n_clusters = "auto"

# Minimum affinity for a class to join a group. Use `hard = true` instead
# to keep only each class's strongest group.
threshold = [0.1, 0.2, 0.3]

# Density clustering only.
# epsilon = [0.5, 0.7, 0.9]
# min_samples = 2

repeats = 1
seed = 42

[semantic]
# tfidf | precomputed
backend = "tfidf"
# vectors = "vectors.json"

[evaluation]
metrics = ["SM", "ICP", "IFN", "NED"]
# Precision and SR need a ground truth.
# ground_truth = "ground_truth.json"
# sr_k = [7, 8, 9, 10]

# Overlapping-gnn training.
# [training]
# hidden_size = 128
# learning_rate = 0.001
# weight_decay = 0.01
# max_epochs = 500
# validation_interval = 25
# patience = 10
"#;

pub fn init_config(force: bool) -> Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    write_default_config(&path, force)?;
    println!("Created {} configuration file", CONFIG_FILE_NAME);
    Ok(())
}

pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{build_request, parse_config};
    use crate::sweep::Algorithm;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let raw = parse_config(DEFAULT_CONFIG).unwrap();
        let request = build_request(&raw).unwrap();
        assert_eq!(request.algorithm, Algorithm::Fuzzy);
        assert_eq!(request.alphas, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(request.discretizations.len(), 3);
    }

    #[test]
    fn test_existing_file_needs_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();
    }
}
