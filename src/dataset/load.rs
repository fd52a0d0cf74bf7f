use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::Dataset;
use super::parse::parse_dataset;

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    let dataset = parse_dataset(&raw, &path.display().to_string())
        .with_context(|| format!("failed to parse dataset {}", path.display()))?;

    if dataset.nodes.is_empty() {
        return Err(anyhow!("dataset {} contains no nodes", path.display()));
    }

    if dataset.rejected > 0 {
        tracing::warn!(
            source = %dataset.source,
            rejected = dataset.rejected,
            "dataset contained unparseable records"
        );
    }

    tracing::info!(
        source = %dataset.source,
        nodes = dataset.nodes.len(),
        transactions = dataset.transactions.len(),
        "dataset loaded"
    );

    Ok(dataset)
}
