pub mod json;
pub mod text;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

pub use types::RunResults;

/// Generate report from saved run results
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let results = std::fs::read_to_string(results_path)
        .with_context(|| format!("Failed to read {}", results_path.display()))?;
    let run_results: RunResults = serde_json::from_str(&results)
        .with_context(|| format!("Invalid run results in {}", results_path.display()))?;

    match format {
        "json" => json::generate(&run_results, output),
        "text" => text::generate(&run_results, output),
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
