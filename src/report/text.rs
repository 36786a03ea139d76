use super::types::RunResults;
use crate::runner::state::TestStatus;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Generate a plain-text report
pub fn generate(results: &RunResults, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, render(results, false))?;
            println!("Text report saved to: {}", path.display());
        }
        None => print!("{}", render(results, true)),
    }
    Ok(())
}

pub fn render(results: &RunResults, color: bool) -> String {
    let paint = |text: &str, status: &TestStatus| -> String {
        if !color {
            return text.to_string();
        }
        match status {
            TestStatus::Passed => text.green().to_string(),
            TestStatus::Failed { .. } => text.red().to_string(),
            _ => text.yellow().to_string(),
        }
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Run {}: {} ({})\n",
        results.run_id, results.project_name, results.generated_at
    ));

    let mut current_suite = "";
    for test in &results.tests {
        if test.suite_name != current_suite {
            current_suite = test.suite_name.as_str();
            out.push_str(&format!("\n[{}]\n", current_suite));
        }
        let (label, detail) = match &test.status {
            TestStatus::Passed => ("PASS", String::new()),
            TestStatus::Failed { step_index, error } => {
                ("FAIL", format!(" at step {}: {}", step_index, error))
            }
            TestStatus::Cancelled { step_index } => {
                ("CANCELLED", format!(" before step {}", step_index))
            }
            TestStatus::Skipped { reason } => ("SKIP", format!(" ({})", reason)),
            TestStatus::Pending | TestStatus::Running => ("PENDING", String::new()),
        };
        out.push_str(&format!(
            "  {:<9} {} [{}/{} steps]{}\n",
            paint(label, &test.status),
            test.test_name,
            test.steps_executed,
            test.step_count,
            detail
        ));
    }

    let summary = &results.summary;
    out.push_str(&format!(
        "\n{} tests: {} passed, {} failed, {} cancelled, {} skipped\n",
        summary.total_tests, summary.passed, summary.failed, summary.cancelled, summary.skipped
    ));
    out
}
