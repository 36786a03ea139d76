use crate::runner::state::{RunReport, RunSummary, TestRunReport};
use serde::{Deserialize, Serialize};

/// Run results for report generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub run_id: String,
    pub project_id: String,
    pub project_name: String,
    pub tests: Vec<TestRunReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}

impl From<RunReport> for RunResults {
    fn from(report: RunReport) -> Self {
        Self {
            run_id: report.run_id,
            project_id: report.project_id,
            project_name: report.project_name,
            tests: report.tests,
            summary: report.summary,
            generated_at: chrono::Local::now().to_rfc3339(),
        }
    }
}
