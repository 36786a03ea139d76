use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Playback status of one test within a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed { step_index: usize, error: String },
    Cancelled { step_index: usize },
    Skipped { reason: String },
}

/// State for a single test's playback
#[derive(Debug, Clone)]
pub struct TestRunState {
    pub suite_id: String,
    pub suite_name: String,
    pub test_id: String,
    pub test_name: String,
    pub step_count: usize,
    pub steps_executed: usize,
    pub status: TestStatus,
    pub started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl TestRunState {
    pub fn new(
        suite_id: &str,
        suite_name: &str,
        test_id: &str,
        test_name: &str,
        step_count: usize,
    ) -> Self {
        Self {
            suite_id: suite_id.to_string(),
            suite_name: suite_name.to_string(),
            test_id: test_id.to_string(),
            test_name: test_name.to_string(),
            step_count,
            steps_executed: 0,
            status: TestStatus::Pending,
            started_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = TestStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn finish(&mut self, status: TestStatus, steps_executed: usize) {
        self.status = status;
        self.steps_executed = steps_executed;
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn skip(&mut self, reason: &str) {
        self.status = TestStatus::Skipped {
            reason: reason.to_string(),
        };
    }

    pub fn to_report(&self) -> TestRunReport {
        TestRunReport {
            suite_id: self.suite_id.clone(),
            suite_name: self.suite_name.clone(),
            test_id: self.test_id.clone(),
            test_name: self.test_name.clone(),
            step_count: self.step_count,
            steps_executed: self.steps_executed,
            status: self.status.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRunReport {
    pub suite_id: String,
    pub suite_name: String,
    pub test_id: String,
    pub test_name: String,
    pub step_count: usize,
    pub steps_executed: usize,
    pub status: TestStatus,
    pub duration_ms: Option<u64>,
}

/// State of a whole project run
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: String,
    pub project_id: String,
    pub project_name: String,
    pub tests: Vec<TestRunState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl RunState {
    pub fn new(run_id: &str, project_id: &str, project_name: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            tests: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_test(&mut self, test: TestRunState) {
        self.tests.push(test);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> RunSummary {
        let mut passed = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        let mut skipped = 0;
        let mut total_steps = 0;

        for test in &self.tests {
            total_steps += test.steps_executed as u32;
            match test.status {
                TestStatus::Passed => passed += 1,
                TestStatus::Failed { .. } => failed += 1,
                TestStatus::Cancelled { .. } => cancelled += 1,
                TestStatus::Skipped { .. } => skipped += 1,
                _ => {}
            }
        }

        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });

        RunSummary {
            run_id: self.run_id.clone(),
            total_tests: self.tests.len() as u32,
            total_steps,
            passed,
            failed,
            cancelled,
            skipped,
            total_duration_ms,
        }
    }

    pub fn to_report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id.clone(),
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            tests: self.tests.iter().map(|t| t.to_report()).collect(),
            summary: self.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub total_tests: u32,
    pub total_steps: u32,
    pub passed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub skipped: u32,
    pub total_duration_ms: Option<u64>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Serializable form of a finished run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub project_id: String,
    pub project_name: String,
    pub tests: Vec<TestRunReport>,
    pub summary: RunSummary,
}
