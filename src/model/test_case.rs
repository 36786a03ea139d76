use serde::{Deserialize, Serialize};

use super::step::Step;

/// Outcome of the last playback of a test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Passed,
    Failed,
    #[default]
    Unknown,
}

/// A named, ordered sequence of recorded steps.
///
/// Step order is recorded order and replay order. `is_recording` and
/// `is_paused` describe the live session only and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub result: TestResult,
    #[serde(skip)]
    pub is_recording: bool,
    #[serde(skip)]
    pub is_paused: bool,
}

impl Test {
    pub fn new(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            steps: Vec::new(),
            result: TestResult::Unknown,
            is_recording: false,
            is_paused: false,
        }
    }

    /// Recorded length in seconds (offset of the last step)
    pub fn duration_seconds(&self) -> f64 {
        self.steps.last().map(|s| s.offset_seconds).unwrap_or(0.0)
    }
}
