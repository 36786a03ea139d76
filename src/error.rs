use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by recording-session operations.
///
/// None of these leave a partial state change behind: a rejected call
/// returns before touching the session or the bound test.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecorderError {
    #[error("a recording is already active for test {test_id}")]
    AlreadyRecording { test_id: String },

    #[error("no recording is active")]
    NotRecording,

    #[error("recording is bound to test {bound}, not {requested}")]
    WrongTest { bound: String, requested: String },

    #[error("device listener '{listener}' failed: {reason}")]
    DeviceListenerFailure { listener: String, reason: String },
}

/// Errors that abort playback at a given step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlayerError {
    #[error("unsupported step type '{kind}'")]
    UnsupportedStepType { kind: String },

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("input synthesis failed: {0}")]
    Synthesis(String),

    #[error("wait of {seconds}s before this step cannot be scheduled")]
    DelayOutOfRange { seconds: f64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize projects: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("test suite not found: {0}")]
    SuiteNotFound(String),

    #[error("test not found: {0}")]
    TestNotFound(String),

    #[error("step index {index} out of range (test has {len} steps)")]
    StepIndexOutOfRange { index: usize, len: usize },

    #[error("step {index} of test {test_id} would start before the step preceding it")]
    OffsetOutOfOrder { test_id: String, index: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
