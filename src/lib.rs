pub mod driver;
pub mod error;
pub mod model;
pub mod player;
pub mod recorder;
pub mod report;
pub mod runner;
pub mod store;
pub mod utils;

// Re-export common items
pub use error::{ConfigError, PlayerError, RecorderError, StoreError};
pub use model::{MouseButton, Project, Step, StepAction, Test, TestResult, TestSuite};
pub use player::{CancellationToken, PlayResult, PlayStatus, Player};
pub use recorder::Recorder;
pub use report::generate_report;
pub use runner::run_project;
pub use store::ProjectStore;
pub use utils::config::Config;
