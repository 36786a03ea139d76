use super::state::{RunSummary, TestStatus};
use tokio::sync::broadcast;

/// Playback events for real-time updates
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    // Run events
    RunStarted {
        run_id: String,
        project_name: String,
        test_count: usize,
    },
    RunFinished {
        summary: RunSummary,
    },

    // Test events
    TestStarted {
        test_name: String,
        step_count: usize,
    },
    TestFinished {
        test_name: String,
        status: TestStatus,
        duration_ms: u64,
    },

    // Step events
    StepStarted {
        test_name: String,
        index: usize,
        description: String,
    },
    StepPassed {
        test_name: String,
        index: usize,
    },
    StepFailed {
        test_name: String,
        index: usize,
        error: String,
    },
}

/// Event emitter for broadcasting playback events
pub struct EventEmitter {
    sender: broadcast::Sender<PlaybackEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<PlaybackEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: PlaybackEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<PlaybackEvent>) {
        use colored::Colorize;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Console output skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                PlaybackEvent::RunStarted {
                    run_id,
                    project_name,
                    test_count,
                } => {
                    println!(
                        "\n{} Run {} started: {} ({} tests)",
                        "▶".green().bold(),
                        run_id.cyan(),
                        project_name.white().bold(),
                        test_count
                    );
                }

                PlaybackEvent::RunFinished { summary } => {
                    println!("\n{} Run finished", "■".blue().bold());
                    println!("  Total tests: {}", summary.total_tests);
                    println!("  Steps executed: {}", summary.total_steps);
                    println!(
                        "  {} passed, {} failed, {} cancelled, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.cancelled.to_string().yellow(),
                        summary.skipped.to_string().yellow()
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                PlaybackEvent::TestStarted {
                    test_name,
                    step_count,
                } => {
                    println!(
                        "\n  {} Test: {} ({} steps)",
                        "→".blue(),
                        test_name.white().bold(),
                        step_count
                    );
                }

                PlaybackEvent::TestFinished {
                    test_name,
                    status,
                    duration_ms,
                } => {
                    let label = match &status {
                        TestStatus::Passed => "passed".green(),
                        TestStatus::Failed { .. } => "failed".red(),
                        TestStatus::Cancelled { .. } => "cancelled".yellow(),
                        TestStatus::Skipped { .. } => "skipped".yellow(),
                        _ => "unfinished".normal(),
                    };
                    println!(
                        "  {} {} {} ({}ms)",
                        "■".blue(),
                        test_name,
                        label,
                        duration_ms
                    );
                }

                PlaybackEvent::StepStarted {
                    index, description, ..
                } => {
                    log::debug!("step {} started: {}", index, description);
                }

                PlaybackEvent::StepPassed { index, .. } => {
                    println!("      {} step {}", "✓".green(), index);
                }

                PlaybackEvent::StepFailed { index, error, .. } => {
                    println!("      {} step {}: {}", "✗".red(), index, error.red());
                }
            }
        }
    }
}
