pub mod events;
pub mod state;

use colored::Colorize;

pub use events::*;
pub use state::*;

use crate::model::Project;
use crate::player::{CancellationToken, PlayStatus, Player};

/// Options for a project run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Keep playing the remaining tests after a failure
    pub continue_on_failure: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            continue_on_failure: true,
        }
    }
}

/// Play every test of every suite in `project`, storing each test's result.
///
/// Tests run one after another in suite order. Without
/// `continue_on_failure` the first failure skips the rest; cancellation
/// always does.
pub async fn run_project(
    project: &mut Project,
    player: &Player,
    options: &RunOptions,
    emitter: &EventEmitter,
    cancel: &CancellationToken,
) -> RunState {
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut run = RunState::new(&run_id, &project.id, &project.name);
    run.start();

    emitter.emit(PlaybackEvent::RunStarted {
        run_id: run_id.clone(),
        project_name: project.name.clone(),
        test_count: project.test_count(),
    });

    let mut stop_reason: Option<&str> = None;

    for suite in project.test_suites.iter_mut() {
        for test in suite.tests.iter_mut() {
            let mut state = TestRunState::new(
                &suite.id,
                &suite.name,
                &test.id,
                &test.name,
                test.steps.len(),
            );

            if let Some(reason) = stop_reason {
                state.skip(reason);
                run.add_test(state);
                continue;
            }

            emitter.emit(PlaybackEvent::TestStarted {
                test_name: test.name.clone(),
                step_count: test.steps.len(),
            });
            state.start();

            let result = player.play_with_cancel(test, cancel).await;
            result.apply_to(test);

            let status = match &result.status {
                PlayStatus::Passed => TestStatus::Passed,
                PlayStatus::Failed { index, error } => TestStatus::Failed {
                    step_index: *index,
                    error: error.to_string(),
                },
                PlayStatus::Cancelled { index } => TestStatus::Cancelled { step_index: *index },
            };
            state.finish(status.clone(), result.steps_executed);

            emitter.emit(PlaybackEvent::TestFinished {
                test_name: test.name.clone(),
                status: status.clone(),
                duration_ms: result.duration.as_millis() as u64,
            });

            match status {
                TestStatus::Cancelled { .. } => stop_reason = Some("run cancelled"),
                TestStatus::Failed { .. } if !options.continue_on_failure => {
                    stop_reason = Some("previous test failed")
                }
                _ => {}
            }

            run.add_test(state);
        }
    }

    run.finish();
    let summary = run.summary();
    log::info!(
        "Run {} finished: {} passed, {} failed",
        run_id,
        summary.passed,
        summary.failed
    );
    emitter.emit(PlaybackEvent::RunFinished { summary });

    run
}

/// Print a one-line verdict for a finished run
pub fn print_verdict(summary: &RunSummary) {
    if summary.all_passed() {
        println!("{} All {} tests passed", "✓".green().bold(), summary.passed);
    } else {
        println!(
            "{} {} of {} tests did not pass",
            "✗".red().bold(),
            summary.failed + summary.cancelled,
            summary.total_tests
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MouseButton, Step, Test, TestResult, TestSuite};
    use crate::player::DryRunSynthesizer;
    use crate::utils::config::PlaybackConfig;
    use std::sync::Arc;

    fn project() -> Project {
        let mut ok = Test::new("ok");
        ok.steps = vec![
            Step::mouse_click(1, 2, MouseButton::Left, 0.0),
            Step::key_press("a", 0.01),
        ];

        let mut broken = Test::new("broken");
        broken.steps = vec![Step::new(
            crate::model::StepAction::Unsupported {
                kind: "drag".to_string(),
            },
            0.0,
        )];

        let mut later = Test::new("later");
        later.steps = vec![Step::key_press("z", 0.0)];

        let mut suite = TestSuite::new("smoke");
        suite.tests = vec![ok, broken, later];

        let mut project = Project::new("demo");
        project.test_suites.push(suite);
        project
    }

    fn player() -> Player {
        Player::new(Arc::new(DryRunSynthesizer), PlaybackConfig::default())
    }

    #[tokio::test]
    async fn test_run_records_results_and_continues() {
        let mut project = project();
        let emitter = EventEmitter::default();

        let run = run_project(
            &mut project,
            &player(),
            &RunOptions::default(),
            &emitter,
            &CancellationToken::new(),
        )
        .await;

        let summary = run.summary();
        assert_eq!(summary.total_tests, 3);
        assert_eq!((summary.passed, summary.failed), (2, 1));

        let tests = &project.test_suites[0].tests;
        assert_eq!(tests[0].result, TestResult::Passed);
        assert_eq!(tests[1].result, TestResult::Failed);
        assert_eq!(tests[2].result, TestResult::Passed);
        assert_eq!(
            run.tests[1].status,
            TestStatus::Failed {
                step_index: 0,
                error: "unsupported step type 'drag'".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_stop_on_first_failure() {
        let mut project = project();
        let options = RunOptions {
            continue_on_failure: false,
        };
        let (emitter, mut rx) = EventEmitter::new();

        let run = run_project(
            &mut project,
            &player(),
            &options,
            &emitter,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(run.tests[2].status, TestStatus::Skipped { .. }));
        assert_eq!(project.test_suites[0].tests[2].result, TestResult::Unknown);

        assert!(matches!(
            rx.recv().await.unwrap(),
            PlaybackEvent::RunStarted { test_count: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_the_rest() {
        let mut project = project();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let run = run_project(
            &mut project,
            &player(),
            &RunOptions::default(),
            &EventEmitter::default(),
            &cancel,
        )
        .await;

        assert_eq!(run.tests[0].status, TestStatus::Cancelled { step_index: 0 });
        assert!(matches!(run.tests[1].status, TestStatus::Skipped { .. }));
        assert_eq!(run.summary().cancelled, 1);
        assert_eq!(project.test_suites[0].tests[0].result, TestResult::Unknown);
    }
}
