//! Timed replay of a test's steps through an input synthesizer

pub mod synth;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub use tokio_util::sync::CancellationToken;
pub use synth::{DryRunSynthesizer, InputSynthesizer};

use crate::error::PlayerError;
use crate::model::{KeyInput, Step, StepAction, Test, TestResult};
use crate::runner::events::{EventEmitter, PlaybackEvent};
use crate::utils::config::PlaybackConfig;

/// How a playback ended
#[derive(Debug, Clone, PartialEq)]
pub enum PlayStatus {
    Passed,
    /// Step `index` failed; later steps were not executed.
    Failed { index: usize, error: PlayerError },
    /// Cancelled before step `index` ran.
    Cancelled { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayResult {
    pub test_id: String,
    pub status: PlayStatus,
    pub steps_executed: usize,
    pub duration: Duration,
}

impl PlayResult {
    pub fn is_success(&self) -> bool {
        self.status == PlayStatus::Passed
    }

    pub fn failed_index(&self) -> Option<usize> {
        match self.status {
            PlayStatus::Failed { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Result to store on the test. A cancelled run says nothing about the
    /// test itself.
    pub fn test_result(&self) -> TestResult {
        match self.status {
            PlayStatus::Passed => TestResult::Passed,
            PlayStatus::Failed { .. } => TestResult::Failed,
            PlayStatus::Cancelled { .. } => TestResult::Unknown,
        }
    }

    /// Store the outcome on `test`. Cancelled playbacks keep the previous
    /// result.
    pub fn apply_to(&self, test: &mut Test) {
        if test.id != self.test_id {
            log::warn!(
                "Ignoring result of test {} for test {}",
                self.test_id,
                test.id
            );
            return;
        }
        if !matches!(self.status, PlayStatus::Cancelled { .. }) {
            test.result = self.test_result();
        }
    }
}

/// Replays steps in recorded order, honouring the recorded gaps.
pub struct Player {
    synth: Arc<dyn InputSynthesizer>,
    config: PlaybackConfig,
    emitter: Option<Arc<EventEmitter>>,
}

impl Player {
    pub fn new(synth: Arc<dyn InputSynthesizer>, config: PlaybackConfig) -> Self {
        Self {
            synth,
            config,
            emitter: None,
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }

    /// Play every step of `test`. Returns once all steps ran or one failed.
    pub async fn play(&self, test: &Test) -> PlayResult {
        self.play_with_cancel(test, &CancellationToken::new()).await
    }

    pub async fn play_with_cancel(&self, test: &Test, cancel: &CancellationToken) -> PlayResult {
        let started = Instant::now();
        log::info!(
            "Playing test '{}' ({} steps) with {}",
            test.name,
            test.steps.len(),
            self.synth.name()
        );

        let mut deadline = started;
        let mut previous_offset: Option<f64> = None;
        let mut executed = 0;

        for (index, step) in test.steps.iter().enumerate() {
            if let Some(prev) = previous_offset {
                let delay = self.delay_between(prev, step.offset_seconds);
                match deadline.checked_add(delay) {
                    Some(next) => deadline = next,
                    None => {
                        let error = PlayerError::DelayOutOfRange {
                            seconds: delay.as_secs_f64(),
                        };
                        log::warn!("Step {} of '{}' failed: {}", index, test.name, error);
                        self.emit(PlaybackEvent::StepFailed {
                            test_name: test.name.clone(),
                            index,
                            error: error.to_string(),
                        });
                        return self.finish(
                            test,
                            PlayStatus::Failed { index, error },
                            executed,
                            started,
                        );
                    }
                }
            }
            previous_offset = Some(step.offset_seconds);

            if cancel.is_cancelled() {
                return self.finish(test, PlayStatus::Cancelled { index }, executed, started);
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = cancel.cancelled() => {
                    return self.finish(test, PlayStatus::Cancelled { index }, executed, started);
                }
            }

            self.emit(PlaybackEvent::StepStarted {
                test_name: test.name.clone(),
                index,
                description: step.description(),
            });

            if let Err(error) = self.execute(step).await {
                log::warn!("Step {} of '{}' failed: {}", index, test.name, error);
                self.emit(PlaybackEvent::StepFailed {
                    test_name: test.name.clone(),
                    index,
                    error: error.to_string(),
                });
                return self.finish(test, PlayStatus::Failed { index, error }, executed, started);
            }

            executed += 1;
            self.emit(PlaybackEvent::StepPassed {
                test_name: test.name.clone(),
                index,
            });
        }

        self.finish(test, PlayStatus::Passed, executed, started)
    }

    /// Wait before the next step: the recorded gap scaled by speed, capped
    /// by `max_step_delay_ms`.
    fn delay_between(&self, previous: f64, current: f64) -> Duration {
        let gap = (current - previous).max(0.0) / self.config.speed;
        // Too large to represent: saturate, the cap may still bring it back
        let delay = Duration::try_from_secs_f64(gap).unwrap_or(Duration::MAX);
        match self.config.max_step_delay_ms {
            Some(max) => delay.min(Duration::from_millis(max)),
            None => delay,
        }
    }

    async fn execute(&self, step: &Step) -> Result<(), PlayerError> {
        log::debug!("Executing {}", step.description());
        match &step.action {
            StepAction::MouseClick { x, y, button } => {
                self.synth.mouse_click(*x, *y, *button).await
            }
            StepAction::MouseMove { x, y } => self.synth.mouse_move(*x, *y).await,
            StepAction::KeyPress { key } => {
                let key = KeyInput::parse(key).ok_or_else(|| PlayerError::UnknownKey(key.clone()))?;
                self.synth.key_press(key).await
            }
            StepAction::Unsupported { kind } => {
                Err(PlayerError::UnsupportedStepType { kind: kind.clone() })
            }
        }
    }

    fn finish(
        &self,
        test: &Test,
        status: PlayStatus,
        steps_executed: usize,
        started: Instant,
    ) -> PlayResult {
        let duration = started.elapsed();
        match &status {
            PlayStatus::Passed => log::info!(
                "Test '{}' passed ({} steps, {}ms)",
                test.name,
                steps_executed,
                duration.as_millis()
            ),
            PlayStatus::Failed { index, error } => {
                log::info!("Test '{}' failed at step {}: {}", test.name, index, error)
            }
            PlayStatus::Cancelled { index } => {
                log::info!("Test '{}' cancelled before step {}", test.name, index)
            }
        }
        PlayResult {
            test_id: test.id.clone(),
            status,
            steps_executed,
            duration,
        }
    }
}
