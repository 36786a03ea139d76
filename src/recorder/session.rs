use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::clock::RecordingClock;
use super::input::RawInputEvent;
use super::listener::{DeviceListener, EventSink};
use crate::error::RecorderError;
use crate::model::{Step, Test};
use crate::utils::config::RecorderConfig;

type SharedClock = Arc<StdMutex<RecordingClock>>;

/// State of the one live recording session
struct ActiveSession {
    test_id: String,
    clock: SharedClock,
    open: Arc<AtomicBool>,
    stop_tx: oneshot::Sender<()>,
    consumer: JoinHandle<Vec<Step>>,
}

/// Recording-session manager.
///
/// Owns the device listeners and at most one active session. Listeners
/// deliver raw events through a bounded channel to a single consumer task,
/// which is the only writer of the session's step buffer. The bound test is
/// tracked by id; its steps are handed back on stop.
pub struct Recorder {
    config: RecorderConfig,
    listeners: Mutex<Vec<Box<dyn DeviceListener>>>,
    active: Mutex<Option<ActiveSession>>,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            listeners: Mutex::new(Vec::new()),
            active: Mutex::new(None),
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn DeviceListener>) -> Self {
        self.listeners.get_mut().push(listener);
        self
    }

    pub async fn is_recording(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Id of the test bound to the active session
    pub async fn bound_test_id(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|s| s.test_id.clone())
    }

    /// Instant the active session started at
    pub async fn started_at(&self) -> Option<Instant> {
        let active = self.active.lock().await;
        let session = active.as_ref()?;
        let clock = session.clock.lock().ok()?;
        Some(clock.started_at())
    }

    /// Begin recording into `test`, replacing its steps.
    pub async fn start_recording(&self, test: &mut Test) -> Result<(), RecorderError> {
        // Held for the whole call: check-and-set is atomic.
        let mut active = self.active.lock().await;
        if let Some(session) = active.as_ref() {
            return Err(RecorderError::AlreadyRecording {
                test_id: session.test_id.clone(),
            });
        }

        let capacity = self.config.channel_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let open = Arc::new(AtomicBool::new(true));
        let clock: SharedClock = Arc::new(StdMutex::new(RecordingClock::start(Instant::now())));

        let consumer = tokio::spawn(consume_events(
            rx,
            stop_rx,
            clock.clone(),
            self.config.capture_mouse_moves,
        ));

        let mut listeners = self.listeners.lock().await;
        let mut attached = 0;
        for listener in listeners.iter_mut() {
            match listener.attach(EventSink::new(tx.clone(), open.clone())) {
                Ok(()) => attached += 1,
                Err(e) => log::warn!("Listener '{}' failed to attach: {}", listener.name(), e),
            }
        }
        if attached == 0 && !listeners.is_empty() {
            log::warn!("No device listener attached; nothing will be captured");
        }

        test.steps.clear();
        test.is_recording = true;
        test.is_paused = false;

        log::info!(
            "Recording started for test '{}' ({} listener(s))",
            test.name,
            attached
        );

        *active = Some(ActiveSession {
            test_id: test.id.clone(),
            clock,
            open,
            stop_tx,
            consumer,
        });

        Ok(())
    }

    /// Suspend capture without discarding steps; no-op if already paused.
    pub async fn pause_recording(&self, test: &mut Test) -> Result<(), RecorderError> {
        let active = self.active.lock().await;
        let session = bound_session(active.as_ref(), test)?;
        if let Ok(mut clock) = session.clock.lock() {
            if !clock.pause(Instant::now()) {
                log::debug!("Recording for '{}' already paused", test.name);
            }
        }
        test.is_paused = true;
        log::info!("Recording paused for test '{}'", test.name);
        Ok(())
    }

    /// Resume capture after a pause; no-op if not paused.
    pub async fn resume_recording(&self, test: &mut Test) -> Result<(), RecorderError> {
        let active = self.active.lock().await;
        let session = bound_session(active.as_ref(), test)?;
        if let Ok(mut clock) = session.clock.lock() {
            if !clock.resume(Instant::now()) {
                log::debug!("Recording for '{}' was not paused", test.name);
            }
        }
        test.is_paused = false;
        log::info!("Recording resumed for test '{}'", test.name);
        Ok(())
    }

    /// Pause a running session or resume a paused one.
    /// Returns true when the session is now paused.
    pub async fn toggle_pause(&self, test: &mut Test) -> Result<bool, RecorderError> {
        let paused = {
            let active = self.active.lock().await;
            let session = bound_session(active.as_ref(), test)?;
            let paused = session.clock.lock().map(|clock| clock.is_paused());
            paused.unwrap_or(test.is_paused)
        };
        if paused {
            self.resume_recording(test).await?;
        } else {
            self.pause_recording(test).await?;
        }
        Ok(!paused)
    }

    /// Finish the session, moving the captured steps into `test`.
    pub async fn stop_recording<'t>(&self, test: &'t mut Test) -> Result<&'t [Step], RecorderError> {
        let mut active = self.active.lock().await;
        bound_session(active.as_ref(), test)?;
        let session = match active.take() {
            Some(session) => session,
            None => return Err(RecorderError::NotRecording),
        };

        // Close first so nothing new is accepted, then detach.
        session.open.store(false, Ordering::SeqCst);
        for listener in self.listeners.lock().await.iter_mut() {
            if let Err(e) = listener.detach() {
                log::warn!("Listener '{}' failed to detach: {}", listener.name(), e);
            }
        }

        let _ = session.stop_tx.send(());
        let steps = match session.consumer.await {
            Ok(steps) => steps,
            Err(e) => {
                log::error!("Recording consumer for '{}' failed: {}", test.name, e);
                Vec::new()
            }
        };

        test.steps = steps;
        test.is_recording = false;
        test.is_paused = false;

        log::info!(
            "Recording stopped for test '{}': {} step(s)",
            test.name,
            test.steps.len()
        );

        Ok(&test.steps)
    }
}

fn bound_session<'a>(
    active: Option<&'a ActiveSession>,
    test: &Test,
) -> Result<&'a ActiveSession, RecorderError> {
    let session = active.ok_or(RecorderError::NotRecording)?;
    if session.test_id != test.id {
        return Err(RecorderError::WrongTest {
            bound: session.test_id.clone(),
            requested: test.id.clone(),
        });
    }
    Ok(session)
}

/// Single writer of the session's steps. Runs until stopped, then drains
/// whatever was queued before the sink closed.
async fn consume_events(
    mut rx: mpsc::Receiver<RawInputEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    clock: SharedClock,
    capture_mouse_moves: bool,
) -> Vec<Step> {
    let mut steps = Vec::new();

    loop {
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Some(event) => append_event(&mut steps, &event, &clock, capture_mouse_moves),
                None => break,
            },
            _ = &mut stop_rx => break,
        }
    }

    while let Ok(event) = rx.try_recv() {
        append_event(&mut steps, &event, &clock, capture_mouse_moves);
    }

    steps
}

fn append_event(
    steps: &mut Vec<Step>,
    event: &RawInputEvent,
    clock: &SharedClock,
    capture_mouse_moves: bool,
) {
    if event.is_mouse_move() && !capture_mouse_moves {
        return;
    }

    let offset = match clock.lock() {
        Ok(clock) => clock.offset_of(event.at),
        Err(e) => {
            log::error!("Recording clock unavailable: {}", e);
            return;
        }
    };
    let Some(offset) = offset else {
        log::debug!("Paused, dropping {:?}", event.kind);
        return;
    };

    let step = Step::new(event.to_action(), offset.as_secs_f64());
    log::debug!("Captured {} at {:.3}s", step.description(), step.offset_seconds);

    // Stable insert by offset: keeps the sequence non-decreasing even when
    // two listeners deliver slightly out of order.
    let position = steps.partition_point(|s| s.offset_seconds <= step.offset_seconds);
    steps.insert(position, step);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{is_time_ordered, KeyInput, MouseButton, StepAction};
    use crate::recorder::input::InputKind;
    use crate::recorder::listener::{ManualFeed, ManualListener};
    use std::time::Duration;

    struct FailingListener;

    impl DeviceListener for FailingListener {
        fn name(&self) -> &str {
            "broken"
        }

        fn attach(&mut self, _sink: EventSink) -> Result<(), RecorderError> {
            Err(RecorderError::DeviceListenerFailure {
                listener: "broken".to_string(),
                reason: "no display".to_string(),
            })
        }

        fn detach(&mut self) -> Result<(), RecorderError> {
            Err(RecorderError::DeviceListenerFailure {
                listener: "broken".to_string(),
                reason: "hook already gone".to_string(),
            })
        }
    }

    fn recorder_with_feed(config: RecorderConfig) -> (Recorder, ManualFeed) {
        let (listener, feed) = ManualListener::new("manual");
        (Recorder::new(config).with_listener(Box::new(listener)), feed)
    }

    fn click(x: i32, y: i32) -> InputKind {
        InputKind::MouseDown {
            x,
            y,
            button: MouseButton::Left,
        }
    }

    #[tokio::test]
    async fn test_click_then_key_scenario() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut test = Test::new("T");

        recorder.start_recording(&mut test).await.unwrap();
        assert!(test.is_recording);
        let start = recorder.started_at().await.unwrap();

        assert!(
            feed.send(RawInputEvent::new(click(10, 20), start + Duration::from_millis(500)))
                .await
        );
        assert!(
            feed.send(RawInputEvent::new(
                InputKind::KeyDown(KeyInput::Char('a')),
                start + Duration::from_millis(1200)
            ))
            .await
        );

        let steps = recorder.stop_recording(&mut test).await.unwrap().to_vec();
        assert_eq!(
            steps,
            vec![
                Step::mouse_click(10, 20, MouseButton::Left, 0.5),
                Step::key_press("a", 1.2),
            ]
        );
        assert_eq!(test.steps, steps);
        assert!(!test.is_recording);
        assert!(!recorder.is_recording().await);
    }

    #[tokio::test]
    async fn test_start_clears_previous_steps() {
        let (recorder, _feed) = recorder_with_feed(RecorderConfig::default());
        let mut test = Test::new("T");
        test.steps.push(Step::key_press("x", 0.0));

        recorder.start_recording(&mut test).await.unwrap();
        assert!(test.steps.is_empty());
        let steps = recorder.stop_recording(&mut test).await.unwrap();
        assert!(steps.is_empty());
    }

    #[tokio::test]
    async fn test_second_start_rejected_without_touching_first_session() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut first = Test::new("first");
        let mut second = Test::new("second");
        second.steps.push(Step::key_press("z", 0.0));

        recorder.start_recording(&mut first).await.unwrap();
        assert!(feed.send_now(click(1, 1)).await);

        let err = recorder.start_recording(&mut second).await.unwrap_err();
        assert_eq!(
            err,
            RecorderError::AlreadyRecording {
                test_id: first.id.clone()
            }
        );
        assert_eq!(second.steps.len(), 1);
        assert!(!second.is_recording);
        assert_eq!(recorder.bound_test_id().await, Some(first.id.clone()));

        assert!(feed.send_now(click(2, 2)).await);
        let steps = recorder.stop_recording(&mut first).await.unwrap();
        assert_eq!(steps.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_operations_fail_with_not_recording() {
        let recorder = Recorder::new(RecorderConfig::default());
        let mut test = Test::new("idle");

        assert_eq!(
            recorder.stop_recording(&mut test).await.unwrap_err(),
            RecorderError::NotRecording
        );
        assert_eq!(
            recorder.pause_recording(&mut test).await.unwrap_err(),
            RecorderError::NotRecording
        );
        assert_eq!(
            recorder.resume_recording(&mut test).await.unwrap_err(),
            RecorderError::NotRecording
        );
        assert!(!test.is_paused);
    }

    #[tokio::test]
    async fn test_stop_for_unbound_test_is_rejected() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut bound = Test::new("bound");
        let mut other = Test::new("other");

        recorder.start_recording(&mut bound).await.unwrap();
        feed.send_now(click(5, 5)).await;

        let err = recorder.stop_recording(&mut other).await.unwrap_err();
        assert!(matches!(err, RecorderError::WrongTest { .. }));
        assert!(recorder.is_recording().await);

        assert_eq!(recorder.stop_recording(&mut bound).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_gates_capture_and_excludes_paused_time() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut test = Test::new("paused");

        recorder.start_recording(&mut test).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(feed.send_now(click(1, 1)).await);
        tokio::time::advance(Duration::from_millis(100)).await;

        recorder.pause_recording(&mut test).await.unwrap();
        assert!(test.is_paused);
        tokio::time::advance(Duration::from_secs(2)).await;
        feed.send_now(click(2, 2)).await;
        tokio::time::advance(Duration::from_secs(3)).await;

        recorder.resume_recording(&mut test).await.unwrap();
        assert!(!test.is_paused);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(feed.send_now(click(3, 3)).await);

        let steps = recorder.stop_recording(&mut test).await.unwrap();
        assert_eq!(
            steps,
            &[
                Step::mouse_click(1, 1, MouseButton::Left, 1.0),
                Step::mouse_click(3, 3, MouseButton::Left, 2.1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_pause_alternates() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut test = Test::new("toggled");

        assert_eq!(
            recorder.toggle_pause(&mut test).await.unwrap_err(),
            RecorderError::NotRecording
        );

        recorder.start_recording(&mut test).await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(recorder.toggle_pause(&mut test).await.unwrap());
        assert!(test.is_paused);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!recorder.toggle_pause(&mut test).await.unwrap());
        assert!(!test.is_paused);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(feed.send_now(InputKind::KeyDown(KeyInput::Char('q'))).await);

        let steps = recorder.stop_recording(&mut test).await.unwrap();
        assert_eq!(steps, &[Step::key_press("q", 0.75)]);
    }

    #[tokio::test]
    async fn test_out_of_order_delivery_is_sorted_by_offset() {
        let (pointer, pointer_feed) = ManualListener::new("pointer");
        let (keyboard, keyboard_feed) = ManualListener::new("keyboard");
        let recorder = Recorder::new(RecorderConfig::default())
            .with_listener(Box::new(pointer))
            .with_listener(Box::new(keyboard));
        let mut test = Test::new("interleaved");

        recorder.start_recording(&mut test).await.unwrap();
        let start = recorder.started_at().await.unwrap();
        let at = |ms| start + Duration::from_millis(ms);

        pointer_feed
            .send(RawInputEvent::new(click(1, 1), at(300)))
            .await;
        keyboard_feed
            .send(RawInputEvent::new(InputKind::KeyDown(KeyInput::Char('k')), at(100)))
            .await;
        pointer_feed
            .send(RawInputEvent::new(click(2, 2), at(300)))
            .await;

        let steps = recorder.stop_recording(&mut test).await.unwrap();
        assert!(is_time_ordered(steps));
        assert_eq!(steps[0], Step::key_press("k", 0.1));
        // equal offsets keep delivery order
        assert_eq!(
            steps[1].action,
            StepAction::MouseClick {
                x: 1,
                y: 1,
                button: MouseButton::Left
            }
        );
    }

    #[tokio::test]
    async fn test_mouse_moves_only_captured_when_enabled() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut test = Test::new("moves");
        recorder.start_recording(&mut test).await.unwrap();
        feed.send_now(InputKind::MouseMove { x: 4, y: 4 }).await;
        assert!(recorder.stop_recording(&mut test).await.unwrap().is_empty());

        let config = RecorderConfig {
            capture_mouse_moves: true,
            ..RecorderConfig::default()
        };
        let (recorder, feed) = recorder_with_feed(config);
        recorder.start_recording(&mut test).await.unwrap();
        feed.send_now(InputKind::MouseMove { x: 4, y: 4 }).await;
        let steps = recorder.stop_recording(&mut test).await.unwrap();
        assert_eq!(steps[0].action, StepAction::MouseMove { x: 4, y: 4 });
    }

    #[tokio::test]
    async fn test_listener_failures_do_not_abort_recording() {
        let (manual, feed) = ManualListener::new("manual");
        let recorder = Recorder::new(RecorderConfig::default())
            .with_listener(Box::new(FailingListener))
            .with_listener(Box::new(manual));
        let mut test = Test::new("resilient");

        recorder.start_recording(&mut test).await.unwrap();
        assert!(feed.send_now(click(7, 7)).await);

        let steps = recorder.stop_recording(&mut test).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert!(!recorder.is_recording().await);
    }

    #[tokio::test]
    async fn test_events_after_stop_are_discarded() {
        let (recorder, feed) = recorder_with_feed(RecorderConfig::default());
        let mut test = Test::new("closed");

        recorder.start_recording(&mut test).await.unwrap();
        recorder.stop_recording(&mut test).await.unwrap();
        assert!(!feed.send_now(click(1, 1)).await);

        // the recorder is reusable for the next session
        recorder.start_recording(&mut test).await.unwrap();
        assert!(feed.send_now(click(1, 1)).await);
        assert_eq!(recorder.stop_recording(&mut test).await.unwrap().len(), 1);
    }
}
