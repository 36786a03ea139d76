//! Device listener seam between OS input hooks and the recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::input::{InputKind, RawInputEvent};
use crate::error::RecorderError;

/// Producer end of a recording session's event channel.
///
/// Listeners keep a clone for as long as they are attached. Once the session
/// stops, the sink is closed and every further event is discarded.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<RawInputEvent>,
    open: Arc<AtomicBool>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<RawInputEvent>, open: Arc<AtomicBool>) -> Self {
        Self { tx, open }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Deliver an event, waiting for channel capacity.
    /// Returns false if the event was discarded.
    pub async fn send(&self, event: RawInputEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    /// Deliver an event without waiting; for OS hook threads that must not
    /// block. A full channel drops the event.
    pub fn try_send(&self, event: RawInputEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                log::warn!("Event channel full, dropping {:?}", event.kind);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// A source of raw input events (pointer, keyboard, or an OS-wide hook).
pub trait DeviceListener: Send {
    fn name(&self) -> &str;

    /// Start delivering events into `sink`.
    fn attach(&mut self, sink: EventSink) -> Result<(), RecorderError>;

    /// Stop delivering events. Called once per session on stop.
    fn detach(&mut self) -> Result<(), RecorderError>;
}

type SinkSlot = Arc<Mutex<Option<EventSink>>>;

/// Listener fed programmatically through a [`ManualFeed`].
///
/// Used for scripted recordings and by callers that capture input
/// themselves (e.g. a UI front-end forwarding its own events).
pub struct ManualListener {
    name: String,
    slot: SinkSlot,
}

/// Handle that pushes events into a [`ManualListener`]
#[derive(Clone)]
pub struct ManualFeed {
    slot: SinkSlot,
}

impl ManualListener {
    pub fn new(name: &str) -> (Self, ManualFeed) {
        let slot: SinkSlot = Arc::new(Mutex::new(None));
        (
            Self {
                name: name.to_string(),
                slot: slot.clone(),
            },
            ManualFeed { slot },
        )
    }
}

impl DeviceListener for ManualListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, sink: EventSink) -> Result<(), RecorderError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| RecorderError::DeviceListenerFailure {
                listener: self.name.clone(),
                reason: e.to_string(),
            })?;
        *slot = Some(sink);
        Ok(())
    }

    fn detach(&mut self) -> Result<(), RecorderError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| RecorderError::DeviceListenerFailure {
                listener: self.name.clone(),
                reason: e.to_string(),
            })?;
        *slot = None;
        Ok(())
    }
}

impl ManualFeed {
    fn sink(&self) -> Option<EventSink> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn is_attached(&self) -> bool {
        self.sink().is_some()
    }

    /// Push an event; false when no session is listening.
    pub async fn send(&self, event: RawInputEvent) -> bool {
        match self.sink() {
            Some(sink) => sink.send(event).await,
            None => false,
        }
    }

    /// Push an event stamped with the current instant.
    pub async fn send_now(&self, kind: InputKind) -> bool {
        self.send(RawInputEvent::now(kind)).await
    }
}
