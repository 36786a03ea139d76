//! Recorder module for capturing live input into test steps
//!
//! This module provides:
//! - Device listeners that turn OS input into raw, timestamped events
//! - A recording-session manager that owns the single active session
//! - Pause-aware elapsed-time accounting for step offsets

pub mod clock;
pub mod input;
pub mod listener;
pub mod session;

pub use clock::RecordingClock;
pub use input::{InputKind, RawInputEvent};
pub use listener::{DeviceListener, EventSink, ManualFeed, ManualListener};
pub use session::Recorder;
