use tokio::time::Instant;

use crate::model::{KeyInput, MouseButton, StepAction};

/// Raw device event as delivered by a listener, before it becomes a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    MouseDown { x: i32, y: i32, button: MouseButton },
    MouseMove { x: i32, y: i32 },
    KeyDown(KeyInput),
}

/// An input event stamped with the instant the device reported it.
///
/// All listeners stamp with the same monotonic clock, so events from the
/// pointer and keyboard listeners can be ordered against each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawInputEvent {
    pub kind: InputKind,
    pub at: Instant,
}

impl RawInputEvent {
    pub fn new(kind: InputKind, at: Instant) -> Self {
        Self { kind, at }
    }

    pub fn now(kind: InputKind) -> Self {
        Self::new(kind, Instant::now())
    }

    pub fn is_mouse_move(&self) -> bool {
        matches!(self.kind, InputKind::MouseMove { .. })
    }

    pub fn to_action(&self) -> StepAction {
        match self.kind {
            InputKind::MouseDown { x, y, button } => StepAction::MouseClick { x, y, button },
            InputKind::MouseMove { x, y } => StepAction::MouseMove { x, y },
            InputKind::KeyDown(key) => StepAction::KeyPress {
                key: key.to_string(),
            },
        }
    }
}
