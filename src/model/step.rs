use serde::{Deserialize, Serialize};
use std::fmt;

/// Mouse button of a click step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// What a step does when replayed
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    MouseClick { x: i32, y: i32, button: MouseButton },
    MouseMove { x: i32, y: i32 },
    KeyPress { key: String },
    /// A stored step whose `type` this build does not know.
    /// Loading keeps it so playback can reject it at the right index.
    Unsupported { kind: String },
}

impl StepAction {
    /// The `type` tag used in the stored form
    pub fn kind(&self) -> &str {
        match self {
            StepAction::MouseClick { .. } => "mouse_click",
            StepAction::MouseMove { .. } => "mouse_move",
            StepAction::KeyPress { .. } => "key_press",
            StepAction::Unsupported { kind } => kind,
        }
    }
}

/// One recorded input event with its offset from the start of recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StepRecord", into = "StepRecord")]
pub struct Step {
    pub action: StepAction,
    pub offset_seconds: f64,
}

impl Step {
    pub fn new(action: StepAction, offset_seconds: f64) -> Self {
        Self {
            action,
            offset_seconds: round_offset(offset_seconds),
        }
    }

    pub fn mouse_click(x: i32, y: i32, button: MouseButton, offset_seconds: f64) -> Self {
        Self::new(StepAction::MouseClick { x, y, button }, offset_seconds)
    }

    pub fn mouse_move(x: i32, y: i32, offset_seconds: f64) -> Self {
        Self::new(StepAction::MouseMove { x, y }, offset_seconds)
    }

    pub fn key_press(key: impl Into<String>, offset_seconds: f64) -> Self {
        Self::new(StepAction::KeyPress { key: key.into() }, offset_seconds)
    }

    /// Human readable description for logs and console output
    pub fn description(&self) -> String {
        match &self.action {
            StepAction::MouseClick { x, y, button } => {
                format!("{} click at ({}, {})", button, x, y)
            }
            StepAction::MouseMove { x, y } => format!("move to ({}, {})", x, y),
            StepAction::KeyPress { key } => format!("press '{}'", key),
            StepAction::Unsupported { kind } => format!("unsupported '{}'", kind),
        }
    }
}

/// Offsets are kept at microsecond precision so stored values are stable.
fn round_offset(secs: f64) -> f64 {
    (secs * 1_000_000.0).round() / 1_000_000.0
}

/// Flat stored form of a step: `{"type": "...", "x": .., "offset_seconds": ..}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    button: Option<MouseButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    offset_seconds: f64,
}

impl TryFrom<StepRecord> for Step {
    type Error = String;

    fn try_from(record: StepRecord) -> Result<Self, Self::Error> {
        let require = |value: Option<i32>, field: &str| {
            value.ok_or_else(|| format!("{} step is missing '{}'", record.kind, field))
        };

        let action = match record.kind.as_str() {
            "mouse_click" => StepAction::MouseClick {
                x: require(record.x, "x")?,
                y: require(record.y, "y")?,
                button: record.button.unwrap_or(MouseButton::Left),
            },
            "mouse_move" => StepAction::MouseMove {
                x: require(record.x, "x")?,
                y: require(record.y, "y")?,
            },
            "key_press" => StepAction::KeyPress {
                key: record
                    .key
                    .clone()
                    .ok_or_else(|| "key_press step is missing 'key'".to_string())?,
            },
            other => StepAction::Unsupported {
                kind: other.to_string(),
            },
        };

        if !record.offset_seconds.is_finite() || record.offset_seconds < 0.0 {
            return Err(format!(
                "invalid offset_seconds {} on {} step",
                record.offset_seconds, record.kind
            ));
        }

        Ok(Step {
            action,
            offset_seconds: record.offset_seconds,
        })
    }
}

impl From<Step> for StepRecord {
    fn from(step: Step) -> Self {
        let mut record = StepRecord {
            kind: step.action.kind().to_string(),
            x: None,
            y: None,
            button: None,
            key: None,
            offset_seconds: step.offset_seconds,
        };
        match step.action {
            StepAction::MouseClick { x, y, button } => {
                record.x = Some(x);
                record.y = Some(y);
                record.button = Some(button);
            }
            StepAction::MouseMove { x, y } => {
                record.x = Some(x);
                record.y = Some(y);
            }
            StepAction::KeyPress { key } => record.key = Some(key),
            StepAction::Unsupported { .. } => {}
        }
        record
    }
}

/// True when offsets never go backwards
pub fn is_time_ordered(steps: &[Step]) -> bool {
    first_out_of_order(steps).is_none()
}

/// Index of the first step whose offset is below its predecessor's
pub fn first_out_of_order(steps: &[Step]) -> Option<usize> {
    steps
        .windows(2)
        .position(|pair| pair[1].offset_seconds < pair[0].offset_seconds)
        .map(|i| i + 1)
}
