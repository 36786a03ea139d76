//! OS input hook and synthesis via `rdev`.
//!
//! `rdev::listen` blocks its thread for the life of the process and cannot be
//! unhooked, so one hook thread is started on first use and forwards into
//! whichever session sink is currently installed in a global slot.

use async_trait::async_trait;
use rdev::{Button, EventType, Key};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{PlayerError, RecorderError};
use crate::model::{KeyInput, MouseButton, NamedKey};
use crate::player::InputSynthesizer;
use crate::recorder::{DeviceListener, EventSink, InputKind, RawInputEvent};

/// Pause between synthesized events so the OS registers each one
const SIMULATE_GAP: Duration = Duration::from_millis(20);

#[derive(Default)]
struct HookState {
    sink: Option<EventSink>,
    started: bool,
    failure: Option<String>,
}

static HOOK: OnceLock<Mutex<HookState>> = OnceLock::new();

fn hook_slot() -> &'static Mutex<HookState> {
    HOOK.get_or_init(|| Mutex::new(HookState::default()))
}

fn current_sink() -> Option<EventSink> {
    hook_slot().lock().ok().and_then(|state| state.sink.clone())
}

fn spawn_hook_thread() -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("rdev-hook".to_string())
        .spawn(|| {
            let mut last_position = (0.0_f64, 0.0_f64);
            let result = rdev::listen(move |event| {
                // Stamp before anything else; the lock below may wait.
                let at = Instant::now();
                let kind = match event.event_type {
                    EventType::MouseMove { x, y } => {
                        last_position = (x, y);
                        InputKind::MouseMove {
                            x: x.round() as i32,
                            y: y.round() as i32,
                        }
                    }
                    EventType::ButtonPress(button) => match mouse_button(button) {
                        Some(button) => InputKind::MouseDown {
                            x: last_position.0.round() as i32,
                            y: last_position.1.round() as i32,
                            button,
                        },
                        None => return,
                    },
                    EventType::KeyPress(key) => match captured_key(key, event.name.as_deref()) {
                        Some(key) => InputKind::KeyDown(key),
                        None => {
                            log::debug!("Ignoring unmapped key {:?}", key);
                            return;
                        }
                    },
                    _ => return,
                };
                if let Some(sink) = current_sink() {
                    sink.try_send(RawInputEvent::new(kind, at));
                }
            });

            if let Err(e) = result {
                log::error!("Input hook stopped: {:?}", e);
                if let Ok(mut state) = hook_slot().lock() {
                    state.failure = Some(format!("{:?}", e));
                    state.sink = None;
                }
            }
        })
        .map(|_| ())
}

/// Pointer and keyboard listener backed by the OS-wide hook
#[derive(Debug, Default)]
pub struct NativeListener;

impl NativeListener {
    pub fn new() -> Self {
        Self
    }

    fn failure(&self, reason: impl ToString) -> RecorderError {
        RecorderError::DeviceListenerFailure {
            listener: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl DeviceListener for NativeListener {
    fn name(&self) -> &str {
        "native"
    }

    fn attach(&mut self, sink: EventSink) -> Result<(), RecorderError> {
        let mut state = hook_slot().lock().map_err(|e| self.failure(e))?;
        if let Some(reason) = &state.failure {
            return Err(self.failure(reason));
        }
        if !state.started {
            spawn_hook_thread().map_err(|e| self.failure(e))?;
            state.started = true;
            log::info!("Input hook started");
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn detach(&mut self) -> Result<(), RecorderError> {
        let mut state = hook_slot().lock().map_err(|e| self.failure(e))?;
        state.sink = None;
        Ok(())
    }
}

/// Plays steps back as real OS input
#[derive(Debug, Default)]
pub struct NativeSynthesizer;

impl NativeSynthesizer {
    async fn simulate(&self, events: Vec<EventType>) -> Result<(), PlayerError> {
        tokio::task::spawn_blocking(move || {
            for event in &events {
                rdev::simulate(event)
                    .map_err(|_| PlayerError::Synthesis(format!("could not send {:?}", event)))?;
                std::thread::sleep(SIMULATE_GAP);
            }
            Ok(())
        })
        .await
        .map_err(|e| PlayerError::Synthesis(e.to_string()))?
    }
}

#[async_trait]
impl InputSynthesizer for NativeSynthesizer {
    fn name(&self) -> &str {
        "native"
    }

    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), PlayerError> {
        self.simulate(vec![EventType::MouseMove {
            x: x as f64,
            y: y as f64,
        }])
        .await
    }

    async fn mouse_click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), PlayerError> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        self.simulate(vec![
            EventType::MouseMove {
                x: x as f64,
                y: y as f64,
            },
            EventType::ButtonPress(button),
            EventType::ButtonRelease(button),
        ])
        .await
    }

    async fn key_press(&self, key: KeyInput) -> Result<(), PlayerError> {
        let (key, shifted) = rdev_key(key).ok_or_else(|| PlayerError::UnknownKey(key.to_string()))?;
        let mut events = Vec::with_capacity(4);
        if shifted {
            events.push(EventType::KeyPress(Key::ShiftLeft));
        }
        events.push(EventType::KeyPress(key));
        events.push(EventType::KeyRelease(key));
        if shifted {
            events.push(EventType::KeyRelease(Key::ShiftLeft));
        }
        self.simulate(events).await
    }
}

fn mouse_button(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(_) => None,
    }
}

fn named_key(key: Key) -> Option<NamedKey> {
    let named = match key {
        Key::UpArrow => NamedKey::ArrowUp,
        Key::DownArrow => NamedKey::ArrowDown,
        Key::LeftArrow => NamedKey::ArrowLeft,
        Key::RightArrow => NamedKey::ArrowRight,
        Key::ShiftLeft | Key::ShiftRight => NamedKey::Shift,
        Key::ControlLeft | Key::ControlRight => NamedKey::Control,
        Key::Alt | Key::AltGr => NamedKey::Alt,
        Key::MetaLeft | Key::MetaRight => NamedKey::Meta,
        Key::CapsLock => NamedKey::CapsLock,
        Key::Return | Key::KpReturn => NamedKey::Enter,
        Key::Tab => NamedKey::Tab,
        Key::Backspace => NamedKey::Backspace,
        Key::Delete => NamedKey::Delete,
        Key::Escape => NamedKey::Escape,
        Key::Home => NamedKey::Home,
        Key::End => NamedKey::End,
        Key::PageUp => NamedKey::PageUp,
        Key::PageDown => NamedKey::PageDown,
        Key::Insert => NamedKey::Insert,
        Key::F1 => NamedKey::F(1),
        Key::F2 => NamedKey::F(2),
        Key::F3 => NamedKey::F(3),
        Key::F4 => NamedKey::F(4),
        Key::F5 => NamedKey::F(5),
        Key::F6 => NamedKey::F(6),
        Key::F7 => NamedKey::F(7),
        Key::F8 => NamedKey::F(8),
        Key::F9 => NamedKey::F(9),
        Key::F10 => NamedKey::F(10),
        Key::F11 => NamedKey::F(11),
        Key::F12 => NamedKey::F(12),
        _ => return None,
    };
    Some(named)
}

fn named_to_rdev(key: NamedKey) -> Option<Key> {
    let key = match key {
        NamedKey::ArrowUp => Key::UpArrow,
        NamedKey::ArrowDown => Key::DownArrow,
        NamedKey::ArrowLeft => Key::LeftArrow,
        NamedKey::ArrowRight => Key::RightArrow,
        NamedKey::Shift => Key::ShiftLeft,
        NamedKey::Control => Key::ControlLeft,
        NamedKey::Alt => Key::Alt,
        NamedKey::Meta => Key::MetaLeft,
        NamedKey::CapsLock => Key::CapsLock,
        NamedKey::Enter => Key::Return,
        NamedKey::Tab => Key::Tab,
        NamedKey::Backspace => Key::Backspace,
        NamedKey::Delete => Key::Delete,
        NamedKey::Escape => Key::Escape,
        NamedKey::Home => Key::Home,
        NamedKey::End => Key::End,
        NamedKey::PageUp => Key::PageUp,
        NamedKey::PageDown => Key::PageDown,
        NamedKey::Insert => Key::Insert,
        NamedKey::F(n) => {
            const F_KEYS: [Key; 12] = [
                Key::F1,
                Key::F2,
                Key::F3,
                Key::F4,
                Key::F5,
                Key::F6,
                Key::F7,
                Key::F8,
                Key::F9,
                Key::F10,
                Key::F11,
                Key::F12,
            ];
            return F_KEYS.get((n as usize).checked_sub(1)?).copied();
        }
    };
    Some(key)
}

// US layout: (unshifted, shifted, key)
const CHAR_KEYS: [(char, char, Key); 47] = [
    ('a', 'A', Key::KeyA),
    ('b', 'B', Key::KeyB),
    ('c', 'C', Key::KeyC),
    ('d', 'D', Key::KeyD),
    ('e', 'E', Key::KeyE),
    ('f', 'F', Key::KeyF),
    ('g', 'G', Key::KeyG),
    ('h', 'H', Key::KeyH),
    ('i', 'I', Key::KeyI),
    ('j', 'J', Key::KeyJ),
    ('k', 'K', Key::KeyK),
    ('l', 'L', Key::KeyL),
    ('m', 'M', Key::KeyM),
    ('n', 'N', Key::KeyN),
    ('o', 'O', Key::KeyO),
    ('p', 'P', Key::KeyP),
    ('q', 'Q', Key::KeyQ),
    ('r', 'R', Key::KeyR),
    ('s', 'S', Key::KeyS),
    ('t', 'T', Key::KeyT),
    ('u', 'U', Key::KeyU),
    ('v', 'V', Key::KeyV),
    ('w', 'W', Key::KeyW),
    ('x', 'X', Key::KeyX),
    ('y', 'Y', Key::KeyY),
    ('z', 'Z', Key::KeyZ),
    ('1', '!', Key::Num1),
    ('2', '@', Key::Num2),
    ('3', '#', Key::Num3),
    ('4', '$', Key::Num4),
    ('5', '%', Key::Num5),
    ('6', '^', Key::Num6),
    ('7', '&', Key::Num7),
    ('8', '*', Key::Num8),
    ('9', '(', Key::Num9),
    ('0', ')', Key::Num0),
    ('-', '_', Key::Minus),
    ('=', '+', Key::Equal),
    ('[', '{', Key::LeftBracket),
    (']', '}', Key::RightBracket),
    (';', ':', Key::SemiColon),
    ('\'', '"', Key::Quote),
    ('\\', '|', Key::BackSlash),
    (',', '<', Key::Comma),
    ('.', '>', Key::Dot),
    ('/', '?', Key::Slash),
    ('`', '~', Key::BackQuote),
];

fn char_key(c: char) -> Option<(Key, bool)> {
    if c == ' ' {
        return Some((Key::Space, false));
    }
    CHAR_KEYS.iter().find_map(|&(plain, shifted, key)| {
        if c == plain {
            Some((key, false))
        } else if c == shifted {
            Some((key, true))
        } else {
            None
        }
    })
}

/// Key to press for `key`, and whether Shift must be held
fn rdev_key(key: KeyInput) -> Option<(Key, bool)> {
    match key {
        KeyInput::Char(c) => char_key(c),
        KeyInput::Named(named) => named_to_rdev(named).map(|key| (key, false)),
    }
}

/// Classify a hooked key press. `name` is the text the OS says it types.
fn captured_key(key: Key, name: Option<&str>) -> Option<KeyInput> {
    if let Some(named) = named_key(key) {
        return Some(KeyInput::from_captured(name, named));
    }
    match name.and_then(KeyInput::parse) {
        Some(KeyInput::Char(c)) => Some(KeyInput::Char(c)),
        _ if key == Key::Space => Some(KeyInput::Char(' ')),
        _ => CHAR_KEYS
            .iter()
            .find(|(_, _, k)| *k == key)
            .map(|(plain, _, _)| KeyInput::Char(*plain)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_text_wins_for_printable_keys() {
        assert_eq!(captured_key(Key::KeyA, Some("A")), Some(KeyInput::Char('A')));
        assert_eq!(captured_key(Key::KeyA, None), Some(KeyInput::Char('a')));
        assert_eq!(captured_key(Key::Space, None), Some(KeyInput::Char(' ')));
    }

    #[test]
    fn test_special_keys_are_named() {
        assert_eq!(
            captured_key(Key::Return, Some("\r")),
            Some(KeyInput::Named(NamedKey::Enter))
        );
        assert_eq!(
            captured_key(Key::ShiftRight, None),
            Some(KeyInput::Named(NamedKey::Shift))
        );
        assert_eq!(captured_key(Key::Unknown(999), None), None);
    }

    #[test]
    fn test_playback_key_mapping() {
        assert_eq!(rdev_key(KeyInput::Char('a')), Some((Key::KeyA, false)));
        assert_eq!(rdev_key(KeyInput::Char('?')), Some((Key::Slash, true)));
        assert_eq!(
            rdev_key(KeyInput::Named(NamedKey::F(12))),
            Some((Key::F12, false))
        );
        assert_eq!(rdev_key(KeyInput::Named(NamedKey::F(13))), None);
        assert_eq!(rdev_key(KeyInput::Char('é')), None);
    }
}
