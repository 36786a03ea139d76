use async_trait::async_trait;

use crate::error::PlayerError;
use crate::model::{KeyInput, MouseButton};

/// Issues simulated input on the target machine.
///
/// Each call should complete the whole gesture (press and release) before
/// returning, so the player's timing covers the action itself.
#[async_trait]
pub trait InputSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), PlayerError>;

    async fn mouse_click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), PlayerError>;

    async fn key_press(&self, key: KeyInput) -> Result<(), PlayerError>;
}

/// Logs every action instead of performing it
#[derive(Debug, Default)]
pub struct DryRunSynthesizer;

#[async_trait]
impl InputSynthesizer for DryRunSynthesizer {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), PlayerError> {
        log::info!("[dry-run] move to ({}, {})", x, y);
        Ok(())
    }

    async fn mouse_click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), PlayerError> {
        log::info!("[dry-run] {} click at ({}, {})", button, x, y);
        Ok(())
    }

    async fn key_press(&self, key: KeyInput) -> Result<(), PlayerError> {
        log::info!("[dry-run] press '{}'", key);
        Ok(())
    }
}
