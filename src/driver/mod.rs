//! Platform input backends behind the recorder and player seams

#[cfg(feature = "native-input")]
pub mod native;

use anyhow::Result;
use std::sync::Arc;

use crate::player::{DryRunSynthesizer, InputSynthesizer};
use crate::recorder::DeviceListener;

/// Whether this build can hook and synthesize OS input
pub fn native_input_available() -> bool {
    cfg!(feature = "native-input")
}

/// Synthesizer for playback: the OS backend, or a logging stand-in for dry runs
pub fn synthesizer(dry_run: bool) -> Arc<dyn InputSynthesizer> {
    if dry_run {
        return Arc::new(DryRunSynthesizer);
    }

    #[cfg(feature = "native-input")]
    {
        Arc::new(native::NativeSynthesizer)
    }

    #[cfg(not(feature = "native-input"))]
    {
        log::warn!("Built without native input support, playing back as dry run");
        Arc::new(DryRunSynthesizer)
    }
}

/// OS-wide pointer and keyboard listener for live recording
pub fn device_listener() -> Result<Box<dyn DeviceListener>> {
    #[cfg(feature = "native-input")]
    {
        Ok(Box::new(native::NativeListener::new()))
    }

    #[cfg(not(feature = "native-input"))]
    {
        anyhow::bail!("Recording needs a build with the `native-input` feature")
    }
}
