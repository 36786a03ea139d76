use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "rpa-tester.yaml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project store file
    pub store_path: PathBuf,

    pub recorder: RecorderConfig,

    pub playback: PlaybackConfig,

    /// Keep running the remaining tests of a project after one fails
    pub continue_on_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("projects.json"),
            recorder: RecorderConfig::default(),
            playback: PlaybackConfig::default(),
            continue_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Capacity of the listener → recorder event channel
    pub channel_capacity: usize,

    /// Record pointer movement as `mouse_move` steps
    pub capture_mouse_moves: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            capture_mouse_moves: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Replay speed multiplier (2.0 = twice as fast)
    pub speed: f64,

    /// Upper bound for a single wait between steps (ms)
    pub max_step_delay_ms: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_step_delay_ms: None,
        }
    }
}

impl Config {
    /// Load config from `path`, or from `rpa-tester.yaml` if present,
    /// falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recorder.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "recorder.channel_capacity must be greater than 0".to_string(),
            ));
        }
        if !(self.playback.speed.is_finite() && self.playback.speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "playback.speed must be a positive number, got {}",
                self.playback.speed
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            r#"
store_path: /tmp/rpa/projects.json
playback:
  speed: 2.5
"#,
        )
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/rpa/projects.json"));
        assert_eq!(config.playback.speed, 2.5);
        assert_eq!(config.playback.max_step_delay_ms, None);
        assert_eq!(config.recorder, RecorderConfig::default());
        assert!(config.continue_on_failure);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "playback:\n  speed: 0").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "recorder:\n  channel_capacity: 0").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "playback: [1, 2").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
