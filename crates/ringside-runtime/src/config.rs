//! Capture configuration
//!
//! Loaded from JSON; every field has a default so partial documents work.

use std::path::Path;
use std::time::Duration;

use ringside_core::{RingsideError, RingsideResult};
use ringside_visual::FusionConfig;
use serde::{Deserialize, Serialize};

/// Logging output configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Capture session configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum detections per second
    pub detection_rate_hz: f64,
    /// Movement gates and laterality split
    pub fusion: FusionConfig,
    /// Capacity of the "landmarks ready" channel
    pub notification_capacity: usize,
    pub logging: LoggingConfig,
}

impl CaptureConfig {
    /// Background-worker shape: detection runs off the render thread
    pub fn background_thread() -> Self {
        Self {
            detection_rate_hz: 30.0,
            fusion: FusionConfig::default(),
            notification_capacity: 4,
            logging: LoggingConfig::default(),
        }
    }

    /// Single-thread shape: detection is throttled harder and the
    /// frames in between are interpolated
    pub fn main_thread() -> Self {
        Self {
            detection_rate_hz: 10.0,
            ..Self::background_thread()
        }
    }

    pub fn from_json_str(json: &str) -> RingsideResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RingsideError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> RingsideResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RingsideError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> RingsideResult<()> {
        if !self.detection_rate_hz.is_finite() || self.detection_rate_hz <= 0.0 {
            return Err(RingsideError::InvalidConfig(format!(
                "detection_rate_hz must be positive, got {}",
                self.detection_rate_hz
            )));
        }
        if self.notification_capacity == 0 {
            return Err(RingsideError::InvalidConfig(
                "notification_capacity must be at least 1".to_string(),
            ));
        }
        let fusion = &self.fusion;
        for (name, value) in [
            ("head_max_movement", fusion.head_max_movement),
            ("hand_max_movement", fusion.hand_max_movement),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RingsideError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&fusion.single_hand_split_x) {
            return Err(RingsideError::InvalidConfig(format!(
                "single_hand_split_x must be within [0, 1], got {}",
                fusion.single_hand_split_x
            )));
        }
        Ok(())
    }

    /// Minimum time between two processed frames
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.detection_rate_hz)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::background_thread()
    }
}
