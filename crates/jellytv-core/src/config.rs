//! Engine configuration
//!
//! Every section has working defaults; a JSON document only needs to name
//! the values it changes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Health monitor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Signals are ignored for this long after a session starts (seconds)
    pub grace_period_secs: f64,
    /// Rolling window for buffering events (seconds)
    pub buffering_window_secs: f64,
    /// More buffering events than this inside the window is unhealthy
    pub max_buffering_events: usize,
    /// More stalls than this is unhealthy
    pub max_stalls: u32,
    /// No progress for this long while playing counts as a stall (seconds)
    pub stall_timeout_secs: f64,
    /// Period of the health-check task (seconds)
    pub check_interval_secs: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 20.0,
            buffering_window_secs: 60.0,
            max_buffering_events: 3,
            max_stalls: 2,
            stall_timeout_secs: 15.0,
            check_interval_secs: 5.0,
        }
    }
}

impl HealthConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs_f64(self.grace_period_secs)
    }

    pub fn buffering_window(&self) -> Duration {
        Duration::from_secs_f64(self.buffering_window_secs)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.stall_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs_f64(self.check_interval_secs)
    }
}

/// Progress reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Seconds between progress reports
    pub interval_secs: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { interval_secs: 10.0 }
    }
}

impl ProgressConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

/// Backend tuning shared by all playback backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Reload attempts after a fatal network error
    pub network_retries: u32,
    /// In-place recoveries after a fatal decode error
    pub media_recovery_attempts: u32,
    /// Two decode errors closer than this escalate to the second recovery stage (seconds)
    pub media_recovery_cooldown_secs: f64,
    /// Content at or above this bitrate gets explicit decoder buffering hints (bits/s)
    pub high_bitrate_threshold: u64,
    /// Initial buffering the native decoder should accumulate for high-bitrate content (seconds)
    pub native_initial_buffer_secs: u32,
    /// Buffer the native decoder refills to after an underrun (seconds)
    pub native_resume_buffer_secs: u32,
    /// Forward buffer goal for the adaptive engine (seconds)
    pub adaptive_buffering_goal_secs: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            network_retries: 3,
            media_recovery_attempts: 2,
            media_recovery_cooldown_secs: 3.0,
            high_bitrate_threshold: 40_000_000,
            native_initial_buffer_secs: 10,
            native_resume_buffer_secs: 5,
            adaptive_buffering_goal_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn media_recovery_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.media_recovery_cooldown_secs)
    }
}

/// Negotiation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Caps the streaming bitrate sent to the server (bits/s); `None` uses the device ceiling
    pub max_streaming_bitrate: Option<u64>,
    /// Re-request playback info when the default audio track is unsupported
    pub audio_renegotiation: bool,
    /// Ask for the `.js` cue list instead of WebVTT for external subtitles
    pub subtitle_cue_list: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_streaming_bitrate: None,
            audio_renegotiation: true,
            subtitle_cue_list: false,
        }
    }
}

/// Manual capability overrides applied on top of detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityOverrides {
    pub disable_hevc: bool,
    pub disable_av1: bool,
    pub disable_vp9: bool,
    pub disable_hdr: bool,
    /// Allow AV1 in TS/AVI on top of WebM/MKV/MP4; `None` keeps the detected value
    pub av1_extended_containers: Option<bool>,
    pub max_bitrate: Option<u64>,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub health: HealthConfig,
    pub progress: ProgressConfig,
    pub backend: BackendConfig,
    pub negotiation: NegotiationConfig,
    pub capabilities: CapabilityOverrides,
}

impl EngineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("health.grace_period_secs", self.health.grace_period_secs, true),
            ("health.buffering_window_secs", self.health.buffering_window_secs, false),
            ("health.stall_timeout_secs", self.health.stall_timeout_secs, false),
            ("health.check_interval_secs", self.health.check_interval_secs, false),
            ("progress.interval_secs", self.progress.interval_secs, false),
            ("backend.media_recovery_cooldown_secs", self.backend.media_recovery_cooldown_secs, true),
        ];
        for (name, value, zero_ok) in positive {
            let valid = value.is_finite() && if zero_ok { value >= 0.0 } else { value > 0.0 };
            if !valid {
                return Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        if self.negotiation.max_streaming_bitrate == Some(0) {
            return Err(Error::InvalidConfig(
                "negotiation.max_streaming_bitrate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.health.grace_period(), Duration::from_secs(20));
        assert_eq!(config.progress.interval(), Duration::from_secs(10));
        assert_eq!(config.backend.media_recovery_attempts, 2);
        assert!(config.negotiation.audio_renegotiation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"health": {"max_stalls": 5}, "capabilities": {"av1_extended_containers": true}}"#,
        )
        .unwrap();
        assert_eq!(config.health.max_stalls, 5);
        assert_eq!(config.health.grace_period_secs, 20.0);
        assert_eq!(config.capabilities.av1_extended_containers, Some(true));
        assert_eq!(config.progress.interval_secs, 10.0);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let err = EngineConfig::from_json_str(r#"{"progress": {"interval_secs": 0}}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
