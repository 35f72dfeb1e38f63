//! Platform probes
//!
//! A probe answers questions about the host device. Every question may be
//! unanswerable on a given firmware; detection treats an error and a `None`
//! the same way and moves on to the next strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single platform query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("platform API unavailable: {0}")]
    Unavailable(String),

    #[error("platform query failed: {0}")]
    Failed(String),
}

pub type ProbeResult<T> = std::result::Result<Option<T>, ProbeError>;

/// Panel resolution class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PanelResolution {
    Hd,
    Fhd,
    Uhd,
    Uhd8k,
}

impl PanelResolution {
    pub fn max_width(&self) -> u32 {
        match self {
            PanelResolution::Hd => 1280,
            PanelResolution::Fhd => 1920,
            PanelResolution::Uhd => 3840,
            PanelResolution::Uhd8k => 7680,
        }
    }

    pub fn max_height(&self) -> u32 {
        match self {
            PanelResolution::Hd => 720,
            PanelResolution::Fhd => 1080,
            PanelResolution::Uhd => 2160,
            PanelResolution::Uhd8k => 4320,
        }
    }

    pub fn is_uhd(&self) -> bool {
        *self >= PanelResolution::Uhd
    }
}

impl std::fmt::Display for PanelResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelResolution::Hd => write!(f, "HD"),
            PanelResolution::Fhd => write!(f, "FHD"),
            PanelResolution::Uhd => write!(f, "UHD"),
            PanelResolution::Uhd8k => write!(f, "8K"),
        }
    }
}

/// Questions the capability detector asks the host platform
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    /// Numeric platform version from the system-info API (e.g. `6.5`)
    async fn platform_version(&self) -> ProbeResult<f32> {
        Ok(None)
    }

    /// Device model name (e.g. `QE55Q80TATXXU`)
    async fn model_name(&self) -> ProbeResult<String> {
        Ok(None)
    }

    /// Firmware version string
    async fn firmware_version(&self) -> ProbeResult<String> {
        Ok(None)
    }

    /// Panel resolution class
    async fn panel(&self) -> ProbeResult<PanelResolution> {
        Ok(None)
    }

    /// Live HDR (HDR10/HLG) support query
    async fn hdr_supported(&self) -> ProbeResult<bool> {
        Ok(None)
    }

    /// Live Dolby Vision support query
    async fn dolby_vision_supported(&self) -> ProbeResult<bool> {
        Ok(None)
    }
}

/// Probe answering from fixed values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticProbe {
    pub platform_version: Option<f32>,
    pub model_name: Option<String>,
    pub firmware_version: Option<String>,
    pub panel: Option<PanelResolution>,
    pub hdr: Option<bool>,
    pub dolby_vision: Option<bool>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform_version(mut self, version: f32) -> Self {
        self.platform_version = Some(version);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware.into());
        self
    }

    pub fn with_panel(mut self, panel: PanelResolution) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn with_hdr(mut self, hdr: bool) -> Self {
        self.hdr = Some(hdr);
        self
    }

    pub fn with_dolby_vision(mut self, dolby_vision: bool) -> Self {
        self.dolby_vision = Some(dolby_vision);
        self
    }
}

#[async_trait]
impl PlatformProbe for StaticProbe {
    async fn platform_version(&self) -> ProbeResult<f32> {
        Ok(self.platform_version)
    }

    async fn model_name(&self) -> ProbeResult<String> {
        Ok(self.model_name.clone())
    }

    async fn firmware_version(&self) -> ProbeResult<String> {
        Ok(self.firmware_version.clone())
    }

    async fn panel(&self) -> ProbeResult<PanelResolution> {
        Ok(self.panel)
    }

    async fn hdr_supported(&self) -> ProbeResult<bool> {
        Ok(self.hdr)
    }

    async fn dolby_vision_supported(&self) -> ProbeResult<bool> {
        Ok(self.dolby_vision)
    }
}
