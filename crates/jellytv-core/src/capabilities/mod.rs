//! Device capability detection
//!
//! Builds an immutable [`CapabilityProfile`] describing what the local
//! playback hardware can decode. Detection runs once per
//! [`CapabilityContext`] and is cached until [`CapabilityContext::invalidate`].
//!
//! Platform year is resolved in priority order:
//! 1. numeric platform version from the system-info API
//! 2. year-code letter in the model name
//! 3. four-digit year in the firmware version
//!
//! Codec and HDR support is then derived from year thresholds, with live
//! hardware answers (HDR, Dolby Vision) taking precedence over inference.

pub mod device_profile;
pub mod model_year;
pub mod probe;

pub use device_profile::DeviceProfile;
pub use probe::{PanelResolution, PlatformProbe, ProbeError, ProbeResult, StaticProbe};

use crate::config::CapabilityOverrides;
use crate::types::VideoRangeType;
use model_year::{
    platform_version_for_year, year_for_platform_version, year_from_firmware, year_from_model,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Year assumed when nothing could be detected
pub const DEFAULT_PLATFORM_YEAR: u16 = 2018;

// Year thresholds
const VP9_MIN_YEAR: u16 = 2017;
const AV1_MIN_YEAR: u16 = 2021;
const AV1_MIN_YEAR_8K: u16 = 2020;
const HDR10_MIN_YEAR: u16 = 2016;
const HLG_MIN_YEAR: u16 = 2017;
const HDR10_PLUS_MIN_YEAR: u16 = 2018;
const HEVC_10BIT_MIN_YEAR: u16 = 2016;
const WEBM_MIN_YEAR: u16 = 2017;
const FLAC_MIN_YEAR: u16 = 2017;
const OPUS_MIN_YEAR: u16 = 2018;
/// First platform release whose 8K models also decode AV1 from TS/AVI
const AV1_EXTENDED_MIN_PLATFORM: f32 = 6.5;

/// Where the platform year came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionSource {
    PlatformVersion,
    ModelName,
    Firmware,
    Default,
}

/// Video decoder support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCodecSupport {
    pub h264: bool,
    pub hevc: bool,
    pub vp9: bool,
    pub av1: bool,
    pub dolby_vision: bool,
    /// Highest H.264 level, in server units (5.1 → 51)
    pub h264_max_level: f64,
    /// Highest HEVC level, in server units (5.1 → 153)
    pub hevc_max_level: f64,
    /// 10-bit HEVC decode
    pub hevc_10bit: bool,
}

/// Audio decoder support.
///
/// DTS, TrueHD and Atmos are never decodable on this hardware line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCodecSupport {
    pub aac: bool,
    pub mp3: bool,
    pub ac3: bool,
    pub eac3: bool,
    pub opus: bool,
    pub flac: bool,
    pub vorbis: bool,
    pub pcm: bool,
    pub dts: bool,
    pub truehd: bool,
    pub atmos: bool,
}

/// Demuxer support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSupport {
    pub mp4: bool,
    pub mov: bool,
    pub mkv: bool,
    pub webm: bool,
    pub ts: bool,
    pub m2ts: bool,
    pub avi: bool,
    pub asf: bool,
}

/// Dynamic-range output modes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdrSupport {
    pub hdr10: bool,
    pub hdr10_plus: bool,
    pub hlg: bool,
    pub dolby_vision: bool,
}

impl HdrSupport {
    pub fn any(&self) -> bool {
        self.hdr10 || self.hdr10_plus || self.hlg || self.dolby_vision
    }
}

/// Immutable snapshot of what this device can decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub platform_year: u16,
    pub platform_version: f32,
    pub source: DetectionSource,
    pub panel: PanelResolution,
    pub video: VideoCodecSupport,
    pub audio: AudioCodecSupport,
    pub containers: ContainerSupport,
    pub hdr: HdrSupport,
    /// Highest bitrate the device can sustain (bits/s)
    pub max_bitrate: u64,
    /// AV1 accepted in TS/AVI as well as WebM/MKV/MP4
    pub av1_extended_containers: bool,
}

impl CapabilityProfile {
    /// Profile inferred from a platform year
    pub fn for_platform_year(
        year: u16,
        platform_version: f32,
        panel: PanelResolution,
        source: DetectionSource,
    ) -> Self {
        let uhd = panel.is_uhd();
        let eight_k = panel == PanelResolution::Uhd8k;

        let av1 = year >= AV1_MIN_YEAR || (eight_k && year >= AV1_MIN_YEAR_8K);

        let hevc_max_level = match panel {
            PanelResolution::Uhd8k => 183.0,
            PanelResolution::Uhd => 153.0,
            _ => 123.0,
        };

        let max_bitrate = match panel {
            PanelResolution::Uhd8k => 120_000_000,
            PanelResolution::Uhd if year >= 2020 => 100_000_000,
            PanelResolution::Uhd => 80_000_000,
            _ => 40_000_000,
        };

        Self {
            platform_year: year,
            platform_version,
            source,
            panel,
            video: VideoCodecSupport {
                h264: true,
                hevc: true,
                vp9: year >= VP9_MIN_YEAR,
                av1,
                dolby_vision: false,
                h264_max_level: 51.0,
                hevc_max_level,
                hevc_10bit: year >= HEVC_10BIT_MIN_YEAR,
            },
            audio: AudioCodecSupport {
                aac: true,
                mp3: true,
                ac3: true,
                eac3: true,
                opus: year >= OPUS_MIN_YEAR,
                flac: year >= FLAC_MIN_YEAR,
                vorbis: year >= WEBM_MIN_YEAR,
                pcm: true,
                dts: false,
                truehd: false,
                atmos: false,
            },
            containers: ContainerSupport {
                mp4: true,
                mov: true,
                mkv: true,
                webm: year >= WEBM_MIN_YEAR,
                ts: true,
                m2ts: true,
                avi: true,
                asf: true,
            },
            hdr: HdrSupport {
                hdr10: uhd && year >= HDR10_MIN_YEAR,
                hdr10_plus: uhd && year >= HDR10_PLUS_MIN_YEAR,
                hlg: uhd && year >= HLG_MIN_YEAR,
                dolby_vision: false,
            },
            max_bitrate,
            av1_extended_containers: av1 && eight_k && platform_version >= AV1_EXTENDED_MIN_PLATFORM,
        }
    }

    /// Profile used when every probe failed: year-2018 hardware, no HDR, no AV1
    pub fn conservative(panel: PanelResolution) -> Self {
        let mut profile = Self::for_platform_year(
            DEFAULT_PLATFORM_YEAR,
            platform_version_for_year(DEFAULT_PLATFORM_YEAR),
            panel,
            DetectionSource::Default,
        );
        profile.hdr = HdrSupport::default();
        profile.video.av1 = false;
        profile.av1_extended_containers = false;
        profile
    }

    /// Video codec name as reported by the server
    pub fn supports_video_codec(&self, codec: &str) -> bool {
        match codec.to_ascii_lowercase().as_str() {
            "h264" | "avc" | "avc1" => self.video.h264,
            "hevc" | "h265" | "hvc1" | "hev1" => self.video.hevc,
            "vp9" => self.video.vp9,
            "av1" | "av01" => self.video.av1,
            "dvhe" | "dvh1" => self.video.dolby_vision,
            _ => false,
        }
    }

    /// Audio codec name as reported by the server
    pub fn supports_audio_codec(&self, codec: &str) -> bool {
        let codec = codec.to_ascii_lowercase();
        if codec.starts_with("pcm") {
            return self.audio.pcm;
        }
        match codec.as_str() {
            "aac" | "mp4a" => self.audio.aac,
            "mp3" | "mp2" => self.audio.mp3,
            "ac3" => self.audio.ac3,
            "eac3" | "ec3" => self.audio.eac3,
            "opus" => self.audio.opus,
            "flac" => self.audio.flac,
            "vorbis" => self.audio.vorbis,
            "dts" | "dca" => self.audio.dts,
            "truehd" | "mlp" => self.audio.truehd,
            _ => false,
        }
    }

    /// Container name as reported by the server
    pub fn supports_container(&self, container: &str) -> bool {
        match container.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => self.containers.mp4,
            "mov" => self.containers.mov,
            "mkv" | "matroska" => self.containers.mkv,
            "webm" => self.containers.webm,
            "ts" | "mpegts" => self.containers.ts,
            "m2ts" | "mts" => self.containers.m2ts,
            "avi" => self.containers.avi,
            "asf" | "wmv" => self.containers.asf,
            _ => false,
        }
    }

    /// Whether a video stream of the given dynamic range can be shown without tone mapping.
    ///
    /// Dolby Vision profiles carrying an HDR10/HLG/SDR base layer fall back to
    /// that layer; pure DOVI needs Dolby Vision. Unknown ranges are treated as SDR.
    pub fn supports_range(&self, range: VideoRangeType) -> bool {
        let dv = self.hdr.dolby_vision;
        match range {
            VideoRangeType::Sdr | VideoRangeType::DoviWithSdr | VideoRangeType::Unknown => true,
            VideoRangeType::Hdr10 => self.hdr.hdr10,
            VideoRangeType::Hdr10Plus => self.hdr.hdr10_plus || self.hdr.hdr10,
            VideoRangeType::Hlg => self.hdr.hlg,
            VideoRangeType::Dovi => dv,
            VideoRangeType::DoviWithHdr10 => self.hdr.hdr10 || dv,
            VideoRangeType::DoviWithHlg => self.hdr.hlg || dv,
        }
    }

    /// Supported container names, in server spelling
    pub fn container_names(&self) -> Vec<&'static str> {
        let c = &self.containers;
        [
            (c.mp4, "mp4"),
            (c.mp4, "m4v"),
            (c.mov, "mov"),
            (c.mkv, "mkv"),
            (c.webm, "webm"),
            (c.ts, "ts"),
            (c.ts, "mpegts"),
            (c.m2ts, "m2ts"),
            (c.avi, "avi"),
            (c.asf, "asf"),
        ]
        .into_iter()
        .filter_map(|(ok, name)| ok.then_some(name))
        .collect()
    }

    /// Supported audio codec names, in server spelling
    pub fn audio_codec_names(&self) -> Vec<&'static str> {
        let a = &self.audio;
        [
            (a.aac, "aac"),
            (a.mp3, "mp3"),
            (a.ac3, "ac3"),
            (a.eac3, "eac3"),
            (a.opus, "opus"),
            (a.flac, "flac"),
            (a.vorbis, "vorbis"),
            (a.pcm, "pcm_s16le"),
            (a.pcm, "pcm_s24le"),
            (a.dts, "dts"),
            (a.truehd, "truehd"),
        ]
        .into_iter()
        .filter_map(|(ok, name)| ok.then_some(name))
        .collect()
    }

    /// Video codecs a container may carry on this device.
    ///
    /// AV1 demuxes only from WebM/MKV/MP4 unless `av1_extended_containers`;
    /// VP9 only from WebM/MKV/MP4; AVI and ASF carry H.264 only.
    pub fn video_codecs_for_container(&self, container: &str) -> Vec<&'static str> {
        let container = container.to_ascii_lowercase();
        let modern = matches!(container.as_str(), "webm" | "mkv" | "matroska" | "mp4" | "m4v");
        let legacy = matches!(container.as_str(), "avi" | "asf" | "wmv");
        let transport = matches!(container.as_str(), "ts" | "mpegts" | "m2ts" | "mts");

        let mut codecs = Vec::new();
        if container == "webm" {
            // WebM is VP8/VP9/AV1 only
            if self.video.vp9 {
                codecs.push("vp9");
            }
            if self.video.av1 {
                codecs.push("av1");
            }
            return codecs;
        }
        if self.video.h264 {
            codecs.push("h264");
        }
        if self.video.hevc && !legacy {
            codecs.push("hevc");
        }
        if self.video.vp9 && modern {
            codecs.push("vp9");
        }
        let av1_extended = self.av1_extended_containers && (transport || container == "avi");
        if self.video.av1 && (modern || av1_extended) {
            codecs.push("av1");
        }
        codecs
    }

    fn apply_overrides(&mut self, overrides: &CapabilityOverrides) {
        if overrides.disable_hevc {
            self.video.hevc = false;
            self.video.hevc_10bit = false;
        }
        if overrides.disable_av1 {
            self.video.av1 = false;
        }
        if overrides.disable_vp9 {
            self.video.vp9 = false;
        }
        if overrides.disable_hdr {
            self.hdr = HdrSupport::default();
            self.video.dolby_vision = false;
        }
        if let Some(extended) = overrides.av1_extended_containers {
            self.av1_extended_containers = extended && self.video.av1;
        }
        if let Some(max_bitrate) = overrides.max_bitrate {
            self.max_bitrate = max_bitrate;
        }
    }
}

fn answer<T>(result: ProbeResult<T>, probe: &'static str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!(probe, error = %e, "Platform probe unavailable");
            None
        }
    }
}

async fn detect_year(probe: &dyn PlatformProbe) -> Option<(u16, f32, DetectionSource)> {
    if let Some(version) = answer(probe.platform_version().await, "platform_version") {
        if let Some(year) = year_for_platform_version(version) {
            return Some((year, version, DetectionSource::PlatformVersion));
        }
    }

    if let Some(model) = answer(probe.model_name().await, "model_name") {
        if let Some(year) = year_from_model(&model) {
            return Some((year, platform_version_for_year(year), DetectionSource::ModelName));
        }
    }

    if let Some(firmware) = answer(probe.firmware_version().await, "firmware_version") {
        if let Some(year) = year_from_firmware(&firmware) {
            return Some((year, platform_version_for_year(year), DetectionSource::Firmware));
        }
    }

    None
}

/// Run detection against a probe. Never fails.
pub async fn detect(probe: &dyn PlatformProbe, overrides: &CapabilityOverrides) -> CapabilityProfile {
    let panel = answer(probe.panel().await, "panel");

    let mut profile = match detect_year(probe).await {
        Some((year, version, source)) => CapabilityProfile::for_platform_year(
            year,
            version,
            panel.unwrap_or(PanelResolution::Uhd),
            source,
        ),
        None => CapabilityProfile::conservative(panel.unwrap_or(PanelResolution::Fhd)),
    };

    // Live hardware answers win over year inference
    if let Some(hdr) = answer(probe.hdr_supported().await, "hdr") {
        profile.hdr.hdr10 = hdr;
        profile.hdr.hlg = hdr;
        profile.hdr.hdr10_plus = hdr && profile.platform_year >= HDR10_PLUS_MIN_YEAR;
    }
    if let Some(dolby_vision) = answer(probe.dolby_vision_supported().await, "dolby_vision") {
        profile.hdr.dolby_vision = dolby_vision;
        profile.video.dolby_vision = dolby_vision;
    }

    profile.apply_overrides(overrides);
    profile
}

/// Owns the lazily built, invalidatable capability profile
pub struct CapabilityContext {
    probe: Arc<dyn PlatformProbe>,
    overrides: RwLock<CapabilityOverrides>,
    cache: Mutex<Option<Arc<CapabilityProfile>>>,
}

impl CapabilityContext {
    pub fn new(probe: Arc<dyn PlatformProbe>, overrides: CapabilityOverrides) -> Self {
        Self {
            probe,
            overrides: RwLock::new(overrides),
            cache: Mutex::new(None),
        }
    }

    /// Cached profile, detecting on first use
    #[instrument(skip(self))]
    pub async fn capabilities(&self) -> Arc<CapabilityProfile> {
        let mut cache = self.cache.lock().await;
        if let Some(profile) = cache.as_ref() {
            return Arc::clone(profile);
        }

        let overrides = self.overrides.read().clone();
        let profile = Arc::new(detect(self.probe.as_ref(), &overrides).await);
        info!(
            year = profile.platform_year,
            version = profile.platform_version,
            source = ?profile.source,
            panel = %profile.panel,
            hevc = profile.video.hevc,
            av1 = profile.video.av1,
            hdr10 = profile.hdr.hdr10,
            dolby_vision = profile.hdr.dolby_vision,
            "Capability profile detected"
        );
        *cache = Some(Arc::clone(&profile));
        profile
    }

    /// Drop the cached profile; the next call re-detects
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
        debug!("Capability profile invalidated");
    }

    /// Replace the manual overrides and re-detect on next use
    pub async fn set_overrides(&self, overrides: CapabilityOverrides) {
        *self.overrides.write() = overrides;
        self.invalidate().await;
    }
}
