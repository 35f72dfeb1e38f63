//! Core types shared by the negotiation engine
//!
//! Media sources and streams mirror the media server's wire format
//! (PascalCase JSON) so they deserialize straight out of a PlaybackInfo
//! response.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server positions are expressed in 100-nanosecond ticks
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert server ticks to seconds
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// Convert seconds to server ticks
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64).round() as i64
}

/// Unique identifier for a local playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the selected source reaches the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMethod {
    /// Original file, unmodified
    DirectPlay,
    /// Container repackaged by the server, codecs untouched
    DirectStream,
    /// Re-encoded by the server into a segmented stream
    Transcode,
}

impl PlayMethod {
    /// Score contribution used when ranking media sources
    pub fn score(&self) -> i32 {
        match self {
            PlayMethod::DirectPlay => 100,
            PlayMethod::DirectStream => 50,
            PlayMethod::Transcode => 0,
        }
    }
}

impl std::fmt::Display for PlayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMethod::DirectPlay => write!(f, "DirectPlay"),
            PlayMethod::DirectStream => write!(f, "DirectStream"),
            PlayMethod::Transcode => write!(f, "Transcode"),
        }
    }
}

/// Top-level media kind, decides the `/Videos` vs `/Audio` URL root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

impl MediaType {
    pub fn url_root(&self) -> &'static str {
        match self {
            MediaType::Video => "Videos",
            MediaType::Audio => "Audio",
        }
    }
}

/// Kind of an individual stream inside a media source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaStreamType {
    Video,
    Audio,
    Subtitle,
    EmbeddedImage,
    Data,
    #[serde(other)]
    Unknown,
}

/// Dynamic range declared by the server for a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoRangeType {
    #[serde(rename = "SDR")]
    Sdr,
    #[serde(rename = "HDR10")]
    Hdr10,
    #[serde(rename = "HDR10Plus")]
    Hdr10Plus,
    #[serde(rename = "HLG")]
    Hlg,
    #[serde(rename = "DOVI")]
    Dovi,
    #[serde(rename = "DOVIWithHDR10")]
    DoviWithHdr10,
    #[serde(rename = "DOVIWithHLG")]
    DoviWithHlg,
    #[serde(rename = "DOVIWithSDR")]
    DoviWithSdr,
    #[serde(other)]
    Unknown,
}

impl VideoRangeType {
    pub fn is_hdr(&self) -> bool {
        !matches!(self, VideoRangeType::Sdr | VideoRangeType::Unknown)
    }

    /// Wire name, as used in device profile conditions
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoRangeType::Sdr => "SDR",
            VideoRangeType::Hdr10 => "HDR10",
            VideoRangeType::Hdr10Plus => "HDR10Plus",
            VideoRangeType::Hlg => "HLG",
            VideoRangeType::Dovi => "DOVI",
            VideoRangeType::DoviWithHdr10 => "DOVIWithHDR10",
            VideoRangeType::DoviWithHlg => "DOVIWithHLG",
            VideoRangeType::DoviWithSdr => "DOVIWithSDR",
            VideoRangeType::Unknown => "Unknown",
        }
    }
}

/// One video, audio or subtitle stream of a media source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaStream {
    pub index: i32,
    #[serde(rename = "Type")]
    pub stream_type: MediaStreamType,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub bit_depth: Option<u32>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub video_range_type: Option<VideoRangeType>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub bit_rate: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_forced: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub is_text_subtitle_stream: bool,
    #[serde(default)]
    pub delivery_url: Option<String>,
}

impl MediaStream {
    /// Lower-cased codec name, empty when the server did not report one
    pub fn codec_name(&self) -> String {
        self.codec.as_deref().unwrap_or_default().to_ascii_lowercase()
    }

    /// Dynamic range, SDR when unreported
    pub fn range(&self) -> VideoRangeType {
        self.video_range_type.unwrap_or(VideoRangeType::Sdr)
    }
}

/// One candidate encoding of a media item, as offered by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub media_streams: Vec<MediaStream>,
    #[serde(default)]
    pub supports_direct_play: bool,
    #[serde(default)]
    pub supports_direct_stream: bool,
    #[serde(default)]
    pub supports_transcoding: bool,
    #[serde(default)]
    pub direct_stream_url: Option<String>,
    #[serde(default)]
    pub transcoding_url: Option<String>,
    #[serde(default)]
    pub transcoding_container: Option<String>,
    #[serde(default)]
    pub default_audio_stream_index: Option<i32>,
    #[serde(default)]
    pub default_subtitle_stream_index: Option<i32>,
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
}

impl MediaSource {
    /// Container names; the server may report a comma separated list ("mov,mp4,m4a")
    pub fn containers(&self) -> Vec<String> {
        self.container
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Primary video stream
    pub fn video_stream(&self) -> Option<&MediaStream> {
        self.media_streams
            .iter()
            .find(|s| s.stream_type == MediaStreamType::Video)
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &MediaStream> {
        self.media_streams
            .iter()
            .filter(|s| s.stream_type == MediaStreamType::Audio)
    }

    pub fn subtitle_streams(&self) -> impl Iterator<Item = &MediaStream> {
        self.media_streams
            .iter()
            .filter(|s| s.stream_type == MediaStreamType::Subtitle)
    }

    /// Stream with the given server index
    pub fn stream(&self, index: i32) -> Option<&MediaStream> {
        self.media_streams.iter().find(|s| s.index == index)
    }

    /// Audio track the server will play unless told otherwise
    pub fn default_audio_stream(&self) -> Option<&MediaStream> {
        self.default_audio_stream_index
            .and_then(|i| self.stream(i))
            .filter(|s| s.stream_type == MediaStreamType::Audio)
            .or_else(|| self.audio_streams().find(|s| s.is_default))
            .or_else(|| self.audio_streams().next())
    }

    /// Vertical resolution of the primary video stream
    pub fn video_height(&self) -> u32 {
        self.video_stream().and_then(|v| v.height).unwrap_or(0)
    }

    /// Horizontal resolution of the primary video stream
    pub fn video_width(&self) -> u32 {
        self.video_stream().and_then(|v| v.width).unwrap_or(0)
    }
}

/// Server response to a playback-info request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfo {
    #[serde(default)]
    pub play_session_id: Option<String>,
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Chapter marker as reported by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChapterInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub start_position_ticks: i64,
}

/// Chapter handed to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// Start time in seconds
    pub start_time: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_time: f64) -> Self {
        Self {
            title: title.into(),
            start_time,
        }
    }
}

impl From<&ChapterInfo> for Chapter {
    fn from(info: &ChapterInfo) -> Self {
        Self {
            title: info.name.clone().unwrap_or_default(),
            start_time: ticks_to_seconds(info.start_position_ticks),
        }
    }
}

/// Item metadata used for chapter fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDetails {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub chapters: Vec<ChapterInfo>,
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
}

/// Server address and access token for one playback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCredentials {
    /// Server identifier, `None` for the signed-in default server
    pub server_id: Option<String>,
    pub server_url: String,
    pub access_token: String,
    pub user_id: String,
}

impl ServerCredentials {
    pub fn new(
        server_url: impl Into<String>,
        access_token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            server_id: None,
            server_url: server_url.into(),
            access_token: access_token.into(),
            user_id: user_id.into(),
        }
    }

    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Server base without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}
