//! Platform playback drivers
//!
//! Backends never touch platform APIs directly. Each one wraps a driver
//! trait implemented by the embedding application: an adaptive streaming
//! engine, the hardware decoder pipeline, or a media element with an
//! optional segmented-stream loader. Drivers report asynchronous happenings
//! back through [`DriverEvent`]s which the embedder forwards to
//! `PlayerBackend::handle_driver_event`.

use super::{AudioTrack, SubtitleTrack};
use crate::error::DriverError;
use async_trait::async_trait;

pub type DriverResult<T = ()> = std::result::Result<T, DriverError>;

/// Something a driver observed
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Loaded { duration: Option<f64> },
    BufferingStarted,
    BufferingEnded,
    Playing,
    Paused,
    QualityChanged { bitrate: Option<u64>, height: Option<u32> },
    Ended,
    Error(DriverError),
}

/// Streaming engine settings applied before each load
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveEngineConfig {
    /// Video codecs in preference order
    pub preferred_video_codecs: Vec<String>,
    /// Prefer HDR variants when the manifest offers them
    pub prefer_hdr: bool,
    pub buffering_goal_secs: u32,
    /// Upper bound for rendition selection (bits/s)
    pub max_bitrate: u64,
    pub max_height: u32,
}

/// Adaptive streaming engine (HLS/DASH player library)
#[async_trait]
pub trait AdaptiveEngine: Send + Sync {
    /// The engine can run on this platform
    fn is_supported(&self) -> bool;
    /// Bind the engine to the video surface
    async fn attach(&mut self) -> DriverResult;
    fn configure(&mut self, config: &AdaptiveEngineConfig);
    async fn load(&mut self, url: &str, start_position: f64) -> DriverResult;
    fn play(&mut self) -> DriverResult;
    fn pause(&mut self) -> DriverResult;
    fn seek(&mut self, position: f64) -> DriverResult;
    fn set_volume(&mut self, volume: f32) -> DriverResult;
    fn position(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn audio_tracks(&self) -> Vec<AudioTrack>;
    fn subtitle_tracks(&self) -> Vec<SubtitleTrack>;
    fn select_audio_track(&mut self, index: i32) -> DriverResult;
    fn select_subtitle_track(&mut self, index: Option<i32>) -> DriverResult;
    async fn destroy(&mut self) -> DriverResult;
}

/// Decoder buffering and bitrate hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingHint {
    /// Seconds to buffer before playback starts
    InitialBuffer(u32),
    /// Seconds to refill to after an underrun
    ResumeBuffer(u32),
    /// Declared stream bitrate (bits/s)
    Bitrate(u64),
}

/// Output rectangle in panel pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DisplayRect {
    pub fn full_screen(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMethod {
    LetterBox,
    FullScreen,
}

/// Platform hardware decoder pipeline; only one may be open at a time
#[async_trait]
pub trait NativeDecoder: Send + Sync {
    fn is_available(&self) -> bool;
    fn open(&mut self, url: &str) -> DriverResult;
    fn set_streaming_hint(&mut self, hint: StreamingHint) -> DriverResult;
    fn set_display_rect(&mut self, rect: DisplayRect) -> DriverResult;
    fn set_display_method(&mut self, method: DisplayMethod) -> DriverResult;
    /// Keep the last frame on screen while seeking or stopped
    fn set_still_frame(&mut self, enabled: bool) -> DriverResult;
    async fn prepare(&mut self) -> DriverResult;
    fn play(&mut self) -> DriverResult;
    fn pause(&mut self) -> DriverResult;
    fn seek(&mut self, position: f64) -> DriverResult;
    fn set_volume(&mut self, volume: f32) -> DriverResult;
    fn position(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn audio_tracks(&self) -> Vec<AudioTrack>;
    fn subtitle_tracks(&self) -> Vec<SubtitleTrack>;
    fn select_audio_track(&mut self, index: i32) -> DriverResult;
    fn select_subtitle_track(&mut self, index: Option<i32>) -> DriverResult;
    fn stop(&mut self) -> DriverResult;
    /// Decode nothing for a moment so the panel drops out of HDR mode
    async fn decode_blank(&mut self) -> DriverResult;
    /// Release the hardware handle
    fn close(&mut self) -> DriverResult;
}

/// Plain media element
pub trait MediaElement: Send + Sync {
    fn can_play_type(&self, mime_type: &str) -> bool;
    fn set_source(&mut self, url: &str, mime_type: Option<&str>) -> DriverResult;
    fn play(&mut self) -> DriverResult;
    fn pause(&mut self) -> DriverResult;
    fn seek(&mut self, position: f64) -> DriverResult;
    fn set_volume(&mut self, volume: f32) -> DriverResult;
    fn position(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn audio_tracks(&self) -> Vec<AudioTrack>;
    fn subtitle_tracks(&self) -> Vec<SubtitleTrack>;
    fn select_audio_track(&mut self, index: i32) -> DriverResult;
    fn select_subtitle_track(&mut self, index: Option<i32>) -> DriverResult;
    /// Drop the current source and release decoder resources
    fn reset(&mut self);
}

/// Segmented-stream loader feeding a media element through media source extensions
pub trait SegmentedLoader: Send + Sync {
    fn is_supported(&self) -> bool;
    fn attach(&mut self) -> DriverResult;
    fn load_source(&mut self, url: &str, start_position: f64) -> DriverResult;
    /// Restart segment loading after a network failure
    fn start_load(&mut self);
    /// Reset the decode pipeline in place
    fn recover_media_error(&mut self);
    /// Switch audio codec handling before the next recovery
    fn swap_audio_codec(&mut self);
    fn audio_tracks(&self) -> Vec<AudioTrack>;
    fn select_audio_track(&mut self, index: i32) -> DriverResult;
    fn destroy(&mut self);
}

/// Supplies fresh driver instances; `None` means the platform lacks that driver
pub trait DriverProvider: Send + Sync {
    fn adaptive_engine(&self) -> Option<Box<dyn AdaptiveEngine>> {
        None
    }

    fn native_decoder(&self) -> Option<Box<dyn NativeDecoder>> {
        None
    }

    fn media_element(&self) -> Option<Box<dyn MediaElement>> {
        None
    }

    fn segmented_loader(&self) -> Option<Box<dyn SegmentedLoader>> {
        None
    }
}
