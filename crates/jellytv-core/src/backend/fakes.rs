//! In-memory drivers for backend tests

use super::drivers::*;
use super::{AudioTrack, SubtitleTrack};
use crate::error::DriverError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered record of driver calls, shared by all fakes of one provider
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub(crate) fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.0.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub(crate) fn contains(&self, call: &str) -> bool {
        self.count(call) > 0
    }
}

/// How a fake driver misbehaves
#[derive(Debug, Clone, Default)]
pub(crate) struct Behavior {
    pub unavailable: bool,
    pub fail_init: bool,
    pub fail_load: Option<DriverError>,
    pub fail_release: bool,
}

fn outcome(log: &CallLog, call: &str, fail: bool) -> DriverResult {
    log.push(call);
    if fail {
        Err(DriverError::other(format!("{call} failed")))
    } else {
        Ok(())
    }
}

fn tracks() -> Vec<AudioTrack> {
    vec![
        AudioTrack {
            index: 1,
            language: Some("eng".into()),
            label: None,
            codec: Some("eac3".into()),
            channels: Some(6),
            active: true,
        },
        AudioTrack {
            index: 2,
            language: Some("fra".into()),
            label: None,
            codec: Some("aac".into()),
            channels: Some(2),
            active: false,
        },
    ]
}

pub(crate) struct FakeEngine {
    log: CallLog,
    behavior: Behavior,
    position: f64,
}

#[async_trait]
impl AdaptiveEngine for FakeEngine {
    fn is_supported(&self) -> bool {
        !self.behavior.unavailable
    }
    async fn attach(&mut self) -> DriverResult {
        outcome(&self.log, "engine.attach", self.behavior.fail_init)
    }
    fn configure(&mut self, config: &AdaptiveEngineConfig) {
        self.log.push(format!(
            "engine.configure:{}:{}",
            config.preferred_video_codecs.join(","),
            config.prefer_hdr
        ));
    }
    async fn load(&mut self, url: &str, start_position: f64) -> DriverResult {
        self.log.push(format!("engine.load:{url}"));
        self.position = start_position;
        match &self.behavior.fail_load {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
    fn play(&mut self) -> DriverResult {
        outcome(&self.log, "engine.play", false)
    }
    fn pause(&mut self) -> DriverResult {
        outcome(&self.log, "engine.pause", false)
    }
    fn seek(&mut self, position: f64) -> DriverResult {
        self.position = position;
        outcome(&self.log, "engine.seek", false)
    }
    fn set_volume(&mut self, _volume: f32) -> DriverResult {
        outcome(&self.log, "engine.volume", false)
    }
    fn position(&self) -> f64 {
        self.position
    }
    fn duration(&self) -> Option<f64> {
        Some(3600.0)
    }
    fn audio_tracks(&self) -> Vec<AudioTrack> {
        tracks()
    }
    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        Vec::new()
    }
    fn select_audio_track(&mut self, index: i32) -> DriverResult {
        outcome(&self.log, &format!("engine.audio:{index}"), false)
    }
    fn select_subtitle_track(&mut self, index: Option<i32>) -> DriverResult {
        outcome(&self.log, &format!("engine.subtitle:{index:?}"), false)
    }
    async fn destroy(&mut self) -> DriverResult {
        outcome(&self.log, "engine.destroy", self.behavior.fail_release)
    }
}

pub(crate) struct FakeDecoder {
    log: CallLog,
    behavior: Behavior,
    position: f64,
}

#[async_trait]
impl NativeDecoder for FakeDecoder {
    fn is_available(&self) -> bool {
        !self.behavior.unavailable
    }
    fn open(&mut self, url: &str) -> DriverResult {
        outcome(&self.log, &format!("decoder.open:{url}"), self.behavior.fail_init)
    }
    fn set_streaming_hint(&mut self, hint: StreamingHint) -> DriverResult {
        outcome(&self.log, &format!("decoder.hint:{hint:?}"), false)
    }
    fn set_display_rect(&mut self, rect: DisplayRect) -> DriverResult {
        outcome(&self.log, &format!("decoder.rect:{}x{}", rect.width, rect.height), false)
    }
    fn set_display_method(&mut self, method: DisplayMethod) -> DriverResult {
        outcome(&self.log, &format!("decoder.method:{method:?}"), false)
    }
    fn set_still_frame(&mut self, enabled: bool) -> DriverResult {
        outcome(&self.log, &format!("decoder.still:{enabled}"), false)
    }
    async fn prepare(&mut self) -> DriverResult {
        self.log.push("decoder.prepare");
        match &self.behavior.fail_load {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
    fn play(&mut self) -> DriverResult {
        outcome(&self.log, "decoder.play", false)
    }
    fn pause(&mut self) -> DriverResult {
        outcome(&self.log, "decoder.pause", false)
    }
    fn seek(&mut self, position: f64) -> DriverResult {
        self.position = position;
        outcome(&self.log, "decoder.seek", false)
    }
    fn set_volume(&mut self, _volume: f32) -> DriverResult {
        outcome(&self.log, "decoder.volume", false)
    }
    fn position(&self) -> f64 {
        self.position
    }
    fn duration(&self) -> Option<f64> {
        Some(3600.0)
    }
    fn audio_tracks(&self) -> Vec<AudioTrack> {
        tracks()
    }
    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        Vec::new()
    }
    fn select_audio_track(&mut self, index: i32) -> DriverResult {
        outcome(&self.log, &format!("decoder.audio:{index}"), false)
    }
    fn select_subtitle_track(&mut self, index: Option<i32>) -> DriverResult {
        outcome(&self.log, &format!("decoder.subtitle:{index:?}"), false)
    }
    fn stop(&mut self) -> DriverResult {
        outcome(&self.log, "decoder.stop", self.behavior.fail_release)
    }
    async fn decode_blank(&mut self) -> DriverResult {
        outcome(&self.log, "decoder.blank", self.behavior.fail_release)
    }
    fn close(&mut self) -> DriverResult {
        outcome(&self.log, "decoder.close", self.behavior.fail_release)
    }
}

pub(crate) struct FakeElement {
    log: CallLog,
    behavior: Behavior,
    native_hls: bool,
    position: f64,
}

impl MediaElement for FakeElement {
    fn can_play_type(&self, mime_type: &str) -> bool {
        !mime_type.to_ascii_lowercase().contains("mpegurl") || self.native_hls
    }
    fn set_source(&mut self, url: &str, _mime_type: Option<&str>) -> DriverResult {
        self.log.push(format!("element.src:{url}"));
        match &self.behavior.fail_load {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
    fn play(&mut self) -> DriverResult {
        outcome(&self.log, "element.play", false)
    }
    fn pause(&mut self) -> DriverResult {
        outcome(&self.log, "element.pause", false)
    }
    fn seek(&mut self, position: f64) -> DriverResult {
        self.position = position;
        outcome(&self.log, "element.seek", false)
    }
    fn set_volume(&mut self, _volume: f32) -> DriverResult {
        outcome(&self.log, "element.volume", false)
    }
    fn position(&self) -> f64 {
        self.position
    }
    fn duration(&self) -> Option<f64> {
        Some(3600.0)
    }
    fn audio_tracks(&self) -> Vec<AudioTrack> {
        Vec::new()
    }
    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        Vec::new()
    }
    fn select_audio_track(&mut self, index: i32) -> DriverResult {
        outcome(&self.log, &format!("element.audio:{index}"), false)
    }
    fn select_subtitle_track(&mut self, index: Option<i32>) -> DriverResult {
        outcome(&self.log, &format!("element.subtitle:{index:?}"), false)
    }
    fn reset(&mut self) {
        self.log.push("element.reset");
    }
}

pub(crate) struct FakeLoader {
    log: CallLog,
    behavior: Behavior,
}

impl SegmentedLoader for FakeLoader {
    fn is_supported(&self) -> bool {
        !self.behavior.unavailable
    }
    fn attach(&mut self) -> DriverResult {
        outcome(&self.log, "loader.attach", self.behavior.fail_init)
    }
    fn load_source(&mut self, url: &str, _start_position: f64) -> DriverResult {
        self.log.push(format!("loader.load:{url}"));
        match &self.behavior.fail_load {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
    fn start_load(&mut self) {
        self.log.push("loader.start_load");
    }
    fn recover_media_error(&mut self) {
        self.log.push("loader.recover");
    }
    fn swap_audio_codec(&mut self) {
        self.log.push("loader.swap_audio");
    }
    fn audio_tracks(&self) -> Vec<AudioTrack> {
        tracks()
    }
    fn select_audio_track(&mut self, index: i32) -> DriverResult {
        outcome(&self.log, &format!("loader.audio:{index}"), false)
    }
    fn destroy(&mut self) {
        self.log.push("loader.destroy");
    }
}

/// Provider handing out fakes; `None` behaviour means the driver is missing
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDrivers {
    pub log: CallLog,
    pub engine: Option<Behavior>,
    pub decoder: Option<Behavior>,
    pub element: Option<Behavior>,
    pub loader: Option<Behavior>,
    pub native_hls: bool,
}

impl FakeDrivers {
    /// Every driver present and well-behaved
    pub(crate) fn all() -> Self {
        Self {
            engine: Some(Behavior::default()),
            decoder: Some(Behavior::default()),
            element: Some(Behavior::default()),
            loader: Some(Behavior::default()),
            ..Default::default()
        }
    }
}

impl DriverProvider for FakeDrivers {
    fn adaptive_engine(&self) -> Option<Box<dyn AdaptiveEngine>> {
        self.engine.clone().map(|behavior| {
            Box::new(FakeEngine {
                log: self.log.clone(),
                behavior,
                position: 0.0,
            }) as Box<dyn AdaptiveEngine>
        })
    }

    fn native_decoder(&self) -> Option<Box<dyn NativeDecoder>> {
        self.decoder.clone().map(|behavior| {
            Box::new(FakeDecoder {
                log: self.log.clone(),
                behavior,
                position: 0.0,
            }) as Box<dyn NativeDecoder>
        })
    }

    fn media_element(&self) -> Option<Box<dyn MediaElement>> {
        self.element.clone().map(|behavior| {
            Box::new(FakeElement {
                log: self.log.clone(),
                behavior,
                native_hls: self.native_hls,
                position: 0.0,
            }) as Box<dyn MediaElement>
        })
    }

    fn segmented_loader(&self) -> Option<Box<dyn SegmentedLoader>> {
        self.loader.clone().map(|behavior| {
            Box::new(FakeLoader {
                log: self.log.clone(),
                behavior,
            }) as Box<dyn SegmentedLoader>
        })
    }
}
