//! Drivers for running the engine without a screen

use jellytv_core::backend::drivers::{DriverResult, MediaElement};
use jellytv_core::backend::{AudioTrack, SubtitleTrack};
use jellytv_core::DriverProvider;
use tracing::debug;

/// Accepts any source and never advances
#[derive(Debug, Default)]
struct HeadlessElement {
    src: Option<String>,
    position: f64,
    audio_track: Option<i32>,
}

impl MediaElement for HeadlessElement {
    fn can_play_type(&self, _mime_type: &str) -> bool {
        true
    }

    fn set_source(&mut self, url: &str, mime_type: Option<&str>) -> DriverResult {
        debug!(url, mime_type, "Headless source set");
        self.src = Some(url.to_string());
        Ok(())
    }

    fn play(&mut self) -> DriverResult {
        Ok(())
    }

    fn pause(&mut self) -> DriverResult {
        Ok(())
    }

    fn seek(&mut self, position: f64) -> DriverResult {
        self.position = position;
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> DriverResult {
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        Vec::new()
    }

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        Vec::new()
    }

    fn select_audio_track(&mut self, index: i32) -> DriverResult {
        self.audio_track = Some(index);
        Ok(())
    }

    fn select_subtitle_track(&mut self, _index: Option<i32>) -> DriverResult {
        Ok(())
    }

    fn reset(&mut self) {
        self.src = None;
        self.position = 0.0;
    }
}

/// Only a media element is available
pub struct HeadlessDrivers;

impl DriverProvider for HeadlessDrivers {
    fn media_element(&self) -> Option<Box<dyn MediaElement>> {
        Some(Box::new(HeadlessElement::default()))
    }
}
