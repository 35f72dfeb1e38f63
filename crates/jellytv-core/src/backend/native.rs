//! Platform hardware decoder backend
//!
//! The decoder pipeline is a single hardware resource. Each load closes the
//! previous pipeline before opening a new one. After HDR content the panel
//! is forced back to SDR with a blank decode before the handle is released,
//! and the handle is closed even when the preceding platform calls fail.

use super::drivers::{DisplayMethod, DisplayRect, DriverEvent, NativeDecoder, StreamingHint};
use super::{
    AudioTrack, BackendCore, BackendEvent, BackendKind, BackendState, LoadOptions, PlayerBackend,
    SubtitleTrack, Subscription,
};
use crate::capabilities::{CapabilityProfile, PanelResolution};
use crate::config::BackendConfig;
use crate::error::DriverError;
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

pub struct NativeBackend {
    core: BackendCore,
    decoder: Option<Box<dyn NativeDecoder>>,
    config: BackendConfig,
    panel: PanelResolution,
    /// A pipeline is open on the decoder
    open: bool,
    /// The open pipeline is showing HDR content
    hdr_active: bool,
}

impl NativeBackend {
    pub fn new(
        decoder: Option<Box<dyn NativeDecoder>>,
        caps: &CapabilityProfile,
        config: BackendConfig,
    ) -> Self {
        Self {
            core: BackendCore::new(BackendKind::Native),
            decoder,
            config,
            panel: caps.panel,
            open: false,
            hdr_active: false,
        }
    }

    fn decoder_mut(&mut self) -> Result<&mut (dyn NativeDecoder + 'static)> {
        self.decoder
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("native decoder released".to_string()))
    }

    /// Tear down the open pipeline; the handle is always closed
    async fn release_pipeline(&mut self) {
        if !self.open {
            return;
        }
        let hdr_active = self.hdr_active;
        self.open = false;
        self.hdr_active = false;
        let Some(decoder) = self.decoder.as_deref_mut() else {
            return;
        };

        if let Err(e) = decoder.stop() {
            debug!(error = %e, "Decoder stop failed");
        }
        if hdr_active {
            if let Err(e) = decoder.decode_blank().await {
                warn!(error = %e, "SDR transition decode failed");
            }
        }
        if let Err(e) = decoder.close() {
            warn!(error = %e, "Decoder close failed");
        }
    }

    /// Open, configure and prepare a pipeline for `url`
    async fn open_pipeline(&mut self, url: &str, options: &LoadOptions) -> std::result::Result<(), DriverError> {
        let high_bitrate = options
            .bitrate
            .is_some_and(|b| b >= self.config.high_bitrate_threshold);
        let rect = DisplayRect::full_screen(self.panel.max_width(), self.panel.max_height());
        let initial = self.config.native_initial_buffer_secs;
        let resume = self.config.native_resume_buffer_secs;

        let decoder = self
            .decoder
            .as_deref_mut()
            .ok_or_else(|| DriverError::other("native decoder released"))?;

        decoder.open(url)?;
        self.open = true;
        self.hdr_active = options.video_range.is_hdr();

        if high_bitrate {
            if let Some(bitrate) = options.bitrate {
                debug!(bitrate, "Applying high-bitrate buffering hints");
                decoder.set_streaming_hint(StreamingHint::Bitrate(bitrate))?;
            }
            decoder.set_streaming_hint(StreamingHint::InitialBuffer(initial))?;
            decoder.set_streaming_hint(StreamingHint::ResumeBuffer(resume))?;
        }
        decoder.set_display_rect(rect)?;
        decoder.set_display_method(DisplayMethod::LetterBox)?;
        decoder.set_still_frame(true)?;
        decoder.prepare().await?;
        if options.start_position > 0.0 {
            decoder.seek(options.start_position)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn state(&self) -> BackendState {
        self.core.state()
    }

    async fn initialize(&mut self) -> bool {
        match self.core.state() {
            BackendState::Ready => return true,
            BackendState::Uninitialized => {}
            _ => return false,
        }
        match self.decoder.as_deref() {
            Some(decoder) if decoder.is_available() => {
                self.core.transition(BackendState::Ready).is_ok()
            }
            _ => {
                debug!("Native decoder unavailable");
                false
            }
        }
    }

    #[instrument(skip(self, options), fields(backend = "native", bitrate = ?options.bitrate))]
    async fn load(&mut self, url: &str, options: &LoadOptions) -> Result<()> {
        self.core.transition(BackendState::Loading)?;
        self.release_pipeline().await;

        match self.open_pipeline(url, options).await {
            Ok(()) => {
                info!(hdr = self.hdr_active, "Native pipeline prepared");
                let duration = self.duration();
                self.core.emit(BackendEvent::Loaded { duration });
                Ok(())
            }
            Err(e) => {
                self.core.fail(e.clone());
                Err(Error::BackendLoad(e))
            }
        }
    }

    async fn play(&mut self) -> Result<()> {
        self.core.require_media("playing")?;
        self.decoder_mut()?.play().map_err(Error::Driver)?;
        self.core.transition(BackendState::Playing)
    }

    async fn pause(&mut self) -> Result<()> {
        self.core.require_media("paused")?;
        self.decoder_mut()?.pause().map_err(Error::Driver)?;
        self.core.transition(BackendState::Paused)
    }

    async fn seek(&mut self, position: f64) -> Result<()> {
        self.core.require_media("seeking")?;
        self.decoder_mut()?
            .seek(position.max(0.0))
            .map_err(Error::Driver)
    }

    fn position(&self) -> f64 {
        self.decoder.as_ref().map_or(0.0, |d| d.position())
    }

    fn duration(&self) -> Option<f64> {
        self.decoder.as_ref().and_then(|d| d.duration())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.decoder_mut()?
            .set_volume(volume.clamp(0.0, 1.0))
            .map_err(Error::Driver)
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        self.decoder.as_ref().map(|d| d.audio_tracks()).unwrap_or_default()
    }

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        self.decoder.as_ref().map(|d| d.subtitle_tracks()).unwrap_or_default()
    }

    async fn select_audio_track(&mut self, index: i32) -> Result<bool> {
        self.core.require_media("audio track change")?;
        if !self.audio_tracks().iter().any(|t| t.index == index) {
            return Ok(false);
        }
        self.decoder_mut()?
            .select_audio_track(index)
            .map_err(Error::Driver)?;
        Ok(true)
    }

    async fn select_subtitle_track(&mut self, index: Option<i32>) -> Result<()> {
        self.core.require_media("subtitle track change")?;
        self.decoder_mut()?
            .select_subtitle_track(index)
            .map_err(Error::Driver)
    }

    fn subscribe(&mut self) -> Subscription {
        self.core.subscribe()
    }

    async fn handle_driver_event(&mut self, event: DriverEvent) {
        if self.core.is_destroyed() {
            return;
        }
        self.core.apply(event);
    }

    async fn destroy(&mut self) {
        if self.core.is_destroyed() {
            return;
        }
        self.release_pipeline().await;
        self.decoder = None;
        self.core.shut_down();
        debug!("Native backend destroyed");
    }
}
