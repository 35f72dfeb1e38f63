//! Media element backend
//!
//! Progressive sources go straight to the element. Segmented streams go
//! through the loader unless the element plays them natively. Fatal loader
//! errors run a bounded recovery ladder before the backend gives up.

use super::drivers::{DriverEvent, MediaElement, SegmentedLoader};
use super::{
    AudioTrack, BackendCore, BackendKind, BackendState, LoadOptions, PlayerBackend, SubtitleTrack,
    Subscription,
};
use crate::config::BackendConfig;
use crate::error::{DriverError, DriverErrorKind};
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// MIME type of HLS playlists, shared by the element probe and playback URLs
pub const HLS_MIME_TYPE: &str = "application/x-mpegURL";

/// What to do about a fatal loader error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    RestartLoad,
    RecoverMedia,
    SwapAudioAndRecover,
    Abort,
}

/// Recovery bookkeeping for the current load
#[derive(Debug, Default)]
struct RecoveryState {
    network_retries: u32,
    media_recoveries: u32,
    last_recover: Option<Instant>,
    last_swap: Option<Instant>,
}

impl RecoveryState {
    fn next_action(&mut self, error: &DriverError, config: &BackendConfig, now: Instant) -> RecoveryAction {
        match error.kind {
            DriverErrorKind::Network { .. } if error.is_client_error() => RecoveryAction::Abort,
            DriverErrorKind::Network { .. } => {
                if self.network_retries >= config.network_retries {
                    return RecoveryAction::Abort;
                }
                self.network_retries += 1;
                RecoveryAction::RestartLoad
            }
            DriverErrorKind::Media => {
                if self.media_recoveries >= config.media_recovery_attempts {
                    return RecoveryAction::Abort;
                }
                let cooldown = config.media_recovery_cooldown();
                let cooled = |at: Option<Instant>| at.map_or(true, |t| now.duration_since(t) > cooldown);

                let action = if cooled(self.last_recover) {
                    RecoveryAction::RecoverMedia
                } else if cooled(self.last_swap) {
                    self.last_swap = Some(now);
                    RecoveryAction::SwapAudioAndRecover
                } else {
                    return RecoveryAction::Abort;
                };
                self.last_recover = Some(now);
                self.media_recoveries += 1;
                action
            }
            DriverErrorKind::Other => RecoveryAction::Abort,
        }
    }
}

/// True for HLS playlists, by extension or declared mime type
pub fn is_segmented(url: &str, mime_type: Option<&str>) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".m3u8")
        || path.ends_with(".m3u")
        || mime_type.is_some_and(|m| m.to_ascii_lowercase().contains("mpegurl"))
}

pub struct SurfaceBackend {
    core: BackendCore,
    element: Option<Box<dyn MediaElement>>,
    loader: Option<Box<dyn SegmentedLoader>>,
    config: BackendConfig,
    /// The current source is fed by the loader
    via_loader: bool,
    recovery: RecoveryState,
}

impl SurfaceBackend {
    pub fn new(
        element: Option<Box<dyn MediaElement>>,
        loader: Option<Box<dyn SegmentedLoader>>,
        config: BackendConfig,
    ) -> Self {
        Self {
            core: BackendCore::new(BackendKind::Surface),
            element,
            loader,
            config,
            via_loader: false,
            recovery: RecoveryState::default(),
        }
    }

    fn element_mut(&mut self) -> Result<&mut (dyn MediaElement + 'static)> {
        self.element
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("media element released".to_string()))
    }

    fn attach_source(&mut self, url: &str, options: &LoadOptions) -> std::result::Result<(), DriverError> {
        let mime = options.mime_type.as_deref();
        let element = self
            .element
            .as_deref_mut()
            .ok_or_else(|| DriverError::other("media element released"))?;

        let use_loader = is_segmented(url, mime) && !element.can_play_type(HLS_MIME_TYPE);
        if use_loader {
            let loader = self
                .loader
                .as_deref_mut()
                .ok_or_else(|| DriverError::media("segmented stream without a loader"))?;
            self.via_loader = true;
            return loader.load_source(url, options.start_position);
        }

        self.via_loader = false;
        element.set_source(url, mime)?;
        if options.start_position > 0.0 {
            element.seek(options.start_position)?;
        }
        Ok(())
    }

    /// Run one rung of the recovery ladder; aborting fails the backend
    fn recover(&mut self, error: DriverError) -> RecoveryAction {
        let action = self.recovery.next_action(&error, &self.config, Instant::now());
        let Some(loader) = self.loader.as_deref_mut() else {
            self.core.fail(error);
            return RecoveryAction::Abort;
        };

        match action {
            RecoveryAction::RestartLoad => {
                info!(attempt = self.recovery.network_retries, error = %error, "Restarting segment load");
                loader.start_load();
            }
            RecoveryAction::RecoverMedia => {
                info!(error = %error, "Recovering from media error");
                loader.recover_media_error();
            }
            RecoveryAction::SwapAudioAndRecover => {
                info!(error = %error, "Swapping audio codec and recovering");
                loader.swap_audio_codec();
                loader.recover_media_error();
            }
            RecoveryAction::Abort => self.core.fail(error),
        }
        action
    }
}

#[async_trait]
impl PlayerBackend for SurfaceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Surface
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
        if self.element.is_none() {
            debug!("No media element");
            return false;
        }

        if let Some(loader) = self.loader.as_deref_mut() {
            let attached = if loader.is_supported() {
                loader.attach()
            } else {
                Err(DriverError::other("segmented loader unsupported"))
            };
            if let Err(e) = attached {
                debug!(error = %e, "Continuing without segmented loader");
                self.loader = None;
            }
        }
        self.core.transition(BackendState::Ready).is_ok()
    }

    #[instrument(skip(self, options), fields(backend = "surface"))]
    async fn load(&mut self, url: &str, options: &LoadOptions) -> Result<()> {
        self.core.transition(BackendState::Loading)?;
        self.recovery = RecoveryState::default();

        match self.attach_source(url, options) {
            Ok(()) => {
                debug!(via_loader = self.via_loader, "Source attached");
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
        self.element_mut()?.play().map_err(Error::Driver)?;
        self.core.transition(BackendState::Playing)
    }

    async fn pause(&mut self) -> Result<()> {
        self.core.require_media("paused")?;
        self.element_mut()?.pause().map_err(Error::Driver)?;
        self.core.transition(BackendState::Paused)
    }

    async fn seek(&mut self, position: f64) -> Result<()> {
        self.core.require_media("seeking")?;
        self.element_mut()?
            .seek(position.max(0.0))
            .map_err(Error::Driver)
    }

    fn position(&self) -> f64 {
        self.element.as_ref().map_or(0.0, |e| e.position())
    }

    fn duration(&self) -> Option<f64> {
        self.element.as_ref().and_then(|e| e.duration())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.element_mut()?
            .set_volume(volume.clamp(0.0, 1.0))
            .map_err(Error::Driver)
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        match (&self.loader, &self.element) {
            (Some(loader), _) if self.via_loader => loader.audio_tracks(),
            (_, Some(element)) => element.audio_tracks(),
            _ => Vec::new(),
        }
    }

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        self.element.as_ref().map(|e| e.subtitle_tracks()).unwrap_or_default()
    }

    async fn select_audio_track(&mut self, index: i32) -> Result<bool> {
        self.core.require_media("audio track change")?;
        if !self.audio_tracks().iter().any(|t| t.index == index) {
            return Ok(false);
        }
        let result = match (self.via_loader, self.loader.as_deref_mut(), self.element.as_deref_mut()) {
            (true, Some(loader), _) => loader.select_audio_track(index),
            (_, _, Some(element)) => element.select_audio_track(index),
            _ => return Err(Error::Internal("media element released".to_string())),
        };
        result.map_err(Error::Driver)?;
        Ok(true)
    }

    async fn select_subtitle_track(&mut self, index: Option<i32>) -> Result<()> {
        self.core.require_media("subtitle track change")?;
        self.element_mut()?
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
        match event {
            DriverEvent::Error(error) if error.fatal && self.via_loader => {
                let action = self.recover(error);
                if action == RecoveryAction::Abort {
                    warn!("Segmented playback unrecoverable");
                }
            }
            other => self.core.apply(other),
        }
    }

    async fn destroy(&mut self) {
        if self.core.is_destroyed() {
            return;
        }
        if let Some(mut loader) = self.loader.take() {
            loader.destroy();
        }
        if let Some(mut element) = self.element.take() {
            element.reset();
        }
        self.via_loader = false;
        self.core.shut_down();
        debug!("Surface backend destroyed");
    }
}
