//! Adaptive streaming engine backend

use super::drivers::{AdaptiveEngine, AdaptiveEngineConfig, DriverEvent};
use super::{
    AudioTrack, BackendCore, BackendEvent, BackendKind, BackendState, LoadOptions, PlayerBackend,
    SubtitleTrack, Subscription,
};
use crate::capabilities::CapabilityProfile;
use crate::config::BackendConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

const HDR_CODEC_ORDER: [&str; 4] = ["hevc", "av1", "vp9", "h264"];
const SDR_CODEC_ORDER: [&str; 4] = ["h264", "hevc", "vp9", "av1"];

pub struct AdaptiveBackend {
    core: BackendCore,
    engine: Option<Box<dyn AdaptiveEngine>>,
    config: BackendConfig,
    caps: CapabilityProfile,
}

impl AdaptiveBackend {
    pub fn new(
        engine: Option<Box<dyn AdaptiveEngine>>,
        caps: &CapabilityProfile,
        config: BackendConfig,
    ) -> Self {
        Self {
            core: BackendCore::new(BackendKind::Adaptive),
            engine,
            config,
            caps: caps.clone(),
        }
    }

    /// Engine settings for one load; HDR renditions lead when both the
    /// content and the panel are HDR
    pub fn engine_config(&self, options: &LoadOptions) -> AdaptiveEngineConfig {
        let prefer_hdr = options.video_range.is_hdr()
            && self.caps.hdr.any()
            && self.caps.supports_range(options.video_range);
        let order = if prefer_hdr { HDR_CODEC_ORDER } else { SDR_CODEC_ORDER };

        AdaptiveEngineConfig {
            preferred_video_codecs: order
                .iter()
                .filter(|c| self.caps.supports_video_codec(c))
                .map(|c| c.to_string())
                .collect(),
            prefer_hdr,
            buffering_goal_secs: self.config.adaptive_buffering_goal_secs,
            max_bitrate: self.caps.max_bitrate,
            max_height: self.caps.panel.max_height(),
        }
    }

    fn engine_mut(&mut self) -> Result<&mut (dyn AdaptiveEngine + 'static)> {
        self.engine
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("adaptive engine released".to_string()))
    }
}

#[async_trait]
impl PlayerBackend for AdaptiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Adaptive
    }

    fn state(&self) -> BackendState {
        self.core.state()
    }

    async fn initialize(&mut self) -> bool {
        if self.core.state() == BackendState::Ready {
            return true;
        }
        if self.core.state() != BackendState::Uninitialized {
            return false;
        }
        let Some(engine) = self.engine.as_deref_mut() else {
            debug!("No adaptive engine on this platform");
            return false;
        };
        if !engine.is_supported() {
            debug!("Adaptive engine not supported");
            return false;
        }
        if let Err(e) = engine.attach().await {
            warn!(error = %e, "Adaptive engine failed to attach");
            return false;
        }
        self.core.transition(BackendState::Ready).is_ok()
    }

    #[instrument(skip(self, options), fields(backend = "adaptive"))]
    async fn load(&mut self, url: &str, options: &LoadOptions) -> Result<()> {
        self.core.transition(BackendState::Loading)?;
        let engine_config = self.engine_config(options);
        info!(
            codecs = ?engine_config.preferred_video_codecs,
            prefer_hdr = engine_config.prefer_hdr,
            "Loading adaptive stream"
        );

        let engine = self.engine_mut()?;
        engine.configure(&engine_config);
        match engine.load(url, options.start_position).await {
            Ok(()) => {
                let duration = engine.duration();
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
        self.engine_mut()?.play().map_err(Error::Driver)?;
        self.core.transition(BackendState::Playing)
    }

    async fn pause(&mut self) -> Result<()> {
        self.core.require_media("paused")?;
        self.engine_mut()?.pause().map_err(Error::Driver)?;
        self.core.transition(BackendState::Paused)
    }

    async fn seek(&mut self, position: f64) -> Result<()> {
        self.core.require_media("seeking")?;
        self.engine_mut()?.seek(position.max(0.0)).map_err(Error::Driver)
    }

    fn position(&self) -> f64 {
        self.engine.as_ref().map_or(0.0, |e| e.position())
    }

    fn duration(&self) -> Option<f64> {
        self.engine.as_ref().and_then(|e| e.duration())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.engine_mut()?
            .set_volume(volume.clamp(0.0, 1.0))
            .map_err(Error::Driver)
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        self.engine.as_ref().map(|e| e.audio_tracks()).unwrap_or_default()
    }

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        self.engine.as_ref().map(|e| e.subtitle_tracks()).unwrap_or_default()
    }

    async fn select_audio_track(&mut self, index: i32) -> Result<bool> {
        self.core.require_media("audio track change")?;
        if !self.audio_tracks().iter().any(|t| t.index == index) {
            return Ok(false);
        }
        self.engine_mut()?
            .select_audio_track(index)
            .map_err(Error::Driver)?;
        Ok(true)
    }

    async fn select_subtitle_track(&mut self, index: Option<i32>) -> Result<()> {
        self.core.require_media("subtitle track change")?;
        self.engine_mut()?
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
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = engine.destroy().await {
                warn!(error = %e, "Adaptive engine teardown failed");
            }
        }
        self.core.shut_down();
        debug!("Adaptive backend destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fakes::{Behavior, FakeDrivers};
    use crate::backend::DriverProvider;
    use crate::capabilities::{DetectionSource, PanelResolution};
    use crate::error::DriverError;
    use crate::types::VideoRangeType;

    fn caps() -> CapabilityProfile {
        CapabilityProfile::for_platform_year(
            2021,
            6.0,
            PanelResolution::Uhd,
            DetectionSource::PlatformVersion,
        )
    }

    fn backend(drivers: &FakeDrivers) -> AdaptiveBackend {
        AdaptiveBackend::new(drivers.adaptive_engine(), &caps(), BackendConfig::default())
    }

    #[tokio::test]
    async fn test_load_and_play() {
        let drivers = FakeDrivers::all();
        let mut backend = backend(&drivers);
        let mut events = backend.subscribe();

        assert!(backend.initialize().await);
        backend
            .load("http://srv/master.m3u8", &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(backend.state(), BackendState::Loading);
        assert_eq!(
            events.recv().await,
            Some(BackendEvent::Loaded { duration: Some(3600.0) })
        );

        backend.play().await.unwrap();
        assert_eq!(backend.state(), BackendState::Playing);
        backend.pause().await.unwrap();
        assert_eq!(backend.state(), BackendState::Paused);
        assert!(backend.select_audio_track(2).await.unwrap());
        assert!(!backend.select_audio_track(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_hdr_content_prefers_hdr_codecs() {
        let drivers = FakeDrivers::all();
        let backend = backend(&drivers);

        let hdr = backend.engine_config(&LoadOptions {
            video_range: VideoRangeType::Hdr10,
            ..Default::default()
        });
        assert!(hdr.prefer_hdr);
        assert_eq!(hdr.preferred_video_codecs[0], "hevc");

        let sdr = backend.engine_config(&LoadOptions::default());
        assert!(!sdr.prefer_hdr);
        assert_eq!(sdr.preferred_video_codecs[0], "h264");
    }

    #[tokio::test]
    async fn test_missing_or_unsupported_engine() {
        let mut missing = backend(&FakeDrivers::default());
        assert!(!missing.initialize().await);

        let unsupported = FakeDrivers {
            engine: Some(Behavior {
                unavailable: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!backend(&unsupported).initialize().await);
    }

    #[tokio::test]
    async fn test_load_failure_enters_error() {
        let drivers = FakeDrivers {
            engine: Some(Behavior {
                fail_load: Some(DriverError::network(Some(404), "manifest")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut backend = backend(&drivers);
        let mut events = backend.subscribe();
        assert!(backend.initialize().await);

        let err = backend.load("http://srv/x.m3u8", &LoadOptions::default()).await;
        assert!(matches!(err, Err(Error::BackendLoad(_))));
        assert_eq!(backend.state(), BackendState::Error);
        assert!(matches!(events.recv().await, Some(BackendEvent::Error { .. })));
        assert!(backend.play().await.is_err());

        backend.destroy().await;
        assert_eq!(backend.state(), BackendState::Destroyed);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let drivers = FakeDrivers::all();
        let mut backend = backend(&drivers);
        backend.destroy().await;
        backend.destroy().await;
        assert_eq!(backend.state(), BackendState::Destroyed);
        assert_eq!(drivers.log.count("engine.destroy"), 1);
        assert!(!backend.initialize().await);
    }
}
