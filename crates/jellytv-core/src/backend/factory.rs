//! Backend selection with fallback

use super::surface::is_segmented;
use super::{AdaptiveBackend, BackendKind, DriverProvider, NativeBackend, PlayerBackend, SurfaceBackend};
use crate::capabilities::CapabilityProfile;
use crate::config::BackendConfig;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Backend orderings for the kinds of streams the engine produces
pub struct BackendPriority;

impl BackendPriority {
    /// HDR goes to the hardware decoder first so the panel switches modes.
    /// Playlists go to the element path, which handles them natively or
    /// through its loader.
    pub fn for_stream(url: &str, mime_type: Option<&str>, is_hdr: bool) -> Vec<BackendKind> {
        if is_hdr {
            vec![BackendKind::Native, BackendKind::Adaptive, BackendKind::Surface]
        } else if is_segmented(url, mime_type) {
            vec![BackendKind::Surface, BackendKind::Adaptive, BackendKind::Native]
        } else {
            vec![BackendKind::Adaptive, BackendKind::Native, BackendKind::Surface]
        }
    }
}

/// Builds backends over the platform's drivers
#[derive(Clone)]
pub struct BackendFactory {
    drivers: Arc<dyn DriverProvider>,
    config: BackendConfig,
}

impl BackendFactory {
    pub fn new(drivers: Arc<dyn DriverProvider>, config: BackendConfig) -> Self {
        Self { drivers, config }
    }

    /// Construct an uninitialized backend of one kind
    pub fn build(&self, kind: BackendKind, caps: &CapabilityProfile) -> Box<dyn PlayerBackend> {
        match kind {
            BackendKind::Adaptive => Box::new(AdaptiveBackend::new(
                self.drivers.adaptive_engine(),
                caps,
                self.config.clone(),
            )),
            BackendKind::Native => Box::new(NativeBackend::new(
                self.drivers.native_decoder(),
                caps,
                self.config.clone(),
            )),
            BackendKind::Surface => Box::new(SurfaceBackend::new(
                self.drivers.media_element(),
                self.drivers.segmented_loader(),
                self.config.clone(),
            )),
        }
    }

    /// First backend in `priority` that initializes. Each one that does not
    /// is destroyed before the next is tried.
    #[instrument(skip(self, caps))]
    pub async fn create(
        &self,
        priority: &[BackendKind],
        caps: &CapabilityProfile,
    ) -> Result<Box<dyn PlayerBackend>> {
        let mut attempted = Vec::with_capacity(priority.len());

        for &kind in priority {
            let mut backend = self.build(kind, caps);
            if backend.initialize().await {
                info!(backend = %kind, "Backend initialized");
                return Ok(backend);
            }
            warn!(backend = %kind, "Backend failed to initialize, trying next");
            backend.destroy().await;
            attempted.push(kind.to_string());
        }

        Err(Error::NoBackendAvailable { attempted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fakes::{Behavior, FakeDrivers};
    use crate::backend::BackendState;
    use crate::capabilities::{DetectionSource, PanelResolution};

    fn caps() -> CapabilityProfile {
        CapabilityProfile::for_platform_year(2020, 5.0, PanelResolution::Uhd, DetectionSource::Default)
    }

    #[test]
    fn test_priority_for_stream() {
        assert_eq!(
            BackendPriority::for_stream("http://srv/stream.mp4", None, true)[0],
            BackendKind::Native
        );
        assert_eq!(
            BackendPriority::for_stream("http://srv/main.m3u8?x=1", None, false)[0],
            BackendKind::Surface
        );
        assert_eq!(
            BackendPriority::for_stream("http://srv/stream.mp4", Some("video/mp4"), false),
            vec![BackendKind::Adaptive, BackendKind::Native, BackendKind::Surface]
        );
    }

    #[tokio::test]
    async fn test_falls_through_failing_backends() {
        let failing = Behavior {
            fail_init: true,
            ..Default::default()
        };
        let drivers = FakeDrivers {
            engine: Some(failing),
            decoder: Some(Behavior {
                unavailable: true,
                ..Default::default()
            }),
            ..FakeDrivers::all()
        };
        let log = drivers.log.clone();
        let factory = BackendFactory::new(Arc::new(drivers), BackendConfig::default());

        let backend = factory.create(&BackendKind::ALL, &caps()).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Surface);
        assert_eq!(backend.state(), BackendState::Ready);
        assert!(log.contains("engine.attach"));
        // the failed engine was released before moving on
        assert_eq!(log.count("engine.destroy"), 1);
    }

    #[tokio::test]
    async fn test_no_backend_available() {
        let factory = BackendFactory::new(Arc::new(FakeDrivers::default()), BackendConfig::default());
        let err = factory.create(&BackendKind::ALL, &caps()).await.err().unwrap();
        match err {
            Error::NoBackendAvailable { attempted } => {
                assert_eq!(attempted, vec!["adaptive", "native", "surface"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_backend_wins() {
        let drivers = FakeDrivers::all();
        let log = drivers.log.clone();
        let factory = BackendFactory::new(Arc::new(drivers), BackendConfig::default());

        let backend = factory
            .create(&[BackendKind::Native, BackendKind::Adaptive], &caps())
            .await
            .unwrap();
        assert_eq!(backend.kind(), BackendKind::Native);
        assert!(!log.contains("engine.attach"));
    }
}
