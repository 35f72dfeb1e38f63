//! Player backends
//!
//! A backend wraps one platform driver behind the common [`PlayerBackend`]
//! interface. Three implementations exist:
//!
//! - [`AdaptiveBackend`]: adaptive streaming engine, prefers HDR renditions
//!   when the panel can show them
//! - [`NativeBackend`]: the platform hardware decoder pipeline
//! - [`SurfaceBackend`]: a plain media element, with segmented streams
//!   delegated to a loader that runs a bounded recovery ladder
//!
//! [`BackendFactory`] tries them in priority order until one initializes.

pub mod adaptive;
pub mod drivers;
pub mod events;
pub mod factory;
pub mod native;
pub mod surface;

#[cfg(test)]
pub(crate) mod fakes;

pub use adaptive::AdaptiveBackend;
pub use drivers::{DriverEvent, DriverProvider};
pub use events::{BackendEvent, EventBus, Subscription};
pub use factory::{BackendFactory, BackendPriority};
pub use native::NativeBackend;
pub use surface::SurfaceBackend;

use crate::error::DriverError;
use crate::types::VideoRangeType;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The fixed set of backend implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Adaptive,
    Native,
    Surface,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Adaptive, BackendKind::Native, BackendKind::Surface];
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Adaptive => write!(f, "adaptive"),
            BackendKind::Native => write!(f, "native"),
            BackendKind::Surface => write!(f, "surface"),
        }
    }
}

/// Backend lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendState {
    Uninitialized,
    Ready,
    Loading,
    Playing,
    Paused,
    Destroyed,
    Error,
}

impl BackendState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: BackendState) -> bool {
        use BackendState::*;
        match (self, target) {
            (Destroyed, _) => false,
            (_, Destroyed) => true,
            (Error, _) => false,
            (_, Error) => true,
            _ => matches!(
                (self, target),
                (Uninitialized, Ready)
                    | (Ready, Loading)
                    | (Loading, Playing)
                    | (Loading, Paused)
                    | (Playing, Paused)
                    | (Paused, Playing)
                    | (Playing, Loading)
                    | (Paused, Loading)
            ),
        }
    }

    /// Media is attached and transport controls apply
    pub fn has_media(&self) -> bool {
        matches!(self, BackendState::Loading | BackendState::Playing | BackendState::Paused)
    }
}

impl std::fmt::Display for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendState::Uninitialized => write!(f, "uninitialized"),
            BackendState::Ready => write!(f, "ready"),
            BackendState::Loading => write!(f, "loading"),
            BackendState::Playing => write!(f, "playing"),
            BackendState::Paused => write!(f, "paused"),
            BackendState::Destroyed => write!(f, "destroyed"),
            BackendState::Error => write!(f, "error"),
        }
    }
}

/// Audio track as exposed by a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub index: i32,
    pub language: Option<String>,
    pub label: Option<String>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub active: bool,
}

/// Subtitle track as exposed by a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub index: i32,
    pub language: Option<String>,
    pub label: Option<String>,
    pub active: bool,
}

/// Per-load parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Seconds into the media
    pub start_position: f64,
    pub mime_type: Option<String>,
    /// Declared bitrate of the stream (bits/s)
    pub bitrate: Option<u64>,
    pub video_range: VideoRangeType,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            start_position: 0.0,
            mime_type: None,
            bitrate: None,
            video_range: VideoRangeType::Sdr,
        }
    }
}

/// Common interface of all playback backends.
///
/// `initialize` reports failure as `false` and never errors. `destroy` is
/// idempotent and valid from every state, including before `initialize`.
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn state(&self) -> BackendState;

    async fn initialize(&mut self) -> bool;

    async fn load(&mut self, url: &str, options: &LoadOptions) -> Result<()>;

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn seek(&mut self, position: f64) -> Result<()>;

    /// Current position in seconds
    fn position(&self) -> f64;

    fn duration(&self) -> Option<f64>;

    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    fn audio_tracks(&self) -> Vec<AudioTrack>;

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack>;

    /// Switch audio track in place; `false` when the backend cannot
    async fn select_audio_track(&mut self, index: i32) -> Result<bool>;

    async fn select_subtitle_track(&mut self, index: Option<i32>) -> Result<()>;

    fn subscribe(&mut self) -> Subscription;

    /// Feed an asynchronous driver notification into the backend
    async fn handle_driver_event(&mut self, event: DriverEvent);

    async fn destroy(&mut self);
}

/// State and event plumbing shared by every backend
#[derive(Debug)]
pub(crate) struct BackendCore {
    kind: BackendKind,
    state: BackendState,
    events: EventBus,
}

impl BackendCore {
    pub(crate) fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            state: BackendState::Uninitialized,
            events: EventBus::new(),
        }
    }

    pub(crate) fn state(&self) -> BackendState {
        self.state
    }

    pub(crate) fn transition(&mut self, to: BackendState) -> Result<()> {
        if self.state == to {
            return Ok(());
        }
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        debug!(backend = %self.kind, from = %self.state, to = %to, "Backend state transition");
        self.state = to;
        Ok(())
    }

    /// Error unless media is attached
    pub(crate) fn require_media(&self, operation: &str) -> Result<()> {
        if self.state.has_media() {
            Ok(())
        } else {
            Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: operation.to_string(),
            })
        }
    }

    /// Enter the error state and tell subscribers
    pub(crate) fn fail(&mut self, error: DriverError) {
        warn!(backend = %self.kind, error = %error, "Backend failed");
        if self.state.can_transition_to(BackendState::Error) {
            self.state = BackendState::Error;
        }
        self.events.emit(BackendEvent::Error { error });
    }

    pub(crate) fn emit(&mut self, event: BackendEvent) {
        self.events.emit(event);
    }

    pub(crate) fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.state == BackendState::Destroyed
    }

    /// Unsubscribe everyone and enter the terminal state
    pub(crate) fn shut_down(&mut self) {
        self.events.close();
        self.state = BackendState::Destroyed;
    }

    /// Handling shared by all backends for non-error driver events
    pub(crate) fn apply(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Loaded { duration } => self.emit(BackendEvent::Loaded { duration }),
            DriverEvent::BufferingStarted => self.emit(BackendEvent::Buffering { active: true }),
            DriverEvent::BufferingEnded => self.emit(BackendEvent::Buffering { active: false }),
            DriverEvent::Playing => {
                let _ = self.transition(BackendState::Playing);
            }
            DriverEvent::Paused => {
                let _ = self.transition(BackendState::Paused);
            }
            DriverEvent::QualityChanged { bitrate, height } => {
                self.emit(BackendEvent::QualityChange { bitrate, height })
            }
            DriverEvent::Ended => self.emit(BackendEvent::Ended),
            DriverEvent::Error(error) => {
                if error.fatal {
                    self.fail(error);
                } else {
                    debug!(backend = %self.kind, error = %error, "Non-fatal driver error");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        use BackendState::*;
        assert!(Uninitialized.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Loading));
        assert!(Loading.can_transition_to(Playing));
        assert!(Playing.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Playing));
        assert!(Paused.can_transition_to(Loading));

        assert!(!Uninitialized.can_transition_to(Loading));
        assert!(!Ready.can_transition_to(Playing));
    }

    #[test]
    fn test_error_only_allows_destroy() {
        use BackendState::*;
        for state in [Uninitialized, Ready, Loading, Playing, Paused] {
            assert!(state.can_transition_to(Error));
            assert!(state.can_transition_to(Destroyed));
        }
        for target in [Uninitialized, Ready, Loading, Playing, Paused, Error] {
            assert!(!Error.can_transition_to(target));
        }
        assert!(Error.can_transition_to(Destroyed));
        assert!(!Destroyed.can_transition_to(Ready));
    }

    #[tokio::test]
    async fn test_core_fail_emits_error() {
        let mut core = BackendCore::new(BackendKind::Surface);
        let mut sub = core.subscribe();
        core.transition(BackendState::Ready).unwrap();
        core.fail(DriverError::other("boom"));

        assert_eq!(core.state(), BackendState::Error);
        assert!(core.transition(BackendState::Loading).is_err());
        assert!(matches!(sub.recv().await, Some(BackendEvent::Error { .. })));

        core.shut_down();
        assert!(core.is_destroyed());
        assert_eq!(sub.recv().await, None);
    }
}
