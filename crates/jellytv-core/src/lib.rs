//! jellytv core - playback negotiation engine
//!
//! Given a media item, the sources a media server offers for it, and what
//! the local hardware can decode, this crate:
//! - detects and caches a capability profile of the platform
//! - decides per source between direct play, direct stream and transcode
//! - scores the sources and picks the best one
//! - hands the playback URL to the first platform backend that initializes
//! - supervises the live session, reporting progress and requesting a
//!   transcode fallback when direct playback keeps stalling
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       PlaybackManager                        │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │   │  Capability  │──▶│   Decision   │──▶│   Selector   │     │
//! │   │   Context    │   │              │   │              │     │
//! │   └──────────────┘   └──────────────┘   └──────┬───────┘     │
//! │                                                │             │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────┴───────┐     │
//! │   │    Health    │◀──│   Backend    │◀──│  Playback    │     │
//! │   │   Monitor    │   │   Factory    │   │    URLs      │     │
//! │   └──────────────┘   └──────────────┘   └──────────────┘     │
//! │            ▲                                                 │
//! │   ┌────────┴─────┐                                           │
//! │   │   Progress   │──▶ CatalogService (media server)          │
//! │   │   Reporter   │                                           │
//! │   └──────────────┘                                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod decision;
pub mod error;
pub mod selector;
pub mod session;
pub mod types;

pub use backend::{
    BackendEvent, BackendFactory, BackendKind, BackendPriority, BackendState, DriverEvent,
    DriverProvider, LoadOptions, PlayerBackend, Subscription,
};
pub use capabilities::{
    CapabilityContext, CapabilityProfile, DeviceProfile, PanelResolution, PlatformProbe,
    StaticProbe,
};
pub use catalog::{CatalogService, CredentialProvider, HttpCatalog, StaticCredentials};
pub use config::EngineConfig;
pub use decision::decide;
pub use error::{DriverError, DriverErrorKind, Error, Result};
pub use selector::{select, SelectionOptions};
pub use session::{
    AudioChange, FallbackRequest, HealthMonitor, HealthStatus, PlaybackManager, PlaybackSession,
    PlaybackStart, StartOptions, SubtitleChange,
};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version; call once at startup
pub fn init() {
    tracing::info!(version = VERSION, "jellytv core initialized");
}
