//! Media server catalog contract
//!
//! The engine talks to the media server only through [`CatalogService`],
//! and obtains server addresses and tokens only through
//! [`CredentialProvider`]. [`http::HttpCatalog`] is the reqwest-backed
//! implementation.

pub mod http;

pub use http::HttpCatalog;

use crate::capabilities::DeviceProfile;
use crate::types::{ItemDetails, PlayMethod, PlaybackInfo, ServerCredentials};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Body of a playback-info request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfoRequest {
    pub user_id: String,
    pub device_profile: DeviceProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_stream_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_streaming_bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time_ticks: Option<i64>,
    pub enable_direct_play: bool,
    pub enable_direct_stream: bool,
    pub enable_transcoding: bool,
    pub auto_open_live_stream: bool,
}

impl PlaybackInfoRequest {
    pub fn new(user_id: impl Into<String>, device_profile: DeviceProfile) -> Self {
        Self {
            user_id: user_id.into(),
            device_profile,
            media_source_id: None,
            audio_stream_index: None,
            subtitle_stream_index: None,
            max_streaming_bitrate: None,
            start_time_ticks: None,
            enable_direct_play: true,
            enable_direct_stream: true,
            enable_transcoding: true,
            auto_open_live_stream: true,
        }
    }

    /// Ask the server for a transcode only
    pub fn force_transcode(mut self) -> Self {
        self.enable_direct_play = false;
        self.enable_direct_stream = false;
        self
    }
}

/// Session descriptor sent with start/progress/stop reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackReport {
    pub item_id: String,
    pub media_source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_session_id: Option<String>,
    pub play_method: PlayMethod,
    pub position_ticks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_stream_index: Option<i32>,
    pub is_paused: bool,
    pub can_seek: bool,
}

/// Catalog and reporting endpoints of the media server
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Negotiate media sources for an item
    async fn get_playback_info(
        &self,
        creds: &ServerCredentials,
        item_id: &str,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfo>;

    async fn report_playback_start(
        &self,
        creds: &ServerCredentials,
        report: &PlaybackReport,
    ) -> Result<()>;

    async fn report_playback_progress(
        &self,
        creds: &ServerCredentials,
        report: &PlaybackReport,
    ) -> Result<()>;

    async fn report_playback_stopped(
        &self,
        creds: &ServerCredentials,
        report: &PlaybackReport,
    ) -> Result<()>;

    /// Item metadata, used when playback info carries no chapters
    async fn get_item(&self, creds: &ServerCredentials, item_id: &str) -> Result<ItemDetails>;
}

/// Source of server credentials; the engine never stores them
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Credentials for a server, `None` meaning the signed-in default server
    async fn credentials(&self, server_id: Option<&str>) -> Option<ServerCredentials>;
}

/// Fixed credential set
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    default: Option<ServerCredentials>,
    others: Vec<ServerCredentials>,
}

impl StaticCredentials {
    pub fn new(default: ServerCredentials) -> Self {
        Self {
            default: Some(default),
            others: Vec::new(),
        }
    }

    /// Add credentials for a cross-server item
    pub fn with_server(mut self, creds: ServerCredentials) -> Self {
        self.others.push(creds);
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self, server_id: Option<&str>) -> Option<ServerCredentials> {
        match server_id {
            None => self.default.clone(),
            Some(id) => self
                .others
                .iter()
                .chain(self.default.iter())
                .find(|c| c.server_id.as_deref() == Some(id))
                .cloned(),
        }
    }
}
