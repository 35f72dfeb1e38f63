//! reqwest implementation of the catalog contract

use super::{CatalogService, PlaybackInfoRequest, PlaybackReport};
use crate::types::{ItemDetails, PlaybackInfo, ServerCredentials};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

const X_EMBY_TOKEN: &str = "X-Emby-Token";

/// Path segment, percent-encoded
fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// HTTP catalog client; one instance serves every server
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
}

impl HttpCatalog {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self { client })
    }

    /// Use an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn headers(creds: &ServerCredentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let token = HeaderValue::from_str(&creds.access_token)
            .map_err(|_| Error::MissingCredentials("access token is not a valid header".into()))?;
        headers.insert(X_EMBY_TOKEN, token);
        Ok(headers)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Catalog {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn post_report<T: Serialize + ?Sized>(
        &self,
        creds: &ServerCredentials,
        path: &str,
        body: &T,
    ) -> Result<()> {
        let url = format!("{}{}", creds.base_url(), path);
        let response = self
            .client
            .post(&url)
            .headers(Self::headers(creds)?)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    #[instrument(skip(self, creds, request), fields(server = %creds.base_url()))]
    async fn get_playback_info(
        &self,
        creds: &ServerCredentials,
        item_id: &str,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfo> {
        let url = format!("{}/Items/{}/PlaybackInfo", creds.base_url(), encode(item_id));
        let response = self
            .client
            .post(&url)
            .headers(Self::headers(creds)?)
            .query(&[("UserId", request.user_id.as_str())])
            .json(request)
            .send()
            .await?;

        let info: PlaybackInfo = Self::check(response).await?.json().await?;
        debug!(
            sources = info.media_sources.len(),
            play_session_id = ?info.play_session_id,
            "Playback info received"
        );
        Ok(info)
    }

    #[instrument(skip(self, creds, report), fields(item_id = %report.item_id))]
    async fn report_playback_start(
        &self,
        creds: &ServerCredentials,
        report: &PlaybackReport,
    ) -> Result<()> {
        self.post_report(creds, "/Sessions/Playing", report).await
    }

    #[instrument(skip(self, creds, report), fields(item_id = %report.item_id, position = report.position_ticks))]
    async fn report_playback_progress(
        &self,
        creds: &ServerCredentials,
        report: &PlaybackReport,
    ) -> Result<()> {
        self.post_report(creds, "/Sessions/Playing/Progress", report).await
    }

    #[instrument(skip(self, creds, report), fields(item_id = %report.item_id))]
    async fn report_playback_stopped(
        &self,
        creds: &ServerCredentials,
        report: &PlaybackReport,
    ) -> Result<()> {
        self.post_report(creds, "/Sessions/Playing/Stopped", report).await
    }

    #[instrument(skip(self, creds))]
    async fn get_item(&self, creds: &ServerCredentials, item_id: &str) -> Result<ItemDetails> {
        let url = format!(
            "{}/Users/{}/Items/{}",
            creds.base_url(),
            encode(&creds.user_id),
            encode(item_id)
        );
        let response = self
            .client
            .get(&url)
            .headers(Self::headers(creds)?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{device_profile::ProfileOptions, CapabilityProfile, DeviceProfile, PanelResolution};
    use crate::types::PlayMethod;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(server: &MockServer) -> ServerCredentials {
        ServerCredentials::new(format!("{}/", server.uri()), "secret", "user-1")
    }

    fn request() -> PlaybackInfoRequest {
        let caps = CapabilityProfile::conservative(PanelResolution::Fhd);
        PlaybackInfoRequest::new("user-1", DeviceProfile::build(&caps, &ProfileOptions::default()))
    }

    fn report() -> PlaybackReport {
        PlaybackReport {
            item_id: "item".to_string(),
            media_source_id: "src".to_string(),
            play_session_id: Some("ps".to_string()),
            play_method: PlayMethod::DirectPlay,
            position_ticks: 0,
            audio_stream_index: Some(1),
            subtitle_stream_index: None,
            is_paused: false,
            can_seek: true,
        }
    }

    #[tokio::test]
    async fn test_playback_info_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Items/item-42/PlaybackInfo"))
            .and(header("X-Emby-Token", "secret"))
            .and(query_param("UserId", "user-1"))
            .and(body_partial_json(serde_json::json!({"UserId": "user-1", "EnableDirectPlay": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "PlaySessionId": "ps-1",
                "MediaSources": [{"Id": "src-1", "Container": "mp4", "SupportsDirectPlay": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = HttpCatalog::new().unwrap();
        let info = catalog
            .get_playback_info(&creds(&server), "item-42", &request())
            .await
            .unwrap();
        assert_eq!(info.play_session_id.as_deref(), Some("ps-1"));
        assert_eq!(info.media_sources[0].id, "src-1");
    }

    #[tokio::test]
    async fn test_reports_hit_session_endpoints() {
        let server = MockServer::start().await;
        for endpoint in ["/Sessions/Playing", "/Sessions/Playing/Progress", "/Sessions/Playing/Stopped"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .and(body_partial_json(serde_json::json!({"ItemId": "item", "PlayMethod": "DirectPlay"})))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;
        }

        let catalog = HttpCatalog::new().unwrap();
        let creds = creds(&server);
        catalog.report_playback_start(&creds, &report()).await.unwrap();
        catalog.report_playback_progress(&creds, &report()).await.unwrap();
        catalog.report_playback_stopped(&creds, &report()).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_item_chapters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Users/user-1/Items/item"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Id": "item",
                "Chapters": [{"Name": "Intro", "StartPositionTicks": 0},
                             {"Name": "Act 1", "StartPositionTicks": 900_000_000i64}]
            })))
            .mount(&server)
            .await;

        let item = HttpCatalog::new()
            .unwrap()
            .get_item(&creds(&server), "item")
            .await
            .unwrap();
        assert_eq!(item.chapters.len(), 2);
        assert_eq!(item.chapters[1].start_position_ticks, 900_000_000);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_catalog_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = HttpCatalog::new()
            .unwrap()
            .get_playback_info(&creds(&server), "item", &request())
            .await
            .unwrap_err();
        match &err {
            Error::Catalog { status, message } => {
                assert_eq!(*status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_recoverable());
    }
}
