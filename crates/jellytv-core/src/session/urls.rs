//! Playback URL construction

use crate::backend::surface::HLS_MIME_TYPE;
use crate::types::{MediaSource, MediaStream, MediaType, PlayMethod, ServerCredentials};
use crate::{Error, Result};
use url::form_urlencoded::Serializer;

/// Everything a playback URL is built from
#[derive(Debug, Clone, Copy)]
pub struct UrlContext<'a> {
    pub creds: &'a ServerCredentials,
    pub item_id: &'a str,
    pub source: &'a MediaSource,
    pub play_session_id: Option<&'a str>,
    pub media_type: MediaType,
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// Resolve a server-relative URL against the server base
fn absolute(creds: &ServerCredentials, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{}{}", creds.base_url(), url)
    } else {
        format!("{}/{}", creds.base_url(), url)
    }
}

/// Static file URL; the server sends the original bytes
pub fn direct_play_url(ctx: &UrlContext<'_>) -> String {
    let query = Serializer::new(String::new())
        .append_pair("Static", "true")
        .append_pair("MediaSourceId", &ctx.source.id)
        .append_pair("api_key", &ctx.creds.access_token)
        .finish();
    format!(
        "{}/{}/{}/stream?{}",
        ctx.creds.base_url(),
        ctx.media_type.url_root(),
        encode(ctx.item_id),
        query
    )
}

/// Server-provided remux URL, or one synthesized from the source container
pub fn direct_stream_url(ctx: &UrlContext<'_>) -> String {
    if let Some(url) = ctx.source.direct_stream_url.as_deref().filter(|u| !u.is_empty()) {
        return absolute(ctx.creds, url);
    }

    let container = ctx
        .source
        .containers()
        .into_iter()
        .next()
        .unwrap_or_else(|| "mp4".to_string());
    let mut query = Serializer::new(String::new());
    query.append_pair("MediaSourceId", &ctx.source.id);
    if let Some(play_session_id) = ctx.play_session_id {
        query.append_pair("PlaySessionId", play_session_id);
    }
    query.append_pair("api_key", &ctx.creds.access_token);

    format!(
        "{}/{}/{}/stream.{}?{}",
        ctx.creds.base_url(),
        ctx.media_type.url_root(),
        encode(ctx.item_id),
        container,
        query.finish()
    )
}

/// Server-declared transcoding URL
pub fn transcode_url(ctx: &UrlContext<'_>) -> Result<String> {
    ctx.source
        .transcoding_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(|u| absolute(ctx.creds, u))
        .ok_or_else(|| Error::MissingTranscodingUrl {
            source_id: ctx.source.id.clone(),
        })
}

pub fn playback_url(ctx: &UrlContext<'_>, method: PlayMethod) -> Result<String> {
    match method {
        PlayMethod::DirectPlay => Ok(direct_play_url(ctx)),
        PlayMethod::DirectStream => Ok(direct_stream_url(ctx)),
        PlayMethod::Transcode => transcode_url(ctx),
    }
}

/// MIME type handed to the backend with a playback URL
pub fn mime_type(url: &str, container: Option<&str>, media_type: MediaType) -> &'static str {
    let path = url.split('?').next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".m3u8") || path.contains("master.m3u8") {
        return HLS_MIME_TYPE;
    }

    let container = container
        .and_then(|c| c.split(',').next())
        .map(|c| c.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match (media_type, container.as_str()) {
        (_, "ts" | "mpegts" | "m2ts") => "video/mp2t",
        (MediaType::Video, "mkv" | "matroska") => "video/x-matroska",
        (MediaType::Video, "webm") => "video/webm",
        (MediaType::Audio, "mp3") => "audio/mpeg",
        (MediaType::Audio, "flac") => "audio/flac",
        (MediaType::Audio, "ogg" | "opus") => "audio/ogg",
        (MediaType::Audio, "aac" | "m4a") => "audio/mp4",
        _ => "video/mp4",
    }
}

/// Text subtitle URL; `cue_list` selects the JSON cue-list flavour
pub fn subtitle_url(
    creds: &ServerCredentials,
    item_id: &str,
    media_source_id: &str,
    stream: &MediaStream,
    cue_list: bool,
) -> String {
    if let Some(url) = stream.delivery_url.as_deref().filter(|_| stream.is_external) {
        return absolute(creds, url);
    }
    let format = if cue_list { "js" } else { "vtt" };
    let query = Serializer::new(String::new())
        .append_pair("api_key", &creds.access_token)
        .finish();
    format!(
        "{}/Videos/{}/{}/Subtitles/{}/Stream.{}?{}",
        creds.base_url(),
        encode(item_id),
        encode(media_source_id),
        stream.index,
        format,
        query
    )
}
