//! Play-method decision
//!
//! Pure functions over a media source and a capability profile. Four
//! independent checks feed the decision:
//!
//! - video: codec, bit depth, level and resolution of the primary video stream
//! - audio: at least one audio stream is decodable
//! - container: at least one of the declared containers is demuxable
//! - restrictions: codec/container pairing and the dynamic-range gate
//!
//! DirectPlay needs the server's direct-play flag and all four checks.
//! DirectStream needs the server's direct-stream flag plus the video,
//! container and dynamic-range checks. Anything else is transcoded.

use crate::capabilities::CapabilityProfile;
use crate::types::{MediaSource, MediaStream, PlayMethod};
use serde::Serialize;

/// Outcome of each compatibility check for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompatibilityChecks {
    pub video: bool,
    pub audio: bool,
    pub container: bool,
    pub restrictions: bool,
    /// Dynamic-range half of `restrictions`, reused by the DirectStream rule
    pub dynamic_range: bool,
}

impl CompatibilityChecks {
    pub fn all(&self) -> bool {
        self.video && self.audio && self.container && self.restrictions
    }
}

/// Server codec name folded onto the names used by the capability profile
pub fn canonical_video_codec(codec: &str) -> String {
    let codec = codec.to_ascii_lowercase();
    match codec.as_str() {
        "avc" | "avc1" => "h264".to_string(),
        "h265" | "hvc1" | "hev1" => "hevc".to_string(),
        "av01" => "av1".to_string(),
        _ => codec,
    }
}

fn video_supported(video: &MediaStream, caps: &CapabilityProfile) -> bool {
    let codec = canonical_video_codec(&video.codec_name());
    if !caps.supports_video_codec(&codec) {
        return false;
    }

    let bit_depth = video.bit_depth.unwrap_or(8);
    let depth_ok = match codec.as_str() {
        "h264" => bit_depth <= 8,
        "hevc" => bit_depth <= 8 || (bit_depth <= 10 && caps.video.hevc_10bit),
        _ => bit_depth <= 10,
    };
    if !depth_ok {
        return false;
    }

    let level_ok = match (codec.as_str(), video.level) {
        ("h264", Some(level)) if level > 0.0 => level <= caps.video.h264_max_level,
        ("hevc", Some(level)) if level > 0.0 => level <= caps.video.hevc_max_level,
        _ => true,
    };
    if !level_ok {
        return false;
    }

    video.width.map_or(true, |w| w <= caps.panel.max_width())
        && video.height.map_or(true, |h| h <= caps.panel.max_height())
}

/// Audio stream decodable by the device
pub fn audio_stream_supported(stream: &MediaStream, caps: &CapabilityProfile) -> bool {
    caps.supports_audio_codec(&stream.codec_name())
}

fn pairing_supported(source: &MediaSource, codec: &str, caps: &CapabilityProfile) -> bool {
    source.containers().iter().any(|container| {
        caps.supports_container(container)
            && caps.video_codecs_for_container(container).contains(&codec)
    })
}

fn checks_with_audio(
    source: &MediaSource,
    caps: &CapabilityProfile,
    audio: bool,
) -> CompatibilityChecks {
    let video_stream = source.video_stream();

    let video = video_stream.map_or(true, |v| video_supported(v, caps));
    let container = source.containers().iter().any(|c| caps.supports_container(c));
    let dynamic_range = video_stream.map_or(true, |v| caps.supports_range(v.range()));
    let pairing = video_stream.map_or(true, |v| {
        pairing_supported(source, &canonical_video_codec(&v.codec_name()), caps)
    });

    CompatibilityChecks {
        video,
        audio,
        container,
        restrictions: pairing && dynamic_range,
        dynamic_range,
    }
}

/// Run the four checks, audio passing when any track is decodable
pub fn check(source: &MediaSource, caps: &CapabilityProfile) -> CompatibilityChecks {
    let mut audio_streams = source.audio_streams().peekable();
    let audio = audio_streams.peek().is_none()
        || audio_streams.any(|s| audio_stream_supported(s, caps));
    checks_with_audio(source, caps, audio)
}

/// Run the four checks with the audio check pinned to one track
pub fn check_with_audio_stream(
    source: &MediaSource,
    caps: &CapabilityProfile,
    audio_stream_index: i32,
) -> CompatibilityChecks {
    let audio = source
        .stream(audio_stream_index)
        .map_or(false, |s| audio_stream_supported(s, caps));
    checks_with_audio(source, caps, audio)
}

fn method_for(source: &MediaSource, checks: &CompatibilityChecks) -> PlayMethod {
    if source.supports_direct_play && checks.all() {
        PlayMethod::DirectPlay
    } else if source.supports_direct_stream
        && checks.video
        && checks.container
        && checks.dynamic_range
    {
        PlayMethod::DirectStream
    } else {
        PlayMethod::Transcode
    }
}

/// Decide how a source reaches the decoder
pub fn decide(source: &MediaSource, caps: &CapabilityProfile) -> PlayMethod {
    method_for(source, &check(source, caps))
}

/// Decide with a specific audio track selected
pub fn decide_with_audio_stream(
    source: &MediaSource,
    caps: &CapabilityProfile,
    audio_stream_index: i32,
) -> PlayMethod {
    method_for(source, &check_with_audio_stream(source, caps, audio_stream_index))
}

/// Index of the first decodable audio stream, in stream order
pub fn find_compatible_audio_stream_index(
    source: &MediaSource,
    caps: &CapabilityProfile,
) -> Option<i32> {
    source
        .audio_streams()
        .find(|s| audio_stream_supported(s, caps))
        .map(|s| s.index)
}

/// Whether the track the server will play by default is decodable
pub fn default_audio_supported(source: &MediaSource, caps: &CapabilityProfile) -> bool {
    source
        .default_audio_stream()
        .map_or(true, |s| audio_stream_supported(s, caps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{DetectionSource, PanelResolution};
    use crate::types::{MediaStreamType, VideoRangeType};

    fn caps() -> CapabilityProfile {
        CapabilityProfile::for_platform_year(
            2021,
            6.0,
            PanelResolution::Uhd,
            DetectionSource::PlatformVersion,
        )
    }

    fn stream(index: i32, stream_type: MediaStreamType, codec: &str) -> MediaStream {
        MediaStream {
            index,
            stream_type,
            codec: Some(codec.to_string()),
            profile: None,
            bit_depth: None,
            channels: None,
            level: None,
            video_range_type: None,
            width: None,
            height: None,
            bit_rate: None,
            language: None,
            display_title: None,
            is_default: false,
            is_forced: false,
            is_external: false,
            is_text_subtitle_stream: false,
            delivery_url: None,
        }
    }

    fn source(container: &str, streams: Vec<MediaStream>) -> MediaSource {
        MediaSource {
            id: "src".to_string(),
            name: None,
            container: Some(container.to_string()),
            media_streams: streams,
            supports_direct_play: true,
            supports_direct_stream: true,
            supports_transcoding: true,
            direct_stream_url: None,
            transcoding_url: None,
            transcoding_container: None,
            default_audio_stream_index: None,
            default_subtitle_stream_index: None,
            bitrate: None,
            run_time_ticks: None,
        }
    }

    #[test]
    fn test_h264_aac_mp4_direct_plays() {
        let src = source(
            "mp4",
            vec![
                stream(0, MediaStreamType::Video, "h264"),
                stream(1, MediaStreamType::Audio, "aac"),
            ],
        );
        assert_eq!(decide(&src, &caps()), PlayMethod::DirectPlay);
    }

    #[test]
    fn test_unsupported_video_or_container_transcodes_regardless_of_audio() {
        let caps = caps();
        for audio in ["aac", "dts", "ac3"] {
            let bad_codec = source(
                "mkv",
                vec![
                    stream(0, MediaStreamType::Video, "mpeg2video"),
                    stream(1, MediaStreamType::Audio, audio),
                ],
            );
            assert_eq!(decide(&bad_codec, &caps), PlayMethod::Transcode);

            let bad_container = source(
                "rmvb",
                vec![
                    stream(0, MediaStreamType::Video, "h264"),
                    stream(1, MediaStreamType::Audio, audio),
                ],
            );
            assert_eq!(decide(&bad_container, &caps), PlayMethod::Transcode);
        }
    }

    #[test]
    fn test_dolby_vision_without_support_transcodes() {
        let mut video = stream(0, MediaStreamType::Video, "hevc");
        video.bit_depth = Some(10);
        video.video_range_type = Some(VideoRangeType::Dovi);
        let src = source("mkv", vec![video, stream(1, MediaStreamType::Audio, "eac3")]);

        let checks = check(&src, &caps());
        assert!(checks.video && checks.audio && checks.container);
        assert!(!checks.restrictions);
        assert_eq!(decide(&src, &caps()), PlayMethod::Transcode);
    }

    #[test]
    fn test_dolby_vision_with_hdr10_base_layer_direct_plays() {
        let mut video = stream(0, MediaStreamType::Video, "hevc");
        video.bit_depth = Some(10);
        video.video_range_type = Some(VideoRangeType::DoviWithHdr10);
        let src = source("mkv", vec![video, stream(1, MediaStreamType::Audio, "eac3")]);
        assert_eq!(decide(&src, &caps()), PlayMethod::DirectPlay);
    }

    #[test]
    fn test_audio_track_selection_changes_outcome() {
        let mut src = source(
            "mkv",
            vec![
                stream(0, MediaStreamType::Video, "h264"),
                stream(1, MediaStreamType::Audio, "dts"),
                stream(2, MediaStreamType::Audio, "ac3"),
            ],
        );
        src.default_audio_stream_index = Some(1);
        let caps = caps();

        assert!(!default_audio_supported(&src, &caps));
        assert_eq!(find_compatible_audio_stream_index(&src, &caps), Some(2));
        assert_eq!(decide_with_audio_stream(&src, &caps, 1), PlayMethod::DirectStream);
        assert_eq!(decide_with_audio_stream(&src, &caps, 2), PlayMethod::DirectPlay);
    }

    #[test]
    fn test_codec_container_pairing() {
        let caps = caps();
        let av1_ts = source(
            "ts",
            vec![
                stream(0, MediaStreamType::Video, "av1"),
                stream(1, MediaStreamType::Audio, "aac"),
            ],
        );
        let checks = check(&av1_ts, &caps);
        assert!(checks.video && checks.container && !checks.restrictions);
        assert_eq!(decide(&av1_ts, &caps), PlayMethod::DirectStream);

        let vp9_webm = source(
            "webm",
            vec![
                stream(0, MediaStreamType::Video, "vp9"),
                stream(1, MediaStreamType::Audio, "opus"),
            ],
        );
        assert_eq!(decide(&vp9_webm, &caps), PlayMethod::DirectPlay);
    }

    #[test]
    fn test_bit_depth_and_level_limits() {
        let caps = caps();
        let mut hi10p = stream(0, MediaStreamType::Video, "h264");
        hi10p.bit_depth = Some(10);
        let src = source("mkv", vec![hi10p, stream(1, MediaStreamType::Audio, "aac")]);
        assert!(!check(&src, &caps).video);

        let mut high_level = stream(0, MediaStreamType::Video, "h264");
        high_level.level = Some(52.0);
        let src = source("mp4", vec![high_level, stream(1, MediaStreamType::Audio, "aac")]);
        assert!(!check(&src, &caps).video);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let src = source(
            "mov,mp4,m4a",
            vec![
                stream(0, MediaStreamType::Video, "hevc"),
                stream(1, MediaStreamType::Audio, "truehd"),
            ],
        );
        let caps = caps();
        let first = decide(&src, &caps);
        for _ in 0..10 {
            assert_eq!(decide(&src, &caps), first);
        }
        assert_eq!(first, PlayMethod::DirectStream);
    }
}
