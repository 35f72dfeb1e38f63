//! Server-facing device profile
//!
//! The media server decides what it may send unmodified from the profile
//! posted with every playback-info request. It is derived entirely from a
//! [`CapabilityProfile`], so the server and the local decision layer agree.

use super::CapabilityProfile;
use crate::types::VideoRangeType;
use serde::{Deserialize, Serialize};

const ALL_RANGES: [VideoRangeType; 8] = [
    VideoRangeType::Sdr,
    VideoRangeType::Hdr10,
    VideoRangeType::Hdr10Plus,
    VideoRangeType::Hlg,
    VideoRangeType::Dovi,
    VideoRangeType::DoviWithHdr10,
    VideoRangeType::DoviWithHlg,
    VideoRangeType::DoviWithSdr,
];

/// Container groups advertised for direct play, first entry decides codec restrictions
const VIDEO_CONTAINERS: &[&[&str]] = &[
    &["mp4", "m4v"],
    &["mov"],
    &["mkv"],
    &["webm"],
    &["ts", "mpegts"],
    &["m2ts"],
    &["avi"],
    &["asf"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DlnaProfileType {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecType {
    Video,
    VideoAudio,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    Equals,
    NotEquals,
    LessThanEqual,
    GreaterThanEqual,
    EqualsAny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleDeliveryMethod {
    Encode,
    Embed,
    External,
    Hls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectPlayProfile {
    pub container: String,
    #[serde(rename = "Type")]
    pub profile_type: DlnaProfileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscodingProfile {
    pub container: String,
    #[serde(rename = "Type")]
    pub profile_type: DlnaProfileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    pub audio_codec: String,
    pub protocol: String,
    pub context: String,
    pub max_audio_channels: String,
    pub min_segments: u32,
    pub break_on_non_key_frames: bool,
    pub copy_timestamps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileCondition {
    pub condition: ConditionKind,
    pub property: String,
    pub value: String,
    pub is_required: bool,
}

impl ProfileCondition {
    fn new(condition: ConditionKind, property: &str, value: impl ToString) -> Self {
        Self {
            condition,
            property: property.to_string(),
            value: value.to_string(),
            is_required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodecProfile {
    #[serde(rename = "Type")]
    pub codec_type: CodecType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    pub conditions: Vec<ProfileCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubtitleProfile {
    pub format: String,
    pub method: SubtitleDeliveryMethod,
}

/// Options that shape the profile for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileOptions {
    /// Advertise nothing as direct-playable so the server transcodes
    pub force_transcode: bool,
    /// Lower the streaming bitrate ceiling below the device maximum
    pub max_streaming_bitrate: Option<u64>,
}

/// Device profile document posted with playback-info requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceProfile {
    pub name: String,
    pub max_streaming_bitrate: u64,
    pub max_static_bitrate: u64,
    pub music_streaming_transcoding_bitrate: u64,
    pub direct_play_profiles: Vec<DirectPlayProfile>,
    pub transcoding_profiles: Vec<TranscodingProfile>,
    pub codec_profiles: Vec<CodecProfile>,
    pub subtitle_profiles: Vec<SubtitleProfile>,
}

impl DeviceProfile {
    pub fn build(caps: &CapabilityProfile, options: &ProfileOptions) -> Self {
        let max_streaming_bitrate = options
            .max_streaming_bitrate
            .map_or(caps.max_bitrate, |cap| cap.min(caps.max_bitrate));

        let direct_play_profiles = if options.force_transcode {
            Vec::new()
        } else {
            direct_play_profiles(caps)
        };

        Self {
            name: format!("jellytv {} ({})", caps.platform_year, caps.panel),
            max_streaming_bitrate,
            max_static_bitrate: caps.max_bitrate,
            music_streaming_transcoding_bitrate: 384_000,
            direct_play_profiles,
            transcoding_profiles: transcoding_profiles(caps),
            codec_profiles: codec_profiles(caps),
            subtitle_profiles: subtitle_profiles(),
        }
    }

    pub fn video_range_types(caps: &CapabilityProfile) -> Vec<VideoRangeType> {
        ALL_RANGES
            .into_iter()
            .filter(|range| caps.supports_range(*range))
            .collect()
    }
}

fn direct_play_profiles(caps: &CapabilityProfile) -> Vec<DirectPlayProfile> {
    let audio_codecs = caps.audio_codec_names();
    let mut profiles = Vec::new();

    for group in VIDEO_CONTAINERS {
        let container = group[0];
        if !caps.supports_container(container) {
            continue;
        }
        let video = caps.video_codecs_for_container(container);
        if video.is_empty() {
            continue;
        }
        let audio: Vec<&str> = if container == "webm" {
            audio_codecs
                .iter()
                .copied()
                .filter(|c| matches!(*c, "opus" | "vorbis"))
                .collect()
        } else {
            audio_codecs.clone()
        };
        profiles.push(DirectPlayProfile {
            container: group.join(","),
            profile_type: DlnaProfileType::Video,
            video_codec: Some(video.join(",")),
            audio_codec: (!audio.is_empty()).then(|| audio.join(",")),
        });
    }

    for (container, codec, supported) in [
        ("mp3", "mp3", caps.audio.mp3),
        ("aac,m4a", "aac", caps.audio.aac),
        ("flac", "flac", caps.audio.flac),
        ("ogg", "opus,vorbis", caps.audio.opus || caps.audio.vorbis),
    ] {
        if supported {
            profiles.push(DirectPlayProfile {
                container: container.to_string(),
                profile_type: DlnaProfileType::Audio,
                video_codec: None,
                audio_codec: Some(codec.to_string()),
            });
        }
    }

    profiles
}

fn transcoding_profiles(caps: &CapabilityProfile) -> Vec<TranscodingProfile> {
    let mut video_codecs = vec!["h264"];
    if caps.video.hevc {
        video_codecs.push("hevc");
    }
    let mut audio_codecs = vec!["aac"];
    if caps.audio.ac3 {
        audio_codecs.push("ac3");
    }
    if caps.audio.eac3 {
        audio_codecs.push("eac3");
    }

    vec![
        TranscodingProfile {
            container: "ts".to_string(),
            profile_type: DlnaProfileType::Video,
            video_codec: Some(video_codecs.join(",")),
            audio_codec: audio_codecs.join(","),
            protocol: "hls".to_string(),
            context: "Streaming".to_string(),
            max_audio_channels: "6".to_string(),
            min_segments: 1,
            break_on_non_key_frames: true,
            copy_timestamps: false,
        },
        TranscodingProfile {
            container: "mp3".to_string(),
            profile_type: DlnaProfileType::Audio,
            video_codec: None,
            audio_codec: "mp3".to_string(),
            protocol: "http".to_string(),
            context: "Streaming".to_string(),
            max_audio_channels: "2".to_string(),
            min_segments: 0,
            break_on_non_key_frames: false,
            copy_timestamps: false,
        },
    ]
}

fn codec_profiles(caps: &CapabilityProfile) -> Vec<CodecProfile> {
    use ConditionKind::*;

    let ranges = DeviceProfile::video_range_types(caps)
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join("|");

    let mut profiles = vec![
        CodecProfile {
            codec_type: CodecType::Video,
            codec: None,
            conditions: vec![
                ProfileCondition::new(LessThanEqual, "Width", caps.panel.max_width()),
                ProfileCondition::new(LessThanEqual, "Height", caps.panel.max_height()),
            ],
        },
        CodecProfile {
            codec_type: CodecType::Video,
            codec: Some("h264".to_string()),
            conditions: vec![
                ProfileCondition::new(LessThanEqual, "VideoBitDepth", 8),
                ProfileCondition::new(LessThanEqual, "VideoLevel", caps.video.h264_max_level),
                ProfileCondition::new(EqualsAny, "VideoRangeType", "SDR"),
            ],
        },
    ];

    if caps.video.hevc {
        let bit_depth = if caps.video.hevc_10bit { 10 } else { 8 };
        profiles.push(CodecProfile {
            codec_type: CodecType::Video,
            codec: Some("hevc".to_string()),
            conditions: vec![
                ProfileCondition::new(LessThanEqual, "VideoBitDepth", bit_depth),
                ProfileCondition::new(LessThanEqual, "VideoLevel", caps.video.hevc_max_level),
                ProfileCondition::new(EqualsAny, "VideoRangeType", &ranges),
            ],
        });
    }

    for (codec, supported) in [("vp9", caps.video.vp9), ("av1", caps.video.av1)] {
        if supported {
            profiles.push(CodecProfile {
                codec_type: CodecType::Video,
                codec: Some(codec.to_string()),
                conditions: vec![ProfileCondition::new(EqualsAny, "VideoRangeType", &ranges)],
            });
        }
    }

    profiles.push(CodecProfile {
        codec_type: CodecType::VideoAudio,
        codec: Some("aac,ac3,eac3".to_string()),
        conditions: vec![ProfileCondition::new(LessThanEqual, "AudioChannels", 6)],
    });

    profiles
}

fn subtitle_profiles() -> Vec<SubtitleProfile> {
    use SubtitleDeliveryMethod::*;

    [
        ("vtt", External),
        ("srt", External),
        ("subrip", External),
        ("ass", Encode),
        ("ssa", Encode),
        ("pgssub", Encode),
        ("dvdsub", Encode),
        ("dvbsub", Encode),
    ]
    .into_iter()
    .map(|(format, method)| SubtitleProfile {
        format: format.to_string(),
        method,
    })
    .collect()
}
