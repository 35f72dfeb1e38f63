//! Media source selection
//!
//! Scores every source the server offered for an item and picks the best.
//! Play method dominates the score; resolution, dynamic range and the best
//! decodable audio track break ties between sources with the same method.

use crate::capabilities::{CapabilityProfile, PanelResolution};
use crate::decision::{
    audio_stream_supported, decide, decide_with_audio_stream, default_audio_supported,
    find_compatible_audio_stream_index,
};
use crate::types::{MediaSource, PlayMethod};
use serde::Serialize;
use tracing::{debug, instrument, warn};

const UHD_BONUS: i32 = 30;
const FHD_BONUS: i32 = 20;
const HD_BONUS: i32 = 10;
const HDR_MATCH_BONUS: i32 = 15;
const SURROUND_BONUS: i32 = 10;
const STEREO_BONUS: i32 = 5;
const EAC3_BONUS: i32 = 3;
const AC3_BONUS: i32 = 2;

/// Caller choices that constrain selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOptions {
    /// Honor this source regardless of score
    pub media_source_id: Option<String>,
    /// Explicit audio track; suppresses audio re-negotiation
    pub audio_stream_index: Option<i32>,
    /// Explicit subtitle track
    pub subtitle_stream_index: Option<i32>,
}

/// One source with its computed score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredSource {
    pub source_id: String,
    /// Position in the server's list
    pub position: usize,
    pub play_method: PlayMethod,
    pub score: i32,
}

/// The chosen source
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub source: &'a MediaSource,
    pub play_method: PlayMethod,
    pub score: i32,
    /// Chosen through `SelectionOptions::media_source_id`
    pub pinned: bool,
}

fn resolution_bonus(source: &MediaSource, panel: PanelResolution) -> i32 {
    let width = source.video_width();
    let height = source.video_height();
    let tier = if height >= 2160 || width >= 3840 {
        UHD_BONUS
    } else if height >= 1080 || width >= 1920 {
        FHD_BONUS
    } else if height >= 720 || width >= 1280 {
        HD_BONUS
    } else {
        0
    };
    let cap = match panel {
        PanelResolution::Hd => HD_BONUS,
        PanelResolution::Fhd => FHD_BONUS,
        PanelResolution::Uhd | PanelResolution::Uhd8k => UHD_BONUS,
    };
    tier.min(cap)
}

fn hdr_bonus(source: &MediaSource, caps: &CapabilityProfile) -> i32 {
    match source.video_stream() {
        Some(video) if video.range().is_hdr() && caps.hdr.any() && caps.supports_range(video.range()) => {
            HDR_MATCH_BONUS
        }
        _ => 0,
    }
}

fn audio_bonus(source: &MediaSource, caps: &CapabilityProfile) -> i32 {
    source
        .audio_streams()
        .filter(|s| audio_stream_supported(s, caps))
        .map(|s| {
            let channels = match s.channels.unwrap_or(0) {
                c if c >= 6 => SURROUND_BONUS,
                c if c >= 2 => STEREO_BONUS,
                _ => 0,
            };
            let codec = match s.codec_name().as_str() {
                "eac3" => EAC3_BONUS,
                "ac3" => AC3_BONUS,
                _ => 0,
            };
            channels + codec
        })
        .max()
        .unwrap_or(0)
}

/// Score of a single source
pub fn score(source: &MediaSource, caps: &CapabilityProfile) -> i32 {
    decide(source, caps).score()
        + resolution_bonus(source, caps.panel)
        + hdr_bonus(source, caps)
        + audio_bonus(source, caps)
}

fn playable(source: &MediaSource, method: PlayMethod) -> bool {
    method != PlayMethod::Transcode || source.supports_transcoding
}

/// Playable sources ordered best first; ties keep server order
pub fn rank(sources: &[MediaSource], caps: &CapabilityProfile) -> Vec<ScoredSource> {
    let mut ranked: Vec<ScoredSource> = sources
        .iter()
        .enumerate()
        .filter_map(|(position, source)| {
            let play_method = decide(source, caps);
            playable(source, play_method).then(|| ScoredSource {
                source_id: source.id.clone(),
                position,
                play_method,
                score: score(source, caps),
            })
        })
        .collect();
    // stable
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Pick the best source, `None` when nothing is playable
#[instrument(skip(sources, caps), fields(candidates = sources.len()))]
pub fn select<'a>(
    sources: &'a [MediaSource],
    caps: &CapabilityProfile,
    options: &SelectionOptions,
) -> Option<Selection<'a>> {
    let method_for = |source: &MediaSource| match options.audio_stream_index {
        Some(index) if source.stream(index).is_some() => {
            decide_with_audio_stream(source, caps, index)
        }
        _ => decide(source, caps),
    };

    if let Some(pinned_id) = options.media_source_id.as_deref() {
        match sources.iter().find(|s| s.id == pinned_id) {
            Some(source) => {
                debug!(source_id = pinned_id, "Using pinned media source");
                return Some(Selection {
                    source,
                    play_method: method_for(source),
                    score: score(source, caps),
                    pinned: true,
                });
            }
            None => warn!(source_id = pinned_id, "Pinned media source not offered, scoring instead"),
        }
    }

    let best = rank(sources, caps).into_iter().next()?;
    let source = &sources[best.position];
    debug!(
        source_id = %best.source_id,
        score = best.score,
        play_method = %best.play_method,
        "Media source selected"
    );

    Some(Selection {
        source,
        play_method: method_for(source),
        score: best.score,
        pinned: false,
    })
}

/// Audio index to re-request playback info with, when the default track
/// cannot be decoded and the caller did not choose a track
pub fn audio_renegotiation_index(
    selection: &Selection<'_>,
    caps: &CapabilityProfile,
    options: &SelectionOptions,
) -> Option<i32> {
    if options.audio_stream_index.is_some() || default_audio_supported(selection.source, caps) {
        return None;
    }
    find_compatible_audio_stream_index(selection.source, caps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::DetectionSource;
    use crate::types::{MediaStream, MediaStreamType, VideoRangeType};

    fn caps() -> CapabilityProfile {
        CapabilityProfile::for_platform_year(
            2021,
            6.0,
            PanelResolution::Uhd,
            DetectionSource::PlatformVersion,
        )
    }

    fn parse(json: serde_json::Value) -> MediaSource {
        serde_json::from_value(json).unwrap()
    }

    fn h264_source(id: &str, height: u32, audio: &str, channels: u32) -> MediaSource {
        parse(serde_json::json!({
            "Id": id,
            "Container": "mp4",
            "SupportsDirectPlay": true,
            "SupportsDirectStream": true,
            "SupportsTranscoding": true,
            "MediaStreams": [
                {"Index": 0, "Type": "Video", "Codec": "h264", "Height": height},
                {"Index": 1, "Type": "Audio", "Codec": audio, "Channels": channels}
            ]
        }))
    }

    #[test]
    fn test_direct_play_beats_resolution() {
        let mut transcode_4k = h264_source("4k", 2160, "aac", 2);
        transcode_4k.container = Some("rmvb".to_string());
        let direct_720 = h264_source("720", 720, "aac", 2);
        let sources = vec![transcode_4k, direct_720];

        let selection = select(&sources, &caps(), &SelectionOptions::default()).unwrap();
        assert_eq!(selection.source.id, "720");
        assert_eq!(selection.play_method, PlayMethod::DirectPlay);
        assert_eq!(selection.score, 100 + 10 + 5);
    }

    #[test]
    fn test_audio_bonus_counts_compatible_tracks_only() {
        let dts = h264_source("dts", 1080, "dts", 8);
        let aac = h264_source("aac", 1080, "aac", 2);
        assert_eq!(audio_bonus(&dts, &caps()), 0);
        assert_eq!(audio_bonus(&aac, &caps()), STEREO_BONUS);

        let eac3 = h264_source("eac3", 1080, "eac3", 6);
        assert_eq!(audio_bonus(&eac3, &caps()), SURROUND_BONUS + EAC3_BONUS);
    }

    #[test]
    fn test_hdr_bonus_requires_device_support() {
        let mut hdr = h264_source("hdr", 2160, "aac", 2);
        hdr.media_streams[0].codec = Some("hevc".to_string());
        hdr.media_streams[0].video_range_type = Some(VideoRangeType::Hdr10);
        assert_eq!(hdr_bonus(&hdr, &caps()), HDR_MATCH_BONUS);

        let mut no_hdr = caps();
        no_hdr.hdr = Default::default();
        assert_eq!(hdr_bonus(&hdr, &no_hdr), 0);
    }

    #[test]
    fn test_resolution_bonus_capped_by_panel() {
        let uhd = h264_source("uhd", 2160, "aac", 2);
        assert_eq!(resolution_bonus(&uhd, PanelResolution::Uhd), UHD_BONUS);
        assert_eq!(resolution_bonus(&uhd, PanelResolution::Fhd), FHD_BONUS);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let sources = vec![
            h264_source("first", 1080, "aac", 2),
            h264_source("second", 1080, "aac", 2),
        ];
        let ranked = rank(&sources, &caps());
        assert_eq!(ranked[0].source_id, "first");
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn test_selected_score_is_maximal_and_idempotent() {
        let sources = vec![
            h264_source("a", 480, "aac", 2),
            h264_source("b", 2160, "eac3", 6),
            h264_source("c", 1080, "dts", 6),
        ];
        let caps = caps();
        let options = SelectionOptions::default();

        let first = select(&sources, &caps, &options).unwrap();
        for source in &sources {
            assert!(first.score >= score(source, &caps));
        }
        let second = select(&sources, &caps, &options).unwrap();
        assert_eq!(first.source.id, second.source.id);
        assert_eq!(first.source.id, "b");
    }

    #[test]
    fn test_pinned_source_honored_unconditionally() {
        let mut worse = h264_source("worse", 480, "aac", 2);
        worse.container = Some("rmvb".to_string());
        let sources = vec![h264_source("better", 1080, "aac", 2), worse];
        let options = SelectionOptions {
            media_source_id: Some("worse".to_string()),
            ..Default::default()
        };

        let selection = select(&sources, &caps(), &options).unwrap();
        assert_eq!(selection.source.id, "worse");
        assert!(selection.pinned);
        assert_eq!(selection.play_method, PlayMethod::Transcode);

        let missing = SelectionOptions {
            media_source_id: Some("gone".to_string()),
            ..Default::default()
        };
        let selection = select(&sources, &caps(), &missing).unwrap();
        assert_eq!(selection.source.id, "better");
        assert!(!selection.pinned);
    }

    #[test]
    fn test_nothing_playable() {
        assert!(select(&[], &caps(), &SelectionOptions::default()).is_none());

        let mut stuck = h264_source("stuck", 1080, "aac", 2);
        stuck.container = Some("rmvb".to_string());
        stuck.supports_transcoding = false;
        assert!(select(&[stuck], &caps(), &SelectionOptions::default()).is_none());
    }

    #[test]
    fn test_renegotiation_index_for_unsupported_default_audio() {
        let mut source = h264_source("multi", 1080, "dts", 6);
        let ac3 = MediaStream {
            index: 2,
            codec: Some("ac3".to_string()),
            ..source.media_streams[1].clone()
        };
        assert_eq!(ac3.stream_type, MediaStreamType::Audio);
        source.media_streams.push(ac3);
        source.default_audio_stream_index = Some(1);
        let sources = vec![source];
        let caps = caps();

        let options = SelectionOptions::default();
        let selection = select(&sources, &caps, &options).unwrap();
        assert_eq!(audio_renegotiation_index(&selection, &caps, &options), Some(2));

        let explicit = SelectionOptions {
            audio_stream_index: Some(1),
            ..Default::default()
        };
        let selection = select(&sources, &caps, &explicit).unwrap();
        assert_eq!(audio_renegotiation_index(&selection, &caps, &explicit), None);
        assert_eq!(selection.play_method, PlayMethod::DirectStream);
    }
}
