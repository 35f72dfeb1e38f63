//! CLI command implementations

use crate::headless::HeadlessDrivers;
use crate::output::{flag, print_json, OutputFormat};
use crate::PlatformArgs;
use anyhow::{bail, Context};
use jellytv_core::capabilities::device_profile::ProfileOptions;
use jellytv_core::capabilities::model_year::platform_version_for_year;
use jellytv_core::decision::{self, check};
use jellytv_core::selector::{audio_renegotiation_index, score};
use jellytv_core::{
    select, seconds_to_ticks, CapabilityContext, CapabilityProfile, DeviceProfile,
    EngineConfig, HttpCatalog, PanelResolution, PlaybackInfo, PlaybackManager, SelectionOptions,
    ServerCredentials, StartOptions, StaticCredentials, StaticProbe,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const VIDEO_CODECS: &[&str] = &["h264", "hevc", "vp9", "av1", "mpeg2video", "vc1"];

/// Engine configuration from a file, or the defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_panel(panel: &str) -> anyhow::Result<PanelResolution> {
    Ok(match panel.to_lowercase().as_str() {
        "hd" | "720p" => PanelResolution::Hd,
        "fhd" | "1080p" => PanelResolution::Fhd,
        "uhd" | "4k" | "2160p" => PanelResolution::Uhd,
        "8k" | "uhd8k" => PanelResolution::Uhd8k,
        other => bail!("unknown panel resolution '{}'", other),
    })
}

fn static_probe(args: &PlatformArgs) -> anyhow::Result<StaticProbe> {
    let mut probe = StaticProbe::new().with_dolby_vision(args.dolby_vision);
    if let Some(version) = args.platform_version {
        probe = probe.with_platform_version(version);
    }
    if let Some(model) = &args.model {
        probe = probe.with_model(model.clone());
    }
    if let Some(firmware) = &args.firmware {
        probe = probe.with_firmware(firmware.clone());
    }
    if let Some(panel) = &args.panel {
        probe = probe.with_panel(parse_panel(panel)?);
    }
    if let Some(hdr) = args.hdr {
        probe = probe.with_hdr(hdr);
    }
    Ok(probe)
}

fn capability_context(args: &PlatformArgs, config: &EngineConfig) -> anyhow::Result<CapabilityContext> {
    Ok(CapabilityContext::new(
        Arc::new(static_probe(args)?),
        config.capabilities.clone(),
    ))
}

fn print_capabilities(caps: &CapabilityProfile) {
    println!("Capability Profile:");
    println!("  Platform year: {}", caps.platform_year);
    println!(
        "  Platform version: {:.1} (nominal {:.1})",
        caps.platform_version,
        platform_version_for_year(caps.platform_year)
    );
    println!("  Detected from: {:?}", caps.source);
    println!("  Panel: {:?}", caps.panel);
    println!("  Max bitrate: {} bps", caps.max_bitrate);

    let video: Vec<&str> = VIDEO_CODECS
        .iter()
        .copied()
        .filter(|c| caps.supports_video_codec(c))
        .collect();
    println!("  Video codecs: {}", video.join(", "));
    println!("  Audio codecs: {}", caps.audio_codec_names().join(", "));
    println!("  Containers: {}", caps.container_names().join(", "));
    println!(
        "  HDR: hdr10={} hdr10+={} hlg={} dolby_vision={}",
        caps.hdr.hdr10, caps.hdr.hdr10_plus, caps.hdr.hlg, caps.hdr.dolby_vision
    );
    println!("  AV1 in TS/AVI: {}", caps.av1_extended_containers);
}

/// Print what a platform can decode
pub async fn probe(
    platform: &PlatformArgs,
    config: &EngineConfig,
    include_device_profile: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let caps = capability_context(platform, config)?.capabilities().await;
    let options = ProfileOptions {
        force_transcode: false,
        max_streaming_bitrate: config.negotiation.max_streaming_bitrate,
    };
    let profile = DeviceProfile::build(&caps, &options);

    match format {
        OutputFormat::Json => {
            let mut out = json!({ "capabilities": caps.as_ref() });
            if include_device_profile {
                out["device_profile"] = serde_json::to_value(&profile)?;
            }
            print_json(&out)?;
        }
        OutputFormat::Text => {
            print_capabilities(&caps);
            println!("\nDevice Profile:");
            println!("  Direct play profiles: {}", profile.direct_play_profiles.len());
            println!("  Max streaming bitrate: {}", profile.max_streaming_bitrate);
            if include_device_profile {
                println!("\n{}", serde_json::to_string_pretty(&profile)?);
            }
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "#")]
    position: usize,
    id: String,
    container: String,
    video: String,
    audio: String,
    #[tabled(rename = "video ok")]
    video_ok: &'static str,
    #[tabled(rename = "audio ok")]
    audio_ok: &'static str,
    #[tabled(rename = "container ok")]
    container_ok: &'static str,
    #[tabled(rename = "range ok")]
    range_ok: &'static str,
    method: String,
    score: i32,
}

/// Decide offline against a saved PlaybackInfo document
pub async fn decide(
    path: &Path,
    platform: &PlatformArgs,
    config: &EngineConfig,
    media_source_id: Option<String>,
    audio_stream_index: Option<i32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let info: PlaybackInfo = serde_json::from_str(&raw).context("parsing PlaybackInfo")?;
    let caps = capability_context(platform, config)?.capabilities().await;

    let options = SelectionOptions {
        media_source_id,
        audio_stream_index,
        subtitle_stream_index: None,
    };
    let selection = select(&info.media_sources, &caps, &options);
    let renegotiate = selection
        .as_ref()
        .and_then(|s| audio_renegotiation_index(s, &caps, &options));

    match format {
        OutputFormat::Json => {
            let sources: Vec<_> = info
                .media_sources
                .iter()
                .map(|source| {
                    json!({
                        "id": source.id,
                        "checks": check(source, &caps),
                        "play_method": decision::decide(source, &caps),
                        "score": score(source, &caps),
                    })
                })
                .collect();
            let selected = selection.as_ref().map(|s| {
                json!({
                    "id": s.source.id,
                    "play_method": s.play_method,
                    "score": s.score,
                    "pinned": s.pinned,
                })
            });
            print_json(&json!({
                "sources": sources,
                "selected": selected,
                "renegotiate_audio_stream_index": renegotiate,
            }))?;
        }
        OutputFormat::Text => {
            let rows: Vec<SourceRow> = info
                .media_sources
                .iter()
                .enumerate()
                .map(|(position, source)| {
                    let checks = check(source, &caps);
                    SourceRow {
                        position,
                        id: source.id.clone(),
                        container: source.container.clone().unwrap_or_default(),
                        video: source
                            .video_stream()
                            .map(|v| format!("{} {:?}", v.codec_name(), v.range()))
                            .unwrap_or_else(|| "-".to_string()),
                        audio: source
                            .default_audio_stream()
                            .map(|a| a.codec_name())
                            .unwrap_or_else(|| "-".to_string()),
                        video_ok: flag(checks.video),
                        audio_ok: flag(checks.audio),
                        container_ok: flag(checks.container),
                        range_ok: flag(checks.dynamic_range),
                        method: decision::decide(source, &caps).to_string(),
                        score: score(source, &caps),
                    }
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));

            match &selection {
                Some(s) => {
                    println!(
                        "\nSelected: {} via {} (score {}{})",
                        s.source.id,
                        s.play_method,
                        s.score,
                        if s.pinned { ", pinned" } else { "" }
                    );
                    if let Some(index) = renegotiate {
                        println!("  Default audio unsupported; would renegotiate with audio stream {}", index);
                    }
                }
                None => println!("\nNo playable source"),
            }
        }
    }

    if selection.is_none() {
        std::process::exit(1);
    }
    Ok(())
}

/// Arguments of the `play` command
pub struct PlayRequest {
    pub item_id: String,
    pub server: String,
    pub token: String,
    pub user: String,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
    pub start: f64,
    pub force_transcode: bool,
    pub hold: Option<u64>,
}

/// Negotiate against a live server and print the outcome
pub async fn play(
    request: PlayRequest,
    platform: &PlatformArgs,
    config: EngineConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let capabilities = Arc::new(capability_context(platform, &config)?);
    let creds = ServerCredentials::new(&request.server, &request.token, &request.user);
    let manager = PlaybackManager::new(
        capabilities,
        Arc::new(HttpCatalog::new()?),
        Arc::new(StaticCredentials::new(creds)),
        Arc::new(HeadlessDrivers),
        config,
    )?;

    let options = StartOptions {
        audio_stream_index: request.audio_stream_index,
        subtitle_stream_index: request.subtitle_stream_index,
        start_position_ticks: Some(seconds_to_ticks(request.start)),
        force_transcode: request.force_transcode,
        ..Default::default()
    };
    let start = manager
        .start(&request.item_id, options)
        .await
        .with_context(|| format!("starting playback of {}", request.item_id))?;

    match format {
        OutputFormat::Json => print_json(&start)?,
        OutputFormat::Text => {
            let session = &start.session;
            println!("Playback negotiated:");
            println!("  Item: {}", session.item_id);
            println!("  Media source: {}", session.media_source_id);
            println!("  Play method: {}", session.play_method);
            println!("  Backend: {}", session.backend);
            println!("  URL: {}", session.url);
            println!("  MIME type: {}", session.mime_type);
            println!("  Audio stream: {:?}", session.audio_stream_index);
            println!("  Subtitle stream: {:?}", session.subtitle_stream_index);
            if let Some(url) = &start.subtitle_url {
                println!("  Subtitle URL: {}", url);
            }
            if !start.chapters.is_empty() {
                println!("\nChapters:");
                for chapter in &start.chapters {
                    println!("  {:>8.1}s  {}", chapter.start_time, chapter.title);
                }
            }
        }
    }

    if let Some(secs) = request.hold {
        println!("\nHolding session for {}s", secs);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
    manager.report_stop().await?;
    Ok(())
}
