//! jellytv CLI - headless playback negotiation
//!
//! Features:
//! - Capability probing for a platform version, model name or firmware
//! - Offline play-method decisions against a saved PlaybackInfo document
//! - Live negotiation against a media server

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod headless;
mod output;

use output::OutputFormat;

/// jellytv CLI - playback negotiation toolkit
#[derive(Parser)]
#[command(name = "jellytv")]
#[command(version)]
#[command(about = "Probe capabilities and negotiate playback with a media server", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// How to identify the platform being emulated
#[derive(clap::Args, Debug, Clone)]
pub struct PlatformArgs {
    /// Platform (web engine) version, e.g. 6.0
    #[arg(long)]
    pub platform_version: Option<f32>,

    /// TV model name, e.g. QN65QN90B
    #[arg(long)]
    pub model: Option<String>,

    /// Firmware string
    #[arg(long)]
    pub firmware: Option<String>,

    /// Panel resolution (hd, fhd, uhd, 8k)
    #[arg(long)]
    pub panel: Option<String>,

    /// Panel supports HDR output
    #[arg(long)]
    pub hdr: Option<bool>,

    /// Panel supports Dolby Vision
    #[arg(long)]
    pub dolby_vision: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the capability profile and device profile for a platform
    Probe {
        #[command(flatten)]
        platform: PlatformArgs,

        /// Include the full device profile document
        #[arg(long)]
        device_profile: bool,
    },

    /// Decide offline against a saved PlaybackInfo response
    Decide {
        /// Path to a PlaybackInfo JSON document
        playback_info: PathBuf,

        #[command(flatten)]
        platform: PlatformArgs,

        /// Pin a media source id
        #[arg(long)]
        media_source_id: Option<String>,

        /// Pin an audio stream index
        #[arg(long)]
        audio_stream_index: Option<i32>,
    },

    /// Negotiate playback of an item against a live server
    Play {
        /// Item id
        item_id: String,

        /// Server base URL
        #[arg(long, env = "JELLYTV_SERVER")]
        server: String,

        /// Access token
        #[arg(long, env = "JELLYTV_TOKEN", hide_env_values = true)]
        token: String,

        /// User id
        #[arg(long, env = "JELLYTV_USER")]
        user: String,

        #[command(flatten)]
        platform: PlatformArgs,

        /// Request a specific audio stream
        #[arg(long)]
        audio_stream_index: Option<i32>,

        /// Request a specific subtitle stream
        #[arg(long)]
        subtitle_stream_index: Option<i32>,

        /// Start position in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// Force a server transcode
        #[arg(long)]
        force_transcode: bool,

        /// Keep the session open this many seconds, then report stop
        #[arg(long)]
        hold: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    jellytv_core::init();

    let format = OutputFormat::from(cli.format.as_str());
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Probe {
            platform,
            device_profile,
        } => {
            commands::probe(&platform, &config, device_profile, format).await?;
        }
        Commands::Decide {
            playback_info,
            platform,
            media_source_id,
            audio_stream_index,
        } => {
            commands::decide(
                &playback_info,
                &platform,
                &config,
                media_source_id,
                audio_stream_index,
                format,
            )
            .await?;
        }
        Commands::Play {
            item_id,
            server,
            token,
            user,
            platform,
            audio_stream_index,
            subtitle_stream_index,
            start,
            force_transcode,
            hold,
        } => {
            let request = commands::PlayRequest {
                item_id,
                server,
                token,
                user,
                audio_stream_index,
                subtitle_stream_index,
                start,
                force_transcode,
                hold,
            };
            commands::play(request, &platform, config, format).await?;
        }
    }

    Ok(())
}
