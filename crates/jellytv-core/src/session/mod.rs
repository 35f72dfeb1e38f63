//! Playback session lifecycle
//!
//! [`PlaybackManager`] owns the single current session. Starting an item
//! flushes a stop report for the previous one and destroys its backend,
//! negotiates a source and play method with the server, builds the playback
//! URL, obtains a backend from the factory and loads it. While a session is
//! live it reports progress on a fixed interval and feeds backend events
//! and sampled positions into a [`HealthMonitor`]. When the monitor asks
//! for a transcode fallback a [`FallbackRequest`] is sent to the embedder,
//! which answers with [`PlaybackManager::fallback_to_transcode`].

pub mod health;
pub mod progress;
pub mod urls;

pub use health::{HealthMonitor, HealthStatus};
pub use progress::{PeriodicTask, ProgressReporter};
pub use urls::UrlContext;

use crate::backend::{
    BackendEvent, BackendFactory, BackendKind, BackendPriority, BackendState, DriverEvent,
    DriverProvider, LoadOptions, PlayerBackend, Subscription,
};
use crate::capabilities::device_profile::ProfileOptions;
use crate::capabilities::{CapabilityContext, CapabilityProfile, DeviceProfile};
use crate::catalog::{CatalogService, CredentialProvider, PlaybackInfoRequest, PlaybackReport};
use crate::config::EngineConfig;
use crate::decision::audio_stream_supported;
use crate::selector::{audio_renegotiation_index, select, SelectionOptions};
use crate::types::{
    seconds_to_ticks, ticks_to_seconds, Chapter, ChapterInfo, MediaSource, MediaStream,
    MediaStreamType, MediaType, PlayMethod, ServerCredentials, SessionId, VideoRangeType,
};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

type SharedBackend = Arc<Mutex<Box<dyn PlayerBackend>>>;

/// Caller choices for starting playback
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Server of a cross-server item; `None` is the signed-in server
    pub server_id: Option<String>,
    pub media_source_id: Option<String>,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
    pub start_position_ticks: Option<i64>,
    pub media_type: MediaType,
    pub force_transcode: bool,
    /// Chapters already known from item data; fetched when absent
    pub chapters: Option<Vec<ChapterInfo>>,
}

/// The negotiated, current playback
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub item_id: String,
    pub server_id: Option<String>,
    pub media_source_id: String,
    pub play_session_id: Option<String>,
    pub play_method: PlayMethod,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
    pub start_position_ticks: i64,
    pub url: String,
    pub mime_type: String,
    pub backend: BackendKind,
}

/// What the UI renders from after a successful start
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackStart {
    pub session: PlaybackSession,
    pub audio_streams: Vec<MediaStream>,
    pub subtitle_streams: Vec<MediaStream>,
    pub chapters: Vec<Chapter>,
    /// Delivery URL of the selected text subtitle
    pub subtitle_url: Option<String>,
}

/// Health monitor verdict: restart this session with transcoding forced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackRequest {
    pub session_id: SessionId,
    pub item_id: String,
    pub play_method: PlayMethod,
}

#[derive(Debug, Clone)]
pub enum AudioChange {
    /// The backend switched tracks without reloading
    InPlace { audio_stream_index: i32 },
    Renegotiated(Box<PlaybackStart>),
}

#[derive(Debug, Clone)]
pub enum SubtitleChange {
    Off,
    /// Text track served by the server, rendered by the UI
    External { url: String },
    /// Image track burned in by a server transcode
    BurnIn(Box<PlaybackStart>),
}

/// Outcome of negotiation with the server
struct Negotiated {
    source: MediaSource,
    play_method: PlayMethod,
    play_session_id: Option<String>,
    audio_stream_index: Option<i32>,
    subtitle_stream_index: Option<i32>,
}

struct ActiveSession {
    session: PlaybackSession,
    options: StartOptions,
    creds: ServerCredentials,
    source: MediaSource,
    backend: SharedBackend,
    monitor: Arc<parking_lot::Mutex<HealthMonitor>>,
    reports: Arc<watch::Sender<PlaybackReport>>,
    progress: PeriodicTask,
    health: PeriodicTask,
    events: JoinHandle<()>,
}

impl ActiveSession {
    /// Options that re-create this session at its current position
    async fn restart_options(&self) -> StartOptions {
        let position = self.backend.lock().await.position();
        StartOptions {
            media_source_id: Some(self.session.media_source_id.clone()),
            audio_stream_index: self.session.audio_stream_index,
            subtitle_stream_index: self.session.subtitle_stream_index,
            start_position_ticks: Some(seconds_to_ticks(position)),
            force_transcode: false,
            ..self.options.clone()
        }
    }
}

/// Sends a fallback request when the monitor asks for one
#[derive(Clone)]
struct FallbackNotifier {
    tx: mpsc::UnboundedSender<FallbackRequest>,
    request: FallbackRequest,
}

impl FallbackNotifier {
    fn check(&self, monitor: &mut HealthMonitor) {
        if monitor.should_fallback_to_transcode() && self.tx.send(self.request.clone()).is_err() {
            debug!("Nobody is listening for fallback requests");
        }
    }
}

/// Periodic sampling of the backend for progress reports and stall detection
#[derive(Clone)]
struct HealthSampler {
    backend: SharedBackend,
    monitor: Arc<parking_lot::Mutex<HealthMonitor>>,
    reports: Arc<watch::Sender<PlaybackReport>>,
    notifier: FallbackNotifier,
}

impl HealthSampler {
    async fn sample(&self) {
        let (position, state) = {
            let backend = self.backend.lock().await;
            (backend.position(), backend.state())
        };
        if !state.has_media() {
            return;
        }
        self.reports.send_modify(|r| {
            r.position_ticks = seconds_to_ticks(position);
            r.is_paused = state == BackendState::Paused;
        });
        let mut monitor = self.monitor.lock();
        monitor.observe_position(position, state == BackendState::Playing);
        self.notifier.check(&mut monitor);
    }
}

async fn watch_events(
    mut events: Subscription,
    monitor: Arc<parking_lot::Mutex<HealthMonitor>>,
    notifier: FallbackNotifier,
) {
    while let Some(event) = events.recv().await {
        match event {
            BackendEvent::Buffering { active: true } => {
                let mut monitor = monitor.lock();
                monitor.record_buffering();
                notifier.check(&mut monitor);
            }
            BackendEvent::Error { error } => {
                warn!(item_id = %notifier.request.item_id, error = %error, "Backend error during playback");
            }
            BackendEvent::Ended => debug!(item_id = %notifier.request.item_id, "Playback ended"),
            _ => {}
        }
    }
}

/// Text subtitles the server can deliver as a sidecar file
fn is_sidecar_subtitle(stream: &MediaStream) -> bool {
    stream.is_text_subtitle_stream && !matches!(stream.codec_name().as_str(), "ass" | "ssa")
}

/// Owner of the current playback session
pub struct PlaybackManager {
    capabilities: Arc<CapabilityContext>,
    catalog: Arc<dyn CatalogService>,
    credentials: Arc<dyn CredentialProvider>,
    factory: BackendFactory,
    config: EngineConfig,
    generation: AtomicU64,
    /// Held from backend creation until the backend is installed or destroyed
    pipeline: Mutex<()>,
    active: Mutex<Option<ActiveSession>>,
    fallback_tx: mpsc::UnboundedSender<FallbackRequest>,
    fallback_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<FallbackRequest>>>,
}

impl PlaybackManager {
    pub fn new(
        capabilities: Arc<CapabilityContext>,
        catalog: Arc<dyn CatalogService>,
        credentials: Arc<dyn CredentialProvider>,
        drivers: Arc<dyn DriverProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (fallback_tx, fallback_rx) = mpsc::unbounded_channel();
        Ok(Self {
            capabilities,
            catalog,
            credentials,
            factory: BackendFactory::new(drivers, config.backend.clone()),
            config,
            generation: AtomicU64::new(0),
            pipeline: Mutex::new(()),
            active: Mutex::new(None),
            fallback_tx,
            fallback_rx: parking_lot::Mutex::new(Some(fallback_rx)),
        })
    }

    /// Receiver of health-triggered fallback requests; available once
    pub fn take_fallback_receiver(&self) -> Option<mpsc::UnboundedReceiver<FallbackRequest>> {
        self.fallback_rx.lock().take()
    }

    /// Negotiate and start playback of `item_id`, replacing any current session
    #[instrument(skip(self, options))]
    pub async fn start(&self, item_id: &str, options: StartOptions) -> Result<PlaybackStart> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shutdown_active().await;

        let creds = self
            .credentials
            .credentials(options.server_id.as_deref())
            .await
            .ok_or_else(|| {
                Error::MissingCredentials(
                    options.server_id.clone().unwrap_or_else(|| "default server".to_string()),
                )
            })?;
        let caps = self.capabilities.capabilities().await;
        let negotiated = self.negotiate(&creds, item_id, &options, &caps).await?;
        self.ensure_current(generation, item_id)?;

        let source = &negotiated.source;
        let play_method = negotiated.play_method;
        let ctx = UrlContext {
            creds: &creds,
            item_id,
            source,
            play_session_id: negotiated.play_session_id.as_deref(),
            media_type: options.media_type,
        };
        let url = urls::playback_url(&ctx, play_method)?;
        let container = match play_method {
            PlayMethod::Transcode => source.transcoding_container.as_deref(),
            _ => source.container.as_deref(),
        };
        let mime_type = urls::mime_type(&url, container, options.media_type);

        // transcodes are delivered in SDR
        let video_range = match play_method {
            PlayMethod::Transcode => VideoRangeType::Sdr,
            _ => source.video_stream().map_or(VideoRangeType::Sdr, |v| v.range()),
        };
        let priority = BackendPriority::for_stream(&url, Some(mime_type), video_range.is_hdr());

        // one backend pipeline at a time; a start that lost the race while
        // waiting never touches the drivers
        let _pipeline = self.pipeline.lock().await;
        self.ensure_current(generation, item_id)?;
        let mut backend = self.factory.create(&priority, &caps).await?;

        let start_position_ticks = options.start_position_ticks.unwrap_or(0).max(0);
        let load = LoadOptions {
            start_position: ticks_to_seconds(start_position_ticks),
            mime_type: Some(mime_type.to_string()),
            bitrate: source.bitrate,
            video_range,
        };
        if let Err(e) = backend.load(&url, &load).await {
            backend.destroy().await;
            return Err(e);
        }

        let chapters = self.chapters(&creds, item_id, &options).await;
        let subtitle_url = negotiated
            .subtitle_stream_index
            .and_then(|i| source.stream(i))
            .filter(|s| is_sidecar_subtitle(s))
            .map(|s| {
                urls::subtitle_url(&creds, item_id, &source.id, s, self.config.negotiation.subtitle_cue_list)
            });

        let session = PlaybackSession {
            id: SessionId::new(),
            item_id: item_id.to_string(),
            server_id: options.server_id.clone(),
            media_source_id: source.id.clone(),
            play_session_id: negotiated.play_session_id.clone(),
            play_method,
            audio_stream_index: negotiated.audio_stream_index,
            subtitle_stream_index: negotiated.subtitle_stream_index,
            start_position_ticks,
            url,
            mime_type: mime_type.to_string(),
            backend: backend.kind(),
        };
        let report = PlaybackReport {
            item_id: item_id.to_string(),
            media_source_id: source.id.clone(),
            play_session_id: session.play_session_id.clone(),
            play_method,
            position_ticks: start_position_ticks,
            audio_stream_index: session.audio_stream_index,
            subtitle_stream_index: session.subtitle_stream_index,
            is_paused: false,
            can_seek: true,
        };
        let start = PlaybackStart {
            session: session.clone(),
            audio_streams: source.audio_streams().cloned().collect(),
            subtitle_streams: source.subtitle_streams().cloned().collect(),
            chapters,
            subtitle_url,
        };

        let mut active = self.active.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            drop(active);
            backend.destroy().await;
            debug!("Negotiation superseded after load");
            return Err(Error::Superseded {
                item_id: item_id.to_string(),
            });
        }
        if let Err(e) = self.catalog.report_playback_start(&creds, &report).await {
            warn!(error = %e, "Playback start report failed");
        }

        info!(
            session_id = %session.id,
            media_source_id = %session.media_source_id,
            play_method = %play_method,
            backend = %session.backend,
            "Playback started"
        );
        *active = Some(self.activate(session, options, creds, negotiated.source, backend, report));
        Ok(start)
    }

    fn ensure_current(&self, generation: u64, item_id: &str) -> Result<()> {
        if self.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            debug!(item_id, "Discarding stale negotiation");
            Err(Error::Superseded {
                item_id: item_id.to_string(),
            })
        }
    }

    /// Fetch playback info, select a source and, when the default audio
    /// track cannot be decoded, ask again with a compatible track
    async fn negotiate(
        &self,
        creds: &ServerCredentials,
        item_id: &str,
        options: &StartOptions,
        caps: &CapabilityProfile,
    ) -> Result<Negotiated> {
        let negotiation = &self.config.negotiation;
        let profile = DeviceProfile::build(
            caps,
            &ProfileOptions {
                force_transcode: options.force_transcode,
                max_streaming_bitrate: negotiation.max_streaming_bitrate,
            },
        );
        let mut request = PlaybackInfoRequest::new(&creds.user_id, profile);
        request.media_source_id = options.media_source_id.clone();
        request.audio_stream_index = options.audio_stream_index;
        request.subtitle_stream_index = options.subtitle_stream_index;
        request.max_streaming_bitrate = negotiation.max_streaming_bitrate;
        request.start_time_ticks = options.start_position_ticks;
        if options.force_transcode {
            request = request.force_transcode();
        }

        let mut selection_options = SelectionOptions {
            media_source_id: options.media_source_id.clone(),
            audio_stream_index: options.audio_stream_index,
            subtitle_stream_index: options.subtitle_stream_index,
        };

        let mut info = self.catalog.get_playback_info(creds, item_id, &request).await?;
        if let Some(code) = info.error_code.as_deref() {
            warn!(error_code = code, "Server reported a playback info error");
        }
        let renegotiate = {
            let selection = select(&info.media_sources, caps, &selection_options).ok_or_else(|| {
                Error::NoPlayableSource {
                    item_id: item_id.to_string(),
                }
            })?;
            audio_renegotiation_index(&selection, caps, &selection_options)
                .filter(|_| negotiation.audio_renegotiation)
                .map(|index| (selection.source.id.clone(), index))
        };

        if let Some((source_id, index)) = renegotiate {
            info!(source_id = %source_id, audio_stream_index = index, "Default audio unsupported, renegotiating");
            request.media_source_id = Some(source_id.clone());
            request.audio_stream_index = Some(index);
            info = self.catalog.get_playback_info(creds, item_id, &request).await?;
            selection_options.media_source_id = Some(source_id);
            selection_options.audio_stream_index = Some(index);
        }

        let selection = select(&info.media_sources, caps, &selection_options).ok_or_else(|| {
            Error::NoPlayableSource {
                item_id: item_id.to_string(),
            }
        })?;
        let play_method = if options.force_transcode {
            PlayMethod::Transcode
        } else {
            selection.play_method
        };
        let source = selection.source.clone();
        let audio_stream_index = selection_options
            .audio_stream_index
            .or_else(|| source.default_audio_stream().map(|s| s.index));
        let subtitle_stream_index = selection_options
            .subtitle_stream_index
            .or(source.default_subtitle_stream_index)
            .filter(|i| *i >= 0);

        debug!(
            source_id = %source.id,
            play_method = %play_method,
            score = selection.score,
            audio_stream_index = ?audio_stream_index,
            "Negotiation complete"
        );
        Ok(Negotiated {
            source,
            play_method,
            play_session_id: info.play_session_id,
            audio_stream_index,
            subtitle_stream_index,
        })
    }

    async fn chapters(&self, creds: &ServerCredentials, item_id: &str, options: &StartOptions) -> Vec<Chapter> {
        if let Some(chapters) = options.chapters.as_ref().filter(|c| !c.is_empty()) {
            return chapters.iter().map(Chapter::from).collect();
        }
        match self.catalog.get_item(creds, item_id).await {
            Ok(item) => item.chapters.iter().map(Chapter::from).collect(),
            Err(e) => {
                debug!(error = %e, "No chapters available");
                Vec::new()
            }
        }
    }

    /// Wire up supervision for a freshly loaded backend
    fn activate(
        &self,
        session: PlaybackSession,
        options: StartOptions,
        creds: ServerCredentials,
        source: MediaSource,
        mut backend: Box<dyn PlayerBackend>,
        report: PlaybackReport,
    ) -> ActiveSession {
        let subscription = backend.subscribe();
        let backend: SharedBackend = Arc::new(Mutex::new(backend));
        let monitor = Arc::new(parking_lot::Mutex::new(HealthMonitor::new(
            self.config.health.clone(),
            session.play_method,
        )));
        let (reports, report_rx) = watch::channel(report);
        let reports = Arc::new(reports);
        let notifier = FallbackNotifier {
            tx: self.fallback_tx.clone(),
            request: FallbackRequest {
                session_id: session.id,
                item_id: session.item_id.clone(),
                play_method: session.play_method,
            },
        };

        let mut progress = PeriodicTask::new();
        ProgressReporter::new(Arc::clone(&self.catalog), creds.clone(), report_rx)
            .start(&mut progress, self.config.progress.interval());

        let sampler = HealthSampler {
            backend: Arc::clone(&backend),
            monitor: Arc::clone(&monitor),
            reports: Arc::clone(&reports),
            notifier: notifier.clone(),
        };
        let mut health = PeriodicTask::new();
        health.start(self.config.health.check_interval(), move || {
            let sampler = sampler.clone();
            async move { sampler.sample().await }
        });

        let events = tokio::spawn(watch_events(subscription, Arc::clone(&monitor), notifier));

        ActiveSession {
            session,
            options,
            creds,
            source,
            backend,
            monitor,
            reports,
            progress,
            health,
            events,
        }
    }

    /// Stop supervision, flush the stop report, then release the backend
    async fn finish(&self, mut active: ActiveSession) {
        active.progress.stop();
        active.health.stop();
        active.events.abort();

        let position = active.backend.lock().await.position();
        active.reports.send_modify(|r| r.position_ticks = seconds_to_ticks(position));
        let report = active.reports.borrow().clone();
        if let Err(e) = self.catalog.report_playback_stopped(&active.creds, &report).await {
            warn!(item_id = %report.item_id, error = %e, "Playback stop report failed");
        }

        active.backend.lock().await.destroy().await;
        info!(session_id = %active.session.id, item_id = %active.session.item_id, "Playback stopped");
    }

    async fn shutdown_active(&self) {
        let previous = self.active.lock().await.take();
        if let Some(active) = previous {
            self.finish(active).await;
        }
    }

    /// Stop the current session
    pub async fn report_stop(&self) -> Result<()> {
        let active = self.active.lock().await.take().ok_or(Error::NoActiveSession)?;
        self.finish(active).await;
        Ok(())
    }

    /// Switch audio tracks. Direct play switches in place when the backend
    /// can and the device decodes the new track; everything else
    /// renegotiates with it.
    #[instrument(skip(self))]
    pub async fn change_audio_stream(&self, index: i32) -> Result<AudioChange> {
        let caps = self.capabilities.capabilities().await;
        let (item_id, options) = {
            let mut guard = self.active.lock().await;
            let active = guard.as_mut().ok_or(Error::NoActiveSession)?;
            let decodable = active
                .source
                .stream(index)
                .filter(|s| s.stream_type == MediaStreamType::Audio)
                .map(|s| audio_stream_supported(s, &caps))
                .ok_or_else(|| Error::SourceNotFound(format!("audio stream {index}")))?;

            if !decodable {
                info!(audio_stream_index = index, "Audio track not decodable on device");
            } else if active.session.play_method == PlayMethod::DirectPlay {
                let switched = match active.backend.lock().await.select_audio_track(index).await {
                    Ok(switched) => switched,
                    Err(e) => {
                        debug!(error = %e, "In-place audio switch failed");
                        false
                    }
                };
                if switched {
                    active.session.audio_stream_index = Some(index);
                    active.reports.send_modify(|r| r.audio_stream_index = Some(index));
                    info!(audio_stream_index = index, "Audio track switched in place");
                    return Ok(AudioChange::InPlace {
                        audio_stream_index: index,
                    });
                }
            }

            let mut options = active.restart_options().await;
            options.audio_stream_index = Some(index);
            (active.session.item_id.clone(), options)
        };

        let start = self.start(&item_id, options).await?;
        Ok(AudioChange::Renegotiated(Box::new(start)))
    }

    /// Switch subtitles. Text tracks are delivered as a sidecar URL, image
    /// tracks need a burn-in transcode.
    #[instrument(skip(self))]
    pub async fn change_subtitle_stream(&self, index: Option<i32>) -> Result<SubtitleChange> {
        let (item_id, options) = {
            let mut guard = self.active.lock().await;
            let active = guard.as_mut().ok_or(Error::NoActiveSession)?;

            let Some(index) = index else {
                if let Err(e) = active.backend.lock().await.select_subtitle_track(None).await {
                    debug!(error = %e, "Backend subtitle reset failed");
                }
                active.session.subtitle_stream_index = None;
                active.reports.send_modify(|r| r.subtitle_stream_index = None);
                return Ok(SubtitleChange::Off);
            };

            let stream = active
                .source
                .stream(index)
                .filter(|s| s.stream_type == MediaStreamType::Subtitle)
                .ok_or_else(|| Error::SourceNotFound(format!("subtitle stream {index}")))?;

            if is_sidecar_subtitle(stream) {
                let url = urls::subtitle_url(
                    &active.creds,
                    &active.session.item_id,
                    &active.session.media_source_id,
                    stream,
                    self.config.negotiation.subtitle_cue_list,
                );
                active.session.subtitle_stream_index = Some(index);
                active.reports.send_modify(|r| r.subtitle_stream_index = Some(index));
                return Ok(SubtitleChange::External { url });
            }

            info!(subtitle_stream_index = index, "Image subtitle requires burn-in");
            let mut options = active.restart_options().await;
            options.subtitle_stream_index = Some(index);
            options.force_transcode = true;
            (active.session.item_id.clone(), options)
        };

        let start = self.start(&item_id, options).await?;
        Ok(SubtitleChange::BurnIn(Box::new(start)))
    }

    /// Restart the session `session_id` with transcoding forced, at the
    /// current position. A request for a session that has since been
    /// replaced is answered with [`Error::Superseded`].
    #[instrument(skip(self))]
    pub async fn fallback_to_transcode(&self, session_id: SessionId) -> Result<PlaybackStart> {
        let (item_id, options) = {
            let guard = self.active.lock().await;
            let active = guard.as_ref().ok_or(Error::NoActiveSession)?;
            if active.session.id != session_id {
                debug!(session_id = %session_id, current = %active.session.id, "Fallback for a replaced session");
                return Err(Error::Superseded {
                    item_id: active.session.item_id.clone(),
                });
            }
            let mut options = active.restart_options().await;
            options.force_transcode = true;
            (active.session.item_id.clone(), options)
        };
        warn!(item_id = %item_id, "Falling back to transcode");
        self.start(&item_id, options).await
    }

    async fn backend(&self) -> Result<SharedBackend> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| Arc::clone(&a.backend))
            .ok_or(Error::NoActiveSession)
    }

    /// Forward a platform driver notification to the current backend
    pub async fn dispatch_driver_event(&self, event: DriverEvent) -> Result<()> {
        let backend = self.backend().await?;
        let mut backend = backend.lock().await;
        backend.handle_driver_event(event).await;
        Ok(())
    }

    /// Backend events of the current session
    pub async fn subscribe_events(&self) -> Result<Subscription> {
        let backend = self.backend().await?;
        let mut backend = backend.lock().await;
        Ok(backend.subscribe())
    }

    pub async fn play(&self) -> Result<()> {
        let backend = self.backend().await?;
        let mut backend = backend.lock().await;
        backend.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        let backend = self.backend().await?;
        let mut backend = backend.lock().await;
        backend.pause().await
    }

    pub async fn seek(&self, position: f64) -> Result<()> {
        let backend = self.backend().await?;
        let mut backend = backend.lock().await;
        backend.seek(position).await
    }

    pub async fn current_session(&self) -> Option<PlaybackSession> {
        self.active.lock().await.as_ref().map(|a| a.session.clone())
    }

    pub async fn health_status(&self) -> Option<HealthStatus> {
        self.active.lock().await.as_ref().map(|a| a.monitor.lock().status())
    }
}
