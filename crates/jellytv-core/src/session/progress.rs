//! Periodic tasks and progress reporting

use crate::catalog::{CatalogService, PlaybackReport};
use crate::types::ServerCredentials;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// A repeating background task. Starting a running task and stopping a
/// stopped one are both no-ops; dropping the handle stops it.
#[derive(Debug, Default)]
pub struct PeriodicTask {
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `tick` every `period`, first after one full period.
    /// Returns `false` if already running.
    pub fn start<F, Fut>(&mut self, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        self.handle = Some(handle);
        true
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sends the latest session descriptor to the server on every tick
#[derive(Clone)]
pub struct ProgressReporter {
    catalog: Arc<dyn CatalogService>,
    creds: ServerCredentials,
    reports: watch::Receiver<PlaybackReport>,
}

impl ProgressReporter {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        creds: ServerCredentials,
        reports: watch::Receiver<PlaybackReport>,
    ) -> Self {
        Self {
            catalog,
            creds,
            reports,
        }
    }

    /// Report once; failures are logged and otherwise ignored
    pub async fn report(&self) {
        let report = self.reports.borrow().clone();
        match self.catalog.report_playback_progress(&self.creds, &report).await {
            Ok(()) => debug!(item_id = %report.item_id, position_ticks = report.position_ticks, "Progress reported"),
            Err(e) => warn!(item_id = %report.item_id, error = %e, "Progress report failed"),
        }
    }

    /// Report on `task` every `period`
    pub fn start(self, task: &mut PeriodicTask, period: Duration) -> bool {
        task.start(period, move || {
            let reporter = self.clone();
            async move { reporter.report().await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemDetails, PlayMethod, PlaybackInfo};
    use crate::catalog::PlaybackInfoRequest;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingCatalog {
        progress: Mutex<Vec<i64>>,
        fail: bool,
    }

    #[async_trait]
    impl CatalogService for RecordingCatalog {
        async fn get_playback_info(
            &self,
            _creds: &ServerCredentials,
            _item_id: &str,
            _request: &PlaybackInfoRequest,
        ) -> Result<PlaybackInfo> {
            Err(Error::Internal("unused".into()))
        }
        async fn report_playback_start(&self, _: &ServerCredentials, _: &PlaybackReport) -> Result<()> {
            Ok(())
        }
        async fn report_playback_progress(
            &self,
            _creds: &ServerCredentials,
            report: &PlaybackReport,
        ) -> Result<()> {
            self.progress.lock().push(report.position_ticks);
            if self.fail {
                return Err(Error::Catalog {
                    status: 500,
                    message: "down".into(),
                });
            }
            Ok(())
        }
        async fn report_playback_stopped(&self, _: &ServerCredentials, _: &PlaybackReport) -> Result<()> {
            Ok(())
        }
        async fn get_item(&self, _creds: &ServerCredentials, _item_id: &str) -> Result<ItemDetails> {
            Err(Error::Internal("unused".into()))
        }
    }

    fn report() -> PlaybackReport {
        PlaybackReport {
            item_id: "item".into(),
            media_source_id: "ms".into(),
            play_session_id: None,
            play_method: PlayMethod::DirectPlay,
            position_ticks: 0,
            audio_stream_index: None,
            subtitle_stream_index: None,
            is_paused: false,
            can_seek: true,
        }
    }

    fn creds() -> ServerCredentials {
        ServerCredentials::new("http://srv", "tok", "user")
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_task_first_tick_after_period() {
        let count = Arc::new(Mutex::new(0u32));
        let mut task = PeriodicTask::new();
        let counter = Arc::clone(&count);
        assert!(task.start(Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move { *counter.lock() += 1 }
        }));
        assert!(!task.start(Duration::from_secs(1), || async {}));

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(*count.lock(), 0);
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(*count.lock(), 3);

        task.stop();
        task.stop();
        assert!(!task.is_running());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(*count.lock(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_sends_latest_report() {
        let catalog = Arc::new(RecordingCatalog::default());
        let (tx, rx) = watch::channel(report());
        let mut task = PeriodicTask::new();
        ProgressReporter::new(catalog.clone(), creds(), rx).start(&mut task, Duration::from_secs(10));

        tx.send_modify(|r| r.position_ticks = 50_000_000);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        tx.send_modify(|r| r.position_ticks = 150_000_000);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(*catalog.progress.lock(), vec![50_000_000, 150_000_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_survives_failures() {
        let catalog = Arc::new(RecordingCatalog {
            fail: true,
            ..Default::default()
        });
        let (_tx, rx) = watch::channel(report());
        let mut task = PeriodicTask::new();
        ProgressReporter::new(catalog.clone(), creds(), rx).start(&mut task, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(catalog.progress.lock().len(), 3);
        assert!(task.is_running());
    }
}
