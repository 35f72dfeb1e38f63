//! Playback health supervision
//!
//! The monitor counts buffering events in a rolling window and stalls
//! (playing, but the position does not move). Crossing either limit after
//! the grace period marks the session unhealthy. The transcode fallback is
//! requested at most once per unhealthy episode; renewed progress ends the
//! episode and clears the counters.

use crate::config::HealthConfig;
use crate::types::PlayMethod;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Position changes smaller than this (seconds) are not progress
const PROGRESS_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    /// Unhealthy, fallback not yet requested
    Unhealthy,
    /// Unhealthy, fallback already requested
    UnhealthyReported,
}

#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    play_method: PlayMethod,
    started_at: Instant,
    buffering_events: VecDeque<Instant>,
    stalls: u32,
    last_progress: Instant,
    last_position: Option<f64>,
    status: HealthStatus,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig, play_method: PlayMethod) -> Self {
        let now = Instant::now();
        Self {
            config,
            play_method,
            started_at: now,
            buffering_events: VecDeque::new(),
            stalls: 0,
            last_progress: now,
            last_position: None,
            status: HealthStatus::Healthy,
        }
    }

    /// Start over for a new session
    pub fn reset(&mut self, play_method: PlayMethod) {
        *self = Self::new(self.config.clone(), play_method);
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn stall_count(&self) -> u32 {
        self.stalls
    }

    pub fn in_grace_period(&self) -> bool {
        self.started_at.elapsed() < self.config.grace_period()
    }

    fn mark_unhealthy(&mut self, reason: &str) {
        if self.status == HealthStatus::Healthy {
            warn!(
                reason,
                stalls = self.stalls,
                buffering_events = self.buffering_events.len(),
                play_method = %self.play_method,
                "Playback unhealthy"
            );
            self.status = HealthStatus::Unhealthy;
        }
    }

    pub fn record_buffering(&mut self) {
        if self.in_grace_period() {
            debug!("Buffering during grace period ignored");
            return;
        }
        let now = Instant::now();
        let window = self.config.buffering_window();
        while self
            .buffering_events
            .front()
            .is_some_and(|t| now.duration_since(*t) > window)
        {
            self.buffering_events.pop_front();
        }
        self.buffering_events.push_back(now);

        if self.buffering_events.len() > self.config.max_buffering_events {
            self.mark_unhealthy("buffering");
        }
    }

    pub fn record_stall(&mut self) {
        if self.in_grace_period() {
            debug!("Stall during grace period ignored");
            return;
        }
        self.stalls += 1;
        if self.stalls > self.config.max_stalls {
            self.mark_unhealthy("stalls");
        }
    }

    /// Count a stall when playing without progress for the stall timeout.
    /// Returns whether a stall was recorded.
    pub fn check_stall(&mut self, playing: bool) -> bool {
        if !playing || self.in_grace_period() {
            return false;
        }
        if self.last_progress.elapsed() < self.config.stall_timeout() {
            return false;
        }
        self.record_stall();
        // next stall needs another full timeout
        self.last_progress = Instant::now();
        true
    }

    /// Playback moved forward; ends an unhealthy episode
    pub fn record_progress(&mut self) {
        self.last_progress = Instant::now();
        if self.status != HealthStatus::Healthy {
            info!("Playback recovered");
            self.status = HealthStatus::Healthy;
            self.stalls = 0;
            self.buffering_events.clear();
        }
    }

    /// Feed a sampled position; movement counts as progress, standing
    /// still while playing is checked for a stall
    pub fn observe_position(&mut self, position: f64, playing: bool) {
        match self.last_position.replace(position) {
            None => self.last_progress = Instant::now(),
            Some(last) if (position - last).abs() > PROGRESS_EPSILON => self.record_progress(),
            Some(_) => {
                self.check_stall(playing);
            }
        }
    }

    /// True exactly once per unhealthy episode, never while transcoding
    pub fn should_fallback_to_transcode(&mut self) -> bool {
        if self.status != HealthStatus::Unhealthy || self.play_method == PlayMethod::Transcode {
            return false;
        }
        self.status = HealthStatus::UnhealthyReported;
        info!(play_method = %self.play_method, "Requesting transcode fallback");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::advance;

    fn monitor(method: PlayMethod) -> HealthMonitor {
        HealthMonitor::new(HealthConfig::default(), method)
    }

    async fn past_grace() {
        advance(Duration::from_secs(21)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_period_ignores_everything() {
        let mut m = monitor(PlayMethod::DirectPlay);
        for _ in 0..10 {
            m.record_buffering();
            m.record_stall();
        }
        advance(Duration::from_secs(16)).await;
        assert!(!m.check_stall(true));
        assert_eq!(m.status(), HealthStatus::Healthy);
        assert!(!m.should_fallback_to_transcode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffering_threshold_in_window() {
        let mut m = monitor(PlayMethod::DirectPlay);
        past_grace().await;

        for _ in 0..3 {
            m.record_buffering();
        }
        // at the limit is still healthy
        assert_eq!(m.status(), HealthStatus::Healthy);
        m.record_buffering();
        assert_eq!(m.status(), HealthStatus::Unhealthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_buffering_events_expire() {
        let mut m = monitor(PlayMethod::DirectPlay);
        past_grace().await;

        m.record_buffering();
        m.record_buffering();
        m.record_buffering();
        advance(Duration::from_secs(61)).await;
        m.record_buffering();
        assert_eq!(m.status(), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_once_per_episode() {
        let mut m = monitor(PlayMethod::DirectStream);
        past_grace().await;

        m.record_stall();
        m.record_stall();
        assert_eq!(m.status(), HealthStatus::Healthy);
        m.record_stall();
        assert_eq!(m.status(), HealthStatus::Unhealthy);
        assert!(m.should_fallback_to_transcode());
        assert!(!m.should_fallback_to_transcode());
        assert_eq!(m.status(), HealthStatus::UnhealthyReported);

        m.record_progress();
        assert_eq!(m.status(), HealthStatus::Healthy);
        assert_eq!(m.stall_count(), 0);

        for _ in 0..3 {
            m.record_stall();
        }
        assert!(m.should_fallback_to_transcode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_falls_back_from_transcode() {
        let mut m = monitor(PlayMethod::Transcode);
        past_grace().await;
        for _ in 0..3 {
            m.record_stall();
        }
        assert_eq!(m.status(), HealthStatus::Unhealthy);
        assert!(!m.should_fallback_to_transcode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_detection_from_positions() {
        let mut m = monitor(PlayMethod::DirectPlay);
        past_grace().await;
        m.observe_position(100.0, true);

        advance(Duration::from_secs(16)).await;
        m.observe_position(100.0, true);
        assert_eq!(m.stall_count(), 1);

        // paused playback is not a stall
        advance(Duration::from_secs(16)).await;
        m.observe_position(100.0, false);
        assert_eq!(m.stall_count(), 1);

        m.observe_position(100.0, true);
        assert_eq!(m.stall_count(), 2);
        assert_eq!(m.status(), HealthStatus::Healthy);

        advance(Duration::from_secs(16)).await;
        m.observe_position(100.0, true);
        assert_eq!(m.stall_count(), 3);
        assert_eq!(m.status(), HealthStatus::Unhealthy);

        m.observe_position(104.0, true);
        assert_eq!(m.status(), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restarts_grace() {
        let mut m = monitor(PlayMethod::DirectPlay);
        past_grace().await;
        m.record_stall();
        m.reset(PlayMethod::Transcode);
        assert!(m.in_grace_period());
        assert_eq!(m.stall_count(), 0);
    }
}
