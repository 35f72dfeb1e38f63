//! Backend event delivery
//!
//! Every subscriber gets its own unbounded channel, so events arrive in
//! emission order and a slow reader never blocks the backend. Closing the
//! bus drops all senders, which ends every open [`Subscription`].

use crate::error::DriverError;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

/// Notification raised by a playback backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BackendEvent {
    /// Media is loaded and ready to play
    Loaded { duration: Option<f64> },
    /// Unrecoverable failure; the backend is now in the error state
    Error {
        #[serde(serialize_with = "serialize_driver_error")]
        error: DriverError,
    },
    /// Playback stalled waiting for data (`true`) or resumed (`false`)
    Buffering { active: bool },
    /// Rendition or decoder output changed
    QualityChange {
        bitrate: Option<u64>,
        height: Option<u32>,
    },
    /// Reached the end of the media
    Ended,
}

fn serialize_driver_error<S: serde::Serializer>(
    error: &DriverError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Fan-out of backend events to subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Vec<mpsc::UnboundedSender<BackendEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        Subscription { rx }
    }

    /// Deliver an event, dropping subscribers that went away
    pub fn emit(&mut self, event: BackendEvent) {
        trace!(?event, subscribers = self.senders.len(), "Backend event");
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Unsubscribe everyone
    pub fn close(&mut self) {
        self.senders.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

/// Receiving end of a backend event subscription
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<BackendEvent>,
}

impl Subscription {
    /// Next event, `None` once the backend is destroyed and the queue drained
    pub async fn recv(&mut self) -> Option<BackendEvent> {
        self.rx.recv().await
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<BackendEvent> {
        self.rx.try_recv().ok()
    }

    /// All queued events
    pub fn drain(&mut self) -> Vec<BackendEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
