//! Error types for jellytv Core

use std::fmt;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Error, Debug)]
pub enum Error {
    // Negotiation errors
    #[error("No playable media source for item {item_id}")]
    NoPlayableSource { item_id: String },

    #[error("Media source not found: {0}")]
    SourceNotFound(String),

    #[error("No playback backend available (tried: {})", .attempted.join(", "))]
    NoBackendAvailable { attempted: Vec<String> },

    #[error("Server did not provide a transcoding URL for source {source_id}")]
    MissingTranscodingUrl { source_id: String },

    #[error("No credentials for server {0}")]
    MissingCredentials(String),

    #[error("Negotiation for item {item_id} was superseded by a newer request")]
    Superseded { item_id: String },

    // Session errors
    #[error("No active playback session")]
    NoActiveSession,

    #[error("Invalid backend state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // Backend errors
    #[error("Backend failed to load media: {0}")]
    BackendLoad(DriverError),

    #[error("Playback driver error: {0}")]
    Driver(DriverError),

    // Catalog errors
    #[error("Catalog request failed with status {status}: {message}")]
    Catalog { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Catalog { status, .. } => *status >= 500,
            Error::BackendLoad(e) | Error::Driver(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error code for logging and UI telemetry
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NoPlayableSource { .. } => "NO_PLAYABLE_SOURCE",
            Error::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Error::NoBackendAvailable { .. } => "NO_BACKEND",
            Error::MissingTranscodingUrl { .. } => "NO_TRANSCODING_URL",
            Error::MissingCredentials(_) => "NO_CREDENTIALS",
            Error::Superseded { .. } => "SUPERSEDED",
            Error::NoActiveSession => "NO_SESSION",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::BackendLoad(_) => "BACKEND_LOAD",
            Error::Driver(_) => "DRIVER",
            Error::Catalog { .. } => "CATALOG",
            Error::Network(_) => "NETWORK",
            Error::Json(_) => "JSON",
            Error::Url(_) => "URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
        }
    }

    /// Single blocking message shown to the viewer when a start attempt fails
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::NoPlayableSource { .. } | Error::MissingTranscodingUrl { .. } => {
                "This item can't be played on this device."
            }
            Error::NoBackendAvailable { .. } => "No video player is available on this device.",
            Error::MissingCredentials(_) => "Sign in to the server that hosts this item.",
            Error::Network(_) | Error::Catalog { .. } => "The server could not be reached.",
            Error::BackendLoad(_) => "Playback failed to start.",
            _ => "Something went wrong while starting playback.",
        }
    }
}

/// Failure category reported by a platform playback driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Manifest or segment fetch failed; `status` is the HTTP status when known
    Network { status: Option<u16> },
    /// Demux or decode failure
    Media,
    /// Anything else the driver cannot classify
    Other,
}

/// Error raised by a platform driver (decoder, streaming engine, media element)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub fatal: bool,
    pub message: String,
}

impl DriverError {
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Network { status },
            fatal: true,
            message: message.into(),
        }
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Media,
            fatal: true,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Other,
            fatal: true,
            message: message.into(),
        }
    }

    /// Mark the error as non-fatal (the driver keeps going on its own)
    pub fn non_fatal(mut self) -> Self {
        self.fatal = false;
        self
    }

    /// 4xx responses will not succeed on retry
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, DriverErrorKind::Network { status: Some(s) } if (400..500).contains(&s))
    }

    /// Network failures other than 4xx are worth another load attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DriverErrorKind::Network { .. }) && !self.is_client_error()
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DriverErrorKind::Network { status: Some(s) } => format!("network ({s})"),
            DriverErrorKind::Network { status: None } => "network".to_string(),
            DriverErrorKind::Media => "media".to_string(),
            DriverErrorKind::Other => "other".to_string(),
        };
        write!(f, "{} error: {}", kind, self.message)
    }
}

impl std::error::Error for DriverError {}
